//! Trip logging and the periodic progress daemon.
//!
//! Sessions report two kinds of trip events: one sample per accepted
//! position fix and one segment event each time the traveler completes a
//! step. The [`TripLogger`] trait lets embedders route those events to
//! their own storage; [`LogTripLogger`] is the tracing-backed default.
//!
//! [`spawn_progress_logger`] is a separate background task that follows the
//! snapshot broadcast and emits a periodic structured summary, useful for
//! post-trip analysis and for debugging guidance behavior.
//!
//! # Usage
//!
//! ```ignore
//! use wayguide::triplog::{spawn_progress_logger, DEFAULT_LOG_INTERVAL};
//! use tokio_util::sync::CancellationToken;
//!
//! let cancellation = CancellationToken::new();
//! let handle = spawn_progress_logger(
//!     session.subscribe(),
//!     cancellation.clone(),
//!     DEFAULT_LOG_INTERVAL,
//! );
//! ```

use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::position::Position;
use crate::session::ProgressSnapshot;

/// Default progress logging interval (10 seconds).
pub const DEFAULT_LOG_INTERVAL: Duration = Duration::from_secs(10);

/// One accepted position fix, annotated with trip context.
#[derive(Debug, Clone)]
pub struct TripSample {
    /// The accepted fix.
    pub position: Position,
    /// Estimated speed at this fix, in m/s.
    pub speed_mps: f64,
    /// Street the traveler is currently on; empty when unnamed.
    pub street: String,
    /// Meters left to the destination along the route.
    pub remaining_distance_m: f64,
}

/// A completed step, emitted when the step index advances past it.
#[derive(Debug, Clone)]
pub struct TripSegment {
    /// Street the completed step ran along; empty when unnamed.
    pub street: String,
    /// Index of the completed step.
    pub step_index: usize,
    /// Planned length of the completed step, in meters.
    pub distance_m: f64,
    /// Estimated speed when the step completed, in m/s.
    pub speed_mps: f64,
}

/// Sink for trip events.
///
/// Fire-and-forget: implementations must not fail and must not block the
/// position-update path. The session calls these synchronously per update,
/// so anything slow belongs behind a channel inside the implementation.
pub trait TripLogger: Send + Sync {
    /// Record one accepted position fix.
    fn log_sample(&self, sample: &TripSample);

    /// Record one completed step.
    fn log_segment(&self, segment: &TripSegment);
}

/// Default trip logger that emits tracing events at DEBUG level.
#[derive(Debug, Default)]
pub struct LogTripLogger;

impl TripLogger for LogTripLogger {
    fn log_sample(&self, sample: &TripSample) {
        tracing::debug!(
            lat = format!("{:.5}", sample.position.latitude),
            lon = format!("{:.5}", sample.position.longitude),
            speed_mps = format!("{:.1}", sample.speed_mps),
            street = %sample.street,
            remaining_m = format!("{:.0}", sample.remaining_distance_m),
            "Trip sample"
        );
    }

    fn log_segment(&self, segment: &TripSegment) {
        tracing::debug!(
            street = %segment.street,
            step = segment.step_index,
            distance_m = format!("{:.0}", segment.distance_m),
            speed_mps = format!("{:.1}", segment.speed_mps),
            "Step completed"
        );
    }
}

/// Spawns a background task that periodically logs navigation progress.
///
/// The logger follows the snapshot broadcast, keeps the most recent
/// snapshot, and emits a DEBUG-level summary every `interval`. It stops
/// when the cancellation token fires or the broadcast channel closes.
///
/// # Note
///
/// The caller should check if DEBUG logging is enabled before spawning
/// to avoid wasting resources when logs won't be recorded:
///
/// ```ignore
/// if tracing::enabled!(tracing::Level::DEBUG) {
///     spawn_progress_logger(session.subscribe(), cancel, DEFAULT_LOG_INTERVAL);
/// }
/// ```
pub fn spawn_progress_logger(
    mut snapshots: broadcast::Receiver<ProgressSnapshot>,
    cancellation: CancellationToken,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        let mut latest: Option<ProgressSnapshot> = None;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    log_progress(latest.as_ref());
                }
                received = snapshots.recv() => match received {
                    Ok(snapshot) => latest = Some(snapshot),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::debug!(skipped, "Progress logger lagged behind broadcast");
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        tracing::debug!("Progress logger stopped (broadcast closed)");
                        break;
                    }
                },
                _ = cancellation.cancelled() => {
                    tracing::debug!("Progress logger stopped");
                    break;
                }
            }
        }
    })
}

/// Logs the latest snapshot at DEBUG level.
fn log_progress(latest: Option<&ProgressSnapshot>) {
    match latest {
        Some(snapshot) => {
            let (lat, lon) = snapshot
                .position
                .map(|p| (p.latitude, p.longitude))
                .unwrap_or((f64::NAN, f64::NAN));

            tracing::debug!(
                state = %snapshot.state,
                lat = format!("{lat:.5}"),
                lon = format!("{lon:.5}"),
                step = snapshot.step_index,
                remaining_m = format!("{:.0}", snapshot.remaining_distance_m),
                eta_s = format!("{:.0}", snapshot.eta_seconds),
                speed_mps = format!("{:.1}", snapshot.speed_mps),
                off_route = snapshot.off_route,
                "Trip progress"
            );
        }
        None => {
            tracing::debug!("Trip progress (no updates yet)");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::NavigationState;

    #[test]
    fn log_trip_logger_accepts_events() {
        let logger = LogTripLogger;
        logger.log_sample(&TripSample {
            position: Position::new(37.7749, -122.4194),
            speed_mps: 11.2,
            street: "Market Street".to_owned(),
            remaining_distance_m: 1520.0,
        });
        logger.log_segment(&TripSegment {
            street: "Market Street".to_owned(),
            step_index: 0,
            distance_m: 820.0,
            speed_mps: 10.4,
        });
    }

    #[tokio::test]
    async fn progress_logger_stops_on_cancellation() {
        let (tx, rx) = broadcast::channel(4);
        let cancellation = CancellationToken::new();
        let handle = spawn_progress_logger(rx, cancellation.clone(), Duration::from_millis(10));

        tx.send(ProgressSnapshot::empty(NavigationState::Searching))
            .unwrap();
        cancellation.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn progress_logger_stops_when_broadcast_closes() {
        let (tx, rx) = broadcast::channel(4);
        let cancellation = CancellationToken::new();
        let handle = spawn_progress_logger(rx, cancellation, Duration::from_millis(10));

        drop(tx);
        handle.await.unwrap();
    }
}
