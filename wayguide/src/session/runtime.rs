//! Async session runtime and its cloneable handle.
//!
//! The runtime task owns the [`SessionCore`] and serializes everything that
//! mutates it: commands from handles, position fixes, and route results
//! coming back from spawned provider requests. Provider calls are the only
//! slow operation and run as their own tasks, so position ingestion keeps
//! updating progress against the current route while a request is
//! outstanding.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{broadcast, mpsc, watch};
use tokio_util::sync::CancellationToken;

use crate::config::EngineConfig;
use crate::error::RoutingError;
use crate::geo::Point;
use crate::position::Position;
use crate::provider::RouteProvider;
use crate::route::Route;
use crate::triplog::{LogTripLogger, TripLogger};

use super::core::{RoutePurpose, RouteRequest, SessionCore};
use super::state::{NavigationState, ProgressSnapshot, SessionStatus};

/// Commands a handle can send into the runtime.
#[derive(Debug, Clone)]
enum SessionCommand {
    Start { destination: Point },
    Stop,
    Position(Position),
}

/// A provider result tagged for staleness filtering.
#[derive(Debug)]
struct RouteMessage {
    generation: u64,
    purpose: RoutePurpose,
    result: Result<Route, RoutingError>,
}

/// Cloneable handle for driving a running session.
///
/// All methods are safe to call from any task. Commands sent after the
/// runtime has shut down are dropped.
#[derive(Clone)]
pub struct SessionHandle {
    commands: mpsc::Sender<SessionCommand>,
    snapshots: broadcast::Sender<ProgressSnapshot>,
    status: watch::Receiver<SessionStatus>,
}

impl SessionHandle {
    /// Requests navigation toward `destination`.
    ///
    /// The outcome surfaces through snapshots and
    /// [`status`](Self::status): Routing then Navigating on success, Idle
    /// with an error string on failure.
    pub async fn start_navigation(&self, destination: Point) {
        let _ = self
            .commands
            .send(SessionCommand::Start { destination })
            .await;
    }

    /// Stops navigation and returns the session to Idle.
    pub async fn stop_navigation(&self) {
        let _ = self.commands.send(SessionCommand::Stop).await;
    }

    /// Pushes one position fix without blocking.
    ///
    /// Fixes arrive at sub-second cadence; if the session is backed up the
    /// sample is dropped rather than stalling the position source.
    pub fn update_position(&self, position: Position) {
        if self
            .commands
            .try_send(SessionCommand::Position(position))
            .is_err()
        {
            tracing::debug!("Dropped position update (session busy or gone)");
        }
    }

    /// Subscribes to published progress snapshots.
    pub fn subscribe(&self) -> broadcast::Receiver<ProgressSnapshot> {
        self.snapshots.subscribe()
    }

    /// Returns the latest session status.
    pub fn status(&self) -> SessionStatus {
        self.status.borrow().clone()
    }

    /// Returns a watch receiver for awaiting status changes.
    pub fn watch_status(&self) -> watch::Receiver<SessionStatus> {
        self.status.clone()
    }
}

/// The navigation session's runtime task.
///
/// Created together with its [`SessionHandle`]; consumed by
/// [`run`](Self::run).
pub struct SessionRuntime {
    core: SessionCore,
    provider: Arc<dyn RouteProvider>,
    request_timeout: Duration,
    commands: mpsc::Receiver<SessionCommand>,
    route_results_tx: mpsc::Sender<RouteMessage>,
    route_results: mpsc::Receiver<RouteMessage>,
    snapshots: broadcast::Sender<ProgressSnapshot>,
    status_tx: watch::Sender<SessionStatus>,
}

impl SessionRuntime {
    /// Creates a runtime with the tracing-backed trip logger.
    pub fn new(
        provider: Arc<dyn RouteProvider>,
        config: EngineConfig,
    ) -> (Self, SessionHandle) {
        Self::with_trip_logger(provider, config, Arc::new(LogTripLogger))
    }

    /// Creates a runtime with a custom trip logging collaborator.
    pub fn with_trip_logger(
        provider: Arc<dyn RouteProvider>,
        config: EngineConfig,
        trip_logger: Arc<dyn TripLogger>,
    ) -> (Self, SessionHandle) {
        let (command_tx, command_rx) = mpsc::channel(config.command_channel_capacity);
        let (snapshot_tx, _) = broadcast::channel(config.snapshot_channel_capacity);
        let (status_tx, status_rx) =
            watch::channel(SessionStatus::new(NavigationState::Searching));
        let (route_tx, route_rx) = mpsc::channel(4);

        let handle = SessionHandle {
            commands: command_tx,
            snapshots: snapshot_tx.clone(),
            status: status_rx,
        };
        let runtime = Self {
            request_timeout: config.route_request_timeout,
            core: SessionCore::new(config, trip_logger),
            provider,
            commands: command_rx,
            route_results_tx: route_tx,
            route_results: route_rx,
            snapshots: snapshot_tx,
            status_tx,
        };
        (runtime, handle)
    }

    /// Runs the session until the token is cancelled or every handle is
    /// dropped.
    pub async fn run(mut self, cancellation: CancellationToken) {
        tracing::info!(provider = self.provider.name(), "Navigation session running");

        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(command) => self.handle_command(command),
                    None => {
                        tracing::debug!("All session handles dropped");
                        break;
                    }
                },
                Some(message) = self.route_results.recv() => {
                    self.handle_route_message(message);
                }
                _ = cancellation.cancelled() => {
                    tracing::info!("Navigation session shut down");
                    break;
                }
            }
        }
    }

    fn handle_command(&mut self, command: SessionCommand) {
        match command {
            SessionCommand::Start { destination } => {
                let effects = self.core.handle_start(destination);
                if let Some(request) = effects.request {
                    self.dispatch(request);
                }
                self.publish(effects.snapshot);
            }
            SessionCommand::Stop => {
                let snapshot = self.core.handle_stop();
                self.publish(snapshot);
            }
            SessionCommand::Position(position) => {
                let effects = self.core.handle_position(position, Instant::now());
                if let Some(outcome) = &effects.outcome {
                    tracing::debug!(outcome = outcome.name(), "Off-route evaluation");
                }
                if let Some(request) = effects.request {
                    self.dispatch(request);
                }
                if let Some(snapshot) = effects.snapshot {
                    self.publish(snapshot);
                }
            }
        }
    }

    fn handle_route_message(&mut self, message: RouteMessage) {
        let resolution = self.core.handle_route_result(
            message.generation,
            message.purpose,
            message.result,
            Instant::now(),
        );
        if let Some(outcome) = &resolution.outcome {
            tracing::debug!(outcome = outcome.name(), "Reroute resolved");
        }
        if let Some(snapshot) = resolution.snapshot {
            self.publish(snapshot);
        }
    }

    /// Spawns one provider request; its result feeds back into the loop.
    fn dispatch(&self, request: RouteRequest) {
        let provider = Arc::clone(&self.provider);
        let results = self.route_results_tx.clone();
        let timeout = self.request_timeout;
        tracing::debug!(
            provider = provider.name(),
            generation = request.generation,
            purpose = ?request.purpose,
            "Dispatching route request"
        );

        tokio::spawn(async move {
            let computed = tokio::time::timeout(
                timeout,
                provider.compute_route(request.origin, request.destination),
            )
            .await;
            let result = match computed {
                Ok(result) => result,
                Err(_) => Err(RoutingError::Backend {
                    message: format!("route request timed out after {:.0?}", timeout),
                }),
            };
            let message = RouteMessage {
                generation: request.generation,
                purpose: request.purpose,
                result,
            };
            if results.send(message).await.is_err() {
                tracing::debug!("Session gone before route result delivery");
            }
        });
    }

    fn publish(&mut self, snapshot: ProgressSnapshot) {
        // No subscribers is fine.
        let _ = self.snapshots.send(snapshot.clone());
        self.status_tx
            .send_replace(self.core.status_with(Some(snapshot)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::StaticRouteProvider;
    use crate::route::{Leg, Maneuver, Step};

    fn short_route() -> Route {
        let step = Step {
            instruction: "Head out onto First Avenue".to_owned(),
            name: "First Avenue".to_owned(),
            maneuver: Maneuver::new("depart", None, Point::new(0.0, 0.0)),
            polyline: vec![Point::new(0.0, 0.0), Point::new(0.0, 0.01)],
            distance_m: 1112.0,
            duration_s: 111.0,
        };
        Route::from_legs(
            vec![Leg {
                steps: vec![step],
                distance_m: 1112.0,
                duration_s: 111.0,
            }],
            1112.0,
            111.0,
        )
    }

    async fn wait_for_state(
        handle: &SessionHandle,
        want: &str,
    ) -> SessionStatus {
        let mut status = handle.watch_status();
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                if status.borrow().state.name() == want {
                    return status.borrow().clone();
                }
                status.changed().await.expect("runtime alive");
            }
        })
        .await
        .expect("state reached in time")
    }

    #[tokio::test]
    async fn session_starts_in_searching() {
        let provider = Arc::new(StaticRouteProvider::new(short_route()));
        let (_runtime, handle) = SessionRuntime::new(provider, EngineConfig::default());
        assert_eq!(handle.status().state.name(), "Searching");
    }

    #[tokio::test]
    async fn fix_then_start_reaches_navigating() {
        let provider = Arc::new(StaticRouteProvider::new(short_route()));
        let (runtime, handle) = SessionRuntime::new(provider, EngineConfig::default());
        let cancellation = CancellationToken::new();
        let task = tokio::spawn(runtime.run(cancellation.clone()));

        handle.update_position(Position::new(0.0, 0.0));
        wait_for_state(&handle, "Idle").await;

        handle.start_navigation(Point::new(0.0, 0.01)).await;
        let status = wait_for_state(&handle, "Navigating").await;
        assert!(status.last_error.is_none());
        let snapshot = status.latest.expect("published snapshot");
        assert_eq!(snapshot.step_index, 0);
        assert!(!snapshot.off_route);

        cancellation.cancel();
        task.await.expect("clean shutdown");
    }

    #[tokio::test]
    async fn snapshots_reach_subscribers() {
        let provider = Arc::new(StaticRouteProvider::new(short_route()));
        let (runtime, handle) = SessionRuntime::new(provider, EngineConfig::default());
        let cancellation = CancellationToken::new();
        let task = tokio::spawn(runtime.run(cancellation.clone()));

        let mut snapshots = handle.subscribe();
        handle.update_position(Position::new(0.0, 0.0));

        let snapshot = tokio::time::timeout(Duration::from_secs(5), snapshots.recv())
            .await
            .expect("snapshot in time")
            .expect("broadcast alive");
        assert_eq!(snapshot.state.name(), "Idle");
        assert!(snapshot.position.is_some());

        cancellation.cancel();
        task.await.expect("clean shutdown");
    }

    #[tokio::test]
    async fn dropping_all_handles_stops_the_runtime() {
        let provider = Arc::new(StaticRouteProvider::new(short_route()));
        let (runtime, handle) = SessionRuntime::new(provider, EngineConfig::default());
        let task = tokio::spawn(runtime.run(CancellationToken::new()));

        drop(handle);
        tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .expect("runtime exits")
            .expect("clean shutdown");
    }
}
