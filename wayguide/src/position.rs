//! Position fix type for the navigation engine.
//!
//! A [`Position`] is one already-resolved location sample: the engine never
//! sees raw sensor data, only the fused fixes a location source hands it.
//! Fixes are immutable; a new sample is a new value.

use std::time::Instant;

/// One resolved position fix.
///
/// # Timestamp
///
/// The `timestamp` field is monotonic ([`Instant`]) and records when the fix
/// was produced. The session requires non-decreasing timestamps per stream
/// and drops samples older than its latest accepted fix.
#[derive(Debug, Clone, Copy)]
pub struct Position {
    /// Latitude in WGS84 degrees (-90 to 90).
    pub latitude: f64,

    /// Longitude in WGS84 degrees (-180 to 180).
    pub longitude: f64,

    /// Direction of travel in degrees (0-360, 0 = north).
    ///
    /// `None` when the source could not resolve a heading (e.g. stationary).
    pub heading: Option<f64>,

    /// Reported ground speed in m/s.
    ///
    /// `None` when the source does not report speed. Reported values near
    /// standstill are noisy; see the speed policy for how they are vetted.
    pub speed_mps: Option<f64>,

    /// Horizontal accuracy radius in meters, when reported.
    pub accuracy_m: Option<f64>,

    /// When this fix was produced.
    pub timestamp: Instant,
}

impl Position {
    /// Creates a fix at the given coordinates, timestamped now.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            heading: None,
            speed_mps: None,
            accuracy_m: None,
            timestamp: Instant::now(),
        }
    }

    /// Creates a fix with an explicit timestamp.
    ///
    /// Replay and test harnesses use this to feed historical samples with
    /// their original spacing.
    pub fn at(latitude: f64, longitude: f64, timestamp: Instant) -> Self {
        Self {
            latitude,
            longitude,
            heading: None,
            speed_mps: None,
            accuracy_m: None,
            timestamp,
        }
    }

    /// Sets the heading in degrees.
    pub fn with_heading(mut self, heading: f64) -> Self {
        self.heading = Some(heading);
        self
    }

    /// Sets the reported speed in m/s.
    pub fn with_speed_mps(mut self, speed: f64) -> Self {
        self.speed_mps = Some(speed);
        self
    }

    /// Sets the reported accuracy in meters.
    pub fn with_accuracy_m(mut self, accuracy: f64) -> Self {
        self.accuracy_m = Some(accuracy);
        self
    }

    /// Age of this fix relative to `now`.
    ///
    /// Saturates to zero if `now` is earlier than the fix timestamp.
    pub fn age(&self, now: Instant) -> std::time::Duration {
        now.saturating_duration_since(self.timestamp)
    }

    /// True when both coordinates are finite numbers in range.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}
