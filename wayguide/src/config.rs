//! Engine configuration.
//!
//! All tunable policy lives here as immutable values handed to the session at
//! construction. Sessions never read ambient or global mutable settings, so
//! every combination of thresholds is independently testable and reproducible.

use std::time::Duration;

/// Configuration for off-route detection and reroute throttling.
#[derive(Debug, Clone)]
pub struct RerouteConfig {
    /// Deviation tolerance at rest, in meters (default: 25.0).
    pub min_threshold_m: f64,
    /// Deviation tolerance at or above `max_threshold_speed_mps`, in meters
    /// (default: 80.0).
    pub max_threshold_m: f64,
    /// Speed at which the tolerance reaches its ceiling, in m/s
    /// (default: 31.0, roughly highway speed).
    pub max_threshold_speed_mps: f64,
    /// Arrival radius around the destination, in meters (default: 25.0).
    pub arrival_radius_m: f64,
    /// How long to suppress new reroute requests after a failed one
    /// (default: 10s).
    pub failure_cooldown: Duration,
}

impl Default for RerouteConfig {
    fn default() -> Self {
        Self {
            min_threshold_m: 25.0,
            max_threshold_m: 80.0,
            max_threshold_speed_mps: 31.0,
            arrival_radius_m: 25.0,
            failure_cooldown: Duration::from_secs(10),
        }
    }
}

impl RerouteConfig {
    /// Sets the failure cooldown window.
    pub fn with_failure_cooldown(mut self, cooldown: Duration) -> Self {
        self.failure_cooldown = cooldown;
        self
    }

    /// Sets the arrival radius in meters.
    pub fn with_arrival_radius_m(mut self, radius: f64) -> Self {
        self.arrival_radius_m = radius;
        self
    }
}

/// Configuration for guidance-cue activation radii.
///
/// Highway exits need earlier driver commitment than ordinary turns, so the
/// exit radius is always the wider of the two.
#[derive(Debug, Clone)]
pub struct ActivationConfig {
    /// Activation radius for ramp/exit maneuvers, in meters (default: 400.0).
    pub exit_radius_m: f64,
    /// Activation radius for ordinary turns, in meters (default: 200.0).
    pub turn_radius_m: f64,
}

impl Default for ActivationConfig {
    fn default() -> Self {
        Self {
            exit_radius_m: 400.0,
            turn_radius_m: 200.0,
        }
    }
}

/// Configuration for ETA estimation.
#[derive(Debug, Clone)]
pub struct EtaConfig {
    /// Minimum live speed considered usable for projection, in m/s
    /// (default: 1.0). Below this the planned average speed is used instead.
    pub min_live_speed_mps: f64,
}

impl Default for EtaConfig {
    fn default() -> Self {
        Self {
            min_live_speed_mps: 1.0,
        }
    }
}

/// Policy thresholds for choosing between reported and derived speed.
///
/// Reported sensor speed is noisy near standstill and occasionally
/// contradicts the speed computed from consecutive fixes. These thresholds
/// decide when to discard it. Tuning is policy, not a correctness contract.
#[derive(Debug, Clone)]
pub struct SpeedPolicy {
    /// Reported speeds below this are treated as unreliable, in m/s
    /// (default: 0.5).
    pub min_reliable_reported_mps: f64,
    /// Maximum tolerated disagreement between reported and derived speed,
    /// in m/s (default: 3.0).
    pub max_disagreement_mps: f64,
}

impl Default for SpeedPolicy {
    fn default() -> Self {
        Self {
            min_reliable_reported_mps: 0.5,
            max_disagreement_mps: 3.0,
        }
    }
}

/// Complete engine configuration.
///
/// Immutable once handed to a session. Use the `with_*` builders to override
/// individual sections:
///
/// ```
/// use wayguide::config::{EngineConfig, RerouteConfig};
/// use std::time::Duration;
///
/// let config = EngineConfig::default()
///     .with_reroute(RerouteConfig::default().with_failure_cooldown(Duration::from_secs(5)));
/// ```
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Off-route detection and reroute throttling.
    pub reroute: RerouteConfig,
    /// Guidance-cue activation radii.
    pub activation: ActivationConfig,
    /// ETA estimation.
    pub eta: EtaConfig,
    /// Reported-vs-derived speed selection.
    pub speed: SpeedPolicy,
    /// Channel capacity for progress snapshot broadcasts (default: 64).
    pub snapshot_channel_capacity: usize,
    /// Channel capacity for inbound session commands (default: 256).
    ///
    /// Position updates use non-blocking sends; a full channel drops the
    /// sample rather than stalling the producer.
    pub command_channel_capacity: usize,
    /// How long to wait for the routing collaborator before treating a
    /// request as failed (default: 30s).
    pub route_request_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            reroute: RerouteConfig::default(),
            activation: ActivationConfig::default(),
            eta: EtaConfig::default(),
            speed: SpeedPolicy::default(),
            snapshot_channel_capacity: 64,
            command_channel_capacity: 256,
            route_request_timeout: Duration::from_secs(30),
        }
    }
}

impl EngineConfig {
    /// Replaces the reroute section.
    pub fn with_reroute(mut self, reroute: RerouteConfig) -> Self {
        self.reroute = reroute;
        self
    }

    /// Replaces the activation section.
    pub fn with_activation(mut self, activation: ActivationConfig) -> Self {
        self.activation = activation;
        self
    }

    /// Replaces the ETA section.
    pub fn with_eta(mut self, eta: EtaConfig) -> Self {
        self.eta = eta;
        self
    }

    /// Replaces the speed policy section.
    pub fn with_speed(mut self, speed: SpeedPolicy) -> Self {
        self.speed = speed;
        self
    }

    /// Sets the snapshot broadcast capacity.
    pub fn with_snapshot_channel_capacity(mut self, capacity: usize) -> Self {
        self.snapshot_channel_capacity = capacity;
        self
    }

    /// Sets the command channel capacity.
    pub fn with_command_channel_capacity(mut self, capacity: usize) -> Self {
        self.command_channel_capacity = capacity;
        self
    }

    /// Sets the routing collaborator timeout.
    pub fn with_route_request_timeout(mut self, timeout: Duration) -> Self {
        self.route_request_timeout = timeout;
        self
    }
}
