//! Public session state and progress reporting types.

use std::fmt;
use std::sync::Arc;

use crate::instruction::{ActivationReason, Instruction};
use crate::position::Position;
use crate::route::Route;

/// Lifecycle state of a navigation session.
///
/// Carrying the route inside [`Navigating`](NavigationState::Navigating)
/// makes "navigating without a route" unrepresentable; cloning is cheap
/// because the route is shared behind an `Arc`.
#[derive(Debug, Clone)]
pub enum NavigationState {
    /// No active route. Ready to start navigation once a position is known.
    Idle,
    /// Following the position stream, waiting for the first fix.
    Searching,
    /// Waiting on the routing collaborator for the initial route.
    Routing,
    /// Actively guiding along the carried route.
    Navigating(Arc<Route>),
    /// Off route with a replacement request outstanding; guidance continues
    /// against the previous route until the request resolves.
    Rerouting,
    /// The traveler reached the arrival radius of the destination.
    Arrived,
}

impl NavigationState {
    /// Short state name for logs and status lines.
    pub fn name(&self) -> &'static str {
        match self {
            NavigationState::Idle => "Idle",
            NavigationState::Searching => "Searching",
            NavigationState::Routing => "Routing",
            NavigationState::Navigating(_) => "Navigating",
            NavigationState::Rerouting => "Rerouting",
            NavigationState::Arrived => "Arrived",
        }
    }

    /// True while the session is guiding along a route (navigating or
    /// awaiting a reroute).
    pub fn is_guiding(&self) -> bool {
        matches!(
            self,
            NavigationState::Navigating(_) | NavigationState::Rerouting
        )
    }
}

impl fmt::Display for NavigationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One complete, internally consistent view of navigation progress.
///
/// Every field is recomputed from the same input fix before the snapshot is
/// published, so observers never see a step index from one update paired
/// with an ETA from another.
#[derive(Debug, Clone)]
pub struct ProgressSnapshot {
    /// Session state at the time of this snapshot.
    pub state: NavigationState,
    /// The fix this snapshot was computed from, when one has been accepted.
    pub position: Option<Position>,
    /// Index of the step the traveler is currently on.
    pub step_index: usize,
    /// Instruction for the current step, with live distance to its maneuver.
    pub current_instruction: Option<Instruction>,
    /// Instruction for the upcoming step, with the planned distance between
    /// the two maneuvers.
    pub next_instruction: Option<Instruction>,
    /// Meters left to the destination along the route.
    pub remaining_distance_m: f64,
    /// Estimated seconds to arrival.
    pub eta_seconds: f64,
    /// Estimated traveler speed in m/s.
    pub speed_mps: f64,
    /// Whether the traveler is beyond the adaptive deviation threshold.
    pub off_route: bool,
    /// Guidance cue to fire for the current maneuver, if within its radius.
    pub activation: Option<ActivationReason>,
}

impl ProgressSnapshot {
    /// An empty snapshot for the given state, before any progress exists.
    pub fn empty(state: NavigationState) -> Self {
        Self {
            state,
            position: None,
            step_index: 0,
            current_instruction: None,
            next_instruction: None,
            remaining_distance_m: 0.0,
            eta_seconds: 0.0,
            speed_mps: 0.0,
            off_route: false,
            activation: None,
        }
    }
}

/// Pull-style session status, published on a watch channel.
#[derive(Debug, Clone)]
pub struct SessionStatus {
    /// Current lifecycle state.
    pub state: NavigationState,
    /// Human-readable description of the most recent failure, cleared on
    /// the next successful transition.
    pub last_error: Option<String>,
    /// The most recently published progress snapshot.
    pub latest: Option<ProgressSnapshot>,
}

impl SessionStatus {
    pub(crate) fn new(state: NavigationState) -> Self {
        Self {
            state,
            last_error: None,
            latest: None,
        }
    }
}
