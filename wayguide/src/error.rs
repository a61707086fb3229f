//! Error types for the navigation engine.

use thiserror::Error;

/// User-facing message attached to session status when navigation is
/// requested without a known position.
pub const LOCATION_UNAVAILABLE_MESSAGE: &str = "Location not available. Please enable GPS.";

/// Errors surfaced by the navigation session.
///
/// Nothing here is fatal to the process: every variant resolves to a
/// well-defined session state (Idle, or navigating with the off-route
/// flag set) rather than propagating upward.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum NavigationError {
    /// Navigation was requested before any position fix was known.
    #[error("Location not available. Please enable GPS.")]
    LocationUnavailable,

    /// The routing collaborator returned an error or an empty route.
    ///
    /// On the initial request this returns the session to Idle. During an
    /// active session it is downgraded to the off-route flag plus a reroute
    /// cooldown instead.
    #[error("Route computation failed: {reason}")]
    RoutingFailure { reason: String },

    /// The route carries no usable geometry (empty polyline or zero steps).
    ///
    /// Instruction resolvers degrade to straight-ahead defaults rather than
    /// failing the session.
    #[error("Route has no usable geometry")]
    InvalidRouteGeometry,
}

/// Errors produced by a routing collaborator.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum RoutingError {
    /// The routing backend could not be reached.
    #[error("Routing backend unreachable: {0}")]
    Unreachable(String),

    /// The backend responded but found no route between the endpoints.
    #[error("No route found between origin and destination")]
    NoRouteFound,

    /// The backend returned a malformed or unusable route document.
    #[error("Routing backend error: {message}")]
    Backend { message: String },
}

impl From<RoutingError> for NavigationError {
    fn from(err: RoutingError) -> Self {
        NavigationError::RoutingFailure {
            reason: err.to_string(),
        }
    }
}
