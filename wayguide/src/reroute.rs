//! Off-route detection and reroute throttling.
//!
//! Maintains the off-route flag, the speed-adaptive deviation threshold, and
//! the request throttling that keeps the engine from hammering the routing
//! collaborator while persistently off route.
//!
//! # Throttling
//!
//! ```text
//! OnRoute --[distance > threshold]--> Dispatch (request issued)
//! Dispatch --[update while outstanding]--> InFlight (coalesced)
//! Dispatch --[failure]--> Suppressed for failure_cooldown, then Dispatch again
//! Dispatch --[success]--> OnRoute (flag cleared, cooldown reset)
//! ```
//!
//! The engine only decides; the session owns the actual request future. All
//! methods take an explicit `now` so throttling is deterministic under test.

use std::sync::Arc;
use std::time::Instant;

use crate::config::RerouteConfig;
use crate::geo::{self, Point};
use crate::position::Position;
use crate::route::Route;

/// Outcome of one off-route evaluation.
///
/// Produced per evaluation and handed to logging/observers; never stored.
#[derive(Debug, Clone)]
pub enum RerouteOutcome {
    /// A replacement route arrived.
    Success(Arc<Route>),
    /// The collaborator failed, or a failure cooldown suppressed the retry.
    Failed { reason: String },
    /// The traveler is on the route.
    NotNeeded,
    /// A reroute request is already outstanding.
    InProgress,
}

impl RerouteOutcome {
    /// Short variant name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            RerouteOutcome::Success(_) => "Success",
            RerouteOutcome::Failed { .. } => "Failed",
            RerouteOutcome::NotNeeded => "NotNeeded",
            RerouteOutcome::InProgress => "InProgress",
        }
    }
}

/// What the session should do after an off-route check.
#[derive(Debug, Clone, PartialEq)]
pub enum RerouteCheck {
    /// Within tolerance of the route.
    OnRoute,
    /// Off route and clear to issue a request now. The engine has already
    /// marked the request as in flight.
    Dispatch,
    /// Off route with a request already outstanding.
    InFlight,
    /// Off route, but a recent failure's cooldown suppresses a new request.
    Suppressed { reason: String },
}

/// Off-route state and reroute throttling for one session.
#[derive(Debug)]
pub struct RerouteDecisionEngine {
    config: RerouteConfig,
    off_route: bool,
    in_flight: bool,
    cooldown_until: Option<Instant>,
    last_failure_reason: Option<String>,
}

impl RerouteDecisionEngine {
    /// Creates an engine with the given policy.
    pub fn new(config: RerouteConfig) -> Self {
        Self {
            config,
            off_route: false,
            in_flight: false,
            cooldown_until: None,
            last_failure_reason: None,
        }
    }

    /// Deviation tolerance for the given speed, in meters.
    ///
    /// GPS error and allowable road-matching slack both grow with speed, so
    /// the tolerance widens linearly from the floor at rest to the ceiling
    /// at `max_threshold_speed_mps`, clamped at both ends. Monotonically
    /// non-decreasing in speed. Non-finite speeds use the floor.
    pub fn adaptive_threshold_m(&self, speed_mps: f64) -> f64 {
        let speed = if speed_mps.is_finite() {
            speed_mps.max(0.0).min(self.config.max_threshold_speed_mps)
        } else {
            0.0
        };
        let span = self.config.max_threshold_m - self.config.min_threshold_m;
        self.config.min_threshold_m + span * (speed / self.config.max_threshold_speed_mps)
    }

    /// True when the traveler is within the arrival radius of the
    /// destination, regardless of route-matching state.
    pub fn is_approaching_destination(&self, position: &Position, destination: Point) -> bool {
        geo::distance_meters(Point::from(position), destination) <= self.config.arrival_radius_m
    }

    /// Evaluates the traveler's deviation from the route.
    ///
    /// Deviation is measured against the polyline still ahead of the
    /// traveler, from `from_segment_index` onward: proximity to an already
    /// passed part of a route that doubles back must not read as on-route.
    /// Routes without projectable geometry always read as on-route; with no
    /// polyline there is no deviation to measure.
    ///
    /// Returning [`RerouteCheck::Dispatch`] marks the request in flight, so
    /// at most one evaluation per episode dispatches; later evaluations
    /// coalesce to [`RerouteCheck::InFlight`] until the result is reported
    /// via [`on_reroute_success`](Self::on_reroute_success) or
    /// [`on_reroute_failure`](Self::on_reroute_failure).
    pub fn check(
        &mut self,
        position: &Position,
        route: &Route,
        from_segment_index: usize,
        speed_mps: f64,
        now: Instant,
    ) -> RerouteCheck {
        let remaining = route
            .polyline()
            .get(from_segment_index..)
            .unwrap_or_default();
        let distance_m = match geo::closest_point_on_polyline(Point::from(position), remaining) {
            Some(projection) => projection.distance_m,
            None => {
                self.off_route = false;
                return RerouteCheck::OnRoute;
            }
        };

        let threshold_m = self.adaptive_threshold_m(speed_mps);

        if distance_m <= threshold_m {
            if self.off_route {
                tracing::info!(
                    distance_m = format!("{distance_m:.0}"),
                    threshold_m = format!("{threshold_m:.0}"),
                    "Traveler back on route"
                );
            }
            self.off_route = false;
            return RerouteCheck::OnRoute;
        }

        if !self.off_route {
            tracing::info!(
                distance_m = format!("{distance_m:.0}"),
                threshold_m = format!("{threshold_m:.0}"),
                speed_mps = format!("{speed_mps:.1}"),
                "Traveler off route"
            );
        }
        self.off_route = true;

        if self.in_flight {
            return RerouteCheck::InFlight;
        }

        if let Some(until) = self.cooldown_until {
            if now < until {
                let reason = self
                    .last_failure_reason
                    .clone()
                    .unwrap_or_else(|| "reroute cooling down".to_owned());
                tracing::debug!(
                    remaining_ms = (until - now).as_millis(),
                    "Reroute suppressed by failure cooldown"
                );
                return RerouteCheck::Suppressed { reason };
            }
        }

        self.in_flight = true;
        tracing::info!(
            distance_m = format!("{distance_m:.0}"),
            "Requesting reroute"
        );
        RerouteCheck::Dispatch
    }

    /// Records a successful reroute: clears the off-route flag, the
    /// in-flight marker, and the failure cooldown.
    pub fn on_reroute_success(&mut self) {
        self.in_flight = false;
        self.off_route = false;
        self.cooldown_until = None;
        self.last_failure_reason = None;
        tracing::info!("Reroute succeeded");
    }

    /// Records a failed reroute and starts the cooldown window.
    pub fn on_reroute_failure(&mut self, reason: &str, now: Instant) {
        self.in_flight = false;
        self.cooldown_until = Some(now + self.config.failure_cooldown);
        self.last_failure_reason = Some(reason.to_owned());
        tracing::warn!(
            reason,
            cooldown_s = self.config.failure_cooldown.as_secs_f64(),
            "Reroute failed, cooling down"
        );
    }

    /// Clears all off-route and throttling state.
    ///
    /// Called whenever navigation (re)starts so nothing leaks from a
    /// previous trip into a new one.
    pub fn reset(&mut self) {
        self.off_route = false;
        self.in_flight = false;
        self.cooldown_until = None;
        self.last_failure_reason = None;
    }

    /// Whether the traveler is currently flagged off route.
    pub fn is_off_route(&self) -> bool {
        self.off_route
    }

    /// Whether a reroute request is currently outstanding.
    pub fn is_in_flight(&self) -> bool {
        self.in_flight
    }
}
