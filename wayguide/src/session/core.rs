//! Synchronous navigation state machine.
//!
//! `SessionCore` owns every piece of per-session state and mutates it one
//! message at a time. It is deliberately free of async: the runtime task
//! feeds it commands and route results, and it answers with effects (a
//! snapshot to publish, a route request to dispatch). This keeps the whole
//! state machine unit-testable without a runtime.
//!
//! # State transitions
//!
//! ```text
//! Searching --[first fix]--> Idle
//! Idle --[start, fix known]--> Routing
//! Idle --[start, no fix]--> Idle (error string set)
//! Routing --[route ok]--> Navigating     Routing --[route err]--> Idle
//! Navigating --[arrival radius]--> Arrived
//! Navigating --[deviation, dispatch]--> Rerouting
//! Rerouting --[route ok]--> Navigating(new)
//! Rerouting --[route err]--> Navigating(old, off-route flagged)
//! any --[stop]--> Idle
//! ```

use std::sync::Arc;
use std::time::Instant;

use crate::config::EngineConfig;
use crate::error::{LOCATION_UNAVAILABLE_MESSAGE, RoutingError};
use crate::eta;
use crate::geo::{self, Point};
use crate::instruction;
use crate::position::Position;
use crate::reroute::{RerouteCheck, RerouteDecisionEngine, RerouteOutcome};
use crate::route::Route;
use crate::speed::SpeedEstimator;
use crate::triplog::{TripLogger, TripSample, TripSegment};

use super::state::{NavigationState, ProgressSnapshot, SessionStatus};

/// Why a route was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoutePurpose {
    /// First route for a newly started navigation.
    Initial,
    /// Replacement route for an off-route traveler.
    Reroute,
}

/// A provider request the runtime should dispatch.
#[derive(Debug, Clone)]
pub struct RouteRequest {
    /// Generation the result must carry to be accepted on arrival.
    pub generation: u64,
    /// Initial route or reroute.
    pub purpose: RoutePurpose,
    /// Traveler fix to route from.
    pub origin: Position,
    /// Coordinate to route to.
    pub destination: Point,
}

/// Effects of starting navigation.
#[derive(Debug)]
pub struct StartEffects {
    /// Snapshot to publish.
    pub snapshot: ProgressSnapshot,
    /// Initial route request, absent when the start was refused.
    pub request: Option<RouteRequest>,
}

/// Effects of processing one position fix.
#[derive(Debug, Default)]
pub struct UpdateEffects {
    /// Snapshot to publish; `None` when the fix was rejected.
    pub snapshot: Option<ProgressSnapshot>,
    /// Reroute request to dispatch, if the evaluation decided to.
    pub request: Option<RouteRequest>,
    /// Outcome of the off-route evaluation, when one ran.
    pub outcome: Option<RerouteOutcome>,
}

/// Effects of a route result arriving from the provider.
#[derive(Debug, Default)]
pub struct RouteResolution {
    /// Snapshot to publish; `None` when the result was stale and dropped.
    pub snapshot: Option<ProgressSnapshot>,
    /// Reroute outcome, present only for reroute results.
    pub outcome: Option<RerouteOutcome>,
}

/// The navigation session's synchronous core.
///
/// Single-writer: exactly one owner mutates it, normally the runtime task.
pub struct SessionCore {
    config: EngineConfig,
    state: NavigationState,
    route: Option<Arc<Route>>,
    destination: Option<Point>,
    last_fix: Option<Position>,
    last_speed_mps: f64,
    step_index: usize,
    speed: SpeedEstimator,
    reroute: RerouteDecisionEngine,
    last_error: Option<String>,
    generation: u64,
    trip_logger: Arc<dyn TripLogger>,
}

impl SessionCore {
    /// Creates a core in the Searching state, awaiting a first fix.
    pub fn new(config: EngineConfig, trip_logger: Arc<dyn TripLogger>) -> Self {
        let speed = SpeedEstimator::new(config.speed.clone());
        let reroute = RerouteDecisionEngine::new(config.reroute.clone());
        Self {
            config,
            state: NavigationState::Searching,
            route: None,
            destination: None,
            last_fix: None,
            last_speed_mps: 0.0,
            step_index: 0,
            speed,
            reroute,
            last_error: None,
            generation: 0,
            trip_logger,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> &NavigationState {
        &self.state
    }

    /// Most recent failure description, if any.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Builds the pull-style status around an already published snapshot.
    pub fn status_with(&self, latest: Option<ProgressSnapshot>) -> SessionStatus {
        SessionStatus {
            state: self.state.clone(),
            last_error: self.last_error.clone(),
            latest,
        }
    }

    /// Starts navigation toward `destination`.
    ///
    /// Refused when no position fix is known; the session stays in its
    /// current state with the location error string set.
    pub fn handle_start(&mut self, destination: Point) -> StartEffects {
        let origin = match self.last_fix {
            Some(fix) => fix,
            None => {
                tracing::warn!(
                    state = %self.state,
                    "Navigation requested without a known position"
                );
                self.last_error = Some(LOCATION_UNAVAILABLE_MESSAGE.to_owned());
                return StartEffects {
                    snapshot: self.basic_snapshot(),
                    request: None,
                };
            }
        };

        self.generation += 1;
        self.state = NavigationState::Routing;
        self.route = None;
        self.destination = Some(destination);
        self.step_index = 0;
        self.reroute.reset();
        self.speed.reset();
        self.last_error = None;

        tracing::info!(
            lat = format!("{:.5}", destination.lat),
            lon = format!("{:.5}", destination.lon),
            generation = self.generation,
            "Navigation started, requesting route"
        );

        StartEffects {
            snapshot: self.basic_snapshot(),
            request: Some(RouteRequest {
                generation: self.generation,
                purpose: RoutePurpose::Initial,
                origin,
                destination,
            }),
        }
    }

    /// Stops navigation and returns the session to Idle.
    ///
    /// Idempotent: stopping an idle session is a no-op that leaves no error
    /// behind. Bumps the generation so any in-flight route result is
    /// dropped on arrival.
    pub fn handle_stop(&mut self) -> ProgressSnapshot {
        self.generation += 1;
        if !matches!(self.state, NavigationState::Idle) {
            tracing::info!(from = %self.state, "Navigation stopped");
        }
        self.state = NavigationState::Idle;
        self.route = None;
        self.destination = None;
        self.step_index = 0;
        self.reroute.reset();
        self.speed.reset();
        self.last_error = None;
        self.basic_snapshot()
    }

    /// Processes one position fix.
    ///
    /// Invalid fixes and fixes older than the latest accepted one are
    /// rejected without publishing. Accepted fixes always produce a
    /// complete snapshot; while guiding they also recompute progress and
    /// run the off-route evaluation.
    pub fn handle_position(&mut self, fix: Position, now: Instant) -> UpdateEffects {
        if !fix.is_valid() {
            tracing::debug!(
                lat = fix.latitude,
                lon = fix.longitude,
                "Discarded invalid position fix"
            );
            return UpdateEffects::default();
        }
        if let Some(last) = &self.last_fix {
            if fix.timestamp < last.timestamp {
                tracing::debug!("Discarded out-of-order position fix");
                return UpdateEffects::default();
            }
        }

        self.last_speed_mps = self.speed.estimate(&fix);
        self.last_fix = Some(fix);

        match self.state {
            NavigationState::Searching => {
                tracing::info!(
                    lat = format!("{:.5}", fix.latitude),
                    lon = format!("{:.5}", fix.longitude),
                    "First position fix received"
                );
                self.state = NavigationState::Idle;
                UpdateEffects {
                    snapshot: Some(self.basic_snapshot()),
                    ..UpdateEffects::default()
                }
            }
            NavigationState::Idle | NavigationState::Routing | NavigationState::Arrived => {
                UpdateEffects {
                    snapshot: Some(self.basic_snapshot()),
                    ..UpdateEffects::default()
                }
            }
            NavigationState::Navigating(_) | NavigationState::Rerouting => {
                let (snapshot, request, outcome) = self.guided_snapshot(fix, now, true);
                UpdateEffects {
                    snapshot: Some(snapshot),
                    request,
                    outcome,
                }
            }
        }
    }

    /// Applies a route result coming back from the provider.
    ///
    /// Results whose generation does not match the session's are stale
    /// (the session stopped or restarted since the request went out) and
    /// are dropped without touching any state.
    pub fn handle_route_result(
        &mut self,
        generation: u64,
        purpose: RoutePurpose,
        result: Result<Route, RoutingError>,
        now: Instant,
    ) -> RouteResolution {
        if generation != self.generation {
            tracing::debug!(
                generation,
                current = self.generation,
                "Stale route result discarded"
            );
            return RouteResolution::default();
        }

        match purpose {
            RoutePurpose::Initial => self.resolve_initial(result, now),
            RoutePurpose::Reroute => self.resolve_reroute(result, now),
        }
    }

    fn resolve_initial(
        &mut self,
        result: Result<Route, RoutingError>,
        now: Instant,
    ) -> RouteResolution {
        if !matches!(self.state, NavigationState::Routing) {
            tracing::debug!(state = %self.state, "Ignoring route result outside Routing");
            return RouteResolution::default();
        }

        let route = match validated(result) {
            Ok(route) => route,
            Err(err) => {
                let reason = err.to_string();
                tracing::warn!(error = %reason, "Routing failed, returning to Idle");
                self.state = NavigationState::Idle;
                self.route = None;
                self.destination = None;
                self.last_error = Some(reason);
                return RouteResolution {
                    snapshot: Some(self.basic_snapshot()),
                    outcome: None,
                };
            }
        };

        let route = Arc::new(route);
        tracing::info!(
            distance_m = format!("{:.0}", route.total_distance_m()),
            duration_s = format!("{:.0}", route.total_duration_s()),
            steps = route.step_count(),
            "Route received, navigation active"
        );
        self.adopt_route(route);

        RouteResolution {
            snapshot: Some(self.refreshed_snapshot(now)),
            outcome: None,
        }
    }

    fn resolve_reroute(
        &mut self,
        result: Result<Route, RoutingError>,
        now: Instant,
    ) -> RouteResolution {
        if !matches!(self.state, NavigationState::Rerouting) {
            tracing::debug!(state = %self.state, "Ignoring reroute result outside Rerouting");
            return RouteResolution::default();
        }

        match validated(result) {
            Ok(route) => {
                let route = Arc::new(route);
                self.reroute.on_reroute_success();
                tracing::info!(
                    distance_m = format!("{:.0}", route.total_distance_m()),
                    steps = route.step_count(),
                    "Following replacement route"
                );
                self.adopt_route(Arc::clone(&route));
                RouteResolution {
                    snapshot: Some(self.refreshed_snapshot(now)),
                    outcome: Some(RerouteOutcome::Success(route)),
                }
            }
            Err(err) => {
                let reason = err.to_string();
                self.reroute.on_reroute_failure(&reason, now);
                // Drop back to the previous route; guidance continues with
                // the off-route flag raised.
                match self.route.clone() {
                    Some(route) => self.state = NavigationState::Navigating(route),
                    None => self.state = NavigationState::Idle,
                }
                self.last_error = Some(reason.clone());
                RouteResolution {
                    snapshot: Some(self.refreshed_snapshot(now)),
                    outcome: Some(RerouteOutcome::Failed { reason }),
                }
            }
        }
    }

    /// Installs a freshly received route and resets per-route progress.
    fn adopt_route(&mut self, route: Arc<Route>) {
        self.route = Some(Arc::clone(&route));
        self.state = NavigationState::Navigating(route);
        self.step_index = 0;
        self.reroute.reset();
        self.last_error = None;
    }

    /// Recomputes progress against the current route using the latest fix.
    fn refreshed_snapshot(&mut self, now: Instant) -> ProgressSnapshot {
        match self.last_fix {
            Some(fix) => {
                let (snapshot, _, _) = self.guided_snapshot(fix, now, false);
                snapshot
            }
            None => self.basic_snapshot(),
        }
    }

    /// A snapshot of the session without route progress.
    fn basic_snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            state: self.state.clone(),
            position: self.last_fix,
            step_index: self.step_index,
            current_instruction: None,
            next_instruction: None,
            remaining_distance_m: 0.0,
            eta_seconds: 0.0,
            speed_mps: self.last_speed_mps,
            off_route: self.reroute.is_off_route(),
            activation: None,
        }
    }

    /// Computes a complete progress snapshot from one fix.
    ///
    /// Step index, instructions, remaining distance, ETA, activation, and
    /// the off-route flag all come from the same fix, so the published
    /// snapshot is internally consistent. `evaluate_reroute` is false when
    /// the caller is installing a new route and deviation against it has
    /// not been observed yet.
    fn guided_snapshot(
        &mut self,
        fix: Position,
        now: Instant,
        evaluate_reroute: bool,
    ) -> (ProgressSnapshot, Option<RouteRequest>, Option<RerouteOutcome>) {
        let route = match &self.route {
            Some(route) => Arc::clone(route),
            None => return (self.basic_snapshot(), None, None),
        };
        let speed_mps = self.last_speed_mps;

        if let Some(destination) = self.destination {
            if self.reroute.is_approaching_destination(&fix, destination) {
                if !matches!(self.state, NavigationState::Arrived) {
                    tracing::info!(
                        lat = format!("{:.5}", fix.latitude),
                        lon = format!("{:.5}", fix.longitude),
                        "Arrived at destination"
                    );
                }
                self.state = NavigationState::Arrived;
                let mut snapshot = self.basic_snapshot();
                snapshot.remaining_distance_m =
                    geo::distance_meters(Point::from(&fix), destination);
                return (snapshot, None, None);
            }
        }

        let previous_step = self.step_index;
        self.step_index = instruction::find_current_step_index(&fix, &route, previous_step);
        for completed in previous_step..self.step_index {
            if let Some(step) = route.step(completed) {
                self.trip_logger.log_segment(&TripSegment {
                    street: step.name.clone(),
                    step_index: completed,
                    distance_m: step.distance_m,
                    speed_mps,
                });
            }
        }

        // Project against the geometry still ahead of the current step, so
        // remaining distance and the off-route decision cannot latch onto an
        // already passed part of a route that doubles back.
        let here = Point::from(&fix);
        let first_segment = route.first_segment_of_step(self.step_index);
        let ahead = route.polyline().get(first_segment..).unwrap_or_default();
        let remaining_distance_m = match geo::closest_point_on_polyline(here, ahead) {
            Some(projection) => geo::remaining_distance_m(
                here,
                route.polyline(),
                first_segment + projection.segment_index,
            ),
            None => 0.0,
        };

        let current_instruction = instruction::current_instruction(&fix, &route, self.step_index);
        let next_instruction = instruction::next_instruction(&route, self.step_index);
        let eta_seconds = eta::eta_seconds(
            remaining_distance_m,
            speed_mps,
            route.planned_average_speed_mps(),
            route.total_duration_s(),
            &self.config.eta,
        );
        // Guidance cues fire for the maneuver the traveler is approaching,
        // which is the one that begins the next step.
        let activation = route.step(self.step_index + 1).and_then(|upcoming| {
            let distance_m = geo::distance_meters(here, upcoming.maneuver.location);
            instruction::determine_activation_reason(
                &upcoming.maneuver.maneuver_type,
                distance_m,
                &self.config.activation,
            )
        });

        self.trip_logger.log_sample(&TripSample {
            position: fix,
            speed_mps,
            street: route
                .step(self.step_index)
                .map(|step| step.name.clone())
                .unwrap_or_default(),
            remaining_distance_m,
        });

        let (request, outcome) = if evaluate_reroute {
            self.evaluate_reroute(&fix, &route, first_segment, speed_mps, now)
        } else {
            (None, None)
        };

        let snapshot = ProgressSnapshot {
            state: self.state.clone(),
            position: Some(fix),
            step_index: self.step_index,
            current_instruction,
            next_instruction,
            remaining_distance_m,
            eta_seconds,
            speed_mps,
            off_route: self.reroute.is_off_route(),
            activation,
        };
        (snapshot, request, outcome)
    }

    /// Runs the off-route evaluation and maps its decision to an outcome.
    fn evaluate_reroute(
        &mut self,
        fix: &Position,
        route: &Route,
        from_segment: usize,
        speed_mps: f64,
        now: Instant,
    ) -> (Option<RouteRequest>, Option<RerouteOutcome>) {
        match self.reroute.check(fix, route, from_segment, speed_mps, now) {
            RerouteCheck::OnRoute => (None, Some(RerouteOutcome::NotNeeded)),
            RerouteCheck::Dispatch => {
                let destination = match self.destination {
                    Some(destination) => destination,
                    None => return (None, Some(RerouteOutcome::InProgress)),
                };
                self.state = NavigationState::Rerouting;
                tracing::info!(generation = self.generation, "Rerouting");
                (
                    Some(RouteRequest {
                        generation: self.generation,
                        purpose: RoutePurpose::Reroute,
                        origin: *fix,
                        destination,
                    }),
                    Some(RerouteOutcome::InProgress),
                )
            }
            RerouteCheck::InFlight => (None, Some(RerouteOutcome::InProgress)),
            RerouteCheck::Suppressed { reason } => {
                self.last_error = Some(reason.clone());
                (None, Some(RerouteOutcome::Failed { reason }))
            }
        }
    }
}

/// Rejects provider results that carry no usable geometry.
fn validated(result: Result<Route, RoutingError>) -> Result<Route, RoutingError> {
    match result {
        Ok(route) if !route.has_geometry() => Err(RoutingError::Backend {
            message: "route has no geometry".to_owned(),
        }),
        other => other,
    }
}
