//! Simulate command - drive a synthetic traveler along a route.
//!
//! Walks the parsed route's polyline at a constant speed, feeding position
//! fixes into a live navigation session and printing every guidance event
//! the session publishes. An optional sideways deviation from a given step
//! exercises off-route detection and rerouting against a second document.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use wayguide::eta::format_duration;
use wayguide::geo::{self, Point, EARTH_RADIUS_M};
use wayguide::instruction::format_distance;
use wayguide::provider::StaticRouteProvider;
use wayguide::route::Route;
use wayguide::session::NavigationState;
use wayguide::triplog::{spawn_progress_logger, DEFAULT_LOG_INTERVAL};
use wayguide::{EngineConfig, Position, ProgressSnapshot, SessionRuntime};

use super::route_info::load_route;
use crate::error::CliError;

/// Ticks to wait for in-flight snapshots after the walk ends.
const DRAIN_TICKS: u32 = 25;

/// Arguments for the simulate command.
pub struct SimulateArgs {
    pub route: String,
    pub speed_mps: f64,
    pub interval_ms: u64,
    pub deviate_at: Option<usize>,
    pub deviate_m: Option<f64>,
    pub reroute_file: Option<String>,
}

/// Run the simulate command.
pub fn run(args: SimulateArgs) -> Result<(), CliError> {
    let route = load_route(&args.route)?;
    if !route.has_geometry() {
        return Err(CliError::Simulation(
            "route has no geometry to drive".to_owned(),
        ));
    }
    let reroute = match &args.reroute_file {
        Some(path) => Some(load_route(path)?),
        None => None,
    };

    let runtime = tokio::runtime::Runtime::new().map_err(CliError::RuntimeInit)?;
    runtime.block_on(simulate(args, route, reroute))
}

async fn simulate(
    args: SimulateArgs,
    route: Route,
    reroute: Option<Route>,
) -> Result<(), CliError> {
    let destination = route
        .destination()
        .ok_or_else(|| CliError::Simulation("route has no destination vertex".to_owned()))?;

    let mut provider = StaticRouteProvider::new(route.clone());
    if let Some(alternative) = reroute {
        provider = provider.with_reroute(alternative);
    }

    let (session, handle) = SessionRuntime::new(Arc::new(provider), EngineConfig::default());
    let cancellation = CancellationToken::new();
    let session_task = tokio::spawn(session.run(cancellation.clone()));
    let progress_logger =
        spawn_progress_logger(handle.subscribe(), cancellation.clone(), DEFAULT_LOG_INTERVAL);
    let mut snapshots = handle.subscribe();

    println!("Simulating drive: {}", args.route);
    println!("  Distance: {}", format_distance(route.total_distance_m()));
    println!(
        "  Speed: {:.1} m/s, fix every {} ms",
        args.speed_mps, args.interval_ms
    );
    if let (Some(step), Some(meters)) = (args.deviate_at, args.deviate_m) {
        println!("  Deviating {meters} m sideways from step {step}");
    }
    println!();

    let mut walker = Walker::new(route);
    let mut reporter = Reporter::new();
    let mut session_route: Option<Arc<Route>> = None;
    let mut rerouted = false;
    let mut arrived = false;

    // The session refuses a start without a known fix; both messages travel
    // down the same command channel, so this ordering holds.
    handle.update_position(fix_at(walker.position(), args.speed_mps));
    handle.start_navigation(destination).await;

    let advance_m = args.speed_mps * args.interval_ms as f64 / 1000.0;
    let mut ticker = tokio::time::interval(Duration::from_millis(args.interval_ms.max(1)));
    let mut drain_ticks = DRAIN_TICKS;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if walker.done() {
                    drain_ticks -= 1;
                    if drain_ticks == 0 {
                        break;
                    }
                    continue;
                }
                let on_course = walker.advance(advance_m);
                let deviating = !rerouted
                    && args
                        .deviate_at
                        .is_some_and(|step| walker.step_index() >= step);
                let point = if deviating {
                    offset_sideways(on_course, walker.bearing(), args.deviate_m.unwrap_or(0.0))
                } else {
                    on_course
                };
                handle.update_position(fix_at(point, args.speed_mps));
            }
            received = snapshots.recv() => match received {
                Ok(snapshot) => {
                    reporter.report(&snapshot);
                    if matches!(snapshot.state, NavigationState::Arrived) {
                        arrived = true;
                        break;
                    }
                    if let NavigationState::Navigating(active) = &snapshot.state {
                        match &session_route {
                            None => session_route = Some(Arc::clone(active)),
                            Some(current) if !Arc::ptr_eq(current, active) => {
                                // Replacement route installed: drive it instead.
                                walker.reset(active.as_ref().clone());
                                session_route = Some(Arc::clone(active));
                                rerouted = true;
                            }
                            Some(_) => {}
                        }
                    }
                }
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    }

    cancellation.cancel();
    let _ = session_task.await;
    let _ = progress_logger.await;

    println!();
    if arrived {
        println!("✓ Arrived at destination");
    } else {
        println!("Simulation ended without arrival");
    }
    Ok(())
}

fn fix_at(point: Point, speed_mps: f64) -> Position {
    Position::new(point.lat, point.lon).with_speed_mps(speed_mps)
}

/// Moves a point sideways, perpendicular to the travel bearing.
///
/// Flat-earth approximation; fine at deviation scales of tens of meters.
fn offset_sideways(point: Point, bearing_deg: f64, meters: f64) -> Point {
    let meters_per_degree = EARTH_RADIUS_M * std::f64::consts::PI / 180.0;
    let normal = (bearing_deg + 90.0).to_radians();
    let dlat = meters * normal.cos() / meters_per_degree;
    let dlon =
        meters * normal.sin() / (meters_per_degree * point.lat.to_radians().cos().max(1e-6));
    Point::new(point.lat + dlat, point.lon + dlon)
}

/// Synthetic traveler walking a route polyline at constant speed.
struct Walker {
    route: Route,
    segment: usize,
    into_segment_m: f64,
}

impl Walker {
    fn new(route: Route) -> Self {
        Self {
            route,
            segment: 0,
            into_segment_m: 0.0,
        }
    }

    /// Switches to a replacement route, restarting at its first vertex.
    fn reset(&mut self, route: Route) {
        *self = Self::new(route);
    }

    fn done(&self) -> bool {
        let polyline = self.route.polyline();
        polyline.len() < 2 || self.segment >= polyline.len() - 1
    }

    /// Step owning the walker's current segment.
    fn step_index(&self) -> usize {
        self.route.step_index_for_segment(self.segment)
    }

    /// Advances along the polyline, returning the new position.
    fn advance(&mut self, mut meters: f64) -> Point {
        while !self.done() {
            let polyline = self.route.polyline();
            let length =
                geo::distance_meters(polyline[self.segment], polyline[self.segment + 1]);
            if self.into_segment_m + meters < length {
                self.into_segment_m += meters;
                break;
            }
            meters -= length - self.into_segment_m;
            self.segment += 1;
            self.into_segment_m = 0.0;
        }
        self.position()
    }

    /// Current position, interpolated within the active segment.
    fn position(&self) -> Point {
        let polyline = self.route.polyline();
        if polyline.is_empty() {
            return Point::new(0.0, 0.0);
        }
        if self.done() {
            return polyline[polyline.len() - 1];
        }
        let start = polyline[self.segment];
        let end = polyline[self.segment + 1];
        let length = geo::distance_meters(start, end);
        if length == 0.0 {
            return start;
        }
        let fraction = self.into_segment_m / length;
        Point::new(
            start.lat + (end.lat - start.lat) * fraction,
            start.lon + (end.lon - start.lon) * fraction,
        )
    }

    /// Travel bearing of the active segment.
    fn bearing(&self) -> f64 {
        let polyline = self.route.polyline();
        if polyline.len() < 2 {
            return 0.0;
        }
        if self.done() {
            return geo::bearing_degrees(polyline[polyline.len() - 2], polyline[polyline.len() - 1]);
        }
        geo::bearing_degrees(polyline[self.segment], polyline[self.segment + 1])
    }
}

/// Prints guidance events, deduplicating unchanged values.
struct Reporter {
    state: String,
    instruction: Option<(usize, String)>,
    total_steps: usize,
    off_route: bool,
    cued: bool,
}

impl Reporter {
    fn new() -> Self {
        Self {
            state: String::new(),
            instruction: None,
            total_steps: 0,
            off_route: false,
            cued: false,
        }
    }

    fn report(&mut self, snapshot: &ProgressSnapshot) {
        // Rerouting snapshots carry no route, so remember the step total.
        if let NavigationState::Navigating(route) = &snapshot.state {
            self.total_steps = route.step_count();
        }

        if snapshot.state.name() != self.state {
            self.state = snapshot.state.name().to_owned();
            emit(&format!("state: {}", self.state));
        }

        if snapshot.off_route != self.off_route {
            self.off_route = snapshot.off_route;
            emit(if snapshot.off_route {
                "off route, requesting a new route"
            } else {
                "back on route"
            });
        }

        if let Some(instruction) = &snapshot.current_instruction {
            let key = (snapshot.step_index, instruction.text.clone());
            if self.instruction.as_ref() != Some(&key) {
                emit(&format!(
                    "step {}/{}: {} [{}] (remaining {}, eta {})",
                    snapshot.step_index + 1,
                    self.total_steps,
                    instruction.text,
                    instruction.direction,
                    format_distance(snapshot.remaining_distance_m),
                    format_duration(snapshot.eta_seconds)
                ));
                self.instruction = Some(key);
                self.cued = false;
            }
        }

        if let (Some(reason), Some(next)) = (snapshot.activation, &snapshot.next_instruction) {
            if !self.cued {
                emit(&format!("cue: {} - {}", reason, next.text));
                self.cued = true;
            }
        }
    }
}

fn emit(message: &str) {
    println!("[{}] {}", chrono::Local::now().format("%H:%M:%S%.3f"), message);
}
