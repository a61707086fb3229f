//! Route model.
//!
//! A [`Route`] is an ordered sequence of [`Leg`]s, each an ordered sequence of
//! [`Step`]s; a Step is one maneuver-to-maneuver unit with its own
//! sub-polyline. The route also carries a flattened view: the overall
//! polyline (step geometries concatenated, join vertices deduplicated) and a
//! segment-to-step index so projections map back to steps cheaply.
//!
//! Routes are immutable once built. A reroute produces a whole new `Route`;
//! nothing is patched in place.
//!
//! # Components
//!
//! - [`Route`], [`Leg`], [`Step`], [`Maneuver`] - the model itself
//! - [`osrm`] - serde model of OSRM route documents and conversion into [`Route`]

pub mod osrm;

pub use osrm::parse_osrm_route;

use crate::geo::{self, Point};

/// Maneuver descriptor for one step.
#[derive(Debug, Clone, PartialEq)]
pub struct Maneuver {
    /// Maneuver category, e.g. "turn", "off ramp", "merge", "arrive".
    pub maneuver_type: String,
    /// Direction modifier, e.g. "left", "slight left", "sharp right".
    pub modifier: Option<String>,
    /// Where the maneuver happens.
    pub location: Point,
}

impl Maneuver {
    /// Creates a maneuver at the given location.
    pub fn new(maneuver_type: impl Into<String>, modifier: Option<&str>, location: Point) -> Self {
        Self {
            maneuver_type: maneuver_type.into(),
            modifier: modifier.map(str::to_owned),
            location,
        }
    }
}

/// One maneuver-to-maneuver unit of a route.
#[derive(Debug, Clone)]
pub struct Step {
    /// Human-facing instruction text, e.g. "Turn left onto Market Street".
    pub instruction: String,
    /// Street or road name, empty when unnamed.
    pub name: String,
    /// The maneuver that begins this step.
    pub maneuver: Maneuver,
    /// Geometry from this maneuver to the next.
    pub polyline: Vec<Point>,
    /// Planned length in meters.
    pub distance_m: f64,
    /// Planned travel time in seconds.
    pub duration_s: f64,
}

/// One origin-to-waypoint span of a route.
#[derive(Debug, Clone)]
pub struct Leg {
    /// Steps in travel order.
    pub steps: Vec<Step>,
    /// Planned length in meters.
    pub distance_m: f64,
    /// Planned travel time in seconds.
    pub duration_s: f64,
}

/// A complete planned route.
#[derive(Debug, Clone)]
pub struct Route {
    legs: Vec<Leg>,
    /// Concatenated step geometries with join vertices deduplicated.
    polyline: Vec<Point>,
    /// For each flattened step, the index of its first segment in `polyline`.
    /// Steps contributing no segments share their successor's start.
    step_segment_starts: Vec<usize>,
    /// Flattened (leg, step) pairs in travel order.
    flat_steps: Vec<(usize, usize)>,
    total_distance_m: f64,
    total_duration_s: f64,
}

impl Route {
    /// Builds a route from legs and planned totals.
    ///
    /// Degenerate input (no legs, no steps, single-point geometries) is
    /// accepted; resolvers degrade per their own contracts rather than this
    /// constructor rejecting the route.
    pub fn from_legs(legs: Vec<Leg>, total_distance_m: f64, total_duration_s: f64) -> Self {
        let mut polyline: Vec<Point> = Vec::new();
        let mut step_segment_starts = Vec::new();
        let mut flat_steps = Vec::new();

        for (leg_idx, leg) in legs.iter().enumerate() {
            for (step_idx, step) in leg.steps.iter().enumerate() {
                flat_steps.push((leg_idx, step_idx));
                step_segment_starts.push(polyline.len().saturating_sub(1));

                for point in &step.polyline {
                    // Step geometries share their join vertex with the next
                    // step; keep one copy so no zero-length segment appears.
                    if polyline.last() != Some(point) {
                        polyline.push(*point);
                    }
                }
            }
        }

        Self {
            legs,
            polyline,
            step_segment_starts,
            flat_steps,
            total_distance_m,
            total_duration_s,
        }
    }

    /// Builds a route from a bare overview polyline and planned totals.
    ///
    /// Used when a routing document carries geometry but no step breakdown.
    /// The result has zero steps, so instruction resolution degrades to
    /// straight-ahead defaults while projection, remaining distance, and
    /// arrival detection keep working.
    pub fn from_polyline(points: Vec<Point>, total_distance_m: f64, total_duration_s: f64) -> Self {
        let mut polyline: Vec<Point> = Vec::with_capacity(points.len());
        for point in points {
            if polyline.last() != Some(&point) {
                polyline.push(point);
            }
        }
        Self {
            legs: Vec::new(),
            polyline,
            step_segment_starts: Vec::new(),
            flat_steps: Vec::new(),
            total_distance_m,
            total_duration_s,
        }
    }

    /// The legs in travel order.
    pub fn legs(&self) -> &[Leg] {
        &self.legs
    }

    /// The overall polyline.
    pub fn polyline(&self) -> &[Point] {
        &self.polyline
    }

    /// Number of steps across all legs.
    pub fn step_count(&self) -> usize {
        self.flat_steps.len()
    }

    /// The step at a flattened index.
    pub fn step(&self, index: usize) -> Option<&Step> {
        let (leg_idx, step_idx) = *self.flat_steps.get(index)?;
        self.legs[leg_idx].steps.get(step_idx)
    }

    /// Iterates steps in travel order.
    pub fn steps(&self) -> impl Iterator<Item = &Step> {
        self.legs.iter().flat_map(|leg| leg.steps.iter())
    }

    /// Maps a segment of the overall polyline back to the step owning it.
    ///
    /// Steps without geometry are skipped in favor of the later step sharing
    /// the same start. Returns 0 for routes without steps.
    pub fn step_index_for_segment(&self, segment_index: usize) -> usize {
        if self.step_segment_starts.is_empty() {
            return 0;
        }
        let upper = self
            .step_segment_starts
            .partition_point(|&start| start <= segment_index);
        upper.saturating_sub(1)
    }

    /// First polyline segment owned by `step_index`.
    ///
    /// The inverse of [`step_index_for_segment`](Self::step_index_for_segment):
    /// slicing the overall polyline from this segment yields the geometry
    /// still ahead of a traveler on that step. Returns 0 for routes without
    /// steps or out-of-range indices.
    pub fn first_segment_of_step(&self, step_index: usize) -> usize {
        self.step_segment_starts
            .get(step_index)
            .copied()
            .unwrap_or(0)
    }

    /// Planned total length in meters.
    pub fn total_distance_m(&self) -> f64 {
        self.total_distance_m
    }

    /// Planned total travel time in seconds.
    pub fn total_duration_s(&self) -> f64 {
        self.total_duration_s
    }

    /// Planned average speed over the whole route, when derivable.
    ///
    /// `None` when the planned duration is zero or not finite, so a stopped
    /// traveler never divides by it blindly.
    pub fn planned_average_speed_mps(&self) -> Option<f64> {
        if self.total_duration_s > 0.0 && self.total_duration_s.is_finite() {
            Some(self.total_distance_m / self.total_duration_s)
        } else {
            None
        }
    }

    /// The final vertex of the route geometry.
    pub fn destination(&self) -> Option<Point> {
        self.polyline.last().copied()
    }

    /// True when the route has enough geometry to project onto.
    pub fn has_geometry(&self) -> bool {
        self.polyline.len() >= 2
    }

    /// Recomputed length of the overall polyline in meters.
    ///
    /// Diagnostic; the planned `total_distance_m` is authoritative for ETA.
    pub fn geometry_length_m(&self) -> f64 {
        geo::polyline_length_m(&self.polyline)
    }
}
