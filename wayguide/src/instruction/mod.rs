//! Turn instruction resolution.
//!
//! Resolves which step the traveler is currently on, and produces the
//! current and next human-facing instruction with a direction category
//! derived from the step's maneuver descriptor.
//!
//! # Forward-only progress
//!
//! [`find_current_step_index`] never returns an index lower than the
//! previous one. GPS noise near parallel roads can briefly project a fix
//! onto an earlier segment; without the clamp the displayed instruction
//! would flicker backwards.
//!
//! # Components
//!
//! - [`Direction`] - closed set of direction categories
//! - [`Instruction`] - one resolved instruction for display
//! - [`activation`] - guidance-cue activation classification

pub mod activation;

pub use activation::{determine_activation_reason, ActivationReason};

use crate::geo::{self, Point};
use crate::position::Position;
use crate::route::{Maneuver, Route};

/// Direction categories for display and voice guidance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Straight,
    SlightLeft,
    Left,
    SharpLeft,
    SlightRight,
    Right,
    SharpRight,
    UTurn,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Straight => "straight",
            Self::SlightLeft => "slight left",
            Self::Left => "left",
            Self::SharpLeft => "sharp left",
            Self::SlightRight => "slight right",
            Self::Right => "right",
            Self::SharpRight => "sharp right",
            Self::UTurn => "u-turn",
        };
        write!(f, "{label}")
    }
}

/// One resolved instruction.
#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    /// Human-facing instruction text, verbatim from the step.
    pub text: String,
    /// Direction category for icons and voice prompts.
    pub direction: Direction,
    /// Street or road name, empty when unnamed.
    pub name: String,
    /// Distance to the step's maneuver point, in meters.
    ///
    /// For the current instruction this is measured live from the given
    /// position. For the next instruction it is the planned distance from
    /// the current maneuver to the next one.
    pub distance_m: f64,
}

/// Maps a maneuver descriptor to a direction category.
///
/// Fixed table: "turn" maps through its modifier;
/// "arrive"/"depart"/"continue"/"merge" are always straight; "fork" and the
/// ramp types defer to the modifier; anything unrecognized is straight.
pub fn direction_for_maneuver(maneuver: &Maneuver) -> Direction {
    let modifier = maneuver.modifier.as_deref();
    match maneuver.maneuver_type.as_str() {
        "turn" | "fork" | "on ramp" | "off ramp" => direction_for_modifier(modifier),
        "arrive" | "depart" | "continue" | "merge" => Direction::Straight,
        _ => Direction::Straight,
    }
}

fn direction_for_modifier(modifier: Option<&str>) -> Direction {
    match modifier {
        Some("left") => Direction::Left,
        Some("slight left") => Direction::SlightLeft,
        Some("sharp left") => Direction::SharpLeft,
        Some("right") => Direction::Right,
        Some("slight right") => Direction::SlightRight,
        Some("sharp right") => Direction::SharpRight,
        Some("uturn") => Direction::UTurn,
        _ => Direction::Straight,
    }
}

/// Resolves the step the traveler is currently on.
///
/// Projects the position onto the route's full polyline and maps the nearest
/// segment back to its owning step. The result never regresses below
/// `previous_step_index` and never exceeds the last valid step. Routes with
/// no steps resolve to 0; routes whose polyline cannot be projected onto
/// keep the previous index.
pub fn find_current_step_index(
    position: &Position,
    route: &Route,
    previous_step_index: usize,
) -> usize {
    if route.step_count() == 0 {
        return 0;
    }
    let last_valid = route.step_count() - 1;

    let projected = match geo::closest_point_on_polyline(Point::from(position), route.polyline()) {
        Some(projection) => route.step_index_for_segment(projection.segment_index),
        None => previous_step_index,
    };

    projected.max(previous_step_index).min(last_valid)
}

/// Resolves the instruction for the step at `step_index`.
///
/// The distance is measured live from `position` to the step's maneuver
/// point. Returns `None` when `step_index` is out of range (including any
/// route with zero steps).
pub fn current_instruction(
    position: &Position,
    route: &Route,
    step_index: usize,
) -> Option<Instruction> {
    let step = route.step(step_index)?;
    Some(Instruction {
        text: step.instruction.clone(),
        direction: direction_for_maneuver(&step.maneuver),
        name: step.name.clone(),
        distance_m: geo::distance_meters(Point::from(position), step.maneuver.location),
    })
}

/// Resolves the instruction for the step after `step_index`.
///
/// The distance is the planned length of the current step, i.e. how far the
/// traveler drives from the current maneuver until the next one. Returns
/// `None` when the current step is the last.
pub fn next_instruction(route: &Route, step_index: usize) -> Option<Instruction> {
    let next = route.step(step_index + 1)?;
    let planned_to_next = route.step(step_index).map_or(0.0, |s| s.distance_m);
    Some(Instruction {
        text: next.instruction.clone(),
        direction: direction_for_maneuver(&next.maneuver),
        name: next.name.clone(),
        distance_m: planned_to_next,
    })
}

/// Formats a distance for instruction display.
///
/// Kilometers with one decimal above 1 km, otherwise meters rounded to the
/// nearest ten.
pub fn format_distance(meters: f64) -> String {
    if meters >= 1000.0 {
        format!("{:.1} km", meters / 1000.0)
    } else {
        format!("{} m", (meters / 10.0).round() as i64 * 10)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::route::{Leg, Step};

    fn pt(lat: f64, lon: f64) -> Point {
        Point::new(lat, lon)
    }

    fn maneuver(maneuver_type: &str, modifier: Option<&str>) -> Maneuver {
        Maneuver::new(maneuver_type, modifier, pt(0.0, 0.0))
    }

    fn step(name: &str, maneuver_type: &str, modifier: Option<&str>, polyline: Vec<Point>) -> Step {
        let location = polyline.first().copied().unwrap_or(pt(0.0, 0.0));
        Step {
            instruction: format!("{maneuver_type} {name}"),
            name: name.to_owned(),
            maneuver: Maneuver::new(maneuver_type, modifier, location),
            polyline,
            distance_m: 111.0,
            duration_s: 10.0,
        }
    }

    /// Two-step route heading east along the equator, then north.
    fn two_step_route() -> Route {
        let leg = Leg {
            steps: vec![
                step(
                    "First Ave",
                    "depart",
                    None,
                    vec![pt(0.0, 0.0), pt(0.0, 0.001), pt(0.0, 0.002)],
                ),
                step(
                    "Second Ave",
                    "turn",
                    Some("left"),
                    vec![pt(0.0, 0.002), pt(0.001, 0.002)],
                ),
            ],
            distance_m: 333.0,
            duration_s: 30.0,
        };
        Route::from_legs(vec![leg], 333.0, 30.0)
    }

    // ==================== Direction mapping ====================

    #[test]
    fn turn_maps_through_modifier() {
        assert_eq!(
            direction_for_maneuver(&maneuver("turn", Some("left"))),
            Direction::Left
        );
        assert_eq!(
            direction_for_maneuver(&maneuver("turn", Some("slight left"))),
            Direction::SlightLeft
        );
        assert_eq!(
            direction_for_maneuver(&maneuver("turn", Some("sharp right"))),
            Direction::SharpRight
        );
        assert_eq!(
            direction_for_maneuver(&maneuver("turn", Some("uturn"))),
            Direction::UTurn
        );
    }

    #[test]
    fn through_maneuvers_are_straight_regardless_of_modifier() {
        for maneuver_type in ["arrive", "depart", "continue", "merge"] {
            assert_eq!(
                direction_for_maneuver(&maneuver(maneuver_type, Some("left"))),
                Direction::Straight,
                "type {maneuver_type:?}"
            );
        }
    }

    #[test]
    fn fork_and_ramps_defer_to_modifier() {
        assert_eq!(
            direction_for_maneuver(&maneuver("fork", Some("slight right"))),
            Direction::SlightRight
        );
        assert_eq!(
            direction_for_maneuver(&maneuver("off ramp", Some("right"))),
            Direction::Right
        );
        assert_eq!(
            direction_for_maneuver(&maneuver("fork", None)),
            Direction::Straight
        );
    }

    #[test]
    fn unrecognized_combinations_default_to_straight() {
        assert_eq!(
            direction_for_maneuver(&maneuver("roundabout turn", Some("left"))),
            Direction::Straight
        );
        assert_eq!(
            direction_for_maneuver(&maneuver("turn", Some("backwards"))),
            Direction::Straight
        );
    }

    // ==================== Step resolution ====================

    #[test]
    fn step_index_advances_with_progress() {
        let route = two_step_route();
        let on_first = Position::new(0.0, 0.0005);
        let on_second = Position::new(0.0005, 0.002);

        assert_eq!(find_current_step_index(&on_first, &route, 0), 0);
        assert_eq!(find_current_step_index(&on_second, &route, 0), 1);
    }

    #[test]
    fn step_index_never_regresses() {
        let route = two_step_route();
        // A noisy fix projecting back onto the first step must not move the
        // index backwards.
        let near_start = Position::new(0.0, 0.0005);
        assert_eq!(find_current_step_index(&near_start, &route, 1), 1);
    }

    #[test]
    fn step_index_clamps_to_last_step() {
        let route = two_step_route();
        let past_end = Position::new(0.002, 0.002);
        assert_eq!(find_current_step_index(&past_end, &route, 5), 1);
    }

    #[test]
    fn step_index_zero_for_steplessness() {
        let route = Route::from_polyline(vec![pt(0.0, 0.0), pt(0.0, 0.001)], 111.0, 10.0);
        let fix = Position::new(0.0, 0.0005);
        assert_eq!(find_current_step_index(&fix, &route, 3), 0);
    }

    // ==================== Instruction resolution ====================

    #[test]
    fn current_instruction_measures_live_distance() {
        let route = two_step_route();
        // ~111 m east of the second step's maneuver point at (0.0, 0.002).
        let fix = Position::new(0.0, 0.003);
        let instruction = current_instruction(&fix, &route, 1).unwrap();
        assert_eq!(instruction.direction, Direction::Left);
        assert_eq!(instruction.name, "Second Ave");
        assert!(
            (instruction.distance_m - 111.0).abs() < 5.0,
            "got {:.1}",
            instruction.distance_m
        );
    }

    #[test]
    fn current_instruction_out_of_range_is_none() {
        let route = two_step_route();
        let fix = Position::new(0.0, 0.0);
        assert!(current_instruction(&fix, &route, 2).is_none());
    }

    #[test]
    fn next_instruction_carries_planned_distance() {
        let route = two_step_route();
        let next = next_instruction(&route, 0).unwrap();
        assert_eq!(next.name, "Second Ave");
        assert_eq!(next.distance_m, 111.0);
    }

    #[test]
    fn next_instruction_none_at_last_step() {
        let route = two_step_route();
        assert!(next_instruction(&route, 1).is_none());
    }

    // ==================== Formatting ====================

    #[test]
    fn distances_format_by_magnitude() {
        assert_eq!(format_distance(156.0), "160 m");
        assert_eq!(format_distance(42.0), "40 m");
        assert_eq!(format_distance(1500.0), "1.5 km");
    }
}
