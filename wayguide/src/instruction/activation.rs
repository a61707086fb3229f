//! Guidance-cue activation classification.
//!
//! Decides whether an upcoming maneuver is close enough to fire a guidance
//! cue (voice prompt, AR overlay), and why. Highway exits activate at a wider
//! radius than ordinary turns: leaving a highway needs lane changes and
//! driver commitment well before the ramp.

use crate::config::ActivationConfig;

/// Why a guidance cue should fire now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivationReason {
    /// Within the exit radius of a ramp/exit maneuver.
    ApproachingExit,
    /// Within the turn radius of an ordinary maneuver.
    ApproachingTurn,
}

impl std::fmt::Display for ActivationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ApproachingExit => write!(f, "approaching exit"),
            Self::ApproachingTurn => write!(f, "approaching turn"),
        }
    }
}

/// Classifies whether a cue should fire for a maneuver at the given distance.
///
/// Categories containing "ramp" or "exit" use `exit_radius_m`; everything
/// else uses `turn_radius_m`. Both radii are inclusive. Returns `None` beyond
/// the applicable radius.
pub fn determine_activation_reason(
    maneuver_category: &str,
    distance_m: f64,
    config: &ActivationConfig,
) -> Option<ActivationReason> {
    let category = maneuver_category.to_ascii_lowercase();
    let is_exit = category.contains("ramp") || category.contains("exit");

    if is_exit {
        (distance_m <= config.exit_radius_m).then_some(ActivationReason::ApproachingExit)
    } else {
        (distance_m <= config.turn_radius_m).then_some(ActivationReason::ApproachingTurn)
    }
}
