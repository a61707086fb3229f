//! Speed estimation from position fixes.
//!
//! Location sources report an instantaneous speed, but near standstill that
//! value is noise, and under multipath it can contradict the movement the
//! fixes themselves show. The estimator keeps the previous accepted fix,
//! derives speed from distance over time delta, and uses the policy
//! thresholds to decide which value to trust per sample.

use std::time::Instant;

use crate::config::SpeedPolicy;
use crate::geo::{self, Point};
use crate::position::Position;

/// Chooses between reported and derived speed per fix.
#[derive(Debug)]
pub struct SpeedEstimator {
    policy: SpeedPolicy,
    last_fix: Option<(Point, Instant)>,
}

impl SpeedEstimator {
    /// Creates an estimator with the given policy.
    pub fn new(policy: SpeedPolicy) -> Self {
        Self {
            policy,
            last_fix: None,
        }
    }

    /// Estimates the traveler's speed at this fix, in m/s.
    ///
    /// The reported speed wins when it is present, at or above the
    /// reliability floor, and within the disagreement tolerance of the
    /// derived speed. Otherwise the derived speed is used; with no history
    /// and an unusable report, the estimate is 0.
    pub fn estimate(&mut self, fix: &Position) -> f64 {
        let point = Point::from(fix);
        let derived = self.derived_speed(point, fix.timestamp);
        self.last_fix = Some((point, fix.timestamp));

        let reported = fix
            .speed_mps
            .filter(|s| s.is_finite() && *s >= self.policy.min_reliable_reported_mps);

        match (reported, derived) {
            (Some(reported), Some(derived)) => {
                if (reported - derived).abs() > self.policy.max_disagreement_mps {
                    derived
                } else {
                    reported
                }
            }
            (Some(reported), None) => reported,
            (None, Some(derived)) => derived,
            (None, None) => 0.0,
        }
    }

    /// Forgets the previous fix.
    ///
    /// Called when navigation (re)starts so a stale gap never produces a
    /// bogus derived speed.
    pub fn reset(&mut self) {
        self.last_fix = None;
    }

    fn derived_speed(&self, point: Point, timestamp: Instant) -> Option<f64> {
        let (prev_point, prev_time) = self.last_fix?;
        let elapsed = timestamp.saturating_duration_since(prev_time).as_secs_f64();
        if elapsed <= 0.0 {
            return None;
        }
        Some(geo::distance_meters(prev_point, point) / elapsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn estimator() -> SpeedEstimator {
        SpeedEstimator::new(SpeedPolicy::default())
    }

    /// Two equator fixes 0.001 degrees (~111.2 m) apart, 10 s between them.
    fn fix_pair(reported_second: Option<f64>) -> (Position, Position) {
        let start = Instant::now();
        let first = Position::at(0.0, 0.0, start);
        let mut second = Position::at(0.0, 0.001, start + Duration::from_secs(10));
        if let Some(speed) = reported_second {
            second = second.with_speed_mps(speed);
        }
        (first, second)
    }

    #[test]
    fn agreeing_reported_speed_wins() {
        let (first, second) = fix_pair(Some(10.0));
        let mut est = estimator();
        est.estimate(&first);
        // Derived ~11.1 m/s, reported 10.0: within tolerance.
        assert_eq!(est.estimate(&second), 10.0);
    }

    #[test]
    fn disagreeing_reported_speed_is_discarded() {
        let (first, second) = fix_pair(Some(30.0));
        let mut est = estimator();
        est.estimate(&first);
        // Derived ~11.1 m/s, reported 30.0: beyond tolerance, use derived.
        let speed = est.estimate(&second);
        assert!((speed - 11.1).abs() < 0.5, "got {speed:.2}");
    }

    #[test]
    fn sub_threshold_report_falls_back_to_derived() {
        let (first, second) = fix_pair(Some(0.3));
        let mut est = estimator();
        est.estimate(&first);
        let speed = est.estimate(&second);
        assert!((speed - 11.1).abs() < 0.5, "got {speed:.2}");
    }

    #[test]
    fn first_fix_uses_reliable_report() {
        let mut est = estimator();
        let fix = Position::new(0.0, 0.0).with_speed_mps(8.0);
        assert_eq!(est.estimate(&fix), 8.0);
    }

    #[test]
    fn first_fix_without_usable_report_is_zero() {
        let mut est = estimator();
        assert_eq!(est.estimate(&Position::new(0.0, 0.0)), 0.0);
        let mut est = estimator();
        let crawling = Position::new(0.0, 0.0).with_speed_mps(0.2);
        assert_eq!(est.estimate(&crawling), 0.0);
    }

    #[test]
    fn identical_timestamps_produce_no_derived_speed() {
        let now = Instant::now();
        let mut est = estimator();
        est.estimate(&Position::at(0.0, 0.0, now));
        // Same timestamp: no time delta, no derived speed, no report.
        assert_eq!(est.estimate(&Position::at(0.0, 0.001, now)), 0.0);
    }

    #[test]
    fn reset_forgets_history() {
        let (first, second) = fix_pair(None);
        let mut est = estimator();
        est.estimate(&first);
        est.reset();
        // Without history the second fix has nothing to derive from.
        assert_eq!(est.estimate(&second), 0.0);
    }
}
