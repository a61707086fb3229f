//! ETA estimation.
//!
//! Blends live instantaneous speed with the route's planned average speed.
//! At a stop (red light, traffic) instantaneous speed collapses toward zero
//! and must not project an infinite ETA, so below a minimum usable speed the
//! estimate falls back to the plan.

use crate::config::EtaConfig;

/// Estimates remaining travel time in seconds.
///
/// Uses `remaining_m / live_speed` when the live speed is usable
/// (≥ `config.min_live_speed_mps`). Otherwise divides by the planned average
/// speed of the original route when that is available and positive. When
/// neither speed is usable, returns the route's planned total duration
/// unmodified.
pub fn eta_seconds(
    remaining_m: f64,
    live_speed_mps: f64,
    planned_average_speed_mps: Option<f64>,
    planned_total_duration_s: f64,
    config: &EtaConfig,
) -> f64 {
    if remaining_m <= 0.0 {
        return 0.0;
    }

    if live_speed_mps.is_finite() && live_speed_mps >= config.min_live_speed_mps {
        return remaining_m / live_speed_mps;
    }

    match planned_average_speed_mps {
        Some(avg) if avg.is_finite() && avg > 0.0 => remaining_m / avg,
        _ => planned_total_duration_s,
    }
}

/// Formats a duration in seconds for display.
pub fn format_duration(seconds: f64) -> String {
    let total = seconds.max(0.0).round() as u64;
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;

    if hours > 0 {
        format!("{hours} h {minutes} min")
    } else if minutes > 0 {
        format!("{minutes} min")
    } else {
        format!("{total} s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> EtaConfig {
        EtaConfig::default()
    }

    #[test]
    fn live_speed_drives_estimate_when_usable() {
        let eta = eta_seconds(1000.0, 20.0, Some(10.0), 300.0, &config());
        assert_eq!(eta, 50.0);
    }

    #[test]
    fn stopped_traveler_falls_back_to_planned_average() {
        // The contract fixture: 1000 m remaining, stopped, 10 m/s plan.
        let eta = eta_seconds(1000.0, 0.0, Some(10.0), 300.0, &config());
        assert_eq!(eta, 100.0);
    }

    #[test]
    fn missing_average_falls_back_to_planned_duration() {
        let eta = eta_seconds(1000.0, 0.0, None, 300.0, &config());
        assert_eq!(eta, 300.0);
        let eta = eta_seconds(1000.0, 0.0, Some(0.0), 300.0, &config());
        assert_eq!(eta, 300.0);
    }

    #[test]
    fn crawling_speed_below_threshold_is_not_used() {
        // 0.5 m/s would project 2000 s; the plan says 100 s.
        let eta = eta_seconds(1000.0, 0.5, Some(10.0), 300.0, &config());
        assert_eq!(eta, 100.0);
    }

    #[test]
    fn nothing_remaining_means_zero() {
        assert_eq!(eta_seconds(0.0, 20.0, Some(10.0), 300.0, &config()), 0.0);
        assert_eq!(eta_seconds(-5.0, 20.0, Some(10.0), 300.0, &config()), 0.0);
    }

    #[test]
    fn non_finite_live_speed_is_ignored() {
        let eta = eta_seconds(1000.0, f64::NAN, Some(10.0), 300.0, &config());
        assert_eq!(eta, 100.0);
    }

    #[test]
    fn durations_format_by_magnitude() {
        assert_eq!(format_duration(42.0), "42 s");
        assert_eq!(format_duration(240.0), "4 min");
        assert_eq!(format_duration(3900.0), "1 h 5 min");
    }
}
