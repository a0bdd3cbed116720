//! Parameter limits enforced by the standard validators.

use serde::{Deserialize, Serialize};

/// Configuration for command parameter bounds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterRules {
    /// Maximum allowed altitude in meters
    pub max_altitude_m: f64,
    /// Minimum allowed altitude in meters
    pub min_altitude_m: f64,
    /// Maximum commanded ground speed in m/s
    pub max_speed_mps: f64,
    /// Longest allowed HOLD
    pub max_hold_secs: u32,
    /// Maximum number of waypoints in a single REROUTE
    pub max_reroute_waypoints: usize,
    /// Highest sensor sample rate in Hz
    pub max_sample_rate_hz: f64,
    /// Longest sensor activation
    pub max_sensor_duration_secs: u32,
    /// Longest delay before a scheduled reboot
    pub max_reboot_delay_secs: u32,
    /// Longest security lockdown
    pub max_lockdown_secs: u32,
}

impl Default for ParameterRules {
    fn default() -> Self {
        Self {
            max_altitude_m: 121.0, // FAA Part 107 limit (~400ft)
            min_altitude_m: 10.0,
            max_speed_mps: 30.0,
            max_hold_secs: 3600,
            max_reroute_waypoints: 50,
            max_sample_rate_hz: 120.0,
            max_sensor_duration_secs: 3600,
            max_reboot_delay_secs: 300,
            max_lockdown_secs: 86_400,
        }
    }
}

impl ParameterRules {
    pub fn altitude_in_bounds(&self, altitude_m: f64) -> bool {
        altitude_m.is_finite() && altitude_m >= self.min_altitude_m && altitude_m <= self.max_altitude_m
    }

    pub fn speed_in_bounds(&self, speed_mps: f64) -> bool {
        speed_mps.is_finite() && (0.0..=self.max_speed_mps).contains(&speed_mps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_altitude_band() {
        let rules = ParameterRules::default();
        assert!(rules.altitude_in_bounds(50.0));
        assert!(rules.altitude_in_bounds(121.0));
        assert!(!rules.altitude_in_bounds(121.5));
        assert!(!rules.altitude_in_bounds(5.0));
        assert!(!rules.altitude_in_bounds(f64::NAN));
    }

    #[test]
    fn test_speed_rejects_negative_and_infinite() {
        let rules = ParameterRules::default();
        assert!(rules.speed_in_bounds(0.0));
        assert!(rules.speed_in_bounds(30.0));
        assert!(!rules.speed_in_bounds(-1.0));
        assert!(!rules.speed_in_bounds(f64::INFINITY));
    }
}
