//! Service configuration from environment.

use std::env;
use std::str::FromStr;

use skyguard_core::{ParameterRules, PipelineConfig};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("altitude bounds inverted: min {min_m}m is above max {max_m}m")]
    InvertedAltitudeBounds { min_m: f64, max_m: f64 },

    #[error("{0} must be greater than zero")]
    ZeroCapacity(&'static str),

    #[error("{name} must be non-negative, got {value}")]
    NegativeThreshold { name: &'static str, value: f64 },

    #[error("critical threat threshold {critical} is below threat threshold {threat}")]
    CriticalBelowThreat { threat: f64, critical: f64 },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub max_command_age_ms: i64,
    pub threat_threshold: f64,
    pub critical_threat_threshold: f64,
    pub history_capacity: usize,
    /// Bound of the request channel feeding the pipeline actor
    pub channel_capacity: usize,
    /// Lag tolerated by security event subscribers before they miss events
    pub event_buffer: usize,
    pub max_altitude_m: f64,
    pub min_altitude_m: f64,
    pub max_speed_mps: f64,
    /// `false` swaps the bounds-checking validator for one that accepts all
    pub strict_parameters: bool,
    pub log_json: bool,
}

impl Default for Config {
    fn default() -> Self {
        let pipeline = PipelineConfig::default();
        let rules = ParameterRules::default();
        Self {
            max_command_age_ms: pipeline.max_command_age_ms,
            threat_threshold: pipeline.threat_threshold,
            critical_threat_threshold: pipeline.critical_threat_threshold,
            history_capacity: pipeline.history_capacity,
            channel_capacity: 256,
            event_buffer: 1024,
            max_altitude_m: rules.max_altitude_m,
            min_altitude_m: rules.min_altitude_m,
            max_speed_mps: rules.max_speed_mps,
            strict_parameters: true,
            log_json: false,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Unset or unparsable values fall
    /// back to the defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        Self {
            max_command_age_ms: parsed(&lookup, "SKYGUARD_MAX_COMMAND_AGE_MS")
                .unwrap_or(defaults.max_command_age_ms),
            threat_threshold: parsed(&lookup, "SKYGUARD_THREAT_THRESHOLD")
                .unwrap_or(defaults.threat_threshold),
            critical_threat_threshold: parsed(&lookup, "SKYGUARD_CRITICAL_THREAT_THRESHOLD")
                .unwrap_or(defaults.critical_threat_threshold),
            history_capacity: parsed(&lookup, "SKYGUARD_HISTORY_CAPACITY")
                .unwrap_or(defaults.history_capacity),
            channel_capacity: parsed(&lookup, "SKYGUARD_CHANNEL_CAPACITY")
                .unwrap_or(defaults.channel_capacity),
            event_buffer: parsed(&lookup, "SKYGUARD_EVENT_BUFFER")
                .unwrap_or(defaults.event_buffer),
            max_altitude_m: parsed(&lookup, "SKYGUARD_MAX_ALTITUDE_M")
                .unwrap_or(defaults.max_altitude_m),
            min_altitude_m: parsed(&lookup, "SKYGUARD_MIN_ALTITUDE_M")
                .unwrap_or(defaults.min_altitude_m),
            max_speed_mps: parsed(&lookup, "SKYGUARD_MAX_SPEED_MPS")
                .unwrap_or(defaults.max_speed_mps),
            strict_parameters: lookup("SKYGUARD_STRICT_PARAMETERS")
                .and_then(|raw| parse_flag(&raw))
                .unwrap_or(defaults.strict_parameters),
            log_json: lookup("SKYGUARD_LOG_JSON")
                .and_then(|raw| parse_flag(&raw))
                .unwrap_or(defaults.log_json),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_altitude_m > self.max_altitude_m {
            return Err(ConfigError::InvertedAltitudeBounds {
                min_m: self.min_altitude_m,
                max_m: self.max_altitude_m,
            });
        }
        if self.history_capacity == 0 {
            return Err(ConfigError::ZeroCapacity("history capacity"));
        }
        if self.channel_capacity == 0 {
            return Err(ConfigError::ZeroCapacity("channel capacity"));
        }
        if self.event_buffer == 0 {
            return Err(ConfigError::ZeroCapacity("event buffer"));
        }
        for (name, value) in [
            ("threat threshold", self.threat_threshold),
            ("critical threat threshold", self.critical_threat_threshold),
        ] {
            // NaN fails this comparison too.
            if !(value >= 0.0) {
                return Err(ConfigError::NegativeThreshold { name, value });
            }
        }
        if self.critical_threat_threshold < self.threat_threshold {
            return Err(ConfigError::CriticalBelowThreat {
                threat: self.threat_threshold,
                critical: self.critical_threat_threshold,
            });
        }
        Ok(())
    }

    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            max_command_age_ms: self.max_command_age_ms,
            threat_threshold: self.threat_threshold,
            critical_threat_threshold: self.critical_threat_threshold,
            history_capacity: self.history_capacity,
        }
    }

    pub fn parameter_rules(&self) -> ParameterRules {
        ParameterRules {
            max_altitude_m: self.max_altitude_m,
            min_altitude_m: self.min_altitude_m,
            max_speed_mps: self.max_speed_mps,
            ..ParameterRules::default()
        }
    }
}

fn parsed<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    lookup(key).and_then(|raw| raw.trim().parse().ok())
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
