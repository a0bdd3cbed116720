//! Command validation and threat scoring.
//!
//! Every check that fails appends a human-readable error and, except for the
//! structural check, adds its weight to the threat score. The score is the
//! plain sum of triggered weights.

use serde::{Deserialize, Serialize};

use crate::models::{
    CommandPayload, CommandSource, EmergencyAction, EmergencyParams, MovementParams,
    SecurityParams, SensorParams, SystemParams, Waypoint,
};
use crate::rules::ParameterRules;

pub const MISSING_FIELDS: &str = "Missing required command fields";
pub const TIMESTAMP_TOO_OLD: &str = "Command timestamp too old";
pub const INVALID_SIGNATURE: &str = "Invalid command signature";
pub const INVALID_PARAMETERS: &str = "Invalid command parameters";
pub const INVALID_SOURCE: &str = "Invalid command source";

pub const STALE_WEIGHT: f64 = 0.3;
pub const SIGNATURE_WEIGHT: f64 = 0.5;
pub const PARAMETER_WEIGHT: f64 = 0.2;
pub const SOURCE_WEIGHT: f64 = 0.4;

/// Outcome of validating one command. Not persisted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub errors: Vec<String>,
    pub threat_score: f64,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Record a failed check with no threat contribution.
    pub fn fail(&mut self, error: &str) {
        self.errors.push(error.to_string());
    }

    /// Record a failed check that raises the threat score.
    pub fn flag(&mut self, error: &str, weight: f64) {
        self.errors.push(error.to_string());
        self.threat_score += weight;
    }
}

/// Type-specific parameter checks, one method per command type.
///
/// Every method accepts by default; implementors override the types they
/// care about.
pub trait ParameterValidator: Send + Sync {
    fn validate_movement(&self, _params: &MovementParams) -> bool {
        true
    }

    fn validate_sensor(&self, _params: &SensorParams) -> bool {
        true
    }

    fn validate_system(&self, _params: &SystemParams) -> bool {
        true
    }

    fn validate_emergency(&self, _params: &EmergencyParams) -> bool {
        true
    }

    fn validate_security(&self, _params: &SecurityParams) -> bool {
        true
    }
}

/// Route a payload to the validator method for its type.
pub fn validate_parameters(validator: &dyn ParameterValidator, payload: &CommandPayload) -> bool {
    match payload {
        CommandPayload::Movement(params) => validator.validate_movement(params),
        CommandPayload::Sensor(params) => validator.validate_sensor(params),
        CommandPayload::System(params) => validator.validate_system(params),
        CommandPayload::Emergency(params) => validator.validate_emergency(params),
        CommandPayload::Security(params) => validator.validate_security(params),
    }
}

/// A source needs an id, a type and a role. Blank strings count as missing.
pub fn validate_source(source: Option<&CommandSource>) -> bool {
    match source {
        Some(source) => {
            !source.id.trim().is_empty()
                && source.source_type.is_some()
                && !source.role.trim().is_empty()
        }
        None => false,
    }
}

/// Accepts every payload.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAllParameters;

impl ParameterValidator for AcceptAllParameters {}

/// Bounds-checks payloads against [`ParameterRules`].
#[derive(Debug, Clone, Default)]
pub struct StandardParameterValidator {
    rules: ParameterRules,
}

impl StandardParameterValidator {
    pub fn new(rules: ParameterRules) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &ParameterRules {
        &self.rules
    }

    fn waypoint_ok(&self, waypoint: &Waypoint) -> bool {
        let coords_ok = waypoint.lat.is_finite()
            && waypoint.lon.is_finite()
            && (-90.0..=90.0).contains(&waypoint.lat)
            && (-180.0..=180.0).contains(&waypoint.lon);
        let speed_ok = waypoint
            .speed_mps
            .map_or(true, |speed| self.rules.speed_in_bounds(speed));

        coords_ok && speed_ok && self.rules.altitude_in_bounds(waypoint.altitude_m)
    }
}

impl ParameterValidator for StandardParameterValidator {
    fn validate_movement(&self, params: &MovementParams) -> bool {
        match params {
            MovementParams::Goto { waypoint } => self.waypoint_ok(waypoint),
            MovementParams::Hold { duration_secs } => {
                (1..=self.rules.max_hold_secs).contains(duration_secs)
            }
            MovementParams::AltitudeChange { target_altitude_m } => {
                self.rules.altitude_in_bounds(*target_altitude_m)
            }
            MovementParams::Reroute { waypoints, .. } => {
                !waypoints.is_empty()
                    && waypoints.len() <= self.rules.max_reroute_waypoints
                    && waypoints.iter().all(|wp| self.waypoint_ok(wp))
            }
            MovementParams::ReturnToHome | MovementParams::Land => true,
        }
    }

    fn validate_sensor(&self, params: &SensorParams) -> bool {
        let rate_ok = params.sample_rate_hz.map_or(true, |rate| {
            rate.is_finite() && rate > 0.0 && rate <= self.rules.max_sample_rate_hz
        });
        let duration_ok = params
            .duration_secs
            .map_or(true, |secs| secs <= self.rules.max_sensor_duration_secs);
        rate_ok && duration_ok
    }

    fn validate_system(&self, params: &SystemParams) -> bool {
        match params {
            SystemParams::Reboot { delay_secs } => *delay_secs <= self.rules.max_reboot_delay_secs,
            SystemParams::UpdateConfig { key, .. } => !key.trim().is_empty(),
            SystemParams::FirmwareUpdate { version } => !version.trim().is_empty(),
            SystemParams::Diagnostics => true,
        }
    }

    fn validate_emergency(&self, params: &EmergencyParams) -> bool {
        if params.reason.trim().is_empty() {
            return false;
        }
        // Killing motors mid-air needs an explicit confirmation
        params.action != EmergencyAction::MotorKill || params.confirmed
    }

    fn validate_security(&self, params: &SecurityParams) -> bool {
        match params {
            SecurityParams::RotateKeys => true,
            SecurityParams::Lockdown { duration_secs } => {
                (1..=self.rules.max_lockdown_secs).contains(duration_secs)
            }
            SecurityParams::RevokeOperator { operator_id } => !operator_id.trim().is_empty(),
            SecurityParams::WipeMissionData { confirmed } => *confirmed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{SensorKind, SourceType};

    #[test]
    fn test_report_sums_weights() {
        let mut report = ValidationReport::default();
        report.fail(MISSING_FIELDS);
        report.flag(TIMESTAMP_TOO_OLD, STALE_WEIGHT);
        report.flag(INVALID_SOURCE, SOURCE_WEIGHT);

        assert!(!report.is_valid());
        assert_eq!(report.errors.len(), 3);
        assert!((report.threat_score - 0.7).abs() < 1e-9);
    }

    #[test]
    fn test_source_requires_id_type_and_role() {
        let good = CommandSource::new("op-1", SourceType::User, "USER");
        assert!(validate_source(Some(&good)));

        let mut no_role = good.clone();
        no_role.role = String::new();
        assert!(!validate_source(Some(&no_role)));

        let mut no_type = good.clone();
        no_type.source_type = None;
        assert!(!validate_source(Some(&no_type)));

        let mut blank_id = good;
        blank_id.id = "   ".to_string();
        assert!(!validate_source(Some(&blank_id)));

        assert!(!validate_source(None));
    }

    #[test]
    fn test_accept_all_parameters() {
        let payload = CommandPayload::Security(SecurityParams::WipeMissionData { confirmed: false });
        assert!(validate_parameters(&AcceptAllParameters, &payload));
    }

    #[test]
    fn test_standard_movement_bounds() {
        let validator = StandardParameterValidator::default();
        let ok = MovementParams::Goto {
            waypoint: Waypoint::new(33.6846, -117.8265, 50.0),
        };
        let too_high = MovementParams::AltitudeChange {
            target_altitude_m: 400.0,
        };
        let bad_lat = MovementParams::Goto {
            waypoint: Waypoint::new(91.0, 0.0, 50.0),
        };
        let empty_reroute = MovementParams::Reroute {
            waypoints: Vec::new(),
            reason: None,
        };

        assert!(validator.validate_movement(&ok));
        assert!(!validator.validate_movement(&too_high));
        assert!(!validator.validate_movement(&bad_lat));
        assert!(!validator.validate_movement(&empty_reroute));
        assert!(!validator.validate_movement(&MovementParams::Hold { duration_secs: 0 }));
    }

    #[test]
    fn test_standard_sensor_rate() {
        let validator = StandardParameterValidator::default();
        let params = SensorParams {
            sensor: SensorKind::Thermal,
            enabled: true,
            sample_rate_hz: Some(0.0),
            duration_secs: None,
        };
        assert!(!validator.validate_sensor(&params));

        let params = SensorParams {
            sample_rate_hz: Some(30.0),
            ..params
        };
        assert!(validator.validate_sensor(&params));
    }

    #[test]
    fn test_motor_kill_requires_confirmation() {
        let validator = StandardParameterValidator::default();
        let mut params = EmergencyParams {
            action: EmergencyAction::MotorKill,
            reason: "rotor failure".to_string(),
            confirmed: false,
        };
        assert!(!validator.validate_emergency(&params));

        params.confirmed = true;
        assert!(validator.validate_emergency(&params));

        params.reason.clear();
        assert!(!validator.validate_emergency(&params));
    }

    #[test]
    fn test_standard_system_and_security() {
        let validator = StandardParameterValidator::default();
        assert!(validator.validate_system(&SystemParams::Diagnostics));
        assert!(!validator.validate_system(&SystemParams::Reboot { delay_secs: 301 }));
        assert!(!validator.validate_system(&SystemParams::UpdateConfig {
            key: " ".to_string(),
            value: serde_json::json!(1),
        }));
        assert!(!validator.validate_security(&SecurityParams::RevokeOperator {
            operator_id: String::new(),
        }));
        assert!(validator.validate_security(&SecurityParams::Lockdown { duration_secs: 600 }));
    }
}
