//! Scripted command sequences that walk every pipeline path.

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use skyguard_core::authorization;
use skyguard_core::{
    Command, CommandExecutor, CommandPayload, CommandPriority, CommandSource, CommandType,
    EmergencyAction, EmergencyParams, ExecutionError, MovementParams, SecurityParams, SensorKind,
    SensorParams, SourceType, SubmitOutcome, SystemParams, Waypoint,
};
use uuid::Uuid;

/// Irvine flight hub
const HUB_LAT: f64 = 33.6846;
const HUB_LON: f64 = -117.8265;

/// Drone the demo executor treats as out of radio range.
pub const OFFLINE_DRONE_ID: &str = "DRONE-OFFLINE";

/// What a step is expected to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Expectation {
    Accepted,
    Rejected,
    Failed,
}

impl Expectation {
    pub fn matches(&self, outcome: SubmitOutcome) -> bool {
        matches!(
            (self, outcome),
            (Expectation::Accepted, SubmitOutcome::Completed)
                | (Expectation::Failed, SubmitOutcome::Failed)
                | (Expectation::Rejected, SubmitOutcome::Rejected(_))
        )
    }
}

pub struct ScenarioStep {
    pub label: String,
    pub command: Command,
    pub expect: Expectation,
}

impl ScenarioStep {
    fn new(label: &str, command: Command, expect: Expectation) -> Self {
        Self {
            label: label.to_string(),
            command,
            expect,
        }
    }
}

/// A named, ordered list of submissions.
pub struct Scenario {
    pub name: String,
    pub steps: Vec<ScenarioStep>,
}

pub fn next_command_id() -> String {
    format!("CMD-{}", Uuid::new_v4().simple())
}

pub fn operator(role: &str) -> CommandSource {
    CommandSource::new("demo-operator", SourceType::User, role).with_ip_address("127.0.0.1")
}

fn signed(drone_id: &str, payload: CommandPayload, source: CommandSource) -> Command {
    Command::new(next_command_id(), drone_id, payload, source).with_signature("demo-signature")
}

pub fn goto_command(drone_id: &str, role: &str, lat: f64, lon: f64) -> Command {
    let waypoint = Waypoint {
        speed_mps: Some(10.0),
        ..Waypoint::new(lat, lon, 50.0)
    };
    signed(
        drone_id,
        CommandPayload::Movement(MovementParams::Goto { waypoint }),
        operator(role),
    )
}

pub fn camera_command(drone_id: &str, role: &str) -> Command {
    signed(
        drone_id,
        CommandPayload::Sensor(SensorParams {
            sensor: SensorKind::Camera,
            enabled: true,
            sample_rate_hz: Some(30.0),
            duration_secs: Some(120),
        }),
        operator(role),
    )
}

pub fn stale_command(drone_id: &str, role: &str) -> Command {
    let ten_seconds_ago = Utc::now().timestamp_millis() - 10_000;
    signed(
        drone_id,
        CommandPayload::Movement(MovementParams::Hold { duration_secs: 30 }),
        operator(role),
    )
    .with_timestamp(ten_seconds_ago)
}

/// A command that lost its signature in transit.
pub fn unsigned_command(drone_id: &str, role: &str) -> Command {
    let mut command = signed(
        drone_id,
        CommandPayload::Movement(MovementParams::Land),
        operator(role),
    );
    command.signature.clear();
    command
}

pub fn reboot_command(drone_id: &str, role: &str) -> Command {
    signed(
        drone_id,
        CommandPayload::System(SystemParams::Reboot { delay_secs: 5 }),
        operator(role),
    )
}

pub fn rotate_keys_command(drone_id: &str, role: &str) -> Command {
    signed(
        drone_id,
        CommandPayload::Security(SecurityParams::RotateKeys),
        operator(role),
    )
}

pub fn emergency_land_command(drone_id: &str, role: &str, reason: &str) -> Command {
    signed(
        drone_id,
        CommandPayload::Emergency(EmergencyParams {
            action: EmergencyAction::Land,
            reason: reason.to_string(),
            confirmed: true,
        }),
        operator(role),
    )
    .with_priority(CommandPriority::Critical)
}

/// Expected outcome for a well-formed command sent with `role`.
fn expect_for(role: &str, command_type: CommandType) -> Expectation {
    let allowed = authorization::allowed_roles(Some(command_type))
        .iter()
        .any(|allowed| *allowed == role);
    if allowed {
        Expectation::Accepted
    } else {
        Expectation::Rejected
    }
}

/// Full tour of the pipeline for one operator role: admissions, validation
/// failures, role checks, a CRITICAL jump and an execution failure.
pub fn create_authorization_tour(drone_id: &str, role: &str, burst: usize) -> Scenario {
    let movement = expect_for(role, CommandType::Movement);

    let mut steps = vec![
        ScenarioStep::new(
            "valid movement",
            goto_command(drone_id, role, HUB_LAT + 0.003, HUB_LON),
            movement,
        ),
        ScenarioStep::new(
            "sensor activation",
            camera_command(drone_id, role),
            expect_for(role, CommandType::Sensor),
        ),
        ScenarioStep::new(
            "stale command",
            stale_command(drone_id, role),
            Expectation::Rejected,
        ),
        ScenarioStep::new(
            "missing signature",
            unsigned_command(drone_id, role),
            Expectation::Rejected,
        ),
        ScenarioStep::new(
            "reboot",
            reboot_command(drone_id, role),
            expect_for(role, CommandType::System),
        ),
        ScenarioStep::new(
            "key rotation",
            rotate_keys_command(drone_id, role),
            expect_for(role, CommandType::Security),
        ),
    ];

    for i in 0..burst {
        let offset = 0.001 * (i as f64 + 1.0);
        steps.push(ScenarioStep::new(
            &format!("burst {}", i + 1),
            goto_command(drone_id, role, HUB_LAT, HUB_LON + offset),
            movement,
        ));
    }

    steps.push(ScenarioStep::new(
        "critical emergency landing",
        emergency_land_command(drone_id, role, "manned aircraft in sector"),
        expect_for(role, CommandType::Emergency),
    ));
    let offline = if movement == Expectation::Accepted {
        Expectation::Failed
    } else {
        movement
    };
    steps.push(ScenarioStep::new(
        "execution failure",
        goto_command(OFFLINE_DRONE_ID, role, HUB_LAT, HUB_LON),
        offline,
    ));

    Scenario {
        name: format!("authorization tour ({role})"),
        steps,
    }
}

/// Succeeds for every drone except the ones marked offline.
#[derive(Debug, Clone)]
pub struct DemoExecutor {
    offline: HashSet<String>,
}

impl Default for DemoExecutor {
    fn default() -> Self {
        Self::new([OFFLINE_DRONE_ID])
    }
}

impl DemoExecutor {
    pub fn new<I, S>(offline: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            offline: offline.into_iter().map(Into::into).collect(),
        }
    }
}

#[async_trait]
impl CommandExecutor for DemoExecutor {
    async fn execute(&self, command: &Command) -> Result<(), ExecutionError> {
        if self.offline.contains(&command.target_drone_id) {
            return Err(ExecutionError::DroneUnreachable(command.target_drone_id.clone()));
        }
        tracing::info!(
            "Dispatched {} to {}",
            command
                .command_type()
                .map(|t| t.as_str())
                .unwrap_or("UNTYPED"),
            command.target_drone_id
        );
        Ok(())
    }
}
