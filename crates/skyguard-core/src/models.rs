//! Core data models for drone-directed commands.

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Command issued to a drone.
///
/// Everything except `status` is write-once at submission. Missing string
/// fields are represented as empty strings so that structurally malformed
/// commands still reach the pipeline, which reports them itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    #[serde(default)]
    pub command_id: String,
    /// Typed parameters. `None` means the command carries no type.
    #[serde(default)]
    pub payload: Option<CommandPayload>,
    #[serde(default)]
    pub signature: String,
    /// Creation time in epoch milliseconds. Absent on the wire reads as 0,
    /// which is always outside the staleness window.
    #[serde(default)]
    pub timestamp: i64,
    #[serde(default)]
    pub priority: CommandPriority,
    #[serde(default)]
    pub source: Option<CommandSource>,
    #[serde(default)]
    pub status: CommandStatus,
    #[serde(default)]
    pub target_drone_id: String,
}

impl Command {
    /// Create a pending, unsigned command stamped with the current time.
    pub fn new(
        command_id: impl Into<String>,
        target_drone_id: impl Into<String>,
        payload: CommandPayload,
        source: CommandSource,
    ) -> Self {
        Self {
            command_id: command_id.into(),
            payload: Some(payload),
            signature: String::new(),
            timestamp: Utc::now().timestamp_millis(),
            priority: CommandPriority::default(),
            source: Some(source),
            status: CommandStatus::Pending,
            target_drone_id: target_drone_id.into(),
        }
    }

    pub fn with_signature(mut self, signature: impl Into<String>) -> Self {
        self.signature = signature.into();
        self
    }

    pub fn with_priority(mut self, priority: CommandPriority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_timestamp(mut self, timestamp_ms: i64) -> Self {
        self.timestamp = timestamp_ms;
        self
    }

    /// Command type derived from the payload tag.
    pub fn command_type(&self) -> Option<CommandType> {
        self.payload.as_ref().map(CommandPayload::command_type)
    }

    /// Role name of the issuing source, if any.
    pub fn role(&self) -> Option<&str> {
        self.source.as_ref().map(|source| source.role.as_str())
    }

    /// Age of the command relative to `now_ms`. Negative for future timestamps.
    pub fn age_ms(&self, now_ms: i64) -> i64 {
        now_ms.saturating_sub(self.timestamp)
    }

    /// Bytes a signature is computed over: the command id, payload,
    /// timestamp and target drone, serialized as compact JSON.
    pub fn canonical_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        #[derive(Serialize)]
        struct Canonical<'a> {
            command_id: &'a str,
            payload: &'a Option<CommandPayload>,
            timestamp: i64,
            target_drone_id: &'a str,
        }

        serde_json::to_vec(&Canonical {
            command_id: &self.command_id,
            payload: &self.payload,
            timestamp: self.timestamp,
            target_drone_id: &self.target_drone_id,
        })
    }
}

/// Closed set of command categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommandType {
    Movement,
    Sensor,
    System,
    Emergency,
    Security,
}

impl CommandType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommandType::Movement => "MOVEMENT",
            CommandType::Sensor => "SENSOR",
            CommandType::System => "SYSTEM",
            CommandType::Emergency => "EMERGENCY",
            CommandType::Security => "SECURITY",
        }
    }
}

impl std::fmt::Display for CommandType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Dispatch priority. Only `Critical` changes queue placement.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommandPriority {
    Low = 0,
    #[default]
    Medium = 1,
    High = 2,
    Critical = 3,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommandStatus {
    /// Submitted, not yet checked
    #[default]
    Pending,
    /// Passed validation, threat and authorization checks
    Validated,
    /// Handed to the executor
    Executing,
    /// Executor reported success
    Completed,
    /// Execution or processing fault
    Failed,
    /// Refused before reaching the queue
    Rejected,
}

impl CommandStatus {
    /// Whether the command has reached one of its final states.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            CommandStatus::Completed | CommandStatus::Failed | CommandStatus::Rejected
        )
    }
}

/// Identity of whoever issued a command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandSource {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type", default)]
    pub source_type: Option<SourceType>,
    /// Free-text role name, compared verbatim by the authorization policy.
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub ip_address: String,
}

impl CommandSource {
    pub fn new(id: impl Into<String>, source_type: SourceType, role: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            source_type: Some(source_type),
            role: role.into(),
            ip_address: String::new(),
        }
    }

    pub fn with_ip_address(mut self, ip_address: impl Into<String>) -> Self {
        self.ip_address = ip_address.into();
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SourceType {
    User,
    System,
    Automation,
}

/// Typed command parameters, tagged by command type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommandPayload {
    Movement(MovementParams),
    Sensor(SensorParams),
    System(SystemParams),
    Emergency(EmergencyParams),
    Security(SecurityParams),
}

impl CommandPayload {
    pub fn command_type(&self) -> CommandType {
        match self {
            CommandPayload::Movement(_) => CommandType::Movement,
            CommandPayload::Sensor(_) => CommandType::Sensor,
            CommandPayload::System(_) => CommandType::System,
            CommandPayload::Emergency(_) => CommandType::Emergency,
            CommandPayload::Security(_) => CommandType::Security,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    pub lat: f64,
    pub lon: f64,
    pub altitude_m: f64,
    #[serde(default)]
    pub speed_mps: Option<f64>,
}

impl Waypoint {
    pub fn new(lat: f64, lon: f64, altitude_m: f64) -> Self {
        Self {
            lat,
            lon,
            altitude_m,
            speed_mps: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MovementParams {
    /// Fly to a single waypoint
    Goto { waypoint: Waypoint },
    /// Hold position (loiter)
    Hold { duration_secs: u32 },
    /// Change altitude
    AltitudeChange { target_altitude_m: f64 },
    /// Reroute through new waypoints
    Reroute {
        waypoints: Vec<Waypoint>,
        #[serde(default)]
        reason: Option<String>,
    },
    ReturnToHome,
    Land,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SensorKind {
    Camera,
    Thermal,
    Lidar,
    RfScanner,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorParams {
    pub sensor: SensorKind,
    pub enabled: bool,
    #[serde(default)]
    pub sample_rate_hz: Option<f64>,
    #[serde(default)]
    pub duration_secs: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SystemParams {
    Reboot { delay_secs: u32 },
    UpdateConfig { key: String, value: serde_json::Value },
    FirmwareUpdate { version: String },
    Diagnostics,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EmergencyAction {
    Land,
    ReturnToHome,
    /// Stops all motors. The drone falls.
    MotorKill,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmergencyParams {
    pub action: EmergencyAction,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub confirmed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SecurityParams {
    RotateKeys,
    Lockdown { duration_secs: u32 },
    RevokeOperator { operator_id: String },
    WipeMissionData {
        #[serde(default)]
        confirmed: bool,
    },
}
