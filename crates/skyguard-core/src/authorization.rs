//! Role-based authorization keyed by command type.

use crate::models::{Command, CommandType};

pub const ADMIN: &str = "ADMIN";
pub const OPERATOR: &str = "OPERATOR";
pub const SECURITY_OFFICER: &str = "SECURITY_OFFICER";
pub const USER: &str = "USER";

/// Roles allowed to issue a command of the given type. `None` covers
/// commands without a type and falls back to the general roles.
pub fn allowed_roles(command_type: Option<CommandType>) -> &'static [&'static str] {
    match command_type {
        Some(CommandType::Emergency) => &[ADMIN, OPERATOR],
        Some(CommandType::Security) => &[ADMIN, SECURITY_OFFICER],
        Some(CommandType::System) => &[ADMIN],
        Some(CommandType::Movement) | Some(CommandType::Sensor) | None => &[ADMIN, OPERATOR, USER],
    }
}

/// Role names are compared exactly; there is no case folding.
pub fn is_authorized(command: &Command) -> bool {
    match command.role() {
        Some(role) => allowed_roles(command.command_type())
            .iter()
            .any(|allowed| *allowed == role),
        None => false,
    }
}
