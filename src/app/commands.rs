//! Inbound commands to the application service.
//!
//! These represent actions requested by the outside world (bus, dashboard,
//! operator console) that the [`AppService`](super::service::AppService)
//! interprets and acts upon.  Actuation requests stay loosely typed until
//! the safety validator has whitelisted them.

use serde::{Deserialize, Serialize};

/// Raw actuation request as received at the boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandRequest {
    pub actuator: String,
    /// `"ON"` or `"OFF"`
    pub action: String,
    /// Seconds; `0` means until switched off
    pub duration_secs: i64,
}

impl CommandRequest {
    pub fn new(actuator: &str, action: &str, duration_secs: i64) -> Self {
        Self {
            actuator: actuator.to_owned(),
            action: action.to_owned(),
            duration_secs,
        }
    }
}

/// Commands that external adapters can send into the application core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppCommand {
    /// Switch one actuator, subject to every safety check.
    Actuate(CommandRequest),

    /// Switch every actuator off immediately, bypassing validation.
    EmergencyStop,

    /// Refit the trend models from the history buffers.
    RetrainForecaster,

    /// Enable or disable automatic control.
    SetAutoControl(bool),
}
