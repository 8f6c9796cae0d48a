//! Automatic control planning.
//!
//! Turns a reading (plus whatever the classifiers and forecaster made of
//! it) into actuator commands.  Planned commands are requests only: the
//! service still passes each one through the safety validator.

pub mod auto;
pub mod rules;

use crate::reading::Actuator;
use crate::safety::Action;

pub use auto::AutoController;

/// Why a command was planned.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CommandSource {
    /// Classifier decision at this confidence.
    Classifier { confidence: f32 },
    /// Threshold rule, used while the classifiers are untrained.
    Hysteresis,
    /// Trained forecast dips below the watering threshold.
    PreventiveWatering { forecast_min: f32 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlannedCommand {
    pub actuator: Actuator,
    pub action: Action,
    pub duration_secs: u32,
    pub source: CommandSource,
}
