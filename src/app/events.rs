//! Outbound application events.
//!
//! The [`AppService`](super::service::AppService) emits these through the
//! [`EventSink`](super::ports::EventSink) port.  Adapters decide how to
//! present them (log lines, bus messages, dashboard updates).

use crate::analytics::{DrynessEta, HealthScore};
use crate::anomaly::AnomalyRecord;
use crate::control::CommandSource;
use crate::decision::Decision;
use crate::error::{ActuatorError, Error};
use crate::forecast::ForecastMode;
use crate::fsm::{ActuatorStatus, ExpiredTimer};
use crate::reading::{Actuator, Metric, PerActuator, ReadingRecord};
use crate::safety::{Action, SafetyAlert, SafetyRejection};

/// Who asked for a command.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CommandOrigin {
    Manual,
    Auto(CommandSource),
}

/// Events emitted by the application core.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// Service started; which model sets were ready.
    Started {
        classifiers_ready: bool,
        forecaster_ready: bool,
    },

    /// A reading failed boundary validation and was dropped.
    ReadingRejected(Error),

    /// Classifier output for the latest reading.
    Decisions(PerActuator<Decision>),

    /// Forecast produced for the latest reading.
    ForecastReady {
        mode: ForecastMode,
        horizon_hours: f32,
        series: usize,
    },

    AnomalyDetected(AnomalyRecord),

    SafetyAlertRaised(SafetyAlert),
    SafetyAlertCleared(SafetyAlert),

    CommandApplied {
        actuator: Actuator,
        action: Action,
        duration_secs: u32,
        origin: CommandOrigin,
    },

    CommandRejected {
        origin: CommandOrigin,
        reason: SafetyRejection,
    },

    /// The hardware refused a write.
    ActuatorFailed(ActuatorError),

    DurationExpired(ExpiredTimer),

    /// Emergency all-off completed with this many hardware failures.
    EmergencyStop { failures: usize },

    /// Trend models refit online.
    ModelRetrained { r2: Vec<(Metric, f64)> },

    Telemetry(TelemetryData),
}

/// Periodic telemetry snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct TelemetryData {
    pub reading: Option<ReadingRecord>,
    pub actuators: PerActuator<ActuatorStatus>,
    pub health: Option<HealthScore>,
    pub dryness: Option<DrynessEta>,
    pub alert_flags: u8,
    pub classifiers_ready: bool,
    pub forecaster_ready: bool,
    pub history_depth: usize,
    pub auto_control: bool,
}
