//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the `log` facade, one `TAG | key=value` line per event.  A bus or
//! dashboard adapter would implement the same trait.

use log::{info, warn};

use crate::app::events::{AppEvent, CommandOrigin};
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`].
#[derive(Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Telemetry(t) => {
                let (health, eta) = match (t.health, t.dryness) {
                    (Some(h), Some(d)) => (h.score, d.hours),
                    _ => (f32::NAN, f32::NAN),
                };
                info!(
                    "TELEM | pump={} fan={} light={} | health={:.0} | dry_in={:.1}h | \
                     alerts=0b{:08b} | models={}/{} | history={} | auto={}",
                    t.actuators.pump.on,
                    t.actuators.fan.on,
                    t.actuators.grow_light.on,
                    health,
                    eta,
                    t.alert_flags,
                    t.classifiers_ready,
                    t.forecaster_ready,
                    t.history_depth,
                    t.auto_control,
                );
            }
            AppEvent::Started {
                classifiers_ready,
                forecaster_ready,
            } => {
                info!(
                    "START | classifiers={} forecaster={}",
                    classifiers_ready, forecaster_ready
                );
            }
            AppEvent::ReadingRejected(e) => {
                warn!("READING | rejected: {e}");
            }
            AppEvent::Decisions(d) => {
                info!(
                    "DECIDE | pump={}({:.2}) fan={}({:.2}) light={}({:.2})",
                    d.pump.on,
                    d.pump.confidence,
                    d.fan.on,
                    d.fan.confidence,
                    d.grow_light.on,
                    d.grow_light.confidence,
                );
            }
            AppEvent::ForecastReady {
                mode,
                horizon_hours,
                series,
            } => {
                info!(
                    "FORECAST | mode={:?} horizon={}h series={}",
                    mode, horizon_hours, series
                );
            }
            AppEvent::AnomalyDetected(a) => {
                warn!(
                    "ANOMALY | {} current={:.1} predicted={:.1} deviation={:.1} severity={:?}",
                    a.metric.name(),
                    a.current_value,
                    a.predicted_value,
                    a.deviation,
                    a.severity,
                );
            }
            AppEvent::SafetyAlertRaised(alert) => {
                warn!("ALERT | set: {alert}");
            }
            AppEvent::SafetyAlertCleared(alert) => {
                info!("ALERT | cleared: {alert}");
            }
            AppEvent::CommandApplied {
                actuator,
                action,
                duration_secs,
                origin,
            } => {
                info!(
                    "CMD | {} {} {}s via {}",
                    actuator.name(),
                    action.name(),
                    duration_secs,
                    origin_tag(origin),
                );
            }
            AppEvent::CommandRejected { origin, reason } => {
                warn!("CMD | rejected via {}: {reason}", origin_tag(origin));
            }
            AppEvent::ActuatorFailed(e) => {
                warn!("HW | {e}");
            }
            AppEvent::DurationExpired(t) => {
                info!("TIMER | {} off after {}s", t.actuator.name(), t.ran_secs);
            }
            AppEvent::EmergencyStop { failures } => {
                warn!("ESTOP | all off, failures={failures}");
            }
            AppEvent::ModelRetrained { r2 } => {
                for (metric, score) in r2 {
                    info!("RETRAIN | {} r2={:.3}", metric.name(), score);
                }
            }
        }
    }
}

fn origin_tag(origin: &CommandOrigin) -> &'static str {
    match origin {
        CommandOrigin::Manual => "manual",
        CommandOrigin::Auto(_) => "auto",
    }
}
