//! Application service: the hexagonal core.
//!
//! [`AppService`] owns the safety validator, actuation state machine and
//! session, and shares the two model engines behind `Arc` so training can
//! run on another thread while this worker keeps serving readings.  All
//! I/O flows through port traits injected at call sites, making the
//! entire service testable with mock adapters.
//!
//! ```text
//!   readings ──▶ ┌─────────────────────────────┐ ──▶ EventSink
//!                │          AppService          │
//! ActuatorPort ◀─│ Classifiers · Forecast ·     │ ◀─▶ SnapshotStore
//!                │ Anomaly · Safety · Timers    │
//!                └─────────────────────────────┘
//! ```

use std::sync::Arc;

use log::{debug, info, warn};

use crate::analytics::{self, CRITICAL_SOIL_MOISTURE};
use crate::anomaly::{AnomalyDetector, AnomalyRecord};
use crate::config::CoreConfig;
use crate::control::{AutoController, PlannedCommand};
use crate::decision::{ActuatorDecisionEngine, Decision};
use crate::error::{ActuatorError, Error, Result, StorageError};
use crate::forecast::{Forecast, TrendForecastEngine, TrendReport};
use crate::fsm::{ActuationStateMachine, ActuatorStatus, ExpiredTimer};
use crate::reading::{FeatureVector, PerActuator, Quality, ReadingRecord};
use crate::safety::{Action, SafetyAlert, SafetyRejection, SafetyValidator, ValidatedCommand};
use crate::snapshot::SnapshotKind;

use super::commands::{AppCommand, CommandRequest};
use super::events::{AppEvent, CommandOrigin, TelemetryData};
use super::ports::{ActuatorPort, EventSink, SnapshotStore};
use super::session::Session;

// ───────────────────────────────────────────────────────────────
// Outcomes
// ───────────────────────────────────────────────────────────────

/// Everything one reading produced.
#[derive(Debug, Clone, PartialEq)]
pub struct ReadingOutcome {
    /// `None` while the classifiers are untrained.
    pub decisions: Option<PerActuator<Decision>>,
    pub forecast: Forecast,
    pub anomalies: Vec<AnomalyRecord>,
    /// Auto-control commands attempted this cycle.
    pub commands: Vec<CommandOutcome>,
    pub alert_flags: u8,
}

/// Result of one command.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandOutcome {
    Applied(ValidatedCommand),
    Rejected(SafetyRejection),
    /// Passed validation but the hardware write failed.
    Failed(ActuatorError),
    EmergencyStopped { failures: Vec<ActuatorError> },
    Retrained(TrendReport),
    /// The command was understood but could not be carried out.
    NotPerformed(Error),
    Acknowledged,
}

impl CommandOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied(_))
    }
}

/// Which snapshots [`AppService::load_models`] found and restored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadedModels {
    pub classifiers: bool,
    pub forecaster: bool,
}

// ───────────────────────────────────────────────────────────────
// AppService
// ───────────────────────────────────────────────────────────────

/// The application service orchestrates all domain logic.
pub struct AppService {
    decisions: Arc<ActuatorDecisionEngine>,
    forecaster: Arc<TrendForecastEngine>,
    anomaly: AnomalyDetector,
    safety: SafetyValidator,
    actuation: ActuationStateMachine,
    auto: AutoController,
    session: Session,
    horizon_hours: f32,
    warned_untrained: bool,
}

impl AppService {
    /// Construct the service from configuration with fresh, untrained
    /// engines.
    pub fn new(config: CoreConfig) -> Self {
        let decisions = Arc::new(ActuatorDecisionEngine::new(config.ensemble.clone()));
        let forecaster = Arc::new(TrendForecastEngine::new(config.forecast.clone()));
        Self::with_engines(config, decisions, forecaster)
    }

    /// Construct around engines shared with other threads.
    pub fn with_engines(
        config: CoreConfig,
        decisions: Arc<ActuatorDecisionEngine>,
        forecaster: Arc<TrendForecastEngine>,
    ) -> Self {
        Self {
            horizon_hours: config.forecast.default_horizon_hours,
            decisions,
            forecaster,
            anomaly: AnomalyDetector::new(config.anomaly),
            safety: SafetyValidator::new(config.safety),
            actuation: ActuationStateMachine::new(),
            auto: AutoController::new(config.auto),
            session: Session::new(),
            warned_untrained: false,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    pub fn start(&mut self, sink: &mut impl EventSink) {
        let classifiers_ready = self.decisions.is_trained();
        let forecaster_ready = self.forecaster.is_trained();
        sink.emit(&AppEvent::Started {
            classifiers_ready,
            forecaster_ready,
        });
        info!(
            "AppService started (classifiers={}, forecaster={})",
            classifiers_ready, forecaster_ready
        );
    }

    // ── Per-reading orchestration ─────────────────────────────

    /// Run one full cycle for an incoming reading:
    /// validate → session → history → alerts → decisions → forecast →
    /// anomalies → auto-control.
    ///
    /// An invalid reading is rejected before any state changes.
    pub fn handle_reading(
        &mut self,
        reading: ReadingRecord,
        hw: &mut impl ActuatorPort,
        sink: &mut impl EventSink,
        now_ms: u64,
    ) -> Result<ReadingOutcome> {
        // 1. Boundary validation
        if let Err(e) = reading.validate() {
            warn!("Reading rejected: {e}");
            self.session.reject();
            sink.emit(&AppEvent::ReadingRejected(e.clone()));
            return Err(e);
        }
        let reading = if reading.quality == Quality::Unknown {
            reading.graded()
        } else {
            reading
        };
        let features = FeatureVector::from(&reading);

        // 2. Session + history
        self.session.accept(reading);
        self.forecaster.update_history(reading.timestamp_ms, &features);

        // 3. Advisory limits
        let alert_flags = self.update_alerts(&features, sink);

        // 4. Classifier decisions
        let decisions = match self.decisions.predict_with_confidence(&features) {
            Ok(d) => {
                self.warned_untrained = false;
                sink.emit(&AppEvent::Decisions(d));
                Some(d)
            }
            Err(Error::Untrained) => {
                if !self.warned_untrained {
                    warn!("Classifiers untrained, decisions skipped");
                    self.warned_untrained = true;
                }
                None
            }
            Err(e) => {
                warn!("Decision inference failed: {e}");
                None
            }
        };

        // 5. Forecast
        let forecast = self.forecaster.predict_future(&features, self.horizon_hours)?;
        sink.emit(&AppEvent::ForecastReady {
            mode: forecast.mode,
            horizon_hours: forecast.horizon_hours,
            series: forecast.series.len(),
        });

        // 6. Anomalies against the fresh forecast
        let anomalies = self.anomaly.detect_anomalies(&features, &forecast);
        for record in &anomalies {
            sink.emit(&AppEvent::AnomalyDetected(*record));
        }

        // 7. Auto-control
        let state = PerActuator::from_fn(|a| self.actuation.is_on(a));
        let planned = self
            .auto
            .plan(&features, decisions.as_ref(), Some(&forecast), &state);
        let commands = planned
            .into_iter()
            .map(|p| self.apply_planned(p, hw, sink, now_ms))
            .collect();

        self.session.set_forecast(forecast.clone());
        Ok(ReadingOutcome {
            decisions,
            forecast,
            anomalies,
            commands,
            alert_flags,
        })
    }

    // ── Command handling ──────────────────────────────────────

    pub fn handle_command(
        &mut self,
        cmd: AppCommand,
        hw: &mut impl ActuatorPort,
        sink: &mut impl EventSink,
        now_ms: u64,
    ) -> CommandOutcome {
        match cmd {
            AppCommand::Actuate(req) => self.apply(&req, CommandOrigin::Manual, hw, sink, now_ms),
            AppCommand::EmergencyStop => {
                let failures = match self.actuation.deactivate_all(hw) {
                    Ok(()) => Vec::new(),
                    Err(e) => e.failures,
                };
                sink.emit(&AppEvent::EmergencyStop {
                    failures: failures.len(),
                });
                CommandOutcome::EmergencyStopped { failures }
            }
            AppCommand::RetrainForecaster => match self.forecaster.retrain_online() {
                Ok(report) => {
                    sink.emit(&AppEvent::ModelRetrained {
                        r2: report.r2.clone(),
                    });
                    CommandOutcome::Retrained(report)
                }
                Err(e) => {
                    warn!("Online retrain skipped: {e}");
                    CommandOutcome::NotPerformed(e)
                }
            },
            AppCommand::SetAutoControl(enabled) => {
                self.auto.set_enabled(enabled);
                info!("Auto control {}", if enabled { "enabled" } else { "disabled" });
                CommandOutcome::Acknowledged
            }
        }
    }

    /// Expire finished timers.  Call at least once a second.
    pub fn tick(
        &mut self,
        hw: &mut impl ActuatorPort,
        sink: &mut impl EventSink,
        now_ms: u64,
    ) -> Vec<ExpiredTimer> {
        let expired = self.actuation.check_duration_expired(hw, now_ms);
        for timer in &expired {
            sink.emit(&AppEvent::DurationExpired(*timer));
        }
        expired
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn status(&self, now_ms: u64) -> PerActuator<ActuatorStatus> {
        self.actuation.status_all(now_ms)
    }

    pub fn build_telemetry(&self, now_ms: u64) -> TelemetryData {
        let reading = self.session.latest().copied();
        TelemetryData {
            reading,
            actuators: self.actuation.status_all(now_ms),
            health: reading.as_ref().map(analytics::health_score),
            dryness: reading
                .as_ref()
                .map(|r| analytics::soil_dryness_eta(r, CRITICAL_SOIL_MOISTURE)),
            alert_flags: self.safety.alerts(),
            classifiers_ready: self.decisions.is_trained(),
            forecaster_ready: self.forecaster.is_trained(),
            history_depth: self.forecaster.history_depth(),
            auto_control: self.auto.enabled(),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn decision_engine(&self) -> &Arc<ActuatorDecisionEngine> {
        &self.decisions
    }

    pub fn forecaster(&self) -> &Arc<TrendForecastEngine> {
        &self.forecaster
    }

    pub fn safety(&self) -> &SafetyValidator {
        &self.safety
    }

    pub fn auto_control(&self) -> bool {
        self.auto.enabled()
    }

    // ── Persistence ───────────────────────────────────────────

    /// Write both snapshots.  Untrained classifiers are skipped; the
    /// forecaster is always saved so its history survives restarts.
    pub fn save_models(&self, store: &mut impl SnapshotStore) -> Result<()> {
        if self.decisions.is_trained() {
            let blob = self.decisions.snapshot()?;
            store.write(SnapshotKind::ActuatorEnsemble.key(), &blob)?;
            info!("Saved classifier snapshot ({} bytes)", blob.len());
        } else {
            debug!("Classifiers untrained, snapshot skipped");
        }
        let blob = self.forecaster.snapshot()?;
        store.write(SnapshotKind::TrendForecaster.key(), &blob)?;
        info!("Saved forecaster snapshot ({} bytes)", blob.len());
        Ok(())
    }

    /// Restore whichever snapshots exist.  A missing key is not an error;
    /// a corrupt blob is, and leaves that engine unchanged.
    pub fn load_models(&self, store: &impl SnapshotStore) -> Result<LoadedModels> {
        let mut loaded = LoadedModels::default();
        if let Some(blob) = read_optional(store, SnapshotKind::ActuatorEnsemble.key())? {
            self.decisions.restore(&blob)?;
            loaded.classifiers = true;
        }
        if let Some(blob) = read_optional(store, SnapshotKind::TrendForecaster.key())? {
            self.forecaster.restore(&blob)?;
            loaded.forecaster = true;
        }
        info!(
            "Loaded models (classifiers={}, forecaster={})",
            loaded.classifiers, loaded.forecaster
        );
        Ok(loaded)
    }

    // ── Internal ──────────────────────────────────────────────

    fn update_alerts(&mut self, features: &FeatureVector, sink: &mut impl EventSink) -> u8 {
        let before = self.safety.alerts();
        let after = self.safety.check_safety_limits(features);
        for alert in SafetyAlert::ALL {
            let was = before & alert.mask() != 0;
            let is = after & alert.mask() != 0;
            match (was, is) {
                (false, true) => sink.emit(&AppEvent::SafetyAlertRaised(alert)),
                (true, false) => sink.emit(&AppEvent::SafetyAlertCleared(alert)),
                _ => {}
            }
        }
        after
    }

    fn apply_planned(
        &mut self,
        planned: PlannedCommand,
        hw: &mut impl ActuatorPort,
        sink: &mut impl EventSink,
        now_ms: u64,
    ) -> CommandOutcome {
        let req = CommandRequest::new(
            planned.actuator.name(),
            planned.action.name(),
            i64::from(planned.duration_secs),
        );
        self.apply(&req, CommandOrigin::Auto(planned.source), hw, sink, now_ms)
    }

    /// Validate → interlock → hardware.  Every command, manual or
    /// automatic, takes this path.
    fn apply(
        &mut self,
        req: &CommandRequest,
        origin: CommandOrigin,
        hw: &mut impl ActuatorPort,
        sink: &mut impl EventSink,
        now_ms: u64,
    ) -> CommandOutcome {
        let cmd = match self
            .safety
            .validate_command(&req.actuator, &req.action, req.duration_secs, now_ms)
        {
            Ok(cmd) => cmd,
            Err(reason) => return reject(sink, origin, reason),
        };

        let result = match cmd.action {
            Action::On => {
                let features = self.session.latest_features();
                if let Err(reason) = self.safety.check_interlocks(cmd.actuator, &features) {
                    return reject(sink, origin, reason);
                }
                self.actuation
                    .activate(hw, cmd.actuator, cmd.duration_secs, now_ms)
            }
            Action::Off => self.actuation.deactivate(hw, cmd.actuator),
        };

        match result {
            Ok(()) => {
                sink.emit(&AppEvent::CommandApplied {
                    actuator: cmd.actuator,
                    action: cmd.action,
                    duration_secs: cmd.duration_secs,
                    origin,
                });
                CommandOutcome::Applied(cmd)
            }
            Err(Error::Actuator(e)) => {
                sink.emit(&AppEvent::ActuatorFailed(e));
                CommandOutcome::Failed(e)
            }
            Err(e) => CommandOutcome::NotPerformed(e),
        }
    }
}

fn reject(sink: &mut impl EventSink, origin: CommandOrigin, reason: SafetyRejection) -> CommandOutcome {
    sink.emit(&AppEvent::CommandRejected {
        origin,
        reason: reason.clone(),
    });
    CommandOutcome::Rejected(reason)
}

fn read_optional(store: &impl SnapshotStore, key: &str) -> Result<Option<Vec<u8>>> {
    match store.read(key) {
        Ok(blob) => Ok(Some(blob)),
        Err(StorageError::NotFound) => Ok(None),
        Err(e) => Err(e.into()),
    }
}
