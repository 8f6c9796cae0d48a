//! Integration tests for the reading → decision → safety → actuator
//! pipeline, command handling, and snapshot persistence.

use std::sync::Arc;

use super::mock_hw::{MockHardware, RecordingSink};

use plantcore::adapters::store::MemorySnapshotStore;
use plantcore::anomaly::Severity;
use plantcore::app::commands::{AppCommand, CommandRequest};
use plantcore::app::events::{AppEvent, CommandOrigin};
use plantcore::app::ports::SnapshotStore;
use plantcore::app::service::{AppService, CommandOutcome};
use plantcore::config::CoreConfig;
use plantcore::control::CommandSource;
use plantcore::decision::ActuatorDecisionEngine;
use plantcore::error::{ActuatorError, Error, SnapshotError};
use plantcore::forecast::{ForecastMode, TrendForecastEngine};
use plantcore::reading::{Actuator, FeatureVector, Metric, ReadingRecord};
use plantcore::safety::{Action, SafetyRejection};
use plantcore::sim;
use plantcore::snapshot::SnapshotKind;

const T0: u64 = 1_700_000_000_000;

fn manual_config() -> CoreConfig {
    let mut config = CoreConfig::default();
    config.auto.enabled = false;
    config
}

fn make_app(config: CoreConfig) -> (AppService, MockHardware, RecordingSink) {
    let mut app = AppService::new(config);
    let mut sink = RecordingSink::new();
    app.start(&mut sink);
    (app, MockHardware::new(), sink)
}

fn actuate(actuator: &str, action: &str, secs: i64) -> AppCommand {
    AppCommand::Actuate(CommandRequest::new(actuator, action, secs))
}

fn trained_classifiers() -> Arc<ActuatorDecisionEngine> {
    let engine = Arc::new(ActuatorDecisionEngine::new(CoreConfig::default().ensemble));
    engine.train(&sim::training_table(600, 42)).unwrap();
    engine
}

// ── Auto control ──────────────────────────────────────────────

#[test]
fn untrained_dry_soil_waters_by_rule_then_expires() {
    let (mut app, mut hw, mut sink) = make_app(CoreConfig::default());
    let dry = ReadingRecord::new(25.0, 60.0, 20.0, 50.0, T0);

    let out = app.handle_reading(dry, &mut hw, &mut sink, T0).unwrap();
    assert!(out.decisions.is_none());
    assert_eq!(out.forecast.mode, ForecastMode::Fallback);
    assert_eq!(out.commands.len(), 1);
    match &out.commands[0] {
        CommandOutcome::Applied(cmd) => {
            assert_eq!(cmd.actuator, Actuator::Pump);
            assert_eq!(cmd.duration_secs, 300);
        }
        other => panic!("expected pump ON, got {other:?}"),
    }
    assert!(hw.is_on(Actuator::Pump));
    assert_eq!(
        sink.count(|e| matches!(
            e,
            AppEvent::CommandApplied {
                origin: CommandOrigin::Auto(CommandSource::Hysteresis),
                ..
            }
        )),
        1
    );

    // Exactly at the duration the pump is still running.
    assert!(app.tick(&mut hw, &mut sink, T0 + 300_000).is_empty());
    let expired = app.tick(&mut hw, &mut sink, T0 + 300_001);
    assert_eq!(expired.len(), 1);
    assert_eq!(expired[0].actuator, Actuator::Pump);
    assert!(!hw.is_on(Actuator::Pump));
    assert!(!app.status(T0 + 300_001).pump.on);
}

#[test]
fn trained_classifiers_switch_fan_in_heat() {
    let forecaster = Arc::new(TrendForecastEngine::new(CoreConfig::default().forecast));
    let mut app =
        AppService::with_engines(CoreConfig::default(), trained_classifiers(), forecaster);
    let (mut hw, mut sink) = (MockHardware::new(), RecordingSink::new());

    let heat = ReadingRecord::new(36.0, 40.0, 45.0, 85.0, T0);
    let out = app.handle_reading(heat, &mut hw, &mut sink, T0).unwrap();

    let decisions = out.decisions.expect("classifiers are trained");
    assert!(decisions.fan.on);
    assert!(!decisions.pump.on);
    assert!(!decisions.grow_light.on);
    assert!(decisions.fan.confidence >= 0.7);

    assert!(hw.is_on(Actuator::Fan));
    assert!(!hw.is_on(Actuator::Pump));
    assert!(out.commands.iter().any(|c| matches!(
        c,
        CommandOutcome::Applied(cmd) if cmd.actuator == Actuator::Fan && cmd.action == Action::On
    )));
    assert_eq!(sink.count(|e| matches!(e, AppEvent::Decisions(_))), 1);
}

#[test]
fn disabled_auto_control_plans_nothing() {
    let (mut app, mut hw, mut sink) = make_app(manual_config());
    let dry = ReadingRecord::new(35.0, 60.0, 10.0, 5.0, T0);
    let out = app.handle_reading(dry, &mut hw, &mut sink, T0).unwrap();
    assert!(out.commands.is_empty());
    assert!(hw.calls.is_empty());
}

// ── Manual commands ───────────────────────────────────────────

#[test]
fn eleventh_command_in_a_minute_is_rate_limited() {
    let (mut app, mut hw, mut sink) = make_app(manual_config());
    for i in 0..10u64 {
        let action = if i % 2 == 0 { "ON" } else { "OFF" };
        let out = app.handle_command(actuate("fan", action, 0), &mut hw, &mut sink, T0 + i * 1000);
        assert!(out.is_applied(), "command {i}: {out:?}");
    }
    let out = app.handle_command(actuate("fan", "ON", 0), &mut hw, &mut sink, T0 + 10_000);
    assert!(matches!(
        out,
        CommandOutcome::Rejected(SafetyRejection::RateLimited {
            actuator: Actuator::Fan,
            ..
        })
    ));

    // Other actuators have their own window.
    assert!(
        app.handle_command(actuate("pump", "ON", 30), &mut hw, &mut sink, T0 + 10_000)
            .is_applied()
    );

    // Once the first command ages out, one slot frees up.
    assert!(
        app.handle_command(actuate("fan", "ON", 0), &mut hw, &mut sink, T0 + 60_000)
            .is_applied()
    );
}

#[test]
fn malformed_requests_are_rejected_without_hardware_writes() {
    let (mut app, mut hw, mut sink) = make_app(manual_config());
    let cases = [
        actuate("heater", "ON", 10),
        actuate("pump", "TOGGLE", 10),
        actuate("pump", "ON", -1),
    ];
    for cmd in cases {
        let out = app.handle_command(cmd, &mut hw, &mut sink, T0);
        assert!(matches!(out, CommandOutcome::Rejected(_)), "{out:?}");
    }
    assert!(hw.calls.is_empty());
    assert_eq!(sink.count(|e| matches!(e, AppEvent::CommandRejected { .. })), 3);
}

#[test]
fn over_cap_duration_is_clamped() {
    let (mut app, mut hw, mut sink) = make_app(manual_config());
    match app.handle_command(actuate("pump", "ON", 7200), &mut hw, &mut sink, T0) {
        CommandOutcome::Applied(cmd) => {
            assert!(cmd.clamped);
            assert_eq!(cmd.duration_secs, 1800);
        }
        other => panic!("expected clamp, got {other:?}"),
    }
    assert_eq!(app.status(T0).pump.remaining_secs, 1800);
}

#[test]
fn failed_activation_leaves_timer_off() {
    let (mut app, mut hw, mut sink) = make_app(manual_config());
    hw.fail(Actuator::Pump);
    let out = app.handle_command(actuate("pump", "ON", 60), &mut hw, &mut sink, T0);
    assert_eq!(
        out,
        CommandOutcome::Failed(ActuatorError::GpioWriteFailed(Actuator::Pump))
    );
    assert!(!app.status(T0).pump.on);
    assert_eq!(sink.count(|e| matches!(e, AppEvent::ActuatorFailed(_))), 1);
}

#[test]
fn emergency_stop_turns_everything_off_despite_failures() {
    let (mut app, mut hw, mut sink) = make_app(manual_config());
    for name in ["pump", "fan", "grow_light"] {
        assert!(app.handle_command(actuate(name, "ON", 0), &mut hw, &mut sink, T0).is_applied());
    }
    hw.fail(Actuator::Fan);

    let out = app.handle_command(AppCommand::EmergencyStop, &mut hw, &mut sink, T0 + 1000);
    assert_eq!(
        out,
        CommandOutcome::EmergencyStopped {
            failures: vec![ActuatorError::GpioWriteFailed(Actuator::Fan)]
        }
    );
    let status = app.status(T0 + 1000);
    assert!(!status.pump.on && !status.fan.on && !status.grow_light.on);
    assert!(!hw.is_on(Actuator::Pump));
    assert!(!hw.is_on(Actuator::GrowLight));
    assert_eq!(
        sink.count(|e| matches!(e, AppEvent::EmergencyStop { failures: 1 })),
        1
    );
}

// ── Forecasting, anomalies, retraining ────────────────────────

#[test]
fn retrain_needs_buffered_history() {
    let (mut app, mut hw, mut sink) = make_app(manual_config());
    let out = app.handle_command(AppCommand::RetrainForecaster, &mut hw, &mut sink, T0);
    assert!(matches!(
        out,
        CommandOutcome::NotPerformed(Error::InsufficientData { .. })
    ));
    assert!(!app.forecaster().is_trained());

    for reading in sim::day_cycle_history(T0, 30, 3) {
        let now = reading.timestamp_ms;
        app.handle_reading(reading, &mut hw, &mut sink, now).unwrap();
    }
    let out = app.handle_command(AppCommand::RetrainForecaster, &mut hw, &mut sink, T0);
    match out {
        CommandOutcome::Retrained(report) => assert_eq!(report.r2.len(), 4),
        other => panic!("expected retrain, got {other:?}"),
    }
    assert!(app.forecaster().is_trained());
    assert_eq!(sink.count(|e| matches!(e, AppEvent::ModelRetrained { .. })), 1);
}

#[test]
fn spike_against_steady_trend_is_flagged() {
    let forecaster = Arc::new(TrendForecastEngine::new(CoreConfig::default().forecast));
    let steady: Vec<FeatureVector> = (0..60u64)
        .map(|i| FeatureVector::complete([25.0, 60.0, 50.0, 50.0], T0 + i * 60_000))
        .collect();
    forecaster.train(&steady).unwrap();
    let classifiers = Arc::new(ActuatorDecisionEngine::new(CoreConfig::default().ensemble));
    let mut app = AppService::with_engines(manual_config(), classifiers, forecaster);
    let (mut hw, mut sink) = (MockHardware::new(), RecordingSink::new());

    let spike = ReadingRecord::new(40.0, 60.0, 50.0, 50.0, T0 + 61 * 60_000);
    let out = app.handle_reading(spike, &mut hw, &mut sink, spike.timestamp_ms).unwrap();

    assert_eq!(out.forecast.mode, ForecastMode::Trained);
    assert_eq!(out.anomalies.len(), 1);
    let a = out.anomalies[0];
    assert_eq!(a.metric, Metric::Temperature);
    assert_eq!(a.severity, Severity::Medium);
    assert!((a.predicted_value - 25.0).abs() < 1e-3);
}

#[test]
fn telemetry_reflects_latest_reading() {
    let (mut app, mut hw, mut sink) = make_app(manual_config());
    let t = app.build_telemetry(T0);
    assert!(t.reading.is_none() && t.health.is_none());

    let reading = ReadingRecord::new(24.0, 60.0, 50.0, 60.0, T0);
    app.handle_reading(reading, &mut hw, &mut sink, T0).unwrap();
    let t = app.build_telemetry(T0);
    assert_eq!(t.reading.map(|r| r.soil_moisture), Some(50.0));
    assert!(t.health.is_some_and(|h| h.score > 90.0));
    assert_eq!(t.history_depth, 1);
    assert!(!t.classifiers_ready);
    assert!(!t.auto_control);
}

// ── Persistence ───────────────────────────────────────────────

#[test]
fn models_survive_save_and_load() {
    let forecaster = Arc::new(TrendForecastEngine::new(CoreConfig::default().forecast));
    let rows: Vec<FeatureVector> = sim::day_cycle_history(T0, 240, 5)
        .iter()
        .map(FeatureVector::from)
        .collect();
    forecaster.train(&rows).unwrap();
    let app = AppService::with_engines(manual_config(), trained_classifiers(), forecaster);

    let mut store = MemorySnapshotStore::new();
    app.save_models(&mut store).unwrap();

    let restored = AppService::new(manual_config());
    let loaded = restored.load_models(&store).unwrap();
    assert!(loaded.classifiers && loaded.forecaster);

    let sample = FeatureVector::complete([33.0, 45.0, 20.0, 10.0], T0);
    assert_eq!(
        app.decision_engine().predict_with_confidence(&sample).unwrap(),
        restored.decision_engine().predict_with_confidence(&sample).unwrap()
    );
    let a = app.forecaster().predict_future(&sample, 6.0).unwrap();
    let b = restored.forecaster().predict_future(&sample, 6.0).unwrap();
    assert_eq!(a, b);
}

#[test]
fn untrained_classifiers_are_not_saved() {
    let app = AppService::new(manual_config());
    let mut store = MemorySnapshotStore::new();
    app.save_models(&mut store).unwrap();
    assert!(!store.contains(SnapshotKind::ActuatorEnsemble.key()));
    assert!(store.contains(SnapshotKind::TrendForecaster.key()));

    let fresh = AppService::new(manual_config());
    let loaded = fresh.load_models(&store).unwrap();
    assert!(!loaded.classifiers && loaded.forecaster);
}

#[test]
fn corrupt_snapshot_is_refused() {
    let app = AppService::with_engines(
        manual_config(),
        trained_classifiers(),
        Arc::new(TrendForecastEngine::new(CoreConfig::default().forecast)),
    );
    let mut store = MemorySnapshotStore::new();
    app.save_models(&mut store).unwrap();
    let key = SnapshotKind::ActuatorEnsemble.key();
    if let Some(last) = store.blob_mut(key).and_then(|b| b.last_mut()) {
        *last ^= 0xFF;
    }

    let fresh = AppService::new(manual_config());
    assert_eq!(
        fresh.load_models(&store),
        Err(Error::Snapshot(SnapshotError::DigestMismatch))
    );
    assert!(!fresh.decision_engine().is_trained());
    assert!(store.read(key).is_ok());
}
