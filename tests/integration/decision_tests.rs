//! Integration tests for the actuator classifiers trained on the
//! synthetic decision table.

use std::sync::Arc;
use std::thread;

use plantcore::config::EnsembleConfig;
use plantcore::decision::ActuatorDecisionEngine;
use plantcore::error::Error;
use plantcore::reading::{Actuator, FeatureVector, Metric};
use plantcore::sim;

fn trained(seed: u64) -> ActuatorDecisionEngine {
    let engine = ActuatorDecisionEngine::new(EnsembleConfig {
        seed,
        ..EnsembleConfig::default()
    });
    engine.train(&sim::training_table(800, 42)).unwrap();
    engine
}

#[test]
fn heat_stress_calls_for_fan_only() {
    let engine = trained(42);
    let d = engine
        .predict(&FeatureVector::complete([36.0, 40.0, 45.0, 85.0], 0))
        .unwrap();
    assert!(d.fan);
    assert!(!d.pump);
    assert!(!d.grow_light);
}

#[test]
fn repeated_predictions_on_one_model_agree() {
    let engine = trained(42);
    let readings = [
        FeatureVector::complete([36.0, 40.0, 45.0, 85.0], 0),
        FeatureVector::complete([22.0, 65.0, 50.0, 15.0], 0),
        FeatureVector::complete([27.5, 55.0, 31.0, 60.0], 0),
    ];
    for reading in &readings {
        let first = engine.predict_with_confidence(reading).unwrap();
        for _ in 0..20 {
            assert_eq!(engine.predict_with_confidence(reading).unwrap(), first);
        }
        assert_eq!(engine.predict(reading).unwrap(), first.map(|_, d| d.on));
    }
}

#[test]
fn dark_night_calls_for_light_only() {
    let engine = trained(42);
    let d = engine
        .predict(&FeatureVector::complete([22.0, 65.0, 50.0, 15.0], 0))
        .unwrap();
    assert!(d.grow_light);
    assert!(!d.pump);
    assert!(!d.fan);
}

#[test]
fn reference_scenarios_mostly_pass() {
    let engine = trained(42);
    let report = engine.evaluate_scenarios(&sim::reference_scenarios()).unwrap();
    assert_eq!(report.outcomes.len(), 6);
    assert!(report.accuracy >= 0.8, "scenario accuracy {}", report.accuracy);
}

#[test]
fn same_seed_same_models() {
    let a = trained(7);
    let b = trained(7);
    assert_eq!(*a.model_set().unwrap(), *b.model_set().unwrap());
}

#[test]
fn importances_follow_the_labelling_rule() {
    let engine = trained(42);
    let imp = engine.feature_importances().unwrap();
    for (actuator, driver) in [
        (Actuator::Pump, Metric::SoilMoisture),
        (Actuator::GrowLight, Metric::LightIntensity),
    ] {
        let row = imp.get(actuator);
        let top = Metric::ALL
            .into_iter()
            .max_by(|a, b| row[a.index()].total_cmp(&row[b.index()]))
            .unwrap();
        assert_eq!(top, driver, "{}: {:?}", actuator.name(), row);
        let sum: f32 = row.iter().sum();
        assert!((sum - 1.0).abs() < 1e-3);
    }
}

#[test]
fn readers_keep_serving_while_training_runs() {
    let engine = Arc::new(trained(42));
    let before = engine.model_set().unwrap();
    let trainer = {
        let engine = Arc::clone(&engine);
        thread::spawn(move || engine.train(&sim::training_table(400, 9)))
    };
    let sample = FeatureVector::complete([24.0, 60.0, 55.0, 70.0], 0);
    for _ in 0..20 {
        assert!(engine.predict(&sample).is_ok());
    }
    let report = trainer.join().unwrap().unwrap();
    assert_eq!(report.train_rows + report.holdout_rows, 400);
    assert!(!Arc::ptr_eq(&before, &engine.model_set().unwrap()));
}

#[test]
fn missing_feature_is_reported_before_inference() {
    let engine = trained(42);
    let partial = FeatureVector::empty(0)
        .with(Metric::Temperature, 25.0)
        .with(Metric::Humidity, 50.0)
        .with(Metric::SoilMoisture, 40.0);
    assert_eq!(
        engine.predict(&partial),
        Err(Error::MissingFeature(Metric::LightIntensity))
    );
    assert_eq!(
        engine.batch_predict(&[partial]),
        Err(Error::MissingFeature(Metric::LightIntensity))
    );
}
