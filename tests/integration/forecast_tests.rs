//! Integration tests for the trend forecaster: fallback projection,
//! trained projection, online retraining and snapshots.

use plantcore::anomaly::AnomalyDetector;
use plantcore::config::{AnomalyConfig, ForecastConfig};
use plantcore::error::Error;
use plantcore::forecast::{ForecastMode, TrendForecastEngine};
use plantcore::reading::{FeatureVector, Metric};
use plantcore::sim;

const T0: u64 = 1_700_000_000_000;

fn engine() -> TrendForecastEngine {
    TrendForecastEngine::new(ForecastConfig::default())
}

fn now() -> FeatureVector {
    FeatureVector::complete([25.0, 60.0, 45.0, 50.0], T0)
}

#[test]
fn fallback_forecast_shape() {
    let f = engine().predict_future(&now(), 6.0).unwrap();
    assert_eq!(f.mode, ForecastMode::Fallback);
    assert_eq!(f.series.len(), 4);
    for series in &f.series {
        let minutes: Vec<u32> = series.points.iter().map(|p| p.minutes_ahead).collect();
        assert_eq!(minutes, (1..=12).map(|i| i * 30).collect::<Vec<_>>());
        for w in series.points.windows(2) {
            assert!(w[1].confidence <= w[0].confidence);
        }
        for p in &series.points {
            assert!((0.3..=1.0).contains(&p.confidence));
            assert!(series.metric.in_range(p.value));
            assert_eq!(p.wall_time.len(), 5);
        }
    }
}

#[test]
fn stale_model_tracks_a_reading_hours_later() {
    // Warming at 0.05 °C per minute over ten hours.
    let rows: Vec<FeatureVector> = (0..600u64)
        .map(|i| FeatureVector::complete([0.05 * i as f32, 60.0, 50.0, 40.0], T0 + i * 60_000))
        .collect();
    let engine = engine();
    engine.train(&rows).unwrap();

    // No retrain for six hours; the reading is still on the trend.
    let minute = 599 + 360;
    let live = FeatureVector::complete([0.05 * minute as f32, 60.0, 50.0, 40.0], T0 + minute * 60_000);
    let f = engine.predict_future(&live, 6.0).unwrap();
    let first = f.nearest(Metric::Temperature).unwrap();
    assert_eq!(first.minutes_ahead, 30);
    let expected = 0.05 * (minute + 30) as f32;
    assert!((first.value - expected).abs() < 0.1, "{} vs {}", first.value, expected);

    let anomalies = AnomalyDetector::new(AnomalyConfig::default()).detect_anomalies(&live, &f);
    assert!(anomalies.is_empty(), "{anomalies:?}");
}

#[test]
fn horizon_bounds_are_enforced() {
    let e = engine();
    for bad in [0.0, -1.0, 24.5] {
        assert!(matches!(
            e.predict_future(&now(), bad),
            Err(Error::InvalidHorizon { .. })
        ));
    }
    assert!(e.predict_future(&now(), 24.0).is_ok());
}

#[test]
fn absent_channel_is_not_forecast() {
    let partial = now().without(Metric::LightIntensity);
    let f = engine().predict_future(&partial, 3.0).unwrap();
    assert_eq!(f.series.len(), 3);
    assert!(f.series(Metric::LightIntensity).is_none());
}

#[test]
fn trained_forecast_decays_confidence() {
    let e = engine();
    let rows: Vec<FeatureVector> = sim::day_cycle_history(T0, 360, 4)
        .iter()
        .map(FeatureVector::from)
        .collect();
    let report = e.train(&rows).unwrap();
    assert_eq!(report.r2.len(), 4);
    assert_eq!(report.rows, 360);

    let f = e.predict_future(&now(), 6.0).unwrap();
    assert_eq!(f.mode, ForecastMode::Trained);
    let first = f.nearest(Metric::Temperature).unwrap();
    assert_eq!(first.minutes_ahead, 30);
    assert!((first.confidence - (-30.0f32 / 360.0).exp()).abs() < 1e-6);
    let last = f.series(Metric::Temperature).unwrap().points.last().unwrap();
    assert!((last.confidence - (-1.0f32).exp()).abs() < 1e-6);
}

#[test]
fn online_retrain_needs_more_than_ten_points() {
    let e = engine();
    let history = sim::day_cycle_history(T0, 11, 2);
    for r in &history[..10] {
        e.update_history(r.timestamp_ms, &FeatureVector::from(r));
    }
    assert_eq!(
        e.retrain_online(),
        Err(Error::InsufficientData {
            required: 11,
            available: 10
        })
    );
    assert!(!e.is_trained());

    let last = &history[10];
    e.update_history(last.timestamp_ms, &FeatureVector::from(last));
    assert!(e.retrain_online().is_ok());
    assert!(e.is_trained());
}

#[test]
fn untrained_snapshot_carries_history() {
    let e = engine();
    for r in sim::day_cycle_history(T0, 5, 1) {
        e.update_history(r.timestamp_ms, &FeatureVector::from(&r));
    }
    let blob = e.snapshot().unwrap();

    let fresh = engine();
    fresh.restore(&blob).unwrap();
    assert!(!fresh.is_trained());
    assert_eq!(fresh.history_depth(), 5);
    assert_eq!(fresh.history_len(Metric::SoilMoisture), 5);
}

#[test]
fn history_is_bounded() {
    let e = TrendForecastEngine::new(ForecastConfig {
        history_capacity: 8,
        ..ForecastConfig::default()
    });
    for r in sim::day_cycle_history(T0, 20, 1) {
        e.update_history(r.timestamp_ms, &FeatureVector::from(&r));
    }
    assert_eq!(e.history_depth(), 8);
}
