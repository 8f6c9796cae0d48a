//! Trend forecaster.
//!
//! One ridge regression per metric over a shared polynomial expansion of
//! elapsed time.  The time axis is minutes relative to the newest training
//! sample, so evaluating at `+k·interval` projects forward from the end of
//! the history.  Until a model set exists the engine answers from a fixed
//! drift table instead; such forecasts are tagged [`ForecastMode::Fallback`].
//!
//! ```text
//!  update_history ──▶ HistoryBuffers ──▶ retrain_online ──▶ TrendModelSet (Arc swap)
//!                                                              │
//!  predict_future(reading, hours) ◀────────────────────────────┘
//! ```

pub mod history;
pub mod ridge;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use parking_lot::{Mutex, RwLock};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use crate::config::ForecastConfig;
use crate::error::{Error, Result};
use crate::reading::{FeatureVector, Metric};
use crate::sim::gaussian;
use crate::snapshot::{self, SnapshotKind};

pub use history::{HistoryBuffer, HistoryBuffers, HistoryPoint};
pub use ridge::{PolynomialFeatures, RidgeModel};

const MS_PER_MINUTE: f64 = 60_000.0;

// ───────────────────────────────────────────────────────────────
// Forecast output
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ForecastMode {
    /// Evaluated from the trained regression models.
    Trained,
    /// Drift-table extrapolation used before any training.
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub minutes_ahead: u32,
    /// UTC "HH:MM" of the projected instant
    pub wall_time: String,
    pub value: f32,
    pub confidence: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricForecast {
    pub metric: Metric,
    pub points: Vec<ForecastPoint>,
}

impl IntoIterator for MetricForecast {
    type Item = ForecastPoint;
    type IntoIter = std::vec::IntoIter<ForecastPoint>;

    fn into_iter(self) -> Self::IntoIter {
        self.points.into_iter()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Forecast {
    pub mode: ForecastMode,
    pub issued_at_ms: u64,
    pub horizon_hours: f32,
    pub series: Vec<MetricForecast>,
}

impl Forecast {
    pub fn series(&self, metric: Metric) -> Option<&MetricForecast> {
        self.series.iter().find(|s| s.metric == metric)
    }

    /// First (nearest-horizon) point for `metric`.
    pub fn nearest(&self, metric: Metric) -> Option<&ForecastPoint> {
        self.series(metric).and_then(|s| s.points.first())
    }

    pub fn min_value(&self, metric: Metric) -> Option<f32> {
        self.series(metric)?
            .points
            .iter()
            .map(|p| p.value)
            .min_by(f32::total_cmp)
    }
}

/// Offsets `interval, 2·interval, …` up to the horizon; consumed once.
struct ForecastSteps {
    next: u32,
    count: u32,
    interval: u32,
}

impl ForecastSteps {
    fn new(hours_ahead: f32, interval_minutes: u32) -> Self {
        let count = (hours_ahead * 60.0 / interval_minutes as f32).floor() as u32;
        Self {
            next: 1,
            count,
            interval: interval_minutes,
        }
    }
}

impl Iterator for ForecastSteps {
    type Item = u32;

    fn next(&mut self) -> Option<u32> {
        if self.next > self.count {
            return None;
        }
        let minutes = self.next * self.interval;
        self.next += 1;
        Some(minutes)
    }
}

fn wall_clock(issued_at_ms: u64, minutes_ahead: u32) -> String {
    let at = issued_at_ms as i64 + i64::from(minutes_ahead) * 60_000;
    DateTime::<Utc>::from_timestamp_millis(at)
        .map_or_else(|| "--:--".to_owned(), |t| t.format("%H:%M").to_string())
}

// ───────────────────────────────────────────────────────────────
// Model set
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricModel {
    pub ridge: RidgeModel,
    /// In-sample coefficient of determination
    pub r2: f64,
    pub samples: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendModelSet {
    pub features: PolynomialFeatures,
    /// Indexed by [`Metric::index`]; `None` where the metric had too little data
    pub models: [Option<MetricModel>; 4],
    /// Timestamp of the newest training sample (time origin)
    pub trained_through_ms: u64,
}

impl TrendModelSet {
    pub fn model(&self, metric: Metric) -> Option<&MetricModel> {
        self.models[metric.index()].as_ref()
    }

    /// Minutes from the training origin to `issued_at_ms`; zero when the
    /// reading predates the newest training sample.
    fn lead_minutes(&self, issued_at_ms: u64) -> f64 {
        issued_at_ms.saturating_sub(self.trained_through_ms) as f64 / MS_PER_MINUTE
    }

    /// Model value `minutes` after the training origin.
    fn evaluate(&self, metric: Metric, minutes: f64) -> Option<f32> {
        let m = self.model(metric)?;
        Some(m.ridge.predict(&self.features.expand(minutes)) as f32)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrendReport {
    /// R² per fitted metric
    pub r2: Vec<(Metric, f64)>,
    pub rows: usize,
}

#[derive(Serialize, Deserialize)]
struct TrendSnapshot {
    models: Option<TrendModelSet>,
    history: HistoryBuffers,
}

/// `(minutes relative to origin, value)` pairs per metric.
type Series = [Vec<(f64, f64)>; 4];

// ───────────────────────────────────────────────────────────────
// Engine
// ───────────────────────────────────────────────────────────────

pub struct TrendForecastEngine {
    config: ForecastConfig,
    models: RwLock<Option<Arc<TrendModelSet>>>,
    history: Mutex<HistoryBuffers>,
    /// Held for the whole of a training run.
    training: Mutex<()>,
    noise: Mutex<StdRng>,
}

impl TrendForecastEngine {
    pub fn new(config: ForecastConfig) -> Self {
        Self {
            models: RwLock::new(None),
            history: Mutex::new(HistoryBuffers::new(config.history_capacity)),
            training: Mutex::new(()),
            noise: Mutex::new(StdRng::seed_from_u64(config.noise_seed)),
            config,
        }
    }

    pub fn config(&self) -> &ForecastConfig {
        &self.config
    }

    pub fn is_trained(&self) -> bool {
        self.models.read().is_some()
    }

    pub fn model_set(&self) -> Option<Arc<TrendModelSet>> {
        self.models.read().clone()
    }

    // ── Training ─────────────────────────────────────────────

    /// Fit one model per metric on a historical table.  Each row's
    /// `timestamp_ms` is its sample time; absent channels are skipped.
    pub fn train(&self, rows: &[FeatureVector]) -> Result<TrendReport> {
        let _guard = self.training.try_lock().ok_or(Error::TrainingInProgress)?;
        let origin = rows.iter().map(|r| r.timestamp_ms).max().unwrap_or(0);
        let mut series: Series = Default::default();
        for row in rows {
            let t = minutes_before(origin, row.timestamp_ms);
            for (metric, value) in row.present() {
                series[metric.index()].push((t, f64::from(value)));
            }
        }
        self.fit_and_install(&series, origin, rows.len())
    }

    /// Refit from the history buffers.  With too little history this is a
    /// no-op returning [`Error::InsufficientData`]; the previous model set
    /// stays authoritative.
    pub fn retrain_online(&self) -> Result<TrendReport> {
        let _guard = self.training.try_lock().ok_or(Error::TrainingInProgress)?;
        let (series, origin, depth) = {
            let history = self.history.lock();
            let depth = history.deepest();
            if depth <= self.config.min_retrain_points {
                debug!("Retrain skipped: {} buffered points", depth);
                return Err(Error::InsufficientData {
                    required: self.config.min_retrain_points + 1,
                    available: depth,
                });
            }
            let origin = history.newest_timestamp().unwrap_or(0);
            let series: Series = core::array::from_fn(|i| {
                history
                    .get(Metric::ALL[i])
                    .iter()
                    .map(|p| (minutes_before(origin, p.timestamp_ms), f64::from(p.value)))
                    .collect()
            });
            (series, origin, depth)
        };
        info!("Online retrain from {} buffered points", depth);
        self.fit_and_install(&series, origin, depth)
    }

    fn fit_and_install(&self, series: &Series, origin: u64, rows: usize) -> Result<TrendReport> {
        let features = PolynomialFeatures {
            degree: self.config.degree,
        };
        let min_points = self.config.degree as usize + 1;
        let mut models: [Option<MetricModel>; 4] = Default::default();
        let mut r2 = Vec::new();

        for metric in Metric::ALL {
            let points = &series[metric.index()];
            if points.len() < min_points {
                warn!("{}: {} points, skipping", metric.name(), points.len());
                continue;
            }
            let x: Vec<Vec<f64>> = points.iter().map(|(t, _)| features.expand(*t)).collect();
            let y: Vec<f64> = points.iter().map(|(_, v)| *v).collect();
            let Some(ridge) = RidgeModel::fit(&x, &y, self.config.ridge_alpha) else {
                warn!("{}: singular fit, skipping", metric.name());
                continue;
            };
            let score = ridge.r2(&x, &y);
            info!("{} trend model R²: {:.4}", metric.name(), score);
            r2.push((metric, score));
            models[metric.index()] = Some(MetricModel {
                ridge,
                r2: score,
                samples: points.len(),
            });
        }

        if r2.is_empty() {
            return Err(Error::InsufficientData {
                required: min_points,
                available: series.iter().map(Vec::len).max().unwrap_or(0),
            });
        }
        let set = TrendModelSet {
            features,
            models,
            trained_through_ms: origin,
        };
        *self.models.write() = Some(Arc::new(set));
        Ok(TrendReport { r2, rows })
    }

    // ── Forecasting ──────────────────────────────────────────

    /// Project every metric present in `reading` forward `hours_ahead`
    /// hours at the configured interval.
    pub fn predict_future(&self, reading: &FeatureVector, hours_ahead: f32) -> Result<Forecast> {
        if self.config.interval_minutes == 0 {
            return Err(Error::InvalidConfig("forecast.interval_minutes must be > 0"));
        }
        let max = self.config.max_horizon_hours;
        if !(hours_ahead > 0.0 && hours_ahead <= max) {
            return Err(Error::InvalidHorizon {
                requested: hours_ahead,
                max,
            });
        }
        Ok(match self.model_set() {
            Some(set) => self.trained_forecast(&set, reading, hours_ahead),
            None => self.fallback_forecast(reading, hours_ahead),
        })
    }

    fn trained_forecast(&self, set: &TrendModelSet, reading: &FeatureVector, hours: f32) -> Forecast {
        let horizon_min = hours * 60.0;
        let decay = self.config.confidence_decay;
        let lead = set.lead_minutes(reading.timestamp_ms);
        let series = reading
            .present()
            .filter(|(m, _)| set.model(*m).is_some())
            .map(|(metric, _)| MetricForecast {
                metric,
                points: ForecastSteps::new(hours, self.config.interval_minutes)
                    .filter_map(|m| {
                        Some(ForecastPoint {
                            minutes_ahead: m,
                            wall_time: wall_clock(reading.timestamp_ms, m),
                            value: set.evaluate(metric, lead + f64::from(m))?,
                            confidence: (-decay * m as f32 / horizon_min).exp(),
                        })
                    })
                    .collect(),
            })
            .collect();
        Forecast {
            mode: ForecastMode::Trained,
            issued_at_ms: reading.timestamp_ms,
            horizon_hours: hours,
            series,
        }
    }

    fn fallback_forecast(&self, reading: &FeatureVector, hours: f32) -> Forecast {
        let cfg = &self.config;
        let mut rng = self.noise.lock();
        let series = reading
            .present()
            .map(|(metric, current)| MetricForecast {
                metric,
                points: ForecastSteps::new(hours, cfg.interval_minutes)
                    .map(|m| {
                        let h = m as f32 / 60.0;
                        let noise = gaussian(&mut *rng) * cfg.fallback_noise_per_hour * h;
                        let value = metric.clamp(current + cfg.drift_per_hour(metric) * h + noise);
                        ForecastPoint {
                            minutes_ahead: m,
                            wall_time: wall_clock(reading.timestamp_ms, m),
                            value,
                            confidence: (1.0 - h / hours).max(cfg.fallback_min_confidence),
                        }
                    })
                    .collect(),
            })
            .collect();
        Forecast {
            mode: ForecastMode::Fallback,
            issued_at_ms: reading.timestamp_ms,
            horizon_hours: hours,
            series,
        }
    }

    // ── History ──────────────────────────────────────────────

    pub fn update_history(&self, timestamp_ms: u64, reading: &FeatureVector) {
        self.history.lock().record(timestamp_ms, reading);
    }

    pub fn history_len(&self, metric: Metric) -> usize {
        self.history.lock().get(metric).len()
    }

    pub fn history_depth(&self) -> usize {
        self.history.lock().deepest()
    }

    // ── Persistence ──────────────────────────────────────────

    /// Model set (if trained) plus the history buffers.
    pub fn snapshot(&self) -> Result<Vec<u8>> {
        let snap = TrendSnapshot {
            models: self.model_set().map(|s| (*s).clone()),
            history: self.history.lock().clone(),
        };
        Ok(snapshot::encode(SnapshotKind::TrendForecaster, &snap)?)
    }

    pub fn restore(&self, blob: &[u8]) -> Result<()> {
        let _guard = self.training.try_lock().ok_or(Error::TrainingInProgress)?;
        let snap: TrendSnapshot = snapshot::decode(SnapshotKind::TrendForecaster, blob)?;
        *self.history.lock() = snap.history;
        *self.models.write() = snap.models.map(Arc::new);
        info!("Trend models restored from snapshot");
        Ok(())
    }
}

fn minutes_before(origin_ms: u64, ts_ms: u64) -> f64 {
    -(origin_ms.saturating_sub(ts_ms) as f64) / MS_PER_MINUTE
}
