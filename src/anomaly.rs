//! Live-versus-forecast anomaly detection.
//!
//! Each present metric is compared against the nearest-horizon point of a
//! forecast.  Thresholds scale with the live magnitude so large readings
//! need proportionally larger deviations to trip.  Stateless.

use serde::{Deserialize, Serialize};

use crate::config::AnomalyConfig;
use crate::forecast::Forecast;
use crate::reading::{FeatureVector, Metric};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnomalyRecord {
    pub metric: Metric,
    pub current_value: f32,
    pub predicted_value: f32,
    pub deviation: f32,
    pub severity: Severity,
}

pub struct AnomalyDetector {
    config: AnomalyConfig,
}

impl AnomalyDetector {
    pub fn new(config: AnomalyConfig) -> Self {
        Self { config }
    }

    pub fn threshold(&self, metric: Metric, live: f32) -> f32 {
        self.config.threshold(metric).at(live)
    }

    pub fn detect_anomalies(&self, live: &FeatureVector, forecast: &Forecast) -> Vec<AnomalyRecord> {
        live.present()
            .filter_map(|(metric, current)| {
                let predicted = forecast.nearest(metric)?.value;
                let deviation = (current - predicted).abs();
                let threshold = self.threshold(metric, current);
                if !(deviation > threshold) {
                    return None;
                }
                let severity = if deviation > self.config.high_multiplier * threshold {
                    Severity::High
                } else {
                    Severity::Medium
                };
                Some(AnomalyRecord {
                    metric,
                    current_value: current,
                    predicted_value: predicted,
                    deviation,
                    severity,
                })
            })
            .collect()
    }
}
