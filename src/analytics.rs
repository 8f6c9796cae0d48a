//! Plant analytics derived from a single reading.
//!
//! A weighted health score against ideal growing ranges, and a linear
//! estimate of how long until the soil dries to a critical level.  Both
//! feed telemetry only; neither influences actuation.

use serde::{Deserialize, Serialize};

use crate::reading::{Metric, ReadingRecord};

/// Ideal range and weight per metric, in [`Metric::ALL`] order.
const IDEAL: [(f32, f32, f32); 4] = [
    (20.0, 28.0, 0.25),
    (50.0, 75.0, 0.20),
    (40.0, 70.0, 0.35),
    (30.0, 80.0, 0.20),
];

/// Soil moisture (%) treated as critically dry.
pub const CRITICAL_SOIL_MOISTURE: f32 = 30.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HealthClass {
    Excellent,
    Good,
    Fair,
    Poor,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HealthScore {
    /// 0–100
    pub score: f32,
    pub class: HealthClass,
}

/// 100 inside the ideal range, falling linearly to 0 one range-width
/// outside it.
fn metric_score(value: f32, lo: f32, hi: f32) -> f32 {
    if (lo..=hi).contains(&value) {
        return 100.0;
    }
    let deviation = if value < lo { lo - value } else { value - hi };
    100.0 * (1.0 - (deviation / (hi - lo)).min(1.0))
}

pub fn health_score(reading: &ReadingRecord) -> HealthScore {
    let score: f32 = Metric::ALL
        .iter()
        .map(|&m| {
            let (lo, hi, w) = IDEAL[m.index()];
            metric_score(reading.value(m), lo, hi) * w
        })
        .sum();
    let class = match score {
        s if s >= 80.0 => HealthClass::Excellent,
        s if s >= 60.0 => HealthClass::Good,
        s if s >= 40.0 => HealthClass::Fair,
        _ => HealthClass::Poor,
    };
    HealthScore { score, class }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DrynessEta {
    pub hours: f32,
    pub confidence: f32,
}

/// Hours until soil moisture reaches `critical`.
///
/// Drying rate (%/h) is a fixed linear blend of moisture deficit,
/// temperature and air dryness around a base of 8 %/h.
pub fn soil_dryness_eta(reading: &ReadingRecord, critical: f32) -> DrynessEta {
    let m = reading.soil_moisture;
    if m <= critical {
        return DrynessEta {
            hours: 0.0,
            confidence: 1.0,
        };
    }
    let rate = 8.0 - 0.05 * (100.0 - m) / 100.0 + 0.02 * reading.temperature / 50.0
        - 0.01 * (100.0 - reading.humidity) / 100.0;
    DrynessEta {
        hours: ((m - critical) / rate.max(0.1)).max(0.0),
        confidence: (0.7 + reading.humidity / 100.0 * 0.2).min(0.95),
    }
}
