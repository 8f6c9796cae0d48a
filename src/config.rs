//! Core configuration parameters
//!
//! All tunable parameters for the plant control core, grouped by the
//! subsystem that consumes them.  Defaults reproduce the reference
//! deployment; the simulator can override them from a JSON file.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::reading::{Metric, PerActuator};

/// Upper bound on `max_commands_per_minute`; sizes the per-actuator
/// rate-limit log.
pub const MAX_RATE_LOG: usize = 64;

/// Core configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CoreConfig {
    pub ensemble: EnsembleConfig,
    pub forecast: ForecastConfig,
    pub anomaly: AnomalyConfig,
    pub safety: SafetyPolicy,
    pub auto: AutoControlConfig,
}

impl CoreConfig {
    /// Range-check every field.  Invalid values are rejected, not clamped.
    pub fn validate(&self) -> Result<()> {
        self.ensemble.validate()?;
        self.forecast.validate()?;
        self.anomaly.validate()?;
        self.safety.validate()?;
        self.auto.validate()
    }
}

// ───────────────────────────────────────────────────────────────
// Actuator classifiers
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnsembleConfig {
    /// Trees per actuator forest
    pub n_trees: u16,
    pub max_depth: u8,
    /// A node with fewer samples becomes a leaf
    pub min_samples_split: u16,
    /// Each child of a split must keep at least this many samples
    pub min_samples_leaf: u16,
    /// Fraction of rows held out for accuracy reporting
    pub holdout_fraction: f32,
    /// Training refuses smaller tables
    pub min_training_samples: usize,
    pub seed: u64,
}

impl Default for EnsembleConfig {
    fn default() -> Self {
        Self {
            n_trees: 100,
            max_depth: 10,
            min_samples_split: 5,
            min_samples_leaf: 2,
            holdout_fraction: 0.2,
            min_training_samples: 10,
            seed: 42,
        }
    }
}

impl EnsembleConfig {
    fn validate(&self) -> Result<()> {
        if self.n_trees == 0 {
            return Err(Error::InvalidConfig("ensemble.n_trees must be > 0"));
        }
        if self.max_depth == 0 || self.max_depth > 32 {
            return Err(Error::InvalidConfig("ensemble.max_depth must be 1..=32"));
        }
        if self.min_samples_split < 2 {
            return Err(Error::InvalidConfig("ensemble.min_samples_split must be >= 2"));
        }
        if self.min_samples_leaf == 0 {
            return Err(Error::InvalidConfig("ensemble.min_samples_leaf must be >= 1"));
        }
        if !(0.0..0.9).contains(&self.holdout_fraction) {
            return Err(Error::InvalidConfig("ensemble.holdout_fraction must be in [0, 0.9)"));
        }
        if self.min_training_samples < 2 {
            return Err(Error::InvalidConfig("ensemble.min_training_samples must be >= 2"));
        }
        Ok(())
    }
}

// ───────────────────────────────────────────────────────────────
// Trend forecaster
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastConfig {
    /// Spacing between forecast points (minutes)
    pub interval_minutes: u32,
    /// Horizon used by the service when forecasting each reading (hours)
    pub default_horizon_hours: f32,
    /// Largest accepted horizon (hours)
    pub max_horizon_hours: f32,
    /// Polynomial degree of the time expansion
    pub degree: u8,
    /// Ridge penalty
    pub ridge_alpha: f64,
    /// Samples kept per metric history buffer (1440 = 24h at 1/min)
    pub history_capacity: usize,
    /// Online retraining needs more than this many buffered points
    pub min_retrain_points: usize,
    /// Untrained fallback drift per hour, in [`Metric::ALL`] order
    pub fallback_drift_per_hour: [f32; 4],
    /// Fallback noise standard deviation per hour of lead time
    pub fallback_noise_per_hour: f32,
    /// Floor on fallback confidence
    pub fallback_min_confidence: f32,
    /// Trained confidence is `exp(-decay * minutes_ahead / horizon_minutes)`
    pub confidence_decay: f32,
    pub noise_seed: u64,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            interval_minutes: 30,
            default_horizon_hours: 6.0,
            max_horizon_hours: 24.0,
            degree: 2,
            ridge_alpha: 1.0,
            history_capacity: 1440,
            min_retrain_points: 10,
            fallback_drift_per_hour: [0.5, -1.0, -2.0, 0.0],
            fallback_noise_per_hour: 0.5,
            fallback_min_confidence: 0.3,
            confidence_decay: 1.0,
            noise_seed: 42,
        }
    }
}

impl ForecastConfig {
    pub fn drift_per_hour(&self, metric: Metric) -> f32 {
        self.fallback_drift_per_hour[metric.index()]
    }

    fn validate(&self) -> Result<()> {
        if self.interval_minutes == 0 {
            return Err(Error::InvalidConfig("forecast.interval_minutes must be > 0"));
        }
        if !(self.max_horizon_hours > 0.0 && self.max_horizon_hours <= 24.0 * 7.0) {
            return Err(Error::InvalidConfig("forecast.max_horizon_hours must be in (0, 168]"));
        }
        if !(self.default_horizon_hours > 0.0 && self.default_horizon_hours <= self.max_horizon_hours) {
            return Err(Error::InvalidConfig(
                "forecast.default_horizon_hours must be in (0, max_horizon_hours]",
            ));
        }
        if self.degree == 0 || self.degree > 4 {
            return Err(Error::InvalidConfig("forecast.degree must be 1..=4"));
        }
        if !(self.ridge_alpha.is_finite() && self.ridge_alpha >= 0.0) {
            return Err(Error::InvalidConfig("forecast.ridge_alpha must be finite and >= 0"));
        }
        if self.history_capacity <= self.min_retrain_points {
            return Err(Error::InvalidConfig(
                "forecast.history_capacity must exceed min_retrain_points",
            ));
        }
        if !(0.0..=1.0).contains(&self.fallback_min_confidence) {
            return Err(Error::InvalidConfig("forecast.fallback_min_confidence must be in [0, 1]"));
        }
        if !(self.confidence_decay > 0.0 && self.confidence_decay.is_finite()) {
            return Err(Error::InvalidConfig("forecast.confidence_decay must be > 0"));
        }
        if !(self.fallback_noise_per_hour >= 0.0) {
            return Err(Error::InvalidConfig("forecast.fallback_noise_per_hour must be >= 0"));
        }
        Ok(())
    }
}

// ───────────────────────────────────────────────────────────────
// Anomaly detection
// ───────────────────────────────────────────────────────────────

/// `threshold = max(floor, fraction * |live|)`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AdaptiveThreshold {
    pub floor: f32,
    pub fraction: f32,
}

impl AdaptiveThreshold {
    pub fn at(&self, live: f32) -> f32 {
        self.floor.max(self.fraction * live.abs())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyConfig {
    /// Per-metric thresholds in [`Metric::ALL`] order
    pub thresholds: [AdaptiveThreshold; 4],
    /// Deviation above `multiplier * threshold` is high severity
    pub high_multiplier: f32,
}

impl Default for AnomalyConfig {
    fn default() -> Self {
        Self {
            thresholds: [
                AdaptiveThreshold { floor: 8.0, fraction: 0.15 },
                AdaptiveThreshold { floor: 30.0, fraction: 0.40 },
                AdaptiveThreshold { floor: 30.0, fraction: 0.40 },
                AdaptiveThreshold { floor: 35.0, fraction: 0.40 },
            ],
            high_multiplier: 2.0,
        }
    }
}

impl AnomalyConfig {
    pub fn threshold(&self, metric: Metric) -> &AdaptiveThreshold {
        &self.thresholds[metric.index()]
    }

    fn validate(&self) -> Result<()> {
        if self
            .thresholds
            .iter()
            .any(|t| !(t.floor > 0.0) || !(t.fraction >= 0.0))
        {
            return Err(Error::InvalidConfig(
                "anomaly thresholds need floor > 0 and fraction >= 0",
            ));
        }
        if !(self.high_multiplier > 1.0) {
            return Err(Error::InvalidConfig("anomaly.high_multiplier must be > 1"));
        }
        Ok(())
    }
}

// ───────────────────────────────────────────────────────────────
// Safety policy
// ───────────────────────────────────────────────────────────────

/// What to do with a command whose duration exceeds the actuator cap.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DurationCapPolicy {
    /// Reject the command outright.
    Reject,
    /// Accept it with the duration cut to the cap.
    #[default]
    Clamp,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SafetyPolicy {
    /// Longest single activation per actuator (seconds)
    pub max_duration_secs: PerActuator<u32>,
    pub duration_cap: DurationCapPolicy,
    /// Accepted commands per actuator within the sliding window
    pub max_commands_per_minute: u8,
    pub rate_window_secs: u32,
    /// Grow light interlock ceiling (°C)
    pub grow_light_max_temp_c: f32,
    // Advisory alert limits
    pub alert_max_temp_c: f32,
    pub alert_max_humidity: f32,
    pub alert_max_soil_moisture: f32,
}

impl Default for SafetyPolicy {
    fn default() -> Self {
        Self {
            max_duration_secs: PerActuator {
                pump: 1800,        // 30 min
                fan: 3600,         // 1 h
                grow_light: 14400, // 4 h
            },
            duration_cap: DurationCapPolicy::Clamp,
            max_commands_per_minute: 10,
            rate_window_secs: 60,
            grow_light_max_temp_c: 40.0,
            alert_max_temp_c: 45.0,
            alert_max_humidity: 95.0,
            alert_max_soil_moisture: 95.0,
        }
    }
}

impl SafetyPolicy {
    fn validate(&self) -> Result<()> {
        if self.max_duration_secs.iter().any(|(_, cap)| *cap == 0) {
            return Err(Error::InvalidConfig("safety.max_duration_secs must be > 0"));
        }
        if self.max_commands_per_minute == 0 || self.max_commands_per_minute as usize > MAX_RATE_LOG {
            return Err(Error::InvalidConfig("safety.max_commands_per_minute must be 1..=64"));
        }
        if self.rate_window_secs == 0 {
            return Err(Error::InvalidConfig("safety.rate_window_secs must be > 0"));
        }
        if !self.grow_light_max_temp_c.is_finite() {
            return Err(Error::InvalidConfig("safety.grow_light_max_temp_c must be finite"));
        }
        Ok(())
    }
}

// ───────────────────────────────────────────────────────────────
// Auto-control
// ───────────────────────────────────────────────────────────────

/// Threshold pairs for the rule-based controller used while the
/// classifiers are untrained.  Each ON threshold sits on the far side of
/// its OFF threshold so the relays do not chatter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HysteresisRules {
    pub pump_on_below_soil: f32,
    pub pump_off_above_soil: f32,
    pub fan_on_above_temp: f32,
    pub fan_off_below_temp: f32,
    pub light_on_below: f32,
    pub light_off_above: f32,
}

impl Default for HysteresisRules {
    fn default() -> Self {
        Self {
            pump_on_below_soil: 30.0,
            pump_off_above_soil: 70.0,
            fan_on_above_temp: 30.0,
            fan_off_below_temp: 25.0,
            light_on_below: 20.0,
            light_off_above: 60.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutoControlConfig {
    pub enabled: bool,
    /// Classifier decisions below this confidence are ignored
    pub min_confidence: f32,
    /// Duration attached to automatic pump activations (seconds)
    pub pump_duration_secs: u32,
    /// Water ahead of time if a trained forecast dips below this (%)
    pub preventive_soil_threshold: f32,
    pub rules: HysteresisRules,
}

impl Default for AutoControlConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_confidence: 0.7,
            pump_duration_secs: 300, // 5 min
            preventive_soil_threshold: 30.0,
            rules: HysteresisRules::default(),
        }
    }
}

impl AutoControlConfig {
    fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.min_confidence) {
            return Err(Error::InvalidConfig("auto.min_confidence must be in [0, 1]"));
        }
        let r = &self.rules;
        if r.pump_on_below_soil >= r.pump_off_above_soil
            || r.fan_off_below_temp >= r.fan_on_above_temp
            || r.light_on_below >= r.light_off_above
        {
            return Err(Error::InvalidConfig("auto.rules thresholds overlap"));
        }
        Ok(())
    }
}
