//! Shared data model: sensor metrics, actuators and validated readings.
//!
//! The node shape is fixed: four sensor channels feed the core and three
//! relays leave it.  Everything downstream indexes by [`Metric`] or
//! [`Actuator`] rather than by free-form strings; names only appear at the
//! boundary (commands, logs, snapshots).

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

// ───────────────────────────────────────────────────────────────
// Metric
// ───────────────────────────────────────────────────────────────

/// One environmental sensor channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Metric {
    Temperature,
    Humidity,
    SoilMoisture,
    LightIntensity,
}

impl Metric {
    /// Feature order used by every model in the crate.
    pub const ALL: [Self; 4] = [
        Self::Temperature,
        Self::Humidity,
        Self::SoilMoisture,
        Self::LightIntensity,
    ];

    pub const fn index(self) -> usize {
        self as usize
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Temperature => "temperature",
            Self::Humidity => "humidity",
            Self::SoilMoisture => "soil_moisture",
            Self::LightIntensity => "light_intensity",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.name() == name)
    }

    /// Physically plausible range (inclusive).
    pub const fn range(self) -> (f32, f32) {
        match self {
            Self::Temperature => (-50.0, 80.0),
            Self::Humidity | Self::SoilMoisture | Self::LightIntensity => (0.0, 100.0),
        }
    }

    pub fn clamp(self, value: f32) -> f32 {
        let (lo, hi) = self.range();
        value.clamp(lo, hi)
    }

    pub fn in_range(self, value: f32) -> bool {
        let (lo, hi) = self.range();
        value.is_finite() && (lo..=hi).contains(&value)
    }
}

// ───────────────────────────────────────────────────────────────
// Actuator
// ───────────────────────────────────────────────────────────────

/// One relay-driven actuator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Actuator {
    Pump,
    Fan,
    GrowLight,
}

impl Actuator {
    pub const ALL: [Self; 3] = [Self::Pump, Self::Fan, Self::GrowLight];

    pub const fn name(self) -> &'static str {
        match self {
            Self::Pump => "pump",
            Self::Fan => "fan",
            Self::GrowLight => "grow_light",
        }
    }

    /// Whitelist lookup.  Only the three fixed names are accepted.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|a| a.name() == name)
    }
}

/// One value per actuator, indexed by [`Actuator`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PerActuator<T> {
    pub pump: T,
    pub fan: T,
    pub grow_light: T,
}

impl<T> PerActuator<T> {
    pub fn from_fn(mut f: impl FnMut(Actuator) -> T) -> Self {
        Self {
            pump: f(Actuator::Pump),
            fan: f(Actuator::Fan),
            grow_light: f(Actuator::GrowLight),
        }
    }

    pub fn get(&self, actuator: Actuator) -> &T {
        match actuator {
            Actuator::Pump => &self.pump,
            Actuator::Fan => &self.fan,
            Actuator::GrowLight => &self.grow_light,
        }
    }

    pub fn get_mut(&mut self, actuator: Actuator) -> &mut T {
        match actuator {
            Actuator::Pump => &mut self.pump,
            Actuator::Fan => &mut self.fan,
            Actuator::GrowLight => &mut self.grow_light,
        }
    }

    pub fn map<U>(&self, mut f: impl FnMut(Actuator, &T) -> U) -> PerActuator<U> {
        PerActuator::from_fn(|a| f(a, self.get(a)))
    }

    pub fn iter(&self) -> impl Iterator<Item = (Actuator, &T)> {
        Actuator::ALL.into_iter().map(move |a| (a, self.get(a)))
    }
}

// ───────────────────────────────────────────────────────────────
// Reading record
// ───────────────────────────────────────────────────────────────

/// Data-quality grade attached to a reading by the ingest path.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Quality {
    Excellent,
    Good,
    Fair,
    Poor,
    #[default]
    Unknown,
}

impl Quality {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Excellent => "excellent",
            Self::Good => "good",
            Self::Fair => "fair",
            Self::Poor => "poor",
            Self::Unknown => "unknown",
        }
    }
}

/// One timestamped sample of all four channels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReadingRecord {
    pub temperature: f32,
    pub humidity: f32,
    pub soil_moisture: f32,
    pub light_intensity: f32,
    /// Milliseconds since the Unix epoch.
    pub timestamp_ms: u64,
    pub quality: Quality,
}

impl ReadingRecord {
    pub fn new(
        temperature: f32,
        humidity: f32,
        soil_moisture: f32,
        light_intensity: f32,
        timestamp_ms: u64,
    ) -> Self {
        Self {
            temperature,
            humidity,
            soil_moisture,
            light_intensity,
            timestamp_ms,
            quality: Quality::Unknown,
        }
    }

    pub fn value(&self, metric: Metric) -> f32 {
        match metric {
            Metric::Temperature => self.temperature,
            Metric::Humidity => self.humidity,
            Metric::SoilMoisture => self.soil_moisture,
            Metric::LightIntensity => self.light_intensity,
        }
    }

    pub fn values(&self) -> [f32; 4] {
        Metric::ALL.map(|m| self.value(m))
    }

    /// Boundary check: every channel finite and inside its physical range.
    pub fn validate(&self) -> Result<()> {
        for metric in Metric::ALL {
            let value = self.value(metric);
            if !metric.in_range(value) {
                return Err(Error::InvalidReading { metric, value });
            }
        }
        Ok(())
    }

    /// Grade the raw sample: 10 points off per out-of-range channel, with a
    /// further 5 off once any channel is out.
    pub fn assess_quality(&self) -> Quality {
        if self.values().iter().any(|v| !v.is_finite()) {
            return Quality::Unknown;
        }
        let out = Metric::ALL
            .iter()
            .filter(|m| !m.in_range(self.value(**m)))
            .count() as i32;
        let mut score = 100 - 10 * out;
        if score < 90 {
            score = (score - 5).max(0);
        }
        match score {
            90.. => Quality::Excellent,
            75..=89 => Quality::Good,
            50..=74 => Quality::Fair,
            _ => Quality::Poor,
        }
    }

    /// Stamp the reading with its assessed quality.
    pub fn graded(mut self) -> Self {
        self.quality = self.assess_quality();
        self
    }
}

// ───────────────────────────────────────────────────────────────
// Feature vector
// ───────────────────────────────────────────────────────────────

/// Model input: possibly-partial channel values plus the sample time.
///
/// Readings that crossed the boundary are always complete; partial vectors
/// exist so callers that assemble inputs by hand get a typed
/// [`Error::MissingFeature`] instead of a silent default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    values: [Option<f32>; 4],
    pub timestamp_ms: u64,
}

impl FeatureVector {
    pub fn empty(timestamp_ms: u64) -> Self {
        Self {
            values: [None; 4],
            timestamp_ms,
        }
    }

    /// Complete vector in [`Metric::ALL`] order.
    pub fn complete(values: [f32; 4], timestamp_ms: u64) -> Self {
        Self {
            values: values.map(Some),
            timestamp_ms,
        }
    }

    #[must_use]
    pub fn with(mut self, metric: Metric, value: f32) -> Self {
        self.values[metric.index()] = Some(value);
        self
    }

    #[must_use]
    pub fn without(mut self, metric: Metric) -> Self {
        self.values[metric.index()] = None;
        self
    }

    pub fn get(&self, metric: Metric) -> Option<f32> {
        self.values[metric.index()]
    }

    pub fn require(&self, metric: Metric) -> Result<f32> {
        self.get(metric).ok_or(Error::MissingFeature(metric))
    }

    /// All four values, or the first missing feature.
    pub fn require_all(&self) -> Result<[f32; 4]> {
        let mut out = [0.0; 4];
        for metric in Metric::ALL {
            out[metric.index()] = self.require(metric)?;
        }
        Ok(out)
    }

    pub fn present(&self) -> impl Iterator<Item = (Metric, f32)> + '_ {
        Metric::ALL
            .into_iter()
            .filter_map(|m| self.get(m).map(|v| (m, v)))
    }
}

impl From<&ReadingRecord> for FeatureVector {
    fn from(r: &ReadingRecord) -> Self {
        Self::complete(r.values(), r.timestamp_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip() {
        for m in Metric::ALL {
            assert_eq!(Metric::from_name(m.name()), Some(m));
        }
        for a in Actuator::ALL {
            assert_eq!(Actuator::from_name(a.name()), Some(a));
        }
        assert_eq!(Actuator::from_name("heater"), None);
        assert_eq!(Actuator::from_name("PUMP"), None);
    }

    #[test]
    fn validate_rejects_out_of_range() {
        let ok = ReadingRecord::new(25.0, 60.0, 50.0, 40.0, 0);
        assert!(ok.validate().is_ok());

        let hot = ReadingRecord::new(81.0, 60.0, 50.0, 40.0, 0);
        assert_eq!(
            hot.validate(),
            Err(Error::InvalidReading {
                metric: Metric::Temperature,
                value: 81.0
            })
        );

        let nan = ReadingRecord::new(25.0, f32::NAN, 50.0, 40.0, 0);
        assert!(nan.validate().is_err());

        let cold_edge = ReadingRecord::new(-50.0, 0.0, 100.0, 0.0, 0);
        assert!(cold_edge.validate().is_ok());
    }

    #[test]
    fn quality_grades() {
        assert_eq!(
            ReadingRecord::new(25.0, 60.0, 50.0, 40.0, 0).assess_quality(),
            Quality::Excellent
        );
        // one channel out: 100 - 10 - 5 = 85
        assert_eq!(
            ReadingRecord::new(25.0, 120.0, 50.0, 40.0, 0).assess_quality(),
            Quality::Good
        );
        // three out: 100 - 30 - 5 = 65
        assert_eq!(
            ReadingRecord::new(99.0, 120.0, -3.0, 40.0, 0).assess_quality(),
            Quality::Fair
        );
        assert_eq!(
            ReadingRecord::new(25.0, 60.0, f32::INFINITY, 40.0, 0).assess_quality(),
            Quality::Unknown
        );
    }

    #[test]
    fn feature_vector_reports_missing() {
        let fv = FeatureVector::complete([20.0, 50.0, 40.0, 30.0], 7).without(Metric::Humidity);
        assert_eq!(fv.require(Metric::Temperature), Ok(20.0));
        assert_eq!(fv.require_all(), Err(Error::MissingFeature(Metric::Humidity)));
        assert_eq!(fv.present().count(), 3);
    }

    #[test]
    fn per_actuator_indexing() {
        let mut p = PerActuator::from_fn(|a| a.name().len());
        assert_eq!(*p.get(Actuator::GrowLight), 10);
        *p.get_mut(Actuator::Fan) = 0;
        let doubled = p.map(|_, v| v * 2);
        assert_eq!(doubled.pump, 8);
        assert_eq!(doubled.fan, 0);
        assert_eq!(p.iter().count(), 3);
    }
}
