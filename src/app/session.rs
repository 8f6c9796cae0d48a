//! Per-process session state: the latest accepted reading and forecast.
//!
//! Owned by the service and mutated only by
//! [`AppService::handle_reading`](super::service::AppService::handle_reading).

use crate::forecast::Forecast;
use crate::reading::{FeatureVector, ReadingRecord};

#[derive(Debug, Default)]
pub struct Session {
    latest: Option<ReadingRecord>,
    last_forecast: Option<Forecast>,
    accepted: u64,
    rejected: u64,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn accept(&mut self, reading: ReadingRecord) {
        self.latest = Some(reading);
        self.accepted += 1;
    }

    pub(crate) fn reject(&mut self) {
        self.rejected += 1;
    }

    pub(crate) fn set_forecast(&mut self, forecast: Forecast) {
        self.last_forecast = Some(forecast);
    }

    pub fn latest(&self) -> Option<&ReadingRecord> {
        self.latest.as_ref()
    }

    /// Latest reading as model input; empty if none yet.
    pub fn latest_features(&self) -> FeatureVector {
        self.latest
            .as_ref()
            .map_or_else(|| FeatureVector::empty(0), FeatureVector::from)
    }

    pub fn last_forecast(&self) -> Option<&Forecast> {
        self.last_forecast.as_ref()
    }

    pub fn accepted(&self) -> u64 {
        self.accepted
    }

    pub fn rejected(&self) -> u64 {
        self.rejected
    }
}
