//! Auto-control planner.

use log::{debug, info};

use super::rules::rule_commands;
use super::{CommandSource, PlannedCommand};
use crate::config::AutoControlConfig;
use crate::decision::Decision;
use crate::forecast::{Forecast, ForecastMode};
use crate::reading::{Actuator, FeatureVector, Metric, PerActuator};
use crate::safety::Action;

pub struct AutoController {
    config: AutoControlConfig,
}

impl AutoController {
    pub fn new(config: AutoControlConfig) -> Self {
        Self { config }
    }

    pub fn enabled(&self) -> bool {
        self.config.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.config.enabled = enabled;
    }

    /// Commands for this cycle, given the current ON/OFF state.
    ///
    /// With classifier decisions available, only those at or above the
    /// confidence floor that would change an actuator's state are planned.
    /// Without them the hysteresis rules decide.  A trained forecast that
    /// dips below the watering threshold adds a pump ON on top.
    pub fn plan(
        &self,
        reading: &FeatureVector,
        decisions: Option<&PerActuator<Decision>>,
        forecast: Option<&Forecast>,
        state: &PerActuator<bool>,
    ) -> Vec<PlannedCommand> {
        if !self.config.enabled {
            return Vec::new();
        }

        let mut planned = match decisions {
            Some(d) => self.from_decisions(d, state),
            None => rule_commands(&self.config.rules, reading, state, self.config.pump_duration_secs),
        };

        let pump_on_planned = planned
            .iter()
            .any(|c| c.actuator == Actuator::Pump && c.action == Action::On);
        if !state.pump && !pump_on_planned {
            if let Some(min) = forecast.and_then(|f| self.preventive_dip(f)) {
                info!(
                    "Preventive watering: soil forecast to reach {:.1}%",
                    min
                );
                planned.push(PlannedCommand {
                    actuator: Actuator::Pump,
                    action: Action::On,
                    duration_secs: self.config.pump_duration_secs,
                    source: CommandSource::PreventiveWatering { forecast_min: min },
                });
            }
        }
        planned
    }

    fn from_decisions(
        &self,
        decisions: &PerActuator<Decision>,
        state: &PerActuator<bool>,
    ) -> Vec<PlannedCommand> {
        decisions
            .iter()
            .filter_map(|(actuator, d)| {
                if d.confidence < self.config.min_confidence {
                    debug!(
                        "{}: confidence {:.2} below floor, holding",
                        actuator.name(),
                        d.confidence
                    );
                    return None;
                }
                if d.on == *state.get(actuator) {
                    return None;
                }
                let duration_secs = if d.on && actuator == Actuator::Pump {
                    self.config.pump_duration_secs
                } else {
                    0
                };
                Some(PlannedCommand {
                    actuator,
                    action: if d.on { Action::On } else { Action::Off },
                    duration_secs,
                    source: CommandSource::Classifier {
                        confidence: d.confidence,
                    },
                })
            })
            .collect()
    }

    /// Lowest forecast soil moisture if a trained forecast goes below the
    /// threshold.  Fallback forecasts never trigger watering.
    fn preventive_dip(&self, forecast: &Forecast) -> Option<f32> {
        if forecast.mode != ForecastMode::Trained {
            return None;
        }
        forecast
            .min_value(Metric::SoilMoisture)
            .filter(|&m| m < self.config.preventive_soil_threshold)
    }
}
