//! Threshold rules with hysteresis.
//!
//! Each actuator switches ON past one threshold and OFF only past a second
//! one on the far side, so a reading hovering near a single limit does not
//! toggle the relay every cycle.

use super::{CommandSource, PlannedCommand};
use crate::config::HysteresisRules;
use crate::reading::{Actuator, FeatureVector, Metric, PerActuator};
use crate::safety::Action;

/// `Some(true)` to switch ON, `Some(false)` to switch OFF, `None` to hold.
fn band(on_if: bool, off_if: bool, currently_on: bool) -> Option<bool> {
    match (currently_on, on_if, off_if) {
        (false, true, _) => Some(true),
        (true, _, true) => Some(false),
        _ => None,
    }
}

pub fn rule_commands(
    rules: &HysteresisRules,
    reading: &FeatureVector,
    state: &PerActuator<bool>,
    pump_duration_secs: u32,
) -> Vec<PlannedCommand> {
    let mut out = Vec::new();
    let mut push = |actuator: Actuator, on: bool| {
        out.push(PlannedCommand {
            actuator,
            action: if on { Action::On } else { Action::Off },
            duration_secs: if on && actuator == Actuator::Pump {
                pump_duration_secs
            } else {
                0
            },
            source: CommandSource::Hysteresis,
        });
    };

    if let Some(soil) = reading.get(Metric::SoilMoisture) {
        if let Some(on) = band(
            soil < rules.pump_on_below_soil,
            soil > rules.pump_off_above_soil,
            state.pump,
        ) {
            push(Actuator::Pump, on);
        }
    }
    if let Some(temp) = reading.get(Metric::Temperature) {
        if let Some(on) = band(
            temp > rules.fan_on_above_temp,
            temp < rules.fan_off_below_temp,
            state.fan,
        ) {
            push(Actuator::Fan, on);
        }
    }
    if let Some(light) = reading.get(Metric::LightIntensity) {
        if let Some(on) = band(
            light < rules.light_on_below,
            light > rules.light_off_above,
            state.grow_light,
        ) {
            push(Actuator::GrowLight, on);
        }
    }
    out
}
