//! Mock adapters for integration tests.
//!
//! Records every relay write so tests can assert on the full command
//! history, and can be told to fail writes for chosen actuators.

use plantcore::app::events::AppEvent;
use plantcore::app::ports::{ActuatorPort, EventSink};
use plantcore::error::ActuatorError;
use plantcore::reading::{Actuator, PerActuator};

// ── MockHardware ──────────────────────────────────────────────

#[derive(Default)]
pub struct MockHardware {
    pub calls: Vec<(Actuator, bool)>,
    pub relays: PerActuator<bool>,
    pub failing: PerActuator<bool>,
}

#[allow(dead_code)]
impl MockHardware {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail(&mut self, actuator: Actuator) {
        *self.failing.get_mut(actuator) = true;
    }

    pub fn is_on(&self, actuator: Actuator) -> bool {
        *self.relays.get(actuator)
    }

    pub fn writes_to(&self, actuator: Actuator) -> usize {
        self.calls.iter().filter(|(a, _)| *a == actuator).count()
    }
}

impl ActuatorPort for MockHardware {
    fn set(&mut self, actuator: Actuator, on: bool) -> Result<(), ActuatorError> {
        self.calls.push((actuator, on));
        if *self.failing.get(actuator) {
            return Err(ActuatorError::GpioWriteFailed(actuator));
        }
        *self.relays.get_mut(actuator) = on;
        Ok(())
    }
}

// ── RecordingSink ─────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<AppEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, pred: impl Fn(&AppEvent) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}
