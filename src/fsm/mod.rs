//! Actuation state machine.
//!
//! ```text
//!            activate(d)                 activate(d')
//!   ┌─────┐ ───────────▶ ┌──────────────┐ ───┐
//!   │ OFF │              │ ON(start, d) │ ◀──┘
//!   └─────┘ ◀─────────── └──────────────┘
//!        deactivate / deactivate_all / now - start > d (d > 0)
//! ```
//!
//! The machine is the only owner of timer state.  One mutex guards the
//! whole table and is held across the hardware call, so an expiry sweep
//! and an activation are serialised and a timer that just expired can
//! never be observed as active.

pub mod timer;

use log::{error, info, warn};
use parking_lot::Mutex;

use crate::app::ports::ActuatorPort;
use crate::error::{ActuatorError, EmergencyStopError, Result};
use crate::reading::{Actuator, PerActuator};

pub use timer::{ActuatorStatus, TimerState};

/// A timed activation that the sweep switched off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpiredTimer {
    pub actuator: Actuator,
    pub ran_secs: u64,
    /// The OFF write failed; the timer is OFF regardless.
    pub hw_error: Option<ActuatorError>,
}

#[derive(Default)]
pub struct ActuationStateMachine {
    timers: Mutex<PerActuator<TimerState>>,
}

impl ActuationStateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    /// OFF or ON → ON(now, duration).  The timer only changes if the
    /// hardware accepted the write.
    pub fn activate(
        &self,
        hw: &mut impl ActuatorPort,
        actuator: Actuator,
        duration_secs: u32,
        now_ms: u64,
    ) -> Result<()> {
        let mut timers = self.timers.lock();
        hw.set(actuator, true)?;
        *timers.get_mut(actuator) = TimerState::On {
            started_at_ms: now_ms,
            duration_secs,
        };
        if duration_secs == 0 {
            info!("{} ON (indefinite)", actuator.name());
        } else {
            info!("{} ON for {}s", actuator.name(), duration_secs);
        }
        Ok(())
    }

    /// Any state → OFF.  The timer is cleared even when the hardware
    /// write fails; the failure is returned.
    pub fn deactivate(&self, hw: &mut impl ActuatorPort, actuator: Actuator) -> Result<()> {
        let mut timers = self.timers.lock();
        *timers.get_mut(actuator) = TimerState::Off;
        info!("{} OFF", actuator.name());
        hw.set(actuator, false)?;
        Ok(())
    }

    /// Switch off every timed activation whose duration has strictly
    /// elapsed.
    pub fn check_duration_expired(
        &self,
        hw: &mut impl ActuatorPort,
        now_ms: u64,
    ) -> Vec<ExpiredTimer> {
        let mut timers = self.timers.lock();
        let mut expired = Vec::new();
        for actuator in Actuator::ALL {
            let slot = timers.get_mut(actuator);
            if !slot.expired(now_ms) {
                continue;
            }
            let ran_secs = slot.status(now_ms).elapsed_secs;
            *slot = TimerState::Off;
            let hw_error = hw.set(actuator, false).err();
            match hw_error {
                None => info!("{} duration expired after {}s", actuator.name(), ran_secs),
                Some(e) => warn!("{} expired but OFF write failed: {e}", actuator.name()),
            }
            expired.push(ExpiredTimer {
                actuator,
                ran_secs,
                hw_error,
            });
        }
        expired
    }

    /// Emergency all-off.  Every actuator is attempted and left OFF; all
    /// hardware failures are reported together.
    pub fn deactivate_all(&self, hw: &mut impl ActuatorPort) -> core::result::Result<(), EmergencyStopError> {
        let mut timers = self.timers.lock();
        let mut failures = Vec::new();
        for actuator in Actuator::ALL {
            *timers.get_mut(actuator) = TimerState::Off;
            if let Err(e) = hw.set(actuator, false) {
                error!("Emergency stop: {e}");
                failures.push(e);
            }
        }
        if failures.is_empty() {
            warn!("Emergency stop: all actuators OFF");
            Ok(())
        } else {
            Err(EmergencyStopError { failures })
        }
    }

    pub fn get_status(&self, actuator: Actuator, now_ms: u64) -> ActuatorStatus {
        self.timers.lock().get(actuator).status(now_ms)
    }

    pub fn status_all(&self, now_ms: u64) -> PerActuator<ActuatorStatus> {
        self.timers.lock().map(|_, t| t.status(now_ms))
    }

    pub fn is_on(&self, actuator: Actuator) -> bool {
        self.timers.lock().get(actuator).is_on()
    }

    pub fn timer(&self, actuator: Actuator) -> TimerState {
        *self.timers.lock().get(actuator)
    }
}
