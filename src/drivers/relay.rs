//! Relay bank driver.
//!
//! Three digital outputs, one per actuator, driven through
//! `embedded_hal::digital::OutputPin` so any HAL's GPIO type plugs in.
//!
//! ## Safety contract
//!
//! This driver is a dumb actuator.  Whitelisting, duration caps, rate
//! limits and interlocks are enforced upstream by the safety validator.

use embedded_hal::digital::{ErrorType, OutputPin};
use log::{debug, warn};

use crate::app::ports::ActuatorPort;
use crate::error::ActuatorError;
use crate::pins;
use crate::reading::{Actuator, PerActuator};

pub struct RelayBank<P: OutputPin> {
    pins: PerActuator<P>,
    active_high: bool,
    /// Last level successfully written, per relay.
    energised: PerActuator<bool>,
}

impl<P: OutputPin> RelayBank<P> {
    /// Wrap three output pins.  All relays are driven to the released
    /// level immediately; a failure there is returned.
    pub fn new(pins: PerActuator<P>, active_high: bool) -> Result<Self, ActuatorError> {
        let mut bank = Self {
            pins,
            active_high,
            energised: PerActuator::default(),
        };
        for actuator in Actuator::ALL {
            bank.drive(actuator, false)?;
        }
        Ok(bank)
    }

    pub fn is_energised(&self, actuator: Actuator) -> bool {
        *self.energised.get(actuator)
    }

    pub fn pin_mut(&mut self, actuator: Actuator) -> &mut P {
        self.pins.get_mut(actuator)
    }

    fn drive(&mut self, actuator: Actuator, on: bool) -> Result<(), ActuatorError> {
        let high = on == self.active_high;
        let pin = self.pins.get_mut(actuator);
        let result = if high { pin.set_high() } else { pin.set_low() };
        match result {
            Ok(()) => {
                *self.energised.get_mut(actuator) = on;
                debug!(
                    "GPIO{} {} ({})",
                    pins::relay_gpio(actuator),
                    if high { "HIGH" } else { "LOW" },
                    actuator.name()
                );
                Ok(())
            }
            Err(_) => {
                warn!("GPIO{} write failed ({})", pins::relay_gpio(actuator), actuator.name());
                Err(ActuatorError::GpioWriteFailed(actuator))
            }
        }
    }
}

impl<P: OutputPin> ActuatorPort for RelayBank<P> {
    fn set(&mut self, actuator: Actuator, on: bool) -> Result<(), ActuatorError> {
        self.drive(actuator, on)
    }
}

// ---------------------------------------------------------------------------
// Host pin
// ---------------------------------------------------------------------------

/// In-memory output pin for host simulation.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SimPin {
    pub high: bool,
}

impl ErrorType for SimPin {
    type Error = core::convert::Infallible;
}

impl OutputPin for SimPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.high = false;
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.high = true;
        Ok(())
    }
}

/// An active-high bank of [`SimPin`]s, all released.
pub fn sim_bank() -> RelayBank<SimPin> {
    RelayBank {
        pins: PerActuator::default(),
        active_high: true,
        energised: PerActuator::default(),
    }
}
