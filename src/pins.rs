//! GPIO pin assignments for the relay board.
//!
//! Single source of truth: the relay driver references this module rather
//! than hard-coding pin numbers.

use crate::reading::Actuator;

// ---------------------------------------------------------------------------
// Relay outputs (active HIGH)
// ---------------------------------------------------------------------------

/// Water pump relay.
pub const PUMP_RELAY_GPIO: u8 = 5;
/// Ventilation fan relay.
pub const FAN_RELAY_GPIO: u8 = 18;
/// Grow light relay.
pub const GROW_LIGHT_RELAY_GPIO: u8 = 19;

pub const fn relay_gpio(actuator: Actuator) -> u8 {
    match actuator {
        Actuator::Pump => PUMP_RELAY_GPIO,
        Actuator::Fan => FAN_RELAY_GPIO,
        Actuator::GrowLight => GROW_LIGHT_RELAY_GPIO,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relay_pins_are_distinct() {
        let pins = Actuator::ALL.map(relay_gpio);
        assert_eq!(pins, [5, 18, 19]);
    }
}
