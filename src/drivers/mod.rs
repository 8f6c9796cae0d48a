//! Actuator drivers.

pub mod relay;

pub use relay::{RelayBank, SimPin, sim_bank};
