//! Application core: pure domain orchestration, zero I/O.
//!
//! Wires the classifiers, forecaster, anomaly detector, safety validator
//! and actuation state machine into a single-worker service.  All
//! interaction with hardware and storage happens through **port traits**
//! defined in [`ports`], keeping this layer fully testable without real
//! peripherals.

pub mod commands;
pub mod events;
pub mod ports;
pub mod service;
pub mod session;
