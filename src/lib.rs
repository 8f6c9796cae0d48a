//! Plantcore library.
//!
//! Predictive control core for a smart plant-care controller: per-actuator
//! random-forest classifiers, polynomial trend forecasting, anomaly
//! detection, command safety validation and timed actuation.  Everything
//! is host-testable; hardware and storage sit behind the port traits in
//! [`app::ports`].

#![deny(unused_must_use)]

pub mod adapters;
pub mod analytics;
pub mod anomaly;
pub mod app;
pub mod config;
pub mod control;
pub mod decision;
pub mod drivers;
pub mod error;
pub mod forecast;
pub mod fsm;
pub mod pins;
pub mod reading;
pub mod safety;
pub mod sim;
pub mod snapshot;
