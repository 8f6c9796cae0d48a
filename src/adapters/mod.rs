//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter     | Implements     | Connects to                |
//! |-------------|----------------|----------------------------|
//! | `log_sink`  | EventSink      | `log` facade               |
//! | `store`     | SnapshotStore  | Snapshot directory / memory|
//! | `time`      | Clock          | Host clock / manual clock  |
//!
//! The relay bank (`ActuatorPort`) lives in [`crate::drivers`].

pub mod log_sink;
pub mod store;
pub mod time;
