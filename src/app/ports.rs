//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ AppService (domain)
//! ```
//!
//! Driven adapters (relays, event sinks, snapshot storage, clocks)
//! implement these traits.  The [`AppService`](super::service::AppService)
//! consumes them via generics at call sites, so the domain core never
//! touches hardware or files directly.

use crate::error::{ActuatorError, StorageError};
use crate::reading::Actuator;

// ───────────────────────────────────────────────────────────────
// Actuator port (driven adapter: domain → hardware)
// ───────────────────────────────────────────────────────────────

/// Write-side port: the domain calls this to switch a relay.
pub trait ActuatorPort {
    /// Energise (`true`) or release (`false`) one actuator.
    fn set(&mut self, actuator: Actuator, on: bool) -> Result<(), ActuatorError>;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.  Adapters decide where they go (log, bus, dashboard).
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Snapshot store port (driven adapter: domain ↔ persistent blobs)
// ───────────────────────────────────────────────────────────────

/// Persistent blob storage for model snapshots.
///
/// Write operations MUST be atomic: a reader sees either the previous
/// blob or the new one, never a partial write.
pub trait SnapshotStore {
    /// Read the blob stored under `key`.
    fn read(&self, key: &str) -> Result<Vec<u8>, StorageError>;

    /// Replace the blob stored under `key`.
    fn write(&mut self, key: &str, data: &[u8]) -> Result<(), StorageError>;
}

// ───────────────────────────────────────────────────────────────
// Clock port
// ───────────────────────────────────────────────────────────────

/// Wall-clock source for the driver loop.  The service itself takes
/// `now_ms` explicitly so tests can run on simulated time.
pub trait Clock {
    /// Milliseconds since the Unix epoch.
    fn now_ms(&self) -> u64;
}
