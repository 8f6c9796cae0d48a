//! Unified error types for the plant control core.
//!
//! A single `Error` enum that every subsystem converts into, keeping the
//! service layer's error handling uniform.  Safety rejections are *not*
//! errors: they are a structured negative outcome, see
//! [`SafetyRejection`](crate::safety::SafetyRejection).

use core::fmt;

use crate::reading::{Actuator, Metric};

// ---------------------------------------------------------------------------
// Top-level core error
// ---------------------------------------------------------------------------

/// Every fallible operation in the core funnels into this type.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// A predict call was missing a required feature.
    MissingFeature(Metric),
    /// A reading failed boundary range validation.
    InvalidReading { metric: Metric, value: f32 },
    /// Inference requested before training or snapshot load.
    Untrained,
    /// Training or retraining requested with too few samples.
    InsufficientData { required: usize, available: usize },
    /// Another training run already holds the model set.
    TrainingInProgress,
    /// Forecast horizon outside `(0, max]` hours.
    InvalidHorizon { requested: f32, max: f32 },
    /// Configuration is invalid.
    InvalidConfig(&'static str),
    /// Snapshot encoding or decoding failed.
    Snapshot(SnapshotError),
    /// Snapshot storage backend failed.
    Storage(StorageError),
    /// An actuator command failed at the hardware port.
    Actuator(ActuatorError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingFeature(m) => write!(f, "validation: missing feature '{}'", m.name()),
            Self::InvalidReading { metric, value } => {
                write!(f, "validation: {} = {value} out of range", metric.name())
            }
            Self::Untrained => write!(f, "model not trained"),
            Self::InsufficientData {
                required,
                available,
            } => write!(
                f,
                "insufficient data: need {required} samples, have {available}"
            ),
            Self::TrainingInProgress => write!(f, "training already in progress"),
            Self::InvalidHorizon { requested, max } => {
                write!(f, "invalid horizon: {requested}h (max {max}h)")
            }
            Self::InvalidConfig(msg) => write!(f, "config: {msg}"),
            Self::Snapshot(e) => write!(f, "snapshot: {e}"),
            Self::Storage(e) => write!(f, "storage: {e}"),
            Self::Actuator(e) => write!(f, "actuator: {e}"),
        }
    }
}

impl std::error::Error for Error {}

// ---------------------------------------------------------------------------
// Actuator errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActuatorError {
    /// GPIO set failed.
    GpioWriteFailed(Actuator),
}

impl fmt::Display for ActuatorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GpioWriteFailed(a) => write!(f, "{} GPIO write failed", a.name()),
        }
    }
}

impl From<ActuatorError> for Error {
    fn from(e: ActuatorError) -> Self {
        Self::Actuator(e)
    }
}

/// Every actuator that failed during an emergency all-off.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmergencyStopError {
    pub failures: Vec<ActuatorError>,
}

impl fmt::Display for EmergencyStopError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "emergency stop: {} actuator(s) failed", self.failures.len())?;
        for e in &self.failures {
            write!(f, "; {e}")?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Snapshot errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotError {
    /// Blob shorter than its header or declared payload.
    Truncated,
    /// Header magic does not match.
    BadMagic,
    /// Blob holds a different model kind.
    KindMismatch { expected: u8, found: u8 },
    /// Schema version not understood by this build.
    VersionMismatch(u16),
    /// Stored digest does not match the payload.
    DigestMismatch,
    /// DEFLATE payload could not be inflated.
    Decompress,
    /// postcard encode/decode failed.
    Codec,
    /// Feature or target names differ from this build's.
    NameMismatch,
}

impl fmt::Display for SnapshotError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Truncated => write!(f, "truncated blob"),
            Self::BadMagic => write!(f, "bad magic"),
            Self::KindMismatch { expected, found } => {
                write!(f, "kind mismatch: expected {expected}, found {found}")
            }
            Self::VersionMismatch(v) => write!(f, "unsupported schema version {v}"),
            Self::DigestMismatch => write!(f, "digest mismatch"),
            Self::Decompress => write!(f, "decompression failed"),
            Self::Codec => write!(f, "codec error"),
            Self::NameMismatch => write!(f, "feature/target names do not match"),
        }
    }
}

impl From<SnapshotError> for Error {
    fn from(e: SnapshotError) -> Self {
        Self::Snapshot(e)
    }
}

impl From<postcard::Error> for SnapshotError {
    fn from(_: postcard::Error) -> Self {
        Self::Codec
    }
}

// ---------------------------------------------------------------------------
// Storage errors
// ---------------------------------------------------------------------------

/// Errors from [`SnapshotStore`](crate::app::ports::SnapshotStore) operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    /// Requested key does not exist.
    NotFound,
    /// Generic I/O error.
    IoError,
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "key not found"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl From<StorageError> for Error {
    fn from(e: StorageError) -> Self {
        Self::Storage(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
