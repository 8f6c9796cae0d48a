//! Versioned snapshot envelope for trained models.
//!
//! ```text
//!  0      4     5      6        8            12           44
//!  ┌──────┬─────┬──────┬────────┬────────────┬────────────┬─────────┐
//!  │ PCSN │kind │flags │version │payload_len │ sha256(32) │ payload │
//!  └──────┴─────┴──────┴────────┴────────────┴────────────┴─────────┘
//! ```
//!
//! The payload is the postcard encoding of the engine's snapshot struct,
//! DEFLATE-compressed when [`FLAG_COMPRESSED`] is set.  The digest covers
//! the payload bytes exactly as stored, so corruption is caught before
//! inflation or decoding is attempted.  Integers are little-endian.

pub mod compress;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::SnapshotError;

pub const MAGIC: [u8; 4] = *b"PCSN";

/// Current schema version.  Bump on any change to a snapshot struct.
pub const SCHEMA_VERSION: u16 = 1;

pub const FLAG_COMPRESSED: u8 = 0b0000_0001;

pub const HEADER_LEN: usize = 44;

/// Which engine a blob belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SnapshotKind {
    ActuatorEnsemble = 1,
    TrendForecaster = 2,
}

impl SnapshotKind {
    /// Storage key used by the service when persisting this kind.
    pub const fn key(self) -> &'static str {
        match self {
            Self::ActuatorEnsemble => "actuator_models",
            Self::TrendForecaster => "trend_models",
        }
    }
}

/// Serialize `value` into a self-describing envelope.
pub fn encode<T: Serialize>(kind: SnapshotKind, value: &T) -> Result<Vec<u8>, SnapshotError> {
    let raw = postcard::to_allocvec(value)?;
    let (flags, payload) = match compress::compress(&raw) {
        Some(c) => (FLAG_COMPRESSED, c),
        None => (0, raw),
    };
    let len = u32::try_from(payload.len()).map_err(|_| SnapshotError::Codec)?;

    let mut out = Vec::with_capacity(HEADER_LEN + payload.len());
    out.extend_from_slice(&MAGIC);
    out.push(kind as u8);
    out.push(flags);
    out.extend_from_slice(&SCHEMA_VERSION.to_le_bytes());
    out.extend_from_slice(&len.to_le_bytes());
    out.extend_from_slice(&hmac_sha256::Hash::hash(&payload));
    out.extend_from_slice(&payload);
    Ok(out)
}

/// Verify and decode an envelope produced by [`encode`].
pub fn decode<T: DeserializeOwned>(kind: SnapshotKind, blob: &[u8]) -> Result<T, SnapshotError> {
    if blob.len() < HEADER_LEN {
        return Err(SnapshotError::Truncated);
    }
    if blob[0..4] != MAGIC {
        return Err(SnapshotError::BadMagic);
    }
    if blob[4] != kind as u8 {
        return Err(SnapshotError::KindMismatch {
            expected: kind as u8,
            found: blob[4],
        });
    }
    let flags = blob[5];
    let version = u16::from_le_bytes([blob[6], blob[7]]);
    if version != SCHEMA_VERSION {
        return Err(SnapshotError::VersionMismatch(version));
    }
    let len = u32::from_le_bytes([blob[8], blob[9], blob[10], blob[11]]) as usize;
    let payload = blob
        .get(HEADER_LEN..)
        .filter(|p| p.len() == len)
        .ok_or(SnapshotError::Truncated)?;
    if hmac_sha256::Hash::hash(payload) != blob[12..HEADER_LEN] {
        return Err(SnapshotError::DigestMismatch);
    }

    if flags & FLAG_COMPRESSED != 0 {
        let raw = compress::decompress(payload).ok_or(SnapshotError::Decompress)?;
        Ok(postcard::from_bytes(&raw)?)
    } else {
        Ok(postcard::from_bytes(payload)?)
    }
}
