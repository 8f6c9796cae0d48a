//! Snapshot payload compression using DEFLATE via `miniz_oxide`.
//!
//! Applied selectively: only payloads above a size threshold are
//! compressed, and only when the result is actually smaller.  Tree
//! ensembles compress well; a freshly-constructed, empty forecaster does not.

use log::warn;
use miniz_oxide::deflate::compress_to_vec;
use miniz_oxide::inflate::decompress_to_vec_with_limit;

/// Minimum payload size worth compressing.
const COMPRESS_THRESHOLD: usize = 128;

/// DEFLATE compression level (1-10).
const COMPRESSION_LEVEL: u8 = 6;

/// Inflated payloads larger than this are treated as corrupt.
pub const MAX_INFLATED_LEN: usize = 64 * 1024 * 1024;

/// Returns `Some(compressed)` if compression shrinks the payload.
pub fn compress(input: &[u8]) -> Option<Vec<u8>> {
    if input.len() < COMPRESS_THRESHOLD {
        return None;
    }
    let compressed = compress_to_vec(input, COMPRESSION_LEVEL);
    (compressed.len() < input.len()).then_some(compressed)
}

/// Inflate a payload, or `None` if the stream is invalid or oversized.
pub fn decompress(input: &[u8]) -> Option<Vec<u8>> {
    match decompress_to_vec_with_limit(input, MAX_INFLATED_LEN) {
        Ok(data) => Some(data),
        Err(e) => {
            warn!("snapshot: DEFLATE error: {:?}", e.status);
            None
        }
    }
}
