//! Bounded per-metric history for online retraining.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::reading::{FeatureVector, Metric};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HistoryPoint {
    pub timestamp_ms: u64,
    pub value: f32,
}

/// FIFO of at most `capacity` points; the oldest is evicted on overflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryBuffer {
    capacity: usize,
    points: VecDeque<HistoryPoint>,
}

impl HistoryBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            points: VecDeque::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, point: HistoryPoint) {
        if self.capacity == 0 {
            return;
        }
        if self.points.len() == self.capacity {
            self.points.pop_front();
        }
        self.points.push_back(point);
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn iter(&self) -> impl Iterator<Item = &HistoryPoint> {
        self.points.iter()
    }

    pub fn latest(&self) -> Option<&HistoryPoint> {
        self.points.back()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryBuffers {
    buffers: [HistoryBuffer; 4],
}

impl HistoryBuffers {
    pub fn new(capacity: usize) -> Self {
        Self {
            buffers: core::array::from_fn(|_| HistoryBuffer::new(capacity)),
        }
    }

    /// Append one point per present metric, stamped with `timestamp_ms`.
    pub fn record(&mut self, timestamp_ms: u64, reading: &FeatureVector) {
        for (metric, value) in reading.present() {
            self.buffers[metric.index()].push(HistoryPoint {
                timestamp_ms,
                value,
            });
        }
    }

    pub fn get(&self, metric: Metric) -> &HistoryBuffer {
        &self.buffers[metric.index()]
    }

    /// Length of the fullest buffer.
    pub fn deepest(&self) -> usize {
        self.buffers.iter().map(HistoryBuffer::len).max().unwrap_or(0)
    }

    pub fn newest_timestamp(&self) -> Option<u64> {
        self.buffers
            .iter()
            .filter_map(|b| b.latest().map(|p| p.timestamp_ms))
            .max()
    }
}
