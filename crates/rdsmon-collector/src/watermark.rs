//! Per-caller high-water marks.
//!
//! Each caller (remote address) keeps its own position in each stream, so two
//! scrapers polling the same exporter both see every event once.

use dashmap::DashMap;

/// Last consumed event timestamp per (caller, stream). Marks only move
/// forward and are never evicted.
#[derive(Debug, Default)]
pub struct HighWaterMarks {
    marks: DashMap<(String, String), i64>,
}

impl HighWaterMarks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, caller: &str, stream: &str) -> Option<i64> {
        self.marks
            .get(&(caller.to_string(), stream.to_string()))
            .map(|entry| *entry)
    }

    /// Raise the mark to `timestamp_ms` if it is newer. Returns the mark
    /// after the update.
    pub fn advance(&self, caller: &str, stream: &str, timestamp_ms: i64) -> i64 {
        let mut entry = self
            .marks
            .entry((caller.to_string(), stream.to_string()))
            .or_insert(timestamp_ms);
        if timestamp_ms > *entry {
            *entry = timestamp_ms;
        }
        *entry
    }

    pub fn len(&self) -> usize {
        self.marks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.marks.is_empty()
    }
}
