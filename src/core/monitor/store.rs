use std::collections::VecDeque;

use super::reading::Reading;

pub const DEFAULT_MAX_READINGS: usize = 500;

/// Bounded ring of readings, oldest evicted first
#[derive(Debug, Clone)]
pub struct SampleStore {
    capacity: usize,
    readings: VecDeque<Reading>,
}

impl SampleStore {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_MAX_READINGS)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            readings: VecDeque::with_capacity(capacity),
        }
    }

    pub fn record(&mut self, reading: Reading) {
        self.readings.push_back(reading);
        while self.readings.len() > self.capacity {
            self.readings.pop_front();
        }
    }

    /// Last `n` readings, most recent first
    pub fn recent(&self, n: usize) -> Vec<Reading> {
        self.readings.iter().rev().take(n).cloned().collect()
    }

    pub fn count(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Full history in chronological order (oldest first)
    pub fn export_all(&self) -> Vec<Reading> {
        self.readings.iter().cloned().collect()
    }

    pub fn clear(&mut self) {
        self.readings.clear();
    }
}

impl Default for SampleStore {
    fn default() -> Self {
        Self::new()
    }
}
