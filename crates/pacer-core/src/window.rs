use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Range {
    pub from: u64,
    pub to: u64,
}

impl Range {
    pub fn contains(&self, ts: u64) -> bool {
        self.from <= ts && ts <= self.to
    }
}

#[derive(Debug, Clone)]
pub struct WindowTracker {
    interval_ms: u64,
    ranges: VecDeque<Range>,
}

impl WindowTracker {
    pub fn new(interval_ms: u64) -> Self {
        Self {
            interval_ms,
            ranges: VecDeque::new(),
        }
    }

    pub fn is_expired(&self, now: u64) -> bool {
        match self.ranges.back() {
            Some(latest) => latest.to < now,
            None => false,
        }
    }

    pub fn clear(&mut self) {
        self.ranges.clear();
    }

    pub fn open_next(&mut self, now: u64) -> Range {
        let from = match self.ranges.back() {
            Some(prev) => prev.to.saturating_add(1),
            None => now,
        };
        let range = Range {
            from,
            to: from.saturating_add(self.interval_ms),
        };
        self.ranges.push_back(range);
        debug!(from, to = range.to, pending = self.ranges.len(), "window opened");
        range
    }

    /// Drops the oldest window once its batch has drained. The last window
    /// is kept: the next batch chains its `from` off it.
    pub fn retire_oldest(&mut self) {
        if self.ranges.len() > 1 {
            self.ranges.pop_front();
        }
    }

    pub fn latest(&self) -> Option<Range> {
        self.ranges.back().copied()
    }

    pub fn ranges(&self) -> Vec<Range> {
        self.ranges.iter().copied().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }
}
