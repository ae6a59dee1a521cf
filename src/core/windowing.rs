//! Time-bounded sliding windows.
//!
//! Timestamps are appended in order and evicted lazily once they fall behind
//! the cutoff, giving O(1) amortized appends and bulk eviction.

use chrono::{DateTime, Duration, Utc};
use std::collections::VecDeque;

/// A monotonic deque of timestamped entries covering a trailing time span.
#[derive(Debug, Clone)]
pub struct TimeWindow<T = ()> {
    /// Span of time kept in the window
    span: Duration,
    /// Entries ordered by timestamp
    entries: VecDeque<(DateTime<Utc>, T)>,
}

impl<T> TimeWindow<T> {
    /// Create an empty window covering the given span.
    pub fn new(span: Duration) -> Self {
        Self {
            span,
            entries: VecDeque::new(),
        }
    }

    /// Span of time this window keeps.
    pub fn span(&self) -> Duration {
        self.span
    }

    /// Append an entry and evict anything older than the cutoff.
    ///
    /// An entry stamped before the newest one is clamped to it so the deque
    /// stays ordered.
    pub fn push(&mut self, timestamp: DateTime<Utc>, value: T) {
        let timestamp = match self.entries.back() {
            Some((last, _)) if *last > timestamp => *last,
            _ => timestamp,
        };
        self.entries.push_back((timestamp, value));
        self.prune(timestamp);
    }

    /// Drop entries that are not newer than `now - span`.
    pub fn prune(&mut self, now: DateTime<Utc>) {
        let cutoff = now - self.span;
        while let Some((ts, _)) = self.entries.front() {
            if *ts <= cutoff {
                self.entries.pop_front();
            } else {
                break;
            }
        }
    }

    /// Number of entries newer than `now - span`.
    pub fn count_since(&self, now: DateTime<Utc>) -> usize {
        let cutoff = now - self.span;
        self.entries.iter().rev().take_while(|(ts, _)| *ts > cutoff).count()
    }

    /// Iterate entries newer than `now - span`, oldest first.
    pub fn recent(&self, now: DateTime<Utc>) -> impl Iterator<Item = &(DateTime<Utc>, T)> {
        let cutoff = now - self.span;
        self.entries.iter().filter(move |(ts, _)| *ts > cutoff)
    }

    /// Timestamp of the newest entry.
    pub fn latest(&self) -> Option<DateTime<Utc>> {
        self.entries.back().map(|(ts, _)| *ts)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl TimeWindow<()> {
    /// Record a bare timestamp.
    pub fn record(&mut self, timestamp: DateTime<Utc>) {
        self.push(timestamp, ());
    }
}
