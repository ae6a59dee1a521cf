//! Daily focus statistics.

use chrono::{DateTime, Local, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Counters persisted across restarts, reset at the start of each local day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    /// Local day these counters belong to (YYYY-MM-DD)
    pub date: String,
    /// Confirmed drifts, dwell overrides and edge triggers
    pub distractions_detected: u64,
    /// Break sessions started from the overlay
    pub reset_sessions: u64,
    /// Seconds spent idle
    pub total_idle_seconds: u64,
}

impl Stats {
    /// Fresh counters for the day containing `now`.
    pub fn fresh(now: DateTime<Utc>) -> Self {
        Self {
            date: day_stamp(now),
            distractions_detected: 0,
            reset_sessions: 0,
            total_idle_seconds: 0,
        }
    }

    /// Reset the counters if they belong to a different day.
    ///
    /// Returns true when a reset happened.
    pub fn roll_over(&mut self, now: DateTime<Utc>) -> bool {
        let today = day_stamp(now);
        if self.date == today {
            return false;
        }
        *self = Self::fresh(now);
        true
    }

    /// Get a summary string for display.
    pub fn summary(&self) -> String {
        format!(
            "Focus Statistics ({}):\n\
             - Distractions detected: {}\n\
             - Reset sessions: {}\n\
             - Idle time: {} seconds",
            self.date, self.distractions_detected, self.reset_sessions, self.total_idle_seconds
        )
    }
}

impl Default for Stats {
    fn default() -> Self {
        Self::fresh(Utc::now())
    }
}

/// Local calendar day of a timestamp.
pub fn day_stamp(now: DateTime<Utc>) -> String {
    local_day(now).format("%Y-%m-%d").to_string()
}

fn local_day(now: DateTime<Utc>) -> NaiveDate {
    now.with_timezone(&Local).date_naive()
}
