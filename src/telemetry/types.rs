//! Privacy-preserving telemetry samples sent by the browser extension.
//!
//! These types capture ONLY timing and magnitude information - never content or coordinates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A keystroke sample.
///
/// Privacy guarantee: only whether the key was a backspace is recorded, never
/// which key was pressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeySample {
    /// Timestamp when the key was pressed
    pub timestamp: DateTime<Utc>,
    /// Whether the key was a backspace or delete
    pub is_backspace: bool,
}

/// A pointer movement sample.
///
/// Privacy guarantee: only relative deltas are recorded, never absolute
/// cursor positions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointerSample {
    pub timestamp: DateTime<Utc>,
    pub dx: f64,
    pub dy: f64,
}

/// A scroll sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScrollSample {
    pub timestamp: DateTime<Utc>,
    /// Pixels scrolled (sign gives direction)
    pub delta: f64,
}

/// Unified sample type, tagged by `kind` on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TelemetrySample {
    Key(KeySample),
    Pointer(PointerSample),
    Scroll(ScrollSample),
}

impl TelemetrySample {
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            TelemetrySample::Key(s) => s.timestamp,
            TelemetrySample::Pointer(s) => s.timestamp,
            TelemetrySample::Scroll(s) => s.timestamp,
        }
    }
}
