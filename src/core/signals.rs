//! Signal evaluation.
//!
//! Turns raw telemetry and mode thresholds into boolean drift signals and a
//! bounded display score. The display score is cosmetic; classification only
//! consumes the boolean flags.

use crate::core::mode::ModeThresholds;
use crate::core::windowing::TimeWindow;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Backspace ratio above which the backspace signal fires.
pub const BACKSPACE_RATIO_THRESHOLD: f64 = 0.25;

/// Mouse jitter score above which the jitter signal fires.
pub const JITTER_THRESHOLD: f64 = 5.0;

/// Upper bound of the display score.
pub const MAX_SCORE: f64 = 10.0;

/// Display score contribution of each signal.
pub const WEIGHT_IDLE: f64 = 2.0;
pub const WEIGHT_TAB_SWITCH: f64 = 3.0;
pub const WEIGHT_BACKSPACE: f64 = 2.0;
pub const WEIGHT_JITTER: f64 = 3.0;

/// Latest content-script snapshot for the active page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentSignals {
    /// Fraction of recent keystrokes that were backspaces (0-1)
    pub backspace_ratio: f64,
    /// Pointer direction reversals per second
    pub mouse_jitter: f64,
    /// Scroll speed in px/s
    pub scroll_velocity: f64,
    pub is_typing_recently: bool,
    pub is_scrolling_recently: bool,
}

impl ContentSignals {
    /// Replace non-finite or negative readings with zero.
    pub fn sanitized(self) -> Self {
        fn clean(v: f64) -> f64 {
            if v.is_finite() && v > 0.0 {
                v
            } else {
                0.0
            }
        }
        Self {
            backspace_ratio: clean(self.backspace_ratio).min(1.0),
            mouse_jitter: clean(self.mouse_jitter),
            scroll_velocity: clean(self.scroll_velocity),
            ..self
        }
    }
}

/// Boolean drift signals for one cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSignals {
    pub idle: bool,
    pub tab_switch: bool,
    pub backspace: bool,
    pub jitter: bool,
}

impl RawSignals {
    /// Number of signals currently true.
    pub fn count(&self) -> usize {
        [self.idle, self.tab_switch, self.backspace, self.jitter]
            .iter()
            .filter(|s| **s)
            .count()
    }

    /// Weighted display score, capped at [`MAX_SCORE`].
    pub fn display_score(&self) -> f64 {
        let mut score = 0.0;
        if self.idle {
            score += WEIGHT_IDLE;
        }
        if self.tab_switch {
            score += WEIGHT_TAB_SWITCH;
        }
        if self.backspace {
            score += WEIGHT_BACKSPACE;
        }
        if self.jitter {
            score += WEIGHT_JITTER;
        }
        f64::min(score, MAX_SCORE)
    }
}

/// Idle tracking reported by the host.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IdleTracker {
    /// When the current idle stretch began, if idle
    pub idle_since: Option<DateTime<Utc>>,
}

impl IdleTracker {
    pub fn is_idle(&self) -> bool {
        self.idle_since.is_some()
    }

    /// Whole seconds idle as of `now`, zero when active.
    pub fn idle_secs(&self, now: DateTime<Utc>) -> u64 {
        self.idle_since
            .map(|since| (now - since).num_seconds().max(0) as u64)
            .unwrap_or(0)
    }
}

/// Everything the evaluator computed for one cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignalEvaluation {
    pub signals: RawSignals,
    pub recent_switches: usize,
    pub idle_secs: u64,
    pub display_score: f64,
}

/// Evaluate drift signals against mode thresholds.
pub fn evaluate_signals(
    tab_switches: &TimeWindow,
    idle: &IdleTracker,
    content: &ContentSignals,
    thresholds: &ModeThresholds,
    now: DateTime<Utc>,
) -> SignalEvaluation {
    let recent_switches = tab_switches.count_since(now);
    let idle_secs = idle.idle_secs(now);

    let signals = RawSignals {
        idle: idle.is_idle() && idle_secs >= thresholds.idle_secs,
        tab_switch: recent_switches >= thresholds.tab_switch_per_min,
        backspace: content.backspace_ratio > BACKSPACE_RATIO_THRESHOLD,
        jitter: content.mouse_jitter > JITTER_THRESHOLD,
    };

    SignalEvaluation {
        signals,
        recent_switches,
        idle_secs,
        display_score: signals.display_score(),
    }
}
