//! Folds raw telemetry samples into a [`ContentSignals`] snapshot.
//!
//! Each log is a [`TimeWindow`] pruned on append, so memory stays bounded by
//! the sampling rate times the window span.

use crate::core::signals::ContentSignals;
use crate::core::windowing::TimeWindow;
use crate::telemetry::types::{KeySample, PointerSample, ScrollSample, TelemetrySample};
use chrono::{DateTime, Duration, Utc};

/// Span of the keystroke log used for the backspace ratio.
const KEY_WINDOW_MS: i64 = 10_000;

/// Span of the pointer log used for jitter.
const POINTER_WINDOW_MS: i64 = 2_000;

/// Span of the scroll log used for velocity.
const SCROLL_WINDOW_MS: i64 = 1_000;

/// A key within this span means the user is typing.
const TYPING_RECENT_MS: i64 = 2_000;

/// A scroll within this span means the user is scrolling.
const SCROLLING_RECENT_MS: i64 = 1_500;

/// Below this many keys the backspace ratio is not meaningful.
const MIN_KEYS_FOR_RATIO: usize = 5;

/// Samples stamped further than this past the recording time are dropped.
const CLOCK_SKEW_MS: i64 = 1_000;

/// Pointer movements smaller than this do not count toward direction changes.
const POINTER_DEADZONE: f64 = 1.0;

/// Tracks recent keystrokes, pointer moves and scrolls.
#[derive(Debug, Clone)]
pub struct ContentSignalTracker {
    keys: TimeWindow<bool>,
    pointer: TimeWindow<(f64, f64)>,
    scroll: TimeWindow<f64>,
}

impl Default for ContentSignalTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl ContentSignalTracker {
    pub fn new() -> Self {
        Self {
            keys: TimeWindow::new(Duration::milliseconds(KEY_WINDOW_MS)),
            pointer: TimeWindow::new(Duration::milliseconds(POINTER_WINDOW_MS)),
            scroll: TimeWindow::new(Duration::milliseconds(SCROLL_WINDOW_MS)),
        }
    }

    /// Record one sample received at `now`.
    ///
    /// Samples stamped in the future are dropped; a single one would otherwise
    /// hold every later entry at its timestamp.
    pub fn record(&mut self, sample: TelemetrySample, now: DateTime<Utc>) {
        if sample.timestamp() > now + Duration::milliseconds(CLOCK_SKEW_MS) {
            tracing::debug!(timestamp = %sample.timestamp(), "dropping sample from the future");
            return;
        }
        match sample {
            TelemetrySample::Key(s) => self.record_key(s),
            TelemetrySample::Pointer(s) => self.record_pointer(s),
            TelemetrySample::Scroll(s) => self.record_scroll(s),
        }
    }

    fn record_key(&mut self, sample: KeySample) {
        self.keys.push(sample.timestamp, sample.is_backspace);
    }

    fn record_pointer(&mut self, sample: PointerSample) {
        if sample.dx.is_finite() && sample.dy.is_finite() {
            self.pointer.push(sample.timestamp, (sample.dx, sample.dy));
        }
    }

    fn record_scroll(&mut self, sample: ScrollSample) {
        if sample.delta.is_finite() {
            self.scroll.push(sample.timestamp, sample.delta);
        }
    }

    /// Compute the snapshot as of `now`.
    pub fn snapshot(&self, now: DateTime<Utc>) -> ContentSignals {
        ContentSignals {
            backspace_ratio: self.backspace_ratio(now),
            mouse_jitter: self.jitter(now),
            scroll_velocity: self.scroll_velocity(now),
            is_typing_recently: recent(self.keys.latest(), now, TYPING_RECENT_MS),
            is_scrolling_recently: recent(self.scroll.latest(), now, SCROLLING_RECENT_MS),
        }
    }

    pub fn clear(&mut self) {
        self.keys.clear();
        self.pointer.clear();
        self.scroll.clear();
    }

    fn backspace_ratio(&self, now: DateTime<Utc>) -> f64 {
        let (total, backspaces) = self
            .keys
            .recent(now)
            .fold((0usize, 0usize), |(t, b), (_, is_bs)| {
                (t + 1, b + usize::from(*is_bs))
            });
        if total < MIN_KEYS_FOR_RATIO {
            return 0.0;
        }
        backspaces as f64 / total as f64
    }

    /// Direction reversals per second.
    fn jitter(&self, now: DateTime<Utc>) -> f64 {
        let moves: Vec<(f64, f64)> = self
            .pointer
            .recent(now)
            .map(|(_, d)| *d)
            .filter(|(dx, dy)| dx.abs() >= POINTER_DEADZONE || dy.abs() >= POINTER_DEADZONE)
            .collect();

        let reversals = moves
            .windows(2)
            .filter(|pair| {
                let (ax, ay) = pair[0];
                let (bx, by) = pair[1];
                flips(ax, bx) || flips(ay, by)
            })
            .count();

        reversals as f64 / (POINTER_WINDOW_MS as f64 / 1000.0)
    }

    fn scroll_velocity(&self, now: DateTime<Utc>) -> f64 {
        let distance: f64 = self.scroll.recent(now).map(|(_, d)| d.abs()).sum();
        distance / (SCROLL_WINDOW_MS as f64 / 1000.0)
    }
}

fn flips(a: f64, b: f64) -> bool {
    (a >= POINTER_DEADZONE && b <= -POINTER_DEADZONE)
        || (a <= -POINTER_DEADZONE && b >= POINTER_DEADZONE)
}

fn recent(latest: Option<DateTime<Utc>>, now: DateTime<Utc>, span_ms: i64) -> bool {
    latest
        .map(|ts| {
            let age = now - ts;
            age >= Duration::zero() && age <= Duration::milliseconds(span_ms)
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t0() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-01-22T10:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn at(ms: i64) -> DateTime<Utc> {
        t0() + Duration::milliseconds(ms)
    }

    #[test]
    fn test_backspace_ratio() {
        let mut tracker = ContentSignalTracker::new();
        for i in 0..8 {
            tracker.record_key(KeySample {
                timestamp: at(i * 100),
                is_backspace: i % 4 == 0,
            });
        }
        let signals = tracker.snapshot(at(1_000));
        assert!((signals.backspace_ratio - 0.25).abs() < 1e-9);
        assert!(signals.is_typing_recently);
    }

    #[test]
    fn test_few_keys_give_zero_ratio() {
        let mut tracker = ContentSignalTracker::new();
        tracker.record_key(KeySample {
            timestamp: at(0),
            is_backspace: true,
        });
        assert_eq!(tracker.snapshot(at(100)).backspace_ratio, 0.0);
    }

    #[test]
    fn test_typing_goes_stale() {
        let mut tracker = ContentSignalTracker::new();
        tracker.record_key(KeySample {
            timestamp: at(0),
            is_backspace: false,
        });
        assert!(!tracker.snapshot(at(2_500)).is_typing_recently);
    }

    #[test]
    fn test_future_sample_is_dropped() {
        let mut tracker = ContentSignalTracker::new();
        let key = |timestamp, is_backspace| {
            TelemetrySample::Key(KeySample {
                timestamp,
                is_backspace,
            })
        };

        tracker.record(key(at(3_600_000), true), at(0));
        for i in 0..10 {
            tracker.record(key(at(i * 100), false), at(i * 100));
        }

        let now = tracker.snapshot(at(1_000));
        assert_eq!(now.backspace_ratio, 0.0);
        assert!(now.is_typing_recently);

        let later = tracker.snapshot(at(1_800_000));
        assert!(!later.is_typing_recently);
        assert_eq!(later.backspace_ratio, 0.0);
    }

    #[test]
    fn test_small_clock_skew_is_kept() {
        let mut tracker = ContentSignalTracker::new();
        let scroll = TelemetrySample::Scroll(ScrollSample {
            timestamp: at(500),
            delta: 200.0,
        });
        tracker.record(scroll, at(0));
        assert!(tracker.snapshot(at(600)).is_scrolling_recently);
    }

    #[test]
    fn test_jitter_counts_reversals() {
        let mut tracker = ContentSignalTracker::new();
        for i in 0..13 {
            let dx = if i % 2 == 0 { 10.0 } else { -10.0 };
            tracker.record_pointer(PointerSample {
                timestamp: at(i * 100),
                dx,
                dy: 0.0,
            });
        }
        // 12 reversals over a 2s window
        let signals = tracker.snapshot(at(1_300));
        assert!((signals.mouse_jitter - 6.0).abs() < 1e-9);
    }

    #[test]
    fn test_smooth_motion_has_no_jitter() {
        let mut tracker = ContentSignalTracker::new();
        for i in 0..10 {
            tracker.record_pointer(PointerSample {
                timestamp: at(i * 100),
                dx: 5.0,
                dy: 2.0,
            });
        }
        assert_eq!(tracker.snapshot(at(1_000)).mouse_jitter, 0.0);
    }

    #[test]
    fn test_scroll_velocity() {
        let mut tracker = ContentSignalTracker::new();
        tracker.record_scroll(ScrollSample {
            timestamp: at(100),
            delta: 300.0,
        });
        tracker.record_scroll(ScrollSample {
            timestamp: at(500),
            delta: -400.0,
        });
        let signals = tracker.snapshot(at(900));
        assert!((signals.scroll_velocity - 700.0).abs() < 1e-9);
        assert!(signals.is_scrolling_recently);

        let later = tracker.snapshot(at(3_000));
        assert_eq!(later.scroll_velocity, 0.0);
        assert!(!later.is_scrolling_recently);
    }
}
