//! Dwell override.
//!
//! Escalates on sustained time spent on a distraction page, independently of
//! the classifier and confirmation window. Also detects the direct
//! productive-to-distraction edge.

use crate::core::domain::DomainCategory;
use chrono::{DateTime, Duration, Utc};

/// Default time on a distraction page before the override fires.
pub const DEFAULT_DWELL_THRESHOLD_SECS: i64 = 30;

/// Tracks how long the current tab has been on a distraction page.
#[derive(Debug, Clone)]
pub struct DwellTracker {
    threshold: Duration,
    /// When the current tab's category last became DISTRACTION
    dwell_start: Option<DateTime<Utc>>,
    /// Category from the previous observation
    last_category: Option<DomainCategory>,
}

/// What a category observation implies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DwellObservation {
    /// Category flipped PRODUCTIVE -> DISTRACTION in one step
    pub edge: bool,
    /// Category moved into DISTRACTION
    pub entered: bool,
    /// Category moved away from DISTRACTION
    pub left: bool,
}

impl DwellTracker {
    pub fn new(threshold: Duration) -> Self {
        Self {
            threshold,
            dwell_start: None,
            last_category: None,
        }
    }

    pub fn threshold(&self) -> Duration {
        self.threshold
    }

    pub fn dwell_start(&self) -> Option<DateTime<Utc>> {
        self.dwell_start
    }

    pub fn last_category(&self) -> Option<DomainCategory> {
        self.last_category
    }

    /// Record the current tab's category.
    ///
    /// Any move away from DISTRACTION resets the timer, so rapid flips through
    /// a productive page restart the dwell count.
    pub fn observe(&mut self, category: DomainCategory, now: DateTime<Utc>) -> DwellObservation {
        let previous = self.last_category.replace(category);
        let was_distraction = previous == Some(DomainCategory::Distraction);
        let is_distraction = category == DomainCategory::Distraction;

        let entered = is_distraction && !was_distraction;
        let left = was_distraction && !is_distraction;

        if entered {
            self.dwell_start = Some(now);
        } else if !is_distraction {
            self.dwell_start = None;
        }

        DwellObservation {
            edge: entered && previous == Some(DomainCategory::Productive),
            entered,
            left,
        }
    }

    /// Time spent on the current distraction page.
    pub fn elapsed(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.dwell_start.map(|start| now - start)
    }

    /// Whether the dwell threshold has been reached.
    pub fn should_escalate(&self, already_distracted: bool, now: DateTime<Utc>) -> bool {
        !already_distracted
            && self
                .elapsed(now)
                .map(|elapsed| elapsed >= self.threshold)
                .unwrap_or(false)
    }

    /// Forget all tracking.
    pub fn reset(&mut self) {
        self.dwell_start = None;
        self.last_category = None;
    }
}

impl Default for DwellTracker {
    fn default() -> Self {
        Self::new(Duration::seconds(DEFAULT_DWELL_THRESHOLD_SECS))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use DomainCategory::{Distraction, Productive, Unknown};

    fn t0() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-01-22T10:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn test_dwell_fires_at_threshold() {
        let mut dwell = DwellTracker::default();
        let obs = dwell.observe(Distraction, t0());
        assert!(obs.entered);
        assert!(!obs.edge);

        assert!(!dwell.should_escalate(false, t0() + Duration::seconds(29)));
        assert!(dwell.should_escalate(false, t0() + Duration::seconds(30)));
        assert!(!dwell.should_escalate(true, t0() + Duration::seconds(31)));
    }

    #[test]
    fn test_staying_on_distraction_keeps_start() {
        let mut dwell = DwellTracker::default();
        dwell.observe(Distraction, t0());
        dwell.observe(Distraction, t0() + Duration::seconds(10));
        assert_eq!(dwell.dwell_start(), Some(t0()));
    }

    #[test]
    fn test_leaving_resets_timer() {
        let mut dwell = DwellTracker::default();
        dwell.observe(Distraction, t0());
        let obs = dwell.observe(Productive, t0() + Duration::seconds(20));
        assert!(obs.left);
        assert_eq!(dwell.dwell_start(), None);

        let obs = dwell.observe(Distraction, t0() + Duration::seconds(25));
        assert!(obs.edge);
        assert!(!dwell.should_escalate(false, t0() + Duration::seconds(40)));
        assert!(dwell.should_escalate(false, t0() + Duration::seconds(55)));
    }

    #[test]
    fn test_edge_only_from_productive() {
        let mut dwell = DwellTracker::default();
        dwell.observe(Productive, t0());
        dwell.observe(Unknown, t0() + Duration::seconds(1));
        let obs = dwell.observe(Distraction, t0() + Duration::seconds(2));
        assert!(obs.entered);
        assert!(!obs.edge);
    }
}
