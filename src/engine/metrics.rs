//! Metrics snapshot broadcast to observers.

use crate::core::classifier::Classification;
use crate::core::domain::DomainCategory;
use crate::core::mode::FocusMode;
use crate::core::signals::RawSignals;
use crate::engine::command::IdleState;
use crate::storage::Stats;
use serde::{Deserialize, Serialize};

/// Point-in-time view of the engine for the popup and other observers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    /// Display score (0-10), decays over time
    pub score: f64,
    pub is_distracted: bool,
    pub active_signal_count: usize,
    /// Label from the latest scoring cycle
    pub classification: Option<Classification>,
    pub signals: RawSignals,
    pub tab_switches: usize,
    pub tab_switch_limit: usize,
    pub idle_state: IdleState,
    pub idle_seconds: u64,
    pub idle_threshold: u64,
    pub backspace_ratio: f64,
    pub jitter_score: f64,
    pub category: DomainCategory,
    /// Seconds on the current distraction page, if any
    pub dwell_seconds: Option<i64>,
    pub mode: FocusMode,
    pub enabled: bool,
    pub stats: Stats,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_snapshot_keys() {
        let snapshot = MetricsSnapshot {
            score: 5.0,
            is_distracted: true,
            active_signal_count: 2,
            classification: Some(Classification::Distracted),
            signals: RawSignals {
                idle: true,
                tab_switch: true,
                ..Default::default()
            },
            tab_switches: 3,
            tab_switch_limit: 2,
            idle_state: IdleState::Idle,
            idle_seconds: 20,
            idle_threshold: 15,
            backspace_ratio: 0.0,
            jitter_score: 0.0,
            category: DomainCategory::Unknown,
            dwell_seconds: None,
            mode: FocusMode::DeepWork,
            enabled: true,
            stats: Stats::fresh(Utc::now()),
        };
        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["isDistracted"], true);
        assert_eq!(json["classification"], "DISTRACTED");
        assert_eq!(json["signals"]["tabSwitch"], true);
        assert_eq!(json["mode"], "deep-work");
        assert_eq!(json["idleState"], "idle");
    }
}
