//! Session state, split into a durable and a transient tier.
//!
//! | field | tier |
//! |---|---|
//! | enabled, mode, stats, custom domain lists | durable |
//! | tab-switch window, idle tracking, display score, decay clock | transient |
//! | content signals, telemetry logs, confirmation window, gate | transient |
//! | tab registry, active/distraction tab, categories, dwell timer | transient |
//!
//! The durable tier is loaded from the store at construction and written back
//! through `Effect::PersistState`. The transient tier starts from zero on every
//! process start and whenever the engine is re-enabled.

use crate::core::classifier::ActivityVerdict;
use crate::core::confirmation::ConfirmationWindow;
use crate::core::decay::ScoreDecay;
use crate::core::domain::{DomainCategory, DomainLists};
use crate::core::dwell::DwellTracker;
use crate::core::hysteresis::HysteresisGate;
use crate::core::mode::{FocusMode, ModeTable};
use crate::core::signals::{ContentSignals, IdleTracker, SignalEvaluation};
use crate::core::windowing::TimeWindow;
use crate::engine::command::{IdleState, TabId};
use crate::storage::{PersistedState, Stats};
use crate::telemetry::ContentSignalTracker;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;

/// Engine tuning that does not change while running.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub tab_switch_window: Duration,
    pub dwell_threshold: Duration,
    pub decay_half_life: Duration,
    pub confirmation_cycles: usize,
    pub modes: ModeTable,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            tab_switch_window: Duration::seconds(60),
            dwell_threshold: Duration::seconds(30),
            decay_half_life: Duration::seconds(30),
            confirmation_cycles: 2,
            modes: ModeTable::default(),
        }
    }
}

impl From<&crate::config::Config> for EngineSettings {
    fn from(config: &crate::config::Config) -> Self {
        let to_chrono = |d: std::time::Duration| {
            Duration::milliseconds(d.as_millis().min(i64::MAX as u128) as i64)
        };
        Self {
            tab_switch_window: to_chrono(config.tab_switch_window),
            dwell_threshold: to_chrono(config.dwell_threshold),
            decay_half_life: to_chrono(config.decay_half_life),
            confirmation_cycles: config.confirmation_cycles,
            modes: config.modes.clone(),
        }
    }
}

/// Survives restarts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DurableState {
    pub enabled: bool,
    pub mode: FocusMode,
    pub stats: Stats,
    pub domains: DomainLists,
}

impl DurableState {
    /// Build from persisted keys, resetting stats from a previous day.
    pub fn from_persisted(persisted: PersistedState, now: DateTime<Utc>) -> Self {
        let mut stats = persisted.stats;
        stats.roll_over(now);
        Self {
            enabled: persisted.enabled,
            mode: persisted.focus_mode,
            stats,
            domains: DomainLists::from_custom(
                persisted.custom_productive,
                persisted.custom_distraction,
            ),
        }
    }

    pub fn to_persisted(&self) -> PersistedState {
        PersistedState {
            enabled: self.enabled,
            focus_mode: self.mode,
            stats: self.stats.clone(),
            custom_productive: self.domains.custom_productive.iter().cloned().collect(),
            custom_distraction: self.domains.custom_distraction.iter().cloned().collect(),
        }
    }
}

/// Rebuilt from zero on every start.
#[derive(Debug, Clone)]
pub struct TransientState {
    pub tab_switches: TimeWindow,
    pub idle: IdleTracker,
    pub idle_state: IdleState,
    /// Display score in [0, 10]
    pub score: f64,
    pub decay: ScoreDecay,
    pub content: ContentSignals,
    pub telemetry: ContentSignalTracker,
    /// Content signals are derived from raw samples rather than reported
    pub streaming_samples: bool,
    pub confirmation: ConfirmationWindow,
    pub gate: HysteresisGate,
    pub dwell: DwellTracker,
    /// Last known URL of every open tab
    pub tabs: HashMap<TabId, String>,
    pub active_tab: Option<TabId>,
    /// Tab most recently classified as a distraction
    pub distraction_tab: Option<TabId>,
    pub previous_category: Option<DomainCategory>,
    pub current_category: Option<DomainCategory>,
    pub last_verdict: Option<ActivityVerdict>,
    pub last_evaluation: SignalEvaluation,
}

impl TransientState {
    pub fn new(settings: &EngineSettings) -> Self {
        Self {
            tab_switches: TimeWindow::new(settings.tab_switch_window),
            idle: IdleTracker::default(),
            idle_state: IdleState::Active,
            score: 0.0,
            decay: ScoreDecay::new(settings.decay_half_life),
            content: ContentSignals::default(),
            telemetry: ContentSignalTracker::new(),
            streaming_samples: false,
            confirmation: ConfirmationWindow::new(settings.confirmation_cycles),
            gate: HysteresisGate::new(),
            dwell: DwellTracker::new(settings.dwell_threshold),
            tabs: HashMap::new(),
            active_tab: None,
            distraction_tab: None,
            previous_category: None,
            current_category: None,
            last_verdict: None,
            last_evaluation: SignalEvaluation::default(),
        }
    }

    pub fn category(&self) -> DomainCategory {
        self.current_category.unwrap_or_default()
    }
}

/// The single mutable aggregate owned by the controller.
#[derive(Debug, Clone)]
pub struct SessionState {
    pub durable: DurableState,
    pub transient: TransientState,
}

impl SessionState {
    pub fn new(settings: &EngineSettings, persisted: PersistedState, now: DateTime<Utc>) -> Self {
        Self {
            durable: DurableState::from_persisted(persisted, now),
            transient: TransientState::new(settings),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_durable_state_keeps_persisted_keys() {
        let persisted = PersistedState {
            enabled: false,
            focus_mode: FocusMode::Study,
            custom_productive: vec!["https://www.example.com/".to_string()],
            ..Default::default()
        };
        let durable = DurableState::from_persisted(persisted, Utc::now());
        assert!(!durable.enabled);
        assert_eq!(durable.mode, FocusMode::Study);
        assert!(durable.domains.custom_productive.contains("example.com"));

        let back = durable.to_persisted();
        assert_eq!(back.custom_productive, vec!["example.com".to_string()]);
    }

    #[test]
    fn test_stale_stats_roll_over_on_load() {
        let now = Utc::now();
        let mut persisted = PersistedState::default();
        persisted.stats = Stats::fresh(now - Duration::days(3));
        persisted.stats.distractions_detected = 9;

        let durable = DurableState::from_persisted(persisted, now);
        assert_eq!(durable.stats.distractions_detected, 0);
    }

    #[test]
    fn test_transient_tier_starts_cold() {
        let transient = TransientState::new(&EngineSettings::default());
        assert_eq!(transient.score, 0.0);
        assert!(transient.confirmation.is_empty());
        assert!(!transient.gate.is_distracted());
        assert_eq!(transient.category(), DomainCategory::Unknown);
    }
}
