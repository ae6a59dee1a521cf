//! End-to-end engine tests driving the controller with explicit timestamps.

use chrono::{DateTime, Duration, Utc};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use synheart_focus_agent::core::{
    decay_score, Classification, ContentSignals, DomainCategory, DomainLists, FocusMode, ModeTable,
    TransitionCause,
};
use synheart_focus_agent::engine::{
    Command, Controller, Effect, EngineSettings, HostEvent, IdleState, Message, TabId,
};
use synheart_focus_agent::storage::{PersistedState, Stats};

fn t0() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2024-01-22T10:00:00Z")
        .unwrap()
        .with_timezone(&Utc)
}

fn at(secs: i64) -> DateTime<Utc> {
    t0() + Duration::seconds(secs)
}

fn controller() -> Controller {
    let persisted = PersistedState {
        stats: Stats::fresh(t0()),
        ..Default::default()
    };
    Controller::new(EngineSettings::default(), persisted, t0())
}

fn activate(tab_id: TabId, url: &str) -> Command {
    HostEvent::TabActivated {
        tab_id,
        url: Some(url.to_string()),
    }
    .into()
}

fn navigate(tab_id: TabId, url: &str) -> Command {
    HostEvent::TabUpdated {
        tab_id,
        url: Some(url.to_string()),
        status: Some("complete".to_string()),
    }
    .into()
}

fn idle(state: IdleState) -> Command {
    HostEvent::IdleStateChanged { state }.into()
}

fn content(backspace_ratio: f64, mouse_jitter: f64) -> Command {
    Message::ContentSignals(ContentSignals {
        backspace_ratio,
        mouse_jitter,
        ..Default::default()
    })
    .into()
}

fn interventions(effects: &[Effect]) -> Vec<(TabId, TransitionCause)> {
    effects
        .iter()
        .filter_map(|e| match e {
            Effect::TriggerIntervention { tab_id, cause, .. } => Some((*tab_id, *cause)),
            _ => None,
        })
        .collect()
}

fn last_classification(c: &Controller) -> Option<Classification> {
    c.state().transient.last_verdict.map(|v| v.classification)
}

/// Three switches between unknown pages, then idle from `idle_at`.
fn restless_on_unknown_pages(c: &mut Controller, idle_at: i64) {
    c.handle(activate(1, "https://example.com/a"), at(0));
    c.handle(activate(2, "https://example.org/b"), at(1));
    c.handle(activate(1, "https://example.com/a"), at(2));
    c.handle(activate(2, "https://example.org/b"), at(3));
    c.handle(idle(IdleState::Idle), at(idle_at));
}

#[test]
fn idle_and_tab_switching_confirm_drift_after_two_cycles() {
    let mut c = controller();
    restless_on_unknown_pages(&mut c, 5);

    let first = c.handle(Command::ScoringTick, at(25));
    let verdict = c.state().transient.last_verdict.unwrap();
    assert_eq!(verdict.classification, Classification::Distracted);
    assert_eq!(verdict.active_count, 2);
    assert!(interventions(&first).is_empty());
    assert!(!c.is_distracted());

    let second = c.handle(Command::ScoringTick, at(30));
    assert!(c.is_distracted());
    assert_eq!(c.durable().stats.distractions_detected, 1);
    assert_eq!(interventions(&second), vec![(2, TransitionCause::Confirmed)]);
    assert!(second.iter().any(|e| matches!(e, Effect::PersistState(_))));

    // Staying distracted does not fire again
    let third = c.handle(Command::ScoringTick, at(35));
    assert!(interventions(&third).is_empty());
    assert_eq!(c.durable().stats.distractions_detected, 1);
}

#[test]
fn productive_domain_forces_focused() {
    let mut c = controller();
    restless_on_unknown_pages(&mut c, 5);
    c.handle(content(0.0, 8.0), at(6));

    c.handle(Command::ScoringTick, at(25));
    assert_eq!(last_classification(&c), Some(Classification::Distracted));

    c.handle(navigate(2, "https://www.coursera.org/learn/ml"), at(27));
    assert_eq!(c.state().transient.category(), DomainCategory::Productive);

    let effects = c.handle(Command::ScoringTick, at(30));
    let verdict = c.state().transient.last_verdict.unwrap();
    assert_eq!(verdict.classification, Classification::Focused);
    assert_eq!(verdict.rule, "safe_zone");
    assert!(verdict.active_count >= 2);
    assert!(interventions(&effects).is_empty());
    assert!(!c.is_distracted());

    c.handle(Command::ScoringTick, at(35));
    assert!(!c.is_distracted());
    assert_eq!(c.durable().stats.distractions_detected, 0);
}

#[test]
fn dwell_on_distraction_page_overrides_confirmation() {
    let mut c = controller();
    c.handle(navigate(7, "https://example.com"), at(0));
    c.handle(navigate(7, "https://www.youtube.com/watch?v=abc"), at(1));
    assert!(!c.is_distracted());
    assert!(c.state().transient.confirmation.is_empty());

    let effects = c.handle(Command::ScoringTick, at(32));
    assert!(c.is_distracted());
    assert_eq!(interventions(&effects), vec![(7, TransitionCause::Dwell)]);
    assert_eq!(c.durable().stats.distractions_detected, 1);
}

#[test]
fn dwell_does_not_fire_before_threshold() {
    let mut c = controller();
    c.handle(navigate(7, "https://example.com"), at(0));
    c.handle(navigate(7, "https://reddit.com"), at(1));
    c.handle(Command::ScoringTick, at(30));
    // One DISTRACTED label is not a confirmation, and 29s is not a dwell
    assert!(!c.is_distracted());
}

#[test]
fn leaving_distraction_page_resets_dwell() {
    let mut c = controller();
    c.handle(navigate(7, "https://example.com"), at(0));
    c.handle(navigate(7, "https://reddit.com"), at(1));
    c.handle(navigate(7, "https://example.com"), at(20));
    c.handle(navigate(7, "https://reddit.com"), at(21));
    assert_eq!(c.state().transient.dwell.dwell_start(), Some(at(21)));
    let metrics = c.metrics(at(40));
    assert_eq!(metrics.dwell_seconds, Some(19));
}

#[test]
fn productive_to_distraction_edge_fires_once() {
    let mut c = controller();
    c.handle(navigate(3, "https://github.com"), at(0));
    let effects = c.handle(navigate(3, "https://twitter.com/home"), at(2));
    assert_eq!(interventions(&effects), vec![(3, TransitionCause::Edge)]);

    let later = c.handle(Command::ScoringTick, at(40));
    assert!(interventions(&later).is_empty());
    assert_eq!(c.durable().stats.distractions_detected, 1);
}

#[test]
fn display_score_halves_every_half_life() {
    let mut c = controller();
    restless_on_unknown_pages(&mut c, 5);
    c.handle(content(0.5, 9.0), at(6));
    c.handle(Command::ScoringTick, at(25));
    assert_eq!(c.metrics(at(25)).score, 10.0);

    c.handle(Command::DecayTick, at(25));
    c.handle(Command::DecayTick, at(55));
    assert_eq!(c.metrics(at(55)).score, 5.0);

    assert_eq!(
        decay_score(10.0, Duration::milliseconds(30_000), Duration::milliseconds(30_000)),
        5.0
    );
}

#[test]
fn recovery_needs_consecutive_calm_cycles() {
    let mut c = controller();
    restless_on_unknown_pages(&mut c, 5);
    c.handle(Command::ScoringTick, at(25));
    c.handle(Command::ScoringTick, at(30));
    assert!(c.is_distracted());

    c.handle(idle(IdleState::Active), at(31));
    // Switches are still inside the trailing minute: one signal, UNCERTAIN
    c.handle(Command::ScoringTick, at(35));
    assert_eq!(last_classification(&c), Some(Classification::Uncertain));
    assert!(c.is_distracted());

    // Switches have left the window: FOCUSED, and [UNCERTAIN, FOCUSED] recovers
    c.handle(Command::ScoringTick, at(70));
    assert_eq!(last_classification(&c), Some(Classification::Focused));
    assert!(!c.is_distracted());
    assert_eq!(c.durable().stats.total_idle_seconds, 26);
}

#[test]
fn mode_change_applies_new_thresholds() {
    let mut c = controller();
    c.handle(Message::SetMode { mode: FocusMode::Casual }.into(), at(0));
    restless_on_unknown_pages(&mut c, 5);

    // Casual needs 60s idle and 6 switches
    c.handle(Command::ScoringTick, at(25));
    c.handle(Command::ScoringTick, at(30));
    assert!(!c.is_distracted());
    assert_eq!(c.metrics(at(30)).tab_switch_limit, 6);
}

#[test]
fn disabled_engine_ignores_host_events() {
    let mut c = controller();
    c.handle(Message::SetEnabled { enabled: false }.into(), at(0));
    c.handle(navigate(1, "https://github.com"), at(1));
    let effects = c.handle(navigate(1, "https://reddit.com"), at(2));
    assert!(effects.is_empty());
    assert!(c.state().transient.tabs.is_empty());
}

#[test]
fn uncertain_counts_as_not_distracted_for_recovery() {
    let mut c = controller();
    c.handle(navigate(1, "https://example.com"), at(0));
    for (i, distracted) in [true, true, false, false].iter().enumerate() {
        let signals = if *distracted { content(0.5, 9.0) } else { content(0.5, 0.0) };
        c.handle(signals, at(i as i64 * 5));
        c.handle(Command::ScoringTick, at(i as i64 * 5 + 1));
    }
    assert_eq!(last_classification(&c), Some(Classification::Uncertain));
    assert!(!c.is_distracted());
}

// ----------------------------------------------------------------------
// Properties
// ----------------------------------------------------------------------

proptest! {
    #[test]
    fn recovery_threshold_below_drift_threshold(
        mode in prop::sample::select(FocusMode::ALL.to_vec())
    ) {
        let thresholds = ModeTable::default().get(mode);
        prop_assert!(thresholds.recovery_signals < thresholds.drift_signals);
    }

    #[test]
    fn domain_classification_is_total(url in ".{0,64}") {
        let lists = DomainLists::default();
        let first = lists.classify(&url);
        prop_assert_eq!(first, lists.classify(&url));
    }

    #[test]
    fn custom_lists_override_builtins(
        host in prop::sample::select(vec!["github.com", "reddit.com", "youtube.com", "docs.rs"])
    ) {
        let lists = DomainLists::from_custom(Vec::new(), vec![host.to_string()]);
        prop_assert_eq!(lists.classify(&format!("https://{host}/x")), DomainCategory::Distraction);

        let lists = DomainLists::from_custom(vec![host.to_string()], Vec::new());
        prop_assert_eq!(lists.classify(&format!("https://{host}/x")), DomainCategory::Productive);
    }

    #[test]
    fn decay_is_non_increasing_and_non_negative(
        score in 0.0f64..=10.0,
        a in 0i64..600_000,
        b in 0i64..600_000,
    ) {
        let half_life = Duration::milliseconds(30_000);
        let (short, long) = (a.min(b), a.max(b));
        let s = decay_score(score, Duration::milliseconds(short), half_life);
        let l = decay_score(score, Duration::milliseconds(long), half_life);
        prop_assert!(l >= 0.0);
        prop_assert!(l <= s);
        prop_assert!(s <= score);
    }

    #[test]
    fn distraction_state_never_flaps(labels in prop::collection::vec(any::<bool>(), 1..40)) {
        let mut c = controller();
        c.handle(navigate(1, "https://example.com"), at(0));

        let mut history = Vec::new();
        for (i, distracted) in labels.iter().enumerate() {
            let now = at(1 + i as i64 * 5);
            let signals = if *distracted { content(0.5, 9.0) } else { content(0.0, 0.0) };
            c.handle(signals, now);

            let before = c.is_distracted();
            c.handle(Command::ScoringTick, now);
            let after = c.is_distracted();

            let label = last_classification(&c).map(|l| l.is_distracted());
            prop_assert_eq!(label, Some(*distracted));
            history.push(*distracted);

            if before != after {
                let n = history.len();
                prop_assert!(n >= 2);
                prop_assert!(history[n - 2..].iter().all(|d| *d == after));
            }
        }
    }
}
