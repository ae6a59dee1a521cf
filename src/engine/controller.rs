//! The controller that owns the session state.
//!
//! All mutation goes through [`Controller::handle`]. Each call runs to
//! completion and returns the side effects the caller must perform, so the
//! engine can be driven and tested without a browser or a clock.

use crate::core::classifier::{classify_activity, ActivityContext, ActivityVerdict};
use crate::core::domain::DomainCategory;
use crate::core::hysteresis::{Transition, TransitionCause};
use crate::core::mode::ModeThresholds;
use crate::core::signals::{evaluate_signals, ContentSignals, SignalEvaluation, MAX_SCORE};
use crate::engine::command::{Command, Effect, HostEvent, IdleState, Message, TabId};
use crate::engine::metrics::MetricsSnapshot;
use crate::engine::state::{DurableState, EngineSettings, SessionState, TransientState};
use crate::error::EngineError;
use crate::intervention::is_restricted_url;
use crate::storage::PersistedState;
use crate::telemetry::TelemetrySample;
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

/// Owns the [`SessionState`] and routes every command through it.
#[derive(Debug, Clone)]
pub struct Controller {
    settings: EngineSettings,
    state: SessionState,
}

impl Controller {
    /// Create a controller from persisted state. The transient tier starts cold.
    pub fn new(settings: EngineSettings, persisted: PersistedState, now: DateTime<Utc>) -> Self {
        let state = SessionState::new(&settings, persisted, now);
        Self { settings, state }
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn durable(&self) -> &DurableState {
        &self.state.durable
    }

    pub fn is_distracted(&self) -> bool {
        self.state.transient.gate.is_distracted()
    }

    /// Thresholds of the current mode.
    pub fn thresholds(&self) -> ModeThresholds {
        self.settings.modes.get(self.state.durable.mode)
    }

    /// Apply one command and return the effects it produced.
    pub fn handle(&mut self, command: Command, now: DateTime<Utc>) -> Vec<Effect> {
        let mut effects = Vec::new();
        match command {
            Command::Message(message) => self.handle_message(message, now, &mut effects),
            _ if !self.state.durable.enabled => {
                debug!("engine disabled, command ignored");
            }
            Command::Host(event) => self.handle_host_event(event, now, &mut effects),
            Command::Telemetry(samples) => self.record_telemetry(samples, now),
            Command::ScoringTick => self.scoring_tick(now, &mut effects),
            Command::DecayTick => self.decay_tick(now, &mut effects),
        }
        effects
    }

    /// Current metrics.
    pub fn metrics(&self, now: DateTime<Utc>) -> MetricsSnapshot {
        let thresholds = self.thresholds();
        let t = &self.state.transient;
        let d = &self.state.durable;

        MetricsSnapshot {
            score: t.score,
            is_distracted: t.gate.is_distracted(),
            active_signal_count: t.last_verdict.map(|v| v.active_count).unwrap_or(0),
            classification: t.last_verdict.map(|v| v.classification),
            signals: t.last_evaluation.signals,
            tab_switches: t.tab_switches.count_since(now),
            tab_switch_limit: thresholds.tab_switch_per_min,
            idle_state: t.idle_state,
            idle_seconds: t.idle.idle_secs(now),
            idle_threshold: thresholds.idle_secs,
            backspace_ratio: t.content.backspace_ratio,
            jitter_score: t.content.mouse_jitter,
            category: t.category(),
            dwell_seconds: t.dwell.elapsed(now).map(|e| e.num_seconds()),
            mode: d.mode,
            enabled: d.enabled,
            stats: d.stats.clone(),
        }
    }

    // ------------------------------------------------------------------
    // Host events
    // ------------------------------------------------------------------

    fn handle_host_event(
        &mut self,
        event: HostEvent,
        now: DateTime<Utc>,
        effects: &mut Vec<Effect>,
    ) {
        match event {
            HostEvent::TabActivated { tab_id, url } => {
                let t = &mut self.state.transient;
                if let Some(url) = url {
                    t.tabs.insert(tab_id, url);
                }
                if t.active_tab != Some(tab_id) {
                    if t.active_tab.is_some() {
                        t.tab_switches.record(now);
                    }
                    t.active_tab = Some(tab_id);
                    // Content signals describe the page that was just left
                    t.content = ContentSignals::default();
                    t.telemetry.clear();
                }
                let category = self.category_of(tab_id);
                self.observe_category(category, now, effects);
            }
            HostEvent::TabUpdated { tab_id, url, .. } => {
                let Some(url) = url else {
                    return;
                };
                let t = &mut self.state.transient;
                t.tabs.insert(tab_id, url);
                if t.active_tab.is_none() {
                    t.active_tab = Some(tab_id);
                }
                if t.active_tab == Some(tab_id) {
                    let category = self.category_of(tab_id);
                    self.observe_category(category, now, effects);
                }
            }
            HostEvent::TabRemoved { tab_id } => {
                let t = &mut self.state.transient;
                t.tabs.remove(&tab_id);
                if t.active_tab == Some(tab_id) {
                    t.active_tab = None;
                    t.current_category = None;
                    t.dwell.reset();
                }
                if t.distraction_tab == Some(tab_id) {
                    t.distraction_tab = None;
                }
            }
            HostEvent::IdleStateChanged { state } => self.set_idle_state(state, now, effects),
        }
    }

    fn category_of(&self, tab_id: TabId) -> DomainCategory {
        self.state
            .transient
            .tabs
            .get(&tab_id)
            .map(|url| self.state.durable.domains.classify(url))
            .unwrap_or_default()
    }

    /// Record the active tab's category; may fire the productive-to-distraction edge.
    fn observe_category(
        &mut self,
        category: DomainCategory,
        now: DateTime<Utc>,
        effects: &mut Vec<Effect>,
    ) {
        let t = &mut self.state.transient;
        t.previous_category = t.current_category.replace(category);
        let observation = t.dwell.observe(category, now);
        if category == DomainCategory::Distraction {
            t.distraction_tab = t.active_tab;
        }
        if observation.entered || observation.left {
            debug!(?category, previous = ?t.previous_category, "tab category changed");
        }

        if observation.edge {
            if let Some(transition) = t.gate.force_distracted(TransitionCause::Edge) {
                self.on_drift(transition, now, effects);
            }
        }
    }

    fn set_idle_state(&mut self, state: IdleState, now: DateTime<Utc>, effects: &mut Vec<Effect>) {
        let t = &mut self.state.transient;
        t.idle_state = state;

        if state.is_idle() {
            if t.idle.idle_since.is_none() {
                t.idle.idle_since = Some(now);
            }
            return;
        }

        if let Some(since) = t.idle.idle_since.take() {
            let secs = (now - since).num_seconds().max(0) as u64;
            let d = &mut self.state.durable;
            d.stats.roll_over(now);
            d.stats.total_idle_seconds += secs;
            effects.push(Effect::PersistState(d.to_persisted()));
        }
    }

    fn record_telemetry(&mut self, samples: Vec<TelemetrySample>, now: DateTime<Utc>) {
        let t = &mut self.state.transient;
        for sample in samples {
            t.telemetry.record(sample, now);
        }
        t.content = t.telemetry.snapshot(now);
        t.streaming_samples = true;
    }

    // ------------------------------------------------------------------
    // Messages
    // ------------------------------------------------------------------

    fn handle_message(&mut self, message: Message, now: DateTime<Utc>, effects: &mut Vec<Effect>) {
        match message {
            Message::ContentSignals(content) => {
                if self.state.durable.enabled {
                    let t = &mut self.state.transient;
                    t.content = content.sanitized();
                    t.streaming_samples = false;
                }
            }
            Message::ResetSessionStarted => {
                let d = &mut self.state.durable;
                d.stats.roll_over(now);
                d.stats.reset_sessions += 1;
                effects.push(Effect::PersistState(d.to_persisted()));
                effects.push(Effect::BroadcastMetrics(self.metrics(now)));
            }
            Message::SetMode { mode } => {
                if self.state.durable.mode != mode {
                    info!(from = %self.state.durable.mode, to = %mode, "focus mode changed");
                    self.state.durable.mode = mode;
                    effects.push(Effect::PersistState(self.state.durable.to_persisted()));
                }
                effects.push(Effect::BroadcastMetrics(self.metrics(now)));
            }
            Message::SetEnabled { enabled } => {
                if self.state.durable.enabled != enabled {
                    info!(enabled, "engine toggled");
                    self.state.durable.enabled = enabled;
                    self.state.transient = TransientState::new(&self.settings);
                    effects.push(Effect::PersistState(self.state.durable.to_persisted()));
                }
                effects.push(Effect::BroadcastMetrics(self.metrics(now)));
            }
            Message::UpdateCustomDomains {
                custom_productive,
                custom_distraction,
            } => {
                self.state
                    .durable
                    .domains
                    .replace_custom(custom_productive, custom_distraction);
                effects.push(Effect::PersistState(self.state.durable.to_persisted()));

                if self.state.durable.enabled {
                    if let Some(tab_id) = self.state.transient.active_tab {
                        let category = self.category_of(tab_id);
                        self.observe_category(category, now, effects);
                    }
                }
                effects.push(Effect::BroadcastMetrics(self.metrics(now)));
            }
            Message::GetMetrics => effects.push(Effect::Respond(self.metrics(now))),
            Message::CloseTab { tab_id } => {
                let t = &self.state.transient;
                match tab_id.or(t.distraction_tab).or(t.active_tab) {
                    Some(tab_id) => effects.push(Effect::CloseTab { tab_id }),
                    None => warn!("close requested but no tab is known"),
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // Cycles
    // ------------------------------------------------------------------

    fn scoring_tick(&mut self, now: DateTime<Utc>, effects: &mut Vec<Effect>) {
        if self.state.durable.stats.roll_over(now) {
            effects.push(Effect::PersistState(self.state.durable.to_persisted()));
        }

        // Window maintenance runs even if classification fails below
        let t = &mut self.state.transient;
        t.tab_switches.prune(now);
        if t.streaming_samples {
            t.content = t.telemetry.snapshot(now);
        }

        if t.dwell.should_escalate(t.gate.is_distracted(), now) {
            if let Some(transition) = t.gate.force_distracted(TransitionCause::Dwell) {
                self.on_drift(transition, now, effects);
            }
        } else {
            match self.classify_cycle(now) {
                Ok((evaluation, verdict)) => self.apply_verdict(evaluation, verdict, now, effects),
                Err(e) => warn!(error = %e, "scoring cycle skipped"),
            }
        }

        effects.push(Effect::BroadcastMetrics(self.metrics(now)));
    }

    fn classify_cycle(
        &self,
        now: DateTime<Utc>,
    ) -> Result<(SignalEvaluation, ActivityVerdict), EngineError> {
        let t = &self.state.transient;
        check_finite("backspace_ratio", t.content.backspace_ratio)?;
        check_finite("mouse_jitter", t.content.mouse_jitter)?;
        check_finite("scroll_velocity", t.content.scroll_velocity)?;

        let thresholds = self.thresholds();
        let evaluation = evaluate_signals(&t.tab_switches, &t.idle, &t.content, &thresholds, now);
        let verdict = classify_activity(
            evaluation.signals,
            ActivityContext::from(&t.content),
            &thresholds,
            t.category(),
        );
        Ok((evaluation, verdict))
    }

    fn apply_verdict(
        &mut self,
        evaluation: SignalEvaluation,
        verdict: ActivityVerdict,
        now: DateTime<Utc>,
        effects: &mut Vec<Effect>,
    ) {
        let t = &mut self.state.transient;
        t.last_evaluation = evaluation;
        t.last_verdict = Some(verdict);
        t.score = t.score.max(evaluation.display_score).min(MAX_SCORE);

        debug!(
            classification = %verdict.classification,
            rule = verdict.rule,
            active = verdict.active_count,
            "scoring cycle"
        );

        if verdict.classification.is_distracted() {
            t.distraction_tab = t.active_tab;
        }

        t.confirmation.push(verdict.classification);
        let Some(transition) = t.gate.step(&mut t.confirmation) else {
            return;
        };

        if transition.is_drift() {
            self.on_drift(transition, now, effects);
        } else {
            info!("focus recovered");
            if t.category() != DomainCategory::Distraction {
                t.distraction_tab = None;
            }
        }
    }

    fn decay_tick(&mut self, now: DateTime<Utc>, effects: &mut Vec<Effect>) {
        let t = &mut self.state.transient;
        t.score = t.decay.apply(t.score, now);
        effects.push(Effect::BroadcastMetrics(self.metrics(now)));
    }

    /// Side effects of entering DISTRACTED, shared by every path into it.
    fn on_drift(&mut self, transition: Transition, now: DateTime<Utc>, effects: &mut Vec<Effect>) {
        let d = &mut self.state.durable;
        d.stats.roll_over(now);
        d.stats.distractions_detected += 1;
        effects.push(Effect::PersistState(d.to_persisted()));

        info!(
            cause = ?transition.cause,
            detected = d.stats.distractions_detected,
            "drift detected"
        );

        let t = &self.state.transient;
        let Some(tab_id) = t.distraction_tab.or(t.active_tab) else {
            warn!("no tab to deliver the intervention to");
            return;
        };
        match t.tabs.get(&tab_id) {
            Some(url) if !is_restricted_url(url) => effects.push(Effect::TriggerIntervention {
                tab_id,
                mode: d.mode,
                cause: transition.cause,
            }),
            Some(url) => warn!(tab_id, url = %url, "skipping intervention on restricted page"),
            None => warn!(tab_id, "skipping intervention, tab is gone"),
        }
    }
}

fn check_finite(field: &'static str, value: f64) -> Result<(), EngineError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(EngineError::InvalidSignal { field, value })
    }
}
