//! Async runtime around the controller.
//!
//! The [`Agent`] serializes every command through one lock, performs the
//! effects the controller returns, and runs the periodic scoring, decay and
//! store-watch tasks.

use crate::config::Config;
use crate::core::domain::DomainLists;
use crate::engine::{Command, Controller, Effect, EngineSettings, Message, MetricsSnapshot};
use crate::error::StoreError;
use crate::intervention::{FanoutSink, InterventionSink, LogSink, Outbound, QueueSink, SharedSink};
use crate::storage::{PersistedState, SharedStore};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// How often the store file is checked for changes made by the CLI.
pub const STORE_POLL_INTERVAL: Duration = Duration::from_secs(1);

const METRICS_CHANNEL_CAPACITY: usize = 16;

/// Controller plus the store contents it was last in step with.
struct Engine {
    controller: Controller,
    /// Last state written to or read from the store
    synced: PersistedState,
}

/// Shared handle to a running engine.
pub struct Agent {
    engine: Mutex<Engine>,
    store: SharedStore,
    queue: Arc<QueueSink>,
    sink: SharedSink,
    metrics_tx: broadcast::Sender<MetricsSnapshot>,
    instance_id: Uuid,
}

impl Agent {
    /// Create an agent from the durable state in `store`.
    ///
    /// Interventions always land in the polling queue; `extra_sinks` receive a
    /// copy of each one.
    pub fn new(
        settings: EngineSettings,
        store: SharedStore,
        extra_sinks: Vec<SharedSink>,
    ) -> Result<Self, StoreError> {
        let persisted = store.load()?;
        let controller = Controller::new(settings, persisted.clone(), Utc::now());

        let queue = Arc::new(QueueSink::new());
        let mut sinks: Vec<SharedSink> = vec![queue.clone(), Arc::new(LogSink)];
        sinks.extend(extra_sinks);

        let (metrics_tx, _) = broadcast::channel(METRICS_CHANNEL_CAPACITY);

        Ok(Self {
            engine: Mutex::new(Engine {
                controller,
                synced: persisted,
            }),
            store,
            queue,
            sink: Arc::new(FanoutSink::new(sinks)),
            metrics_tx,
            instance_id: Uuid::new_v4(),
        })
    }

    /// Create an agent from a loaded [`Config`].
    pub fn from_config(
        config: &Config,
        store: SharedStore,
        extra_sinks: Vec<SharedSink>,
    ) -> Result<Self, StoreError> {
        Self::new(EngineSettings::from(config), store, extra_sinks)
    }

    pub fn instance_id(&self) -> Uuid {
        self.instance_id
    }

    /// Interventions waiting for the extension to collect them.
    pub fn queue(&self) -> &QueueSink {
        &self.queue
    }

    /// Receive every metrics broadcast from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<MetricsSnapshot> {
        self.metrics_tx.subscribe()
    }

    /// Apply a command at the current time.
    ///
    /// Returns the metrics snapshot when the command asked for one.
    pub async fn dispatch(&self, command: Command) -> Option<MetricsSnapshot> {
        self.dispatch_at(command, Utc::now()).await
    }

    /// Apply a command at an explicit time.
    pub async fn dispatch_at(
        &self,
        command: Command,
        now: DateTime<Utc>,
    ) -> Option<MetricsSnapshot> {
        let mut engine = self.engine.lock().await;
        let command = match command {
            Command::Message(Message::UpdateCustomDomains {
                custom_productive: None,
                custom_distraction: None,
            }) => self.reload_domain_lists(),
            other => other,
        };

        let effects = engine.controller.handle(command, now);
        self.apply(&mut engine, effects)
    }

    /// Current metrics.
    pub async fn metrics(&self) -> MetricsSnapshot {
        self.engine.lock().await.controller.metrics(Utc::now())
    }

    /// Pick up changes another process wrote to the store.
    ///
    /// Only keys that differ from the last state this agent wrote or read are
    /// applied, so a stale file never undoes a change made through the agent.
    pub async fn sync_from_store(&self) {
        let mut engine = self.engine.lock().await;
        let persisted = match self.store.load() {
            Ok(persisted) => persisted,
            Err(e) => {
                debug!(error = %e, "store not readable, skipping sync");
                return;
            }
        };

        let messages = store_changes(&engine.synced, &persisted);
        engine.synced = persisted;

        let now = Utc::now();
        for message in messages {
            info!(?message, "applying change from store");
            let effects = engine.controller.handle(message.into(), now);
            self.apply(&mut engine, effects);
        }
    }

    /// Spawn the scoring, decay and store-watch loops.
    ///
    /// All loops exit once `shutdown` flips to true or its sender is dropped.
    pub fn spawn_loops(
        self: &Arc<Self>,
        scoring_interval: Duration,
        decay_interval: Duration,
        shutdown: watch::Receiver<bool>,
    ) -> Vec<JoinHandle<()>> {
        vec![
            spawn_ticker(self.clone(), scoring_interval, Command::ScoringTick, shutdown.clone()),
            spawn_ticker(self.clone(), decay_interval, Command::DecayTick, shutdown.clone()),
            spawn_store_watch(self.clone(), STORE_POLL_INTERVAL, shutdown),
        ]
    }

    fn reload_domain_lists(&self) -> Command {
        match self.store.load() {
            Ok(persisted) => Message::UpdateCustomDomains {
                custom_productive: Some(persisted.custom_productive),
                custom_distraction: Some(persisted.custom_distraction),
            }
            .into(),
            Err(e) => {
                warn!(error = %e, "could not reload custom domains from store");
                Message::UpdateCustomDomains {
                    custom_productive: None,
                    custom_distraction: None,
                }
                .into()
            }
        }
    }

    fn apply(&self, engine: &mut Engine, effects: Vec<Effect>) -> Option<MetricsSnapshot> {
        let mut response = None;
        for effect in effects {
            match effect {
                Effect::PersistState(state) => match self.store.save(&state) {
                    Ok(()) => engine.synced = state,
                    Err(e) => warn!(error = %e, "failed to persist state"),
                },
                Effect::TriggerIntervention { tab_id, mode, cause } => {
                    self.deliver(Outbound::TriggerIntervention { tab_id, mode, cause })
                }
                Effect::CloseTab { tab_id } => self.deliver(Outbound::CloseTab { tab_id }),
                Effect::BroadcastMetrics(metrics) => {
                    // No subscribers is fine
                    let _ = self.metrics_tx.send(metrics);
                }
                Effect::Respond(metrics) => response = Some(metrics),
            }
        }
        response
    }

    fn deliver(&self, outbound: Outbound) {
        let tab_id = outbound.tab_id();
        if let Err(e) = self.sink.deliver(outbound) {
            warn!(tab_id, error = %e, "intervention delivery failed");
        }
    }
}

/// Messages for the keys that changed between two store reads.
fn store_changes(previous: &PersistedState, persisted: &PersistedState) -> Vec<Message> {
    let mut messages = Vec::new();

    if persisted.focus_mode != previous.focus_mode {
        messages.push(Message::SetMode {
            mode: persisted.focus_mode,
        });
    }

    let lists = domain_lists(persisted);
    if lists != domain_lists(previous) {
        messages.push(Message::UpdateCustomDomains {
            custom_productive: Some(lists.custom_productive.into_iter().collect()),
            custom_distraction: Some(lists.custom_distraction.into_iter().collect()),
        });
    }

    if persisted.enabled != previous.enabled {
        messages.push(Message::SetEnabled {
            enabled: persisted.enabled,
        });
    }

    messages
}

fn domain_lists(state: &PersistedState) -> DomainLists {
    DomainLists::from_custom(
        state.custom_productive.iter().cloned(),
        state.custom_distraction.iter().cloned(),
    )
}

fn spawn_ticker(
    agent: Arc<Agent>,
    period: Duration,
    command: Command,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // The first tick completes immediately
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    agent.dispatch(command.clone()).await;
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        debug!(?command, "ticker stopped");
    })
}

fn spawn_store_watch(
    agent: Arc<Agent>,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => agent.sync_from_store().await,
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
    })
}
