//! Intervention delivery.
//!
//! The engine decides *when* to intervene; this module gets the decision to
//! the browser. Delivery failures are logged and skipped, never retried, and
//! never feed back into engine state.

use crate::core::hysteresis::TransitionCause;
use crate::core::mode::FocusMode;
use crate::engine::command::TabId;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// URL prefixes of pages the extension cannot inject into.
pub const RESTRICTED_PREFIXES: &[&str] = &[
    "chrome://",
    "chrome-extension://",
    "chrome-search://",
    "edge://",
    "about:",
    "devtools://",
    "view-source:",
    "file://",
    "moz-extension://",
];

/// Whether a tab URL is an internal page that cannot show an overlay.
pub fn is_restricted_url(url: &str) -> bool {
    let url = url.trim().to_ascii_lowercase();
    url.is_empty() || RESTRICTED_PREFIXES.iter().any(|p| url.starts_with(p))
}

/// Instruction for the browser extension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Outbound {
    TriggerIntervention {
        #[serde(rename = "tabId")]
        tab_id: TabId,
        mode: FocusMode,
        cause: TransitionCause,
    },
    CloseTab {
        #[serde(rename = "tabId")]
        tab_id: TabId,
    },
}

impl Outbound {
    pub fn tab_id(&self) -> TabId {
        match self {
            Outbound::TriggerIntervention { tab_id, .. } | Outbound::CloseTab { tab_id } => *tab_id,
        }
    }
}

/// Delivery errors.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("Delivery channel unavailable: {0}")]
    Unavailable(String),
}

/// Destination for outbound instructions.
pub trait InterventionSink: Send + Sync {
    fn deliver(&self, outbound: Outbound) -> Result<(), DeliveryError>;
}

/// Thread-safe shared sink.
pub type SharedSink = Arc<dyn InterventionSink>;

/// Sink that only logs.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl InterventionSink for LogSink {
    fn deliver(&self, outbound: Outbound) -> Result<(), DeliveryError> {
        tracing::info!(?outbound, "intervention");
        Ok(())
    }
}

/// Queue the extension drains by polling.
#[derive(Debug)]
pub struct QueueSink {
    pending: Mutex<VecDeque<Outbound>>,
    capacity: usize,
}

impl QueueSink {
    /// Default number of undrained instructions kept.
    pub const DEFAULT_CAPACITY: usize = 64;

    pub fn new() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            pending: Mutex::new(VecDeque::new()),
            capacity: capacity.max(1),
        }
    }

    /// Take all pending instructions, oldest first.
    pub fn drain(&self) -> Vec<Outbound> {
        self.pending
            .lock()
            .map(|mut q| q.drain(..).collect())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.pending.lock().map(|q| q.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for QueueSink {
    fn default() -> Self {
        Self::new()
    }
}

impl InterventionSink for QueueSink {
    fn deliver(&self, outbound: Outbound) -> Result<(), DeliveryError> {
        let mut queue = self
            .pending
            .lock()
            .map_err(|e| DeliveryError::Unavailable(e.to_string()))?;
        // Oldest instructions are stale once the extension stops polling
        while queue.len() >= self.capacity {
            queue.pop_front();
        }
        queue.push_back(outbound);
        Ok(())
    }
}

/// Sink delivering to several sinks in order; fails only if all fail.
pub struct FanoutSink {
    sinks: Vec<SharedSink>,
}

impl FanoutSink {
    pub fn new(sinks: Vec<SharedSink>) -> Self {
        Self { sinks }
    }
}

impl InterventionSink for FanoutSink {
    fn deliver(&self, outbound: Outbound) -> Result<(), DeliveryError> {
        let mut last_err = None;
        let mut delivered = false;
        for sink in &self.sinks {
            match sink.deliver(outbound.clone()) {
                Ok(()) => delivered = true,
                Err(e) => last_err = Some(e),
            }
        }
        match (delivered, last_err) {
            (true, _) | (false, None) => Ok(()),
            (false, Some(e)) => Err(e),
        }
    }
}

/// Forwards instructions to an overlay endpoint over HTTP.
#[cfg(feature = "gateway")]
pub struct OverlaySink {
    url: String,
    client: reqwest::Client,
    runtime: tokio::runtime::Handle,
}

#[cfg(feature = "gateway")]
impl OverlaySink {
    /// Create a sink posting to `url`; must be called inside a tokio runtime.
    pub fn new(url: impl Into<String>) -> Result<Self, DeliveryError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .map_err(|e| DeliveryError::Unavailable(e.to_string()))?;
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| DeliveryError::Unavailable(e.to_string()))?;
        Ok(Self {
            url: url.into(),
            client,
            runtime,
        })
    }
}

#[cfg(feature = "gateway")]
impl InterventionSink for OverlaySink {
    fn deliver(&self, outbound: Outbound) -> Result<(), DeliveryError> {
        let request = self.client.post(&self.url).json(&outbound);
        self.runtime.spawn(async move {
            match request.send().await {
                Ok(response) if response.status().is_success() => {}
                Ok(response) => {
                    tracing::warn!(
                        status = %response.status(),
                        "overlay endpoint rejected intervention"
                    );
                }
                Err(e) => tracing::warn!(error = %e, "overlay endpoint unreachable"),
            }
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_restricted_urls() {
        assert!(is_restricted_url("chrome://settings"));
        assert!(is_restricted_url("Chrome-Extension://abc/popup.html"));
        assert!(is_restricted_url("about:blank"));
        assert!(is_restricted_url(""));
        assert!(!is_restricted_url("https://reddit.com"));
    }

    #[test]
    fn test_queue_sink_drains_in_order() {
        let sink = QueueSink::new();
        sink.deliver(Outbound::CloseTab { tab_id: 1 }).unwrap();
        sink.deliver(Outbound::CloseTab { tab_id: 2 }).unwrap();
        let drained = sink.drain();
        assert_eq!(drained.iter().map(Outbound::tab_id).collect::<Vec<_>>(), vec![1, 2]);
        assert!(sink.is_empty());
    }

    #[test]
    fn test_queue_sink_drops_oldest_when_full() {
        let sink = QueueSink::with_capacity(2);
        for tab_id in 0..5 {
            sink.deliver(Outbound::CloseTab { tab_id }).unwrap();
        }
        let drained = sink.drain();
        assert_eq!(drained.iter().map(Outbound::tab_id).collect::<Vec<_>>(), vec![3, 4]);
    }

    #[test]
    fn test_outbound_wire_format() {
        let json = serde_json::to_value(Outbound::TriggerIntervention {
            tab_id: 9,
            mode: FocusMode::DeepWork,
            cause: TransitionCause::Dwell,
        })
        .unwrap();
        assert_eq!(json["type"], "TRIGGER_INTERVENTION");
        assert_eq!(json["tabId"], 9);
        assert_eq!(json["mode"], "deep-work");
        assert_eq!(json["cause"], "dwell");
    }

    #[test]
    fn test_fanout_succeeds_if_any_sink_succeeds() {
        struct Broken;
        impl InterventionSink for Broken {
            fn deliver(&self, _: Outbound) -> Result<(), DeliveryError> {
                Err(DeliveryError::Unavailable("closed".to_string()))
            }
        }
        let queue = Arc::new(QueueSink::new());
        let sinks: Vec<SharedSink> = vec![Arc::new(Broken), queue.clone()];
        let fanout = FanoutSink::new(sinks);
        assert!(fanout.deliver(Outbound::CloseTab { tab_id: 1 }).is_ok());
        assert_eq!(queue.len(), 1);

        let sinks: Vec<SharedSink> = vec![Arc::new(Broken)];
        let only_broken = FanoutSink::new(sinks);
        assert!(only_broken.deliver(Outbound::CloseTab { tab_id: 1 }).is_err());
    }
}
