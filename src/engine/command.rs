//! Commands the engine consumes and effects it produces.
//!
//! Every input is a [`Command`]; the controller answers each with a list of
//! [`Effect`]s instead of performing side effects itself.

use crate::core::hysteresis::TransitionCause;
use crate::core::mode::FocusMode;
use crate::core::signals::ContentSignals;
use crate::engine::metrics::MetricsSnapshot;
use crate::storage::PersistedState;
use crate::telemetry::TelemetrySample;
use serde::{Deserialize, Serialize};

/// Browser tab identifier.
pub type TabId = i64;

/// Host idle state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdleState {
    #[default]
    Active,
    Idle,
    Locked,
}

impl IdleState {
    pub fn is_idle(&self) -> bool {
        !matches!(self, IdleState::Active)
    }
}

/// Events from the hosting browser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum HostEvent {
    TabActivated {
        #[serde(rename = "tabId")]
        tab_id: TabId,
        #[serde(default)]
        url: Option<String>,
    },
    TabUpdated {
        #[serde(rename = "tabId")]
        tab_id: TabId,
        #[serde(default)]
        url: Option<String>,
        #[serde(default)]
        status: Option<String>,
    },
    TabRemoved {
        #[serde(rename = "tabId")]
        tab_id: TabId,
    },
    IdleStateChanged {
        state: IdleState,
    },
}

/// Messages from the content script and settings popup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Message {
    ContentSignals(ContentSignals),
    ResetSessionStarted,
    SetMode {
        mode: FocusMode,
    },
    SetEnabled {
        enabled: bool,
    },
    /// Replace custom lists; an absent list is left unchanged
    UpdateCustomDomains {
        #[serde(rename = "customProductive", default)]
        custom_productive: Option<Vec<String>>,
        #[serde(rename = "customDistraction", default)]
        custom_distraction: Option<Vec<String>>,
    },
    GetMetrics,
    CloseTab {
        #[serde(rename = "tabId", default)]
        tab_id: Option<TabId>,
    },
}

/// Everything the controller can be asked to do.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Host(HostEvent),
    Message(Message),
    /// Raw content samples to fold into the content signals
    Telemetry(Vec<TelemetrySample>),
    /// Periodic scoring cycle
    ScoringTick,
    /// Periodic display score decay
    DecayTick,
}

impl From<HostEvent> for Command {
    fn from(event: HostEvent) -> Self {
        Command::Host(event)
    }
}

impl From<Message> for Command {
    fn from(message: Message) -> Self {
        Command::Message(message)
    }
}

/// Side effects requested by the controller.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Write the durable tier to storage
    PersistState(PersistedState),
    /// Show the intervention overlay in a tab
    TriggerIntervention {
        tab_id: TabId,
        mode: FocusMode,
        cause: TransitionCause,
    },
    /// Close a tab on the user's request
    CloseTab { tab_id: TabId },
    /// Publish metrics to observers
    BroadcastMetrics(MetricsSnapshot),
    /// Answer the sender of a `GET_METRICS` message
    Respond(MetricsSnapshot),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_wire_format() {
        let msg: Message = serde_json::from_str(
            r#"{"type":"CONTENT_SIGNALS","backspaceRatio":0.3,"mouseJitter":6.5,
                "scrollVelocity":0,"isTypingRecently":true,"isScrollingRecently":false}"#,
        )
        .unwrap();
        match msg {
            Message::ContentSignals(c) => {
                assert_eq!(c.backspace_ratio, 0.3);
                assert!(c.is_typing_recently);
            }
            other => panic!("unexpected message {other:?}"),
        }

        let msg: Message = serde_json::from_str(r#"{"type":"SET_MODE","mode":"casual"}"#).unwrap();
        assert_eq!(msg, Message::SetMode { mode: FocusMode::Casual });

        let json = r#"{"type":"UPDATE_CUSTOM_DOMAINS","customDistraction":["a.com"]}"#;
        let msg: Message = serde_json::from_str(json).unwrap();
        assert_eq!(
            msg,
            Message::UpdateCustomDomains {
                custom_productive: None,
                custom_distraction: Some(vec!["a.com".to_string()]),
            }
        );

        let msg: Message = serde_json::from_str(r#"{"type":"CLOSE_TAB"}"#).unwrap();
        assert_eq!(msg, Message::CloseTab { tab_id: None });
    }

    #[test]
    fn test_host_event_wire_format() {
        let event: HostEvent = serde_json::from_str(
            r#"{"event":"tab_updated","tabId":7,"url":"https://reddit.com","status":"complete"}"#,
        )
        .unwrap();
        assert_eq!(
            event,
            HostEvent::TabUpdated {
                tab_id: 7,
                url: Some("https://reddit.com".to_string()),
                status: Some("complete".to_string()),
            }
        );

        let event: HostEvent =
            serde_json::from_str(r#"{"event":"idle_state_changed","state":"locked"}"#).unwrap();
        assert_eq!(
            event,
            HostEvent::IdleStateChanged {
                state: IdleState::Locked
            }
        );
    }
}
