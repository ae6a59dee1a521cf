//! Synheart Focus Agent - focus drift detection from browser telemetry.
//!
//! This library decides, from a stream of browser events and content-script
//! telemetry, when a user has drifted away from focused work and when to
//! show an intervention.
//!
//! # Privacy Guarantees
//!
//! - **No page content**: only hostnames are classified, never page text
//! - **No key content**: typing is reduced to a backspace ratio
//! - **No coordinates**: pointer movement is reduced to a jitter magnitude
//! - **Local only**: durable state is a small JSON file on this machine
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Synheart Focus Agent                      │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌─────────────┐   ┌─────────────┐   ┌─────────────┐       │
//! │  │  Telemetry  │──▶│   Signals   │──▶│ Classifier  │       │
//! │  │ (samples)   │   │ (windows)   │   │  (rules)    │       │
//! │  └─────────────┘   └─────────────┘   └─────────────┘       │
//! │         │                                    │              │
//! │         ▼                                    ▼              │
//! │  ┌─────────────┐   ┌─────────────┐   ┌─────────────┐       │
//! │  │   Domain    │──▶│   Dwell /   │──▶│ Hysteresis  │──▶ Effects
//! │  │ Classifier  │   │    Edge     │   │    Gate     │       │
//! │  └─────────────┘   └─────────────┘   └─────────────┘       │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use chrono::Utc;
//! use synheart_focus_agent::engine::{Command, Controller, EngineSettings, HostEvent};
//! use synheart_focus_agent::storage::PersistedState;
//!
//! let persisted = PersistedState::default();
//! let mut controller = Controller::new(EngineSettings::default(), persisted, Utc::now());
//! controller.handle(
//!     Command::Host(HostEvent::TabUpdated {
//!         tab_id: 1,
//!         url: Some("https://github.com".to_string()),
//!         status: None,
//!     }),
//!     Utc::now(),
//! );
//! let effects = controller.handle(Command::ScoringTick, Utc::now());
//! assert!(!effects.is_empty());
//! assert!(!controller.is_distracted());
//! ```

pub mod config;
pub mod core;
pub mod engine;
pub mod error;
pub mod intervention;
pub mod runtime;
pub mod storage;
pub mod telemetry;

#[cfg(feature = "server")]
pub mod server;

// Re-export key types at crate root for convenience
pub use config::Config;
pub use core::{Classification, DomainCategory, DomainLists, FocusMode, ModeTable, ModeThresholds};
pub use engine::{Command, Controller, Effect, EngineSettings, HostEvent, Message, MetricsSnapshot};
pub use error::{ConfigError, EngineError, StoreError};
pub use intervention::{InterventionSink, Outbound, QueueSink, SharedSink};
pub use runtime::Agent;
pub use storage::{JsonFileStore, MemoryStore, PersistedState, SharedStore, StateStore};

#[cfg(feature = "gateway")]
pub use intervention::OverlaySink;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Privacy declaration that can be displayed to users.
pub const PRIVACY_DECLARATION: &str = r#"
╔══════════════════════════════════════════════════════════════════╗
║            SYNHEART FOCUS AGENT - PRIVACY DECLARATION            ║
╠══════════════════════════════════════════════════════════════════╣
║                                                                  ║
║  This agent watches for focus drift while you browse.            ║
║                                                                  ║
║  ✓ WHAT WE USE:                                                  ║
║    • The hostname of the active tab                              ║
║    • How often you switch tabs and go idle                       ║
║    • Backspace ratio, pointer jitter and scroll speed            ║
║                                                                  ║
║  ✗ WHAT WE NEVER CAPTURE:                                        ║
║    • Which keys you press (no passwords, messages, etc.)         ║
║    • Page content, full URLs or search terms                     ║
║    • Where your cursor is on screen                              ║
║                                                                  ║
║  Everything stays on this machine. Only settings and daily       ║
║  counters are stored.                                            ║
║                                                                  ║
║  You can view today's statistics anytime with:                   ║
║    synheart-focus status                                         ║
║                                                                  ║
╚══════════════════════════════════════════════════════════════════╝
"#;
