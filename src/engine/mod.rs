//! Session state and the controller that drives it.
//!
//! Inputs arrive as [`Command`]s and are answered with [`Effect`]s; the
//! controller itself never performs I/O.

pub mod command;
pub mod controller;
pub mod metrics;
pub mod state;

pub use command::{Command, Effect, HostEvent, IdleState, Message, TabId};
pub use controller::Controller;
pub use metrics::MetricsSnapshot;
pub use state::{DurableState, EngineSettings, SessionState, TransientState};
