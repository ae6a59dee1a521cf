//! Durable storage for the Synheart Focus Agent.
//!
//! This module persists the settings and daily statistics that must survive
//! an agent restart.

pub mod stats;
pub mod store;

// Re-export commonly used types
pub use stats::{day_stamp, Stats};
pub use store::{
    create_shared_store, JsonFileStore, MemoryStore, PersistedState, SharedStore, StateStore,
};
