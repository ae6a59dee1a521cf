//! Durable state persistence.
//!
//! Only the durable tier is stored here: the enabled flag, focus mode, daily
//! stats and custom domain lists. Everything else is rebuilt from zero when the
//! agent restarts.

use crate::core::mode::FocusMode;
use crate::error::StoreError;
use crate::storage::stats::Stats;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Persisted keys. Missing keys fall back to their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PersistedState {
    pub enabled: bool,
    pub focus_mode: FocusMode,
    pub stats: Stats,
    pub custom_productive: Vec<String>,
    pub custom_distraction: Vec<String>,
}

impl Default for PersistedState {
    fn default() -> Self {
        Self {
            enabled: true,
            focus_mode: FocusMode::DeepWork,
            stats: Stats::default(),
            custom_productive: Vec::new(),
            custom_distraction: Vec::new(),
        }
    }
}

/// Storage backend for the durable tier.
pub trait StateStore: Send + Sync {
    /// Load persisted state, or defaults when nothing was saved yet.
    fn load(&self) -> Result<PersistedState, StoreError>;

    /// Save the durable tier.
    fn save(&self, state: &PersistedState) -> Result<(), StoreError>;
}

/// Thread-safe shared store.
pub type SharedStore = Arc<dyn StateStore>;

/// JSON file store.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StateStore for JsonFileStore {
    fn load(&self) -> Result<PersistedState, StoreError> {
        if !self.path.exists() {
            return Ok(PersistedState::default());
        }
        let content = std::fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(PersistedState::default());
        }
        Ok(serde_json::from_str(&content)?)
    }

    fn save(&self, state: &PersistedState) -> Result<(), StoreError> {
        // Ensure parent directory exists
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(state)?;
        std::fs::write(&self.path, json)?;
        Ok(())
    }
}

/// In-memory store, mainly for tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<Option<PersistedState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state(state: PersistedState) -> Self {
        Self {
            state: Mutex::new(Some(state)),
        }
    }

    /// Last saved state, if any.
    pub fn saved(&self) -> Option<PersistedState> {
        self.state.lock().ok().and_then(|s| s.clone())
    }
}

impl StateStore for MemoryStore {
    fn load(&self) -> Result<PersistedState, StoreError> {
        Ok(self.saved().unwrap_or_default())
    }

    fn save(&self, state: &PersistedState) -> Result<(), StoreError> {
        if let Ok(mut slot) = self.state.lock() {
            *slot = Some(state.clone());
        }
        Ok(())
    }
}

/// Create a shared JSON file store.
pub fn create_shared_store(path: PathBuf) -> SharedStore {
    Arc::new(JsonFileStore::new(path))
}
