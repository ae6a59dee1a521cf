//! Focus modes and their drift thresholds.

use crate::error::{ConfigError, EngineError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How strict the engine is about drift.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FocusMode {
    #[default]
    DeepWork,
    Study,
    Casual,
}

impl FocusMode {
    pub const ALL: [FocusMode; 3] = [FocusMode::DeepWork, FocusMode::Study, FocusMode::Casual];

    pub fn as_str(&self) -> &'static str {
        match self {
            FocusMode::DeepWork => "deep-work",
            FocusMode::Study => "study",
            FocusMode::Casual => "casual",
        }
    }
}

impl fmt::Display for FocusMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FocusMode {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "deep-work" | "deep_work" | "deepwork" => Ok(FocusMode::DeepWork),
            "study" => Ok(FocusMode::Study),
            "casual" => Ok(FocusMode::Casual),
            other => Err(EngineError::UnknownMode(other.to_string())),
        }
    }
}

/// Per-mode thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModeThresholds {
    /// Seconds of idleness before the idle signal fires
    pub idle_secs: u64,
    /// Tab switches in the trailing minute before the tab-switch signal fires
    pub tab_switch_per_min: usize,
    /// Active signal count that classifies a cycle as distracted
    pub drift_signals: usize,
    /// Active signal count considered calm again; always below `drift_signals`
    pub recovery_signals: usize,
}

/// Threshold table for every mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModeTable {
    pub deep_work: ModeThresholds,
    pub study: ModeThresholds,
    pub casual: ModeThresholds,
}

impl Default for ModeTable {
    fn default() -> Self {
        Self {
            deep_work: ModeThresholds {
                idle_secs: 15,
                tab_switch_per_min: 2,
                drift_signals: 2,
                recovery_signals: 1,
            },
            study: ModeThresholds {
                idle_secs: 30,
                tab_switch_per_min: 4,
                drift_signals: 2,
                recovery_signals: 1,
            },
            casual: ModeThresholds {
                idle_secs: 60,
                tab_switch_per_min: 6,
                drift_signals: 3,
                recovery_signals: 1,
            },
        }
    }
}

impl ModeTable {
    /// Thresholds for a mode.
    pub fn get(&self, mode: FocusMode) -> ModeThresholds {
        match mode {
            FocusMode::DeepWork => self.deep_work,
            FocusMode::Study => self.study,
            FocusMode::Casual => self.casual,
        }
    }

    /// Reject tables where a mode could never recover, or never drift.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for mode in FocusMode::ALL {
            let t = self.get(mode);
            if t.recovery_signals >= t.drift_signals {
                return Err(ConfigError::InvalidModeTable(format!(
                    "{mode}: recovery_signals ({}) must be below drift_signals ({})",
                    t.recovery_signals, t.drift_signals
                )));
            }
            if t.drift_signals == 0 || t.tab_switch_per_min == 0 {
                return Err(ConfigError::InvalidModeTable(format!(
                    "{mode}: drift_signals and tab_switch_per_min must be positive"
                )));
            }
        }
        Ok(())
    }
}
