//! Configuration for the Synheart Focus Agent.

use crate::core::mode::ModeTable;
pub use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration for the focus agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// How often the scoring cycle runs
    #[serde(with = "duration_serde")]
    pub scoring_interval: Duration,

    /// How often the display score decays
    #[serde(with = "duration_serde")]
    pub decay_interval: Duration,

    /// Half-life of the display score
    #[serde(with = "duration_serde")]
    pub decay_half_life: Duration,

    /// Time on a distraction page before the dwell override fires
    #[serde(with = "duration_serde")]
    pub dwell_threshold: Duration,

    /// Trailing span used to count tab switches
    #[serde(with = "duration_serde")]
    pub tab_switch_window: Duration,

    /// Consecutive DISTRACTED cycles required before acting
    pub confirmation_cycles: usize,

    /// Per-mode thresholds
    pub modes: ModeTable,

    /// Path for storing durable state
    pub data_path: PathBuf,

    /// Local port for the extension ingest server
    pub server_port: u16,

    /// Optional overlay endpoint interventions are forwarded to
    pub overlay_url: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("synheart-focus-agent");

        Self {
            scoring_interval: Duration::from_secs(5),
            decay_interval: Duration::from_secs(5),
            decay_half_life: Duration::from_secs(30),
            dwell_threshold: Duration::from_secs(30),
            tab_switch_window: Duration::from_secs(60),
            confirmation_cycles: 2,
            modes: ModeTable::default(),
            data_path: data_dir,
            server_port: 8787,
            overlay_url: None,
        }
    }
}

impl Config {
    /// Load configuration from the default location.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::config_path())
    }

    /// Load and validate configuration from a path, or defaults if absent.
    pub fn load_from(config_path: &std::path::Path) -> Result<Self, ConfigError> {
        let config = if config_path.exists() {
            let content = std::fs::read_to_string(config_path)
                .map_err(|e| ConfigError::IoError(e.to_string()))?;
            serde_json::from_str::<Config>(&content)
                .map_err(|e| ConfigError::ParseError(e.to_string()))?
        } else {
            Self::default()
        };

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        let config_path = Self::config_path();

        // Ensure parent directory exists
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::IoError(e.to_string()))?;
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(&config_path, content).map_err(|e| ConfigError::IoError(e.to_string()))?;

        Ok(())
    }

    /// Reject configurations the engine cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.modes.validate()?;
        if self.confirmation_cycles == 0 {
            return Err(ConfigError::ParseError(
                "confirmation_cycles must be at least 1".to_string(),
            ));
        }
        if self.scoring_interval.is_zero() || self.decay_interval.is_zero() {
            return Err(ConfigError::ParseError(
                "scoring and decay intervals must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Get the path to the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("synheart-focus-agent")
            .join("config.json")
    }

    /// Path of the durable state file.
    pub fn state_path(&self) -> PathBuf {
        self.data_path.join("state.json")
    }

    /// Ensure all required directories exist.
    pub fn ensure_directories(&self) -> Result<(), ConfigError> {
        std::fs::create_dir_all(&self.data_path)
            .map_err(|e| ConfigError::IoError(e.to_string()))?;
        Ok(())
    }
}

/// Serde support for Duration.
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_secs().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.scoring_interval, Duration::from_secs(5));
        assert_eq!(config.decay_half_life, Duration::from_secs(30));
        assert_eq!(config.dwell_threshold, Duration::from_secs(30));
        assert_eq!(config.confirmation_cycles, 2);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"dwell_threshold": 45, "server_port": 9000}"#).unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.dwell_threshold, Duration::from_secs(45));
        assert_eq!(config.server_port, 9000);
        assert_eq!(config.confirmation_cycles, 2);
    }

    #[test]
    fn test_invalid_mode_table_is_rejected_at_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let mut config = Config::default();
        config.modes.deep_work.recovery_signals = config.modes.deep_work.drift_signals;
        std::fs::write(&path, serde_json::to_string(&config).unwrap()).unwrap();

        assert!(matches!(
            Config::load_from(&path),
            Err(ConfigError::InvalidModeTable(_))
        ));
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("absent.json")).unwrap();
        assert_eq!(config.server_port, 8787);
    }
}
