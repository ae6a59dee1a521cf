//! Error types for the Synheart Focus Agent.

use thiserror::Error;

/// Errors raised while loading or saving configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Serialize error: {0}")]
    SerializeError(String),

    #[error("Invalid mode table: {0}")]
    InvalidModeTable(String),
}

/// Errors raised by the durable state store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid store JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors raised inside the decision engine.
///
/// These never escape a scoring tick; the controller logs them and treats the
/// tick as a no-op.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Unknown focus mode: {0}")]
    UnknownMode(String),

    #[error("Invalid signal value for {field}: {value}")]
    InvalidSignal { field: &'static str, value: f64 },
}
