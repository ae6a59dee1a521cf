//! Content telemetry for the Synheart Focus Agent.
//!
//! The browser extension either reports a finished [`ContentSignals`] snapshot
//! or streams raw samples, which this module folds into one.
//!
//! [`ContentSignals`]: crate::core::ContentSignals

pub mod tracker;
pub mod types;

// Re-export commonly used types
pub use tracker::ContentSignalTracker;
pub use types::{KeySample, PointerSample, ScrollSample, TelemetrySample};
