//! Core decision engine for the Synheart Focus Agent.
//!
//! This module contains:
//! - Domain classification and focus mode thresholds
//! - Time-bounded sliding windows
//! - Signal evaluation and activity classification
//! - Confirmation, hysteresis, dwell override and score decay

pub mod classifier;
pub mod confirmation;
pub mod decay;
pub mod domain;
pub mod dwell;
pub mod hysteresis;
pub mod mode;
pub mod signals;
pub mod windowing;

// Re-export commonly used types
pub use classifier::{classify_activity, ActivityContext, ActivityVerdict, Classification};
pub use confirmation::ConfirmationWindow;
pub use decay::{decay_score, ScoreDecay};
pub use domain::{extract_hostname, DomainCategory, DomainLists};
pub use dwell::DwellTracker;
pub use hysteresis::{FocusState, HysteresisGate, Transition, TransitionCause};
pub use mode::{FocusMode, ModeTable, ModeThresholds};
pub use signals::{evaluate_signals, ContentSignals, IdleTracker, RawSignals, SignalEvaluation};
pub use windowing::TimeWindow;
