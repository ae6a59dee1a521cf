//! FOCUSED/DISTRACTED state machine.
//!
//! Entry requires a full confirmation window of DISTRACTED cycles. Exit
//! requires that no DISTRACTED cycle remains in the window, so with a full
//! window both directions need a run of N matching cycles and a count that
//! alternates at the boundary never moves the state. A window that is empty
//! or only partly filled with non-DISTRACTED cycles already counts as
//! recovered.

use crate::core::confirmation::ConfirmationWindow;
use serde::{Deserialize, Serialize};

/// Engine-level focus state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FocusState {
    #[default]
    Focused,
    Distracted,
}

/// Why the gate moved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionCause {
    /// Confirmation window filled with DISTRACTED
    Confirmed,
    /// Sustained time on a distraction page
    Dwell,
    /// Direct productive to distraction navigation
    Edge,
    /// Confirmation window cleared of DISTRACTED
    Recovered,
}

/// A state change produced by the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: FocusState,
    pub to: FocusState,
    pub cause: TransitionCause,
}

impl Transition {
    pub fn is_drift(&self) -> bool {
        self.to == FocusState::Distracted
    }
}

/// The hysteresis gate.
#[derive(Debug, Clone, Default)]
pub struct HysteresisGate {
    state: FocusState,
}

impl HysteresisGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> FocusState {
        self.state
    }

    pub fn is_distracted(&self) -> bool {
        self.state == FocusState::Distracted
    }

    /// Evaluate the confirmation window and move if its guard holds.
    ///
    /// Recovery clears the window so that re-entering DISTRACTED needs a fresh
    /// confirmation streak.
    pub fn step(&mut self, window: &mut ConfirmationWindow) -> Option<Transition> {
        match self.state {
            FocusState::Focused if window.confirmed_distracted() => {
                Some(self.enter_distracted(TransitionCause::Confirmed))
            }
            FocusState::Distracted if window.confirmed_recovered() => {
                window.clear();
                self.state = FocusState::Focused;
                Some(Transition {
                    from: FocusState::Distracted,
                    to: FocusState::Focused,
                    cause: TransitionCause::Recovered,
                })
            }
            _ => None,
        }
    }

    /// Force FOCUSED to DISTRACTED, bypassing confirmation.
    ///
    /// Returns `None` when already distracted.
    pub fn force_distracted(&mut self, cause: TransitionCause) -> Option<Transition> {
        match self.state {
            FocusState::Focused => Some(self.enter_distracted(cause)),
            FocusState::Distracted => None,
        }
    }

    /// Return to FOCUSED without a transition, e.g. when the engine is reset.
    pub fn reset(&mut self) {
        self.state = FocusState::Focused;
    }

    fn enter_distracted(&mut self, cause: TransitionCause) -> Transition {
        self.state = FocusState::Distracted;
        Transition {
            from: FocusState::Focused,
            to: FocusState::Distracted,
            cause,
        }
    }
}
