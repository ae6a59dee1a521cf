//! Confirmation window over recent classifications.

use crate::core::classifier::Classification;
use std::collections::VecDeque;

/// Default number of consecutive cycles required to confirm a drift.
pub const DEFAULT_CONFIRMATION_CYCLES: usize = 2;

/// Fixed-capacity FIFO of the most recent classifications.
#[derive(Debug, Clone)]
pub struct ConfirmationWindow {
    capacity: usize,
    history: VecDeque<Classification>,
}

impl ConfirmationWindow {
    /// Create a window holding `capacity` cycles (at least one).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            history: VecDeque::with_capacity(capacity),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Record a cycle's classification, evicting the oldest when full.
    pub fn push(&mut self, classification: Classification) {
        self.history.push_back(classification);
        while self.history.len() > self.capacity {
            self.history.pop_front();
        }
    }

    /// Full window where every entry is DISTRACTED.
    pub fn confirmed_distracted(&self) -> bool {
        self.history.len() == self.capacity && self.history.iter().all(|c| c.is_distracted())
    }

    /// No DISTRACTED entry in the window.
    pub fn confirmed_recovered(&self) -> bool {
        !self.history.iter().any(|c| c.is_distracted())
    }

    pub fn clear(&mut self) {
        self.history.clear();
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    /// Entries oldest first.
    pub fn entries(&self) -> impl Iterator<Item = &Classification> {
        self.history.iter()
    }
}

impl Default for ConfirmationWindow {
    fn default() -> Self {
        Self::new(DEFAULT_CONFIRMATION_CYCLES)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use Classification::{Distracted, Focused, Uncertain};

    #[test]
    fn test_needs_full_window_of_distracted() {
        let mut window = ConfirmationWindow::new(2);
        window.push(Distracted);
        assert!(!window.confirmed_distracted());
        window.push(Distracted);
        assert!(window.confirmed_distracted());
    }

    #[test]
    fn test_eviction_keeps_capacity() {
        let mut window = ConfirmationWindow::new(2);
        window.push(Focused);
        window.push(Distracted);
        window.push(Distracted);
        assert_eq!(window.len(), 2);
        assert!(window.confirmed_distracted());
    }

    #[test]
    fn test_recovered_requires_no_distracted_entry() {
        let mut window = ConfirmationWindow::new(3);
        window.push(Distracted);
        window.push(Uncertain);
        assert!(!window.confirmed_recovered());
        window.push(Focused);
        window.push(Focused);
        assert!(window.confirmed_recovered());
    }

    #[test]
    fn test_empty_window_counts_as_recovered() {
        let window = ConfirmationWindow::default();
        assert!(window.confirmed_recovered());
        assert!(!window.confirmed_distracted());
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let window = ConfirmationWindow::new(0);
        assert_eq!(window.capacity(), 1);
    }
}
