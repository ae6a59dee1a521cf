//! Activity classification.
//!
//! A pure function of the cycle's signals, page context and domain category.
//! Rules are evaluated top-down and the first rule that matches decides the
//! label.

use crate::core::domain::DomainCategory;
use crate::core::mode::ModeThresholds;
use crate::core::signals::{ContentSignals, RawSignals};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Scroll speed below which scrolling counts as reading (px/s).
pub const READING_VELOCITY_MAX: f64 = 150.0;

/// Scroll speed above which scrolling counts as aimless browsing (px/s).
pub const AIMLESS_VELOCITY_MIN: f64 = 600.0;

/// What the user appears to be doing this cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Classification {
    DeepFocus,
    Reading,
    Working,
    Distracted,
    Uncertain,
    Focused,
}

impl Classification {
    pub fn as_str(&self) -> &'static str {
        match self {
            Classification::DeepFocus => "DEEP_FOCUS",
            Classification::Reading => "READING",
            Classification::Working => "WORKING",
            Classification::Distracted => "DISTRACTED",
            Classification::Uncertain => "UNCERTAIN",
            Classification::Focused => "FOCUSED",
        }
    }

    pub fn is_distracted(&self) -> bool {
        matches!(self, Classification::Distracted)
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Page context from the content script.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ActivityContext {
    pub is_typing_recently: bool,
    pub is_scrolling_recently: bool,
    pub scroll_velocity: f64,
}

impl From<&ContentSignals> for ActivityContext {
    fn from(content: &ContentSignals) -> Self {
        Self {
            is_typing_recently: content.is_typing_recently,
            is_scrolling_recently: content.is_scrolling_recently,
            scroll_velocity: content.scroll_velocity,
        }
    }
}

/// Classifier output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActivityVerdict {
    pub classification: Classification,
    /// Active signals after context suppression, plus the aimless-browsing bonus
    pub active_count: usize,
    /// Name of the rule that decided the label
    pub rule: &'static str,
}

/// Inputs after context suppression, shared by every rule.
#[derive(Debug, Clone, Copy)]
pub struct RuleInput {
    pub category: DomainCategory,
    pub context: ActivityContext,
    pub signals: RawSignals,
    pub active_count: usize,
    pub drift_signals: usize,
}

impl RuleInput {
    fn slow_scrolling(&self) -> bool {
        self.context.is_scrolling_recently && self.context.scroll_velocity < READING_VELOCITY_MAX
    }
}

/// One classification rule.
pub struct Rule {
    pub name: &'static str,
    pub apply: fn(&RuleInput) -> Option<Classification>,
}

/// Rules in priority order. The last rule always matches.
pub const RULES: &[Rule] = &[
    Rule {
        name: "distraction_domain",
        apply: |i| {
            (i.category == DomainCategory::Distraction).then_some(Classification::Distracted)
        },
    },
    Rule {
        name: "safe_zone",
        apply: |i| (i.category == DomainCategory::Productive).then_some(Classification::Focused),
    },
    Rule {
        name: "deep_focus",
        apply: |i| {
            (i.context.is_typing_recently && !i.signals.tab_switch && !i.signals.backspace)
                .then_some(Classification::DeepFocus)
        },
    },
    Rule {
        name: "reading",
        apply: |i| (i.slow_scrolling() && !i.signals.tab_switch).then_some(Classification::Reading),
    },
    Rule {
        name: "working",
        apply: |i| {
            (i.context.is_typing_recently && i.signals.backspace).then_some(Classification::Working)
        },
    },
    Rule {
        name: "drift_threshold",
        apply: |i| (i.active_count >= i.drift_signals).then_some(Classification::Distracted),
    },
    Rule {
        name: "single_signal",
        apply: |i| (i.active_count == 1).then_some(Classification::Uncertain),
    },
    Rule {
        name: "fallback",
        apply: |_| Some(Classification::Focused),
    },
];

/// Clear signals explained by what the user is visibly doing.
pub fn suppress_with_context(signals: RawSignals, context: &ActivityContext) -> RawSignals {
    let mut s = signals;
    if context.is_typing_recently {
        s.idle = false;
        s.jitter = false;
    }
    if context.is_scrolling_recently && context.scroll_velocity < READING_VELOCITY_MAX {
        s.idle = false;
    }
    s
}

/// Fast scrolling while hopping between tabs.
pub fn is_aimless_browsing(signals: &RawSignals, context: &ActivityContext) -> bool {
    context.scroll_velocity > AIMLESS_VELOCITY_MIN && signals.tab_switch
}

/// Classify one cycle.
pub fn classify_activity(
    signals: RawSignals,
    context: ActivityContext,
    thresholds: &ModeThresholds,
    category: DomainCategory,
) -> ActivityVerdict {
    let suppressed = suppress_with_context(signals, &context);
    let bonus = usize::from(is_aimless_browsing(&suppressed, &context));
    let input = RuleInput {
        category,
        context,
        signals: suppressed,
        active_count: suppressed.count() + bonus,
        drift_signals: thresholds.drift_signals,
    };

    for rule in RULES {
        if let Some(classification) = (rule.apply)(&input) {
            return ActivityVerdict {
                classification,
                active_count: input.active_count,
                rule: rule.name,
            };
        }
    }

    ActivityVerdict {
        classification: Classification::Focused,
        active_count: input.active_count,
        rule: "fallback",
    }
}
