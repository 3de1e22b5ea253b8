//! Semantic check: goal–action divergence.
//!
//! Compares the agent's stated intent against what the proposed action
//! actually does, categorizing both into a fixed set of action
//! categories and penalizing suspicious category transitions.

use std::time::Instant;

use crate::pipeline::outcome::Severity;

use super::{DetectionResult, ThreatKind};

/// Action categories the semantic check classifies intent and action
/// text into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionCategory {
    /// Moving between pages.
    Navigation,
    /// Passive observation.
    Reading,
    /// Clicking an element.
    Clicking,
    /// Entering text.
    Typing,
    /// Payments and money transfer.
    Financial,
    /// Login, credentials, authentication flows.
    Auth,
    /// Data export or retrieval.
    Data,
    /// Irreversible or destructive operations.
    Destructive,
}

const CATEGORY_KEYWORDS: &[(ActionCategory, &[&str])] = &[
    (ActionCategory::Navigation, &["go to", "navigate", "open", "visit"]),
    (ActionCategory::Reading, &["read", "look at", "check", "view", "browse", "search"]),
    (ActionCategory::Clicking, &["click", "press", "select", "tap"]),
    (ActionCategory::Typing, &["type", "enter", "fill in", "write"]),
    (
        ActionCategory::Financial,
        &["pay", "purchase", "buy", "checkout", "transfer", "send money"],
    ),
    (ActionCategory::Auth, &["log in", "login", "sign in", "password", "authenticate"]),
    (ActionCategory::Data, &["download", "export", "copy", "extract"]),
    (ActionCategory::Destructive, &["delete", "remove", "cancel", "close account"]),
];

/// Fixed table of (intent_category → action_category) transitions that
/// are suspicious enough to penalize — e.g. an agent that claimed to be
/// reading a page but is actually making a payment.
const SUSPICIOUS_TRANSITIONS: &[(ActionCategory, ActionCategory)] = &[
    (ActionCategory::Reading, ActionCategory::Financial),
    (ActionCategory::Navigation, ActionCategory::Financial),
    (ActionCategory::Reading, ActionCategory::Auth),
    (ActionCategory::Clicking, ActionCategory::Destructive),
];

const TRANSITION_PENALTY: f32 = 30.0;
const UNEXPECTED_HIGH_RISK_PENALTY: f32 = 20.0;
const ACTION_ONLY_PATTERN_PENALTY: f32 = 15.0;

const ACTION_ONLY_PATTERNS: &[&str] = &["transfer $", "password", "delete", "download"];

fn categorize(text: &str) -> Vec<ActionCategory> {
    let lower = text.to_lowercase();
    CATEGORY_KEYWORDS
        .iter()
        .filter(|(_, keywords)| keywords.iter().any(|k| lower.contains(k)))
        .map(|(cat, _)| *cat)
        .collect()
}

fn keyword_overlap(intent: &str, action: &str) -> f32 {
    let a: std::collections::HashSet<&str> = intent.split_whitespace().collect();
    let b: std::collections::HashSet<&str> = action.split_whitespace().collect();
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let intersection = a.intersection(&b).count();
    let union = a.union(&b).count();
    if union == 0 {
        0.0
    } else {
        intersection as f32 / union as f32
    }
}

/// Decision the semantic check renders from a divergence score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SemanticDecision {
    /// Intent and action are aligned.
    Allow,
    /// Divergence warrants operator confirmation.
    Confirm,
    /// Divergence is severe enough to block outright.
    Block,
}

impl SemanticDecision {
    fn from_score(score: f32) -> Self {
        if score < 40.0 {
            Self::Allow
        } else if score < 70.0 {
            Self::Confirm
        } else {
            Self::Block
        }
    }
}

/// Compare agent intent against the proposed action description and
/// produce a divergence score plus decision.
#[must_use]
pub fn check(agent_intent: &str, action_description: &str) -> (DetectionResult, SemanticDecision) {
    let start = Instant::now();

    if agent_intent.trim().is_empty() {
        let result = DetectionResult::none(ThreatKind::SemanticFirewall, start.elapsed());
        return (result, SemanticDecision::Allow);
    }

    let intent_categories = categorize(agent_intent);
    let action_categories = categorize(action_description);

    let similarity = keyword_overlap(agent_intent, action_description);
    let mut score = (1.0 - similarity) * 30.0;

    for &intent_cat in &intent_categories {
        for &action_cat in &action_categories {
            if SUSPICIOUS_TRANSITIONS.contains(&(intent_cat, action_cat)) {
                score += TRANSITION_PENALTY;
            }
        }
    }

    let high_risk = [ActionCategory::Financial, ActionCategory::Auth, ActionCategory::Destructive];
    for cat in &action_categories {
        if high_risk.contains(cat) && !intent_categories.contains(cat) {
            score += UNEXPECTED_HIGH_RISK_PENALTY;
        }
    }

    let lower_action = action_description.to_lowercase();
    let lower_intent = agent_intent.to_lowercase();
    for pattern in ACTION_ONLY_PATTERNS {
        if lower_action.contains(pattern) && !lower_intent.contains(pattern) {
            score += ACTION_ONLY_PATTERN_PENALTY;
        }
    }

    score = score.min(100.0);
    let decision = SemanticDecision::from_score(score);

    let result = DetectionResult {
        detected: decision != SemanticDecision::Allow,
        score,
        severity: Severity::from_score(score),
        threat_kind: ThreatKind::SemanticFirewall,
        matches: Vec::new(),
        details: std::collections::HashMap::new(),
        latency: start.elapsed(),
    };

    (result, decision)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aligned_intent_allows() {
        let (result, decision) = check("I will click the submit button", "click #submit");
        assert_eq!(decision, SemanticDecision::Allow);
        assert!(!result.detected);
    }

    #[test]
    fn reading_to_financial_transition_blocks() {
        let (_, decision) = check(
            "I'm just going to read this page for you",
            "purchase the item and pay $500 checkout",
        );
        assert_ne!(decision, SemanticDecision::Allow);
    }

    #[test]
    fn unexpected_destructive_action_penalized() {
        let (result, _) = check("navigate to the settings page", "delete the account");
        assert!(result.score > 0.0);
    }

    #[test]
    fn empty_intent_allows_by_default() {
        let (result, decision) = check("", "click #button");
        assert!(!result.detected);
        assert_eq!(decision, SemanticDecision::Allow);
    }
}
