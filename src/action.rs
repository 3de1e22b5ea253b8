//! Proposed agent actions: the unit of work the pipeline evaluates.

use serde::{Deserialize, Serialize};

/// The kind of action a browser-driving agent proposes to take.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionKind {
    /// Navigate the browser to a URL.
    Navigate,
    /// Click an element.
    Click,
    /// Type text into an element.
    Type,
    /// Scroll the page or an element.
    Scroll,
    /// Submit a form.
    Submit,
}

impl ActionKind {
    /// Human-readable label, used in explanations and forensic payloads.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Navigate => "navigate",
            Self::Click => "click",
            Self::Type => "type",
            Self::Scroll => "scroll",
            Self::Submit => "submit",
        }
    }
}

/// A single action a driver asks the core to evaluate before executing.
///
/// Exactly one evaluation per instance — this is not reused across calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProposedAction {
    /// What kind of action this is.
    pub kind: ActionKind,
    /// Destination URL, for `NAVIGATE`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Target element selector, for `CLICK`/`TYPE`/`SUBMIT`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<String>,
    /// Text payload, for `TYPE`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Scroll amount in pixels, for `SCROLL`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<i64>,
    /// The agent's stated natural-language claim about what it is doing.
    ///
    /// Compared against the action's actual effect by the semantic
    /// divergence check and scanned by the honeypot content-echo check.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_intent: Option<String>,
}

impl ProposedAction {
    /// Build a `NAVIGATE` action.
    #[must_use]
    pub fn navigate(url: impl Into<String>) -> Self {
        Self {
            kind: ActionKind::Navigate,
            url: Some(url.into()),
            selector: None,
            text: None,
            amount: None,
            agent_intent: None,
        }
    }

    /// Build a `CLICK` action.
    #[must_use]
    pub fn click(selector: impl Into<String>) -> Self {
        Self {
            kind: ActionKind::Click,
            url: None,
            selector: Some(selector.into()),
            text: None,
            amount: None,
            agent_intent: None,
        }
    }

    /// Build a `TYPE` action.
    #[must_use]
    pub fn type_text(selector: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            kind: ActionKind::Type,
            url: None,
            selector: Some(selector.into()),
            text: Some(text.into()),
            amount: None,
            agent_intent: None,
        }
    }

    /// Attach a stated agent intent to this action, consuming and
    /// returning `self` for chaining at the call site.
    #[must_use]
    pub fn with_intent(mut self, intent: impl Into<String>) -> Self {
        self.agent_intent = Some(intent.into());
        self
    }

    /// The single string this action targets, if any — used by policy
    /// substring checks and the honeypot interaction check.
    #[must_use]
    pub fn target(&self) -> Option<&str> {
        self.selector.as_deref().or(self.url.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn navigate_builder_sets_url() {
        let action = ProposedAction::navigate("https://example.com");
        assert_eq!(action.kind, ActionKind::Navigate);
        assert_eq!(action.url.as_deref(), Some("https://example.com"));
    }

    #[test]
    fn target_prefers_selector_over_url() {
        let action = ProposedAction {
            kind: ActionKind::Click,
            url: Some("https://example.com".into()),
            selector: Some("#submit".into()),
            text: None,
            amount: None,
            agent_intent: None,
        };
        assert_eq!(action.target(), Some("#submit"));
    }

    #[test]
    fn action_kind_serializes_screaming_snake() {
        let json = serde_json::to_string(&ActionKind::Type).unwrap();
        assert_eq!(json, r#""TYPE""#);
    }
}
