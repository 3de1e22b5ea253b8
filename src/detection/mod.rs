//! Stateless threat detectors.
//!
//! Every detector in this module is a pure function (or a
//! [`GuardrailStage`](crate::pipeline::stage::GuardrailStage) wrapping
//! one): same input, same [`DetectionResult`], every time, with no
//! internal state mutated between calls. On malformed input a detector
//! returns a zero-score "not detected" result rather than erroring —
//! detectors never throw.

pub mod deceptive_ui;
pub mod dynamic_injection;
pub mod hallucination;
#[cfg(feature = "heuristics")]
pub mod hidden_content;
#[cfg(feature = "heuristics")]
pub mod injection;
#[cfg(feature = "heuristics")]
pub mod patterns;
pub mod semantic;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use crate::pipeline::outcome::Severity;

/// A tag naming the kind of threat a detector looks for, used as the
/// risk aggregator's per-contributor source key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum ThreatKind {
    /// Prompt injection embedded in text.
    PromptInjection,
    /// CSS-hidden adversarial content.
    HiddenContent,
    /// Deceptive overlays or credential-capture forms.
    DeceptiveUi,
    /// Dynamic code execution or exfiltration in script source.
    DynamicInjection,
    /// A claimed UI element that does not exist or does not match.
    Hallucination,
    /// Divergence between stated intent and actual action.
    SemanticFirewall,
    /// A shadow-DOM-nested variant of another threat kind.
    ShadowDom,
}

impl ThreatKind {
    /// Canonical string key used in [`crate::risk`]'s weight table and
    /// in forensic payloads.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PromptInjection => "prompt_injection",
            Self::HiddenContent => "hidden_content",
            Self::DeceptiveUi => "deceptive_ui",
            Self::DynamicInjection => "dynamic_injection",
            Self::Hallucination => "hallucination",
            Self::SemanticFirewall => "semantic_firewall",
            Self::ShadowDom => "shadow_dom",
        }
    }
}

/// The immutable result of running one detector once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionResult {
    /// Whether the detector's threshold was crossed.
    pub detected: bool,
    /// Raw score, 0–100.
    pub score: f32,
    /// Severity bucket derived from `score`.
    pub severity: Severity,
    /// Which threat this detector looks for.
    pub threat_kind: ThreatKind,
    /// Textual match snippets, capped to a small preview count.
    pub matches: Vec<String>,
    /// Opaque, detector-specific detail fields (e.g. matched pattern ids).
    pub details: HashMap<String, serde_json::Value>,
    /// How long the detector took to run.
    pub latency: Duration,
}

impl DetectionResult {
    /// The canonical "not detected" result, returned by every detector on
    /// malformed or empty input instead of erroring.
    #[must_use]
    pub fn none(threat_kind: ThreatKind, latency: Duration) -> Self {
        Self {
            detected: false,
            score: 0.0,
            severity: Severity::Info,
            threat_kind,
            matches: Vec::new(),
            details: HashMap::new(),
            latency,
        }
    }

    /// Cap the match preview list to `n` entries, as the spec requires
    /// ("list of textual match snippets (capped)").
    #[must_use]
    pub fn cap_matches(mut self, n: usize) -> Self {
        self.matches.truncate(n);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn none_result_is_not_detected() {
        let result = DetectionResult::none(ThreatKind::PromptInjection, Duration::from_micros(5));
        assert!(!result.detected);
        assert_eq!(result.score, 0.0);
        assert_eq!(result.severity, Severity::Info);
    }

    #[test]
    fn threat_kind_as_str() {
        assert_eq!(ThreatKind::DeceptiveUi.as_str(), "deceptive_ui");
    }

    #[test]
    fn cap_matches_truncates() {
        let result = DetectionResult {
            detected: true,
            score: 80.0,
            severity: Severity::Critical,
            threat_kind: ThreatKind::HiddenContent,
            matches: vec!["a".into(), "b".into(), "c".into()],
            details: HashMap::new(),
            latency: Duration::from_micros(1),
        }
        .cap_matches(2);
        assert_eq!(result.matches.len(), 2);
    }
}
