//! Outcome types returned by guardrail stages.
//!
//! Every [`GuardrailStage`](super::stage::GuardrailStage) returns a
//! [`StageOutcome`] describing what should happen to the action under
//! evaluation, plus a [`Severity`] for audit and DEFCON promotion.
//!
//! The outcome enum is **non-exhaustive** — future stages may introduce
//! new actions.

use super::content::Content;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

// ── Severity ───────────────────────────────────────────────────────────

/// Severity level for detections and blocking outcomes.
///
/// Ordered from lowest to highest — `Ord` is derived so comparisons like
/// `severity >= Severity::High` work naturally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    /// Informational — no action required.
    Info,
    /// Low risk — may warrant logging.
    Low,
    /// Medium risk — warrants investigation.
    Medium,
    /// High risk — should block under most policies.
    High,
    /// Critical — immediate block and DEFCON escalation.
    Critical,
}

impl Severity {
    /// Bucket a 0–100 score into a severity level, per the detection
    /// library's fixed thresholds (≥70 CRITICAL, ≥50 HIGH, ≥30 MEDIUM,
    /// ≥20 LOW, else INFO).
    #[must_use]
    pub fn from_score(score: f32) -> Self {
        if score >= 70.0 {
            Self::Critical
        } else if score >= 50.0 {
            Self::High
        } else if score >= 30.0 {
            Self::Medium
        } else if score >= 20.0 {
            Self::Low
        } else {
            Self::Info
        }
    }

    /// Numeric rank, used by the forensic buffer's critical-moment
    /// severity (1–5) rather than this enum's 0–4 ordinal.
    #[must_use]
    pub fn as_rank(self) -> u8 {
        match self {
            Self::Info => 1,
            Self::Low => 2,
            Self::Medium => 3,
            Self::High => 4,
            Self::Critical => 5,
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Info => write!(f, "INFO"),
            Self::Low => write!(f, "LOW"),
            Self::Medium => write!(f, "MEDIUM"),
            Self::High => write!(f, "HIGH"),
            Self::Critical => write!(f, "CRITICAL"),
        }
    }
}

// ── StageOutcome ───────────────────────────────────────────────────────

/// The decision a guardrail stage makes about content under evaluation.
///
/// ```rust
/// use sentinel_core::pipeline::outcome::StageOutcome;
///
/// let outcome = StageOutcome::Allow { confidence: 0.99 };
/// assert!(outcome.is_allow());
/// ```
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum StageOutcome {
    /// Allow the action to proceed.
    Allow {
        /// Confidence that the content is safe (0.0–1.0).
        confidence: f32,
    },

    /// Block the action entirely — it must not reach the driver.
    Block {
        /// Human-readable reason for blocking.
        reason: String,
        /// Severity of the detected threat.
        severity: Severity,
    },

    /// Replace the content with a transformed version and let the
    /// modified version proceed to the remaining stages.
    Transform {
        /// The transformed content.
        content: Content,
        /// Short description of what was changed.
        description: String,
    },

    /// Escalate to the human operator — the stage cannot decide alone.
    Escalate {
        /// Reason for escalation.
        reason: String,
        /// Maximum time to wait for an operator decision before falling
        /// back to the pipeline's fail mode.
        timeout: Duration,
    },

    /// The stage has nothing to say — this content is outside its scope.
    Skip {
        /// Why the stage skipped evaluation.
        reason: String,
    },
}

impl StageOutcome {
    /// Short label for this outcome variant, for metrics and logging.
    #[must_use]
    pub fn variant_name(&self) -> &'static str {
        match self {
            Self::Allow { .. } => "allow",
            Self::Block { .. } => "block",
            Self::Transform { .. } => "transform",
            Self::Escalate { .. } => "escalate",
            Self::Skip { .. } => "skip",
        }
    }

    /// `true` if the outcome is [`Allow`](Self::Allow).
    #[must_use]
    pub fn is_allow(&self) -> bool {
        matches!(self, Self::Allow { .. })
    }

    /// `true` if the outcome is [`Block`](Self::Block).
    #[must_use]
    pub fn is_block(&self) -> bool {
        matches!(self, Self::Block { .. })
    }

    /// `true` if the outcome is [`Transform`](Self::Transform).
    #[must_use]
    pub fn is_transform(&self) -> bool {
        matches!(self, Self::Transform { .. })
    }

    /// `true` if the outcome is [`Escalate`](Self::Escalate).
    #[must_use]
    pub fn is_escalate(&self) -> bool {
        matches!(self, Self::Escalate { .. })
    }

    /// `true` if the outcome is [`Skip`](Self::Skip).
    #[must_use]
    pub fn is_skip(&self) -> bool {
        matches!(self, Self::Skip { .. })
    }

    /// Convenience constructor for a confident allow.
    ///
    /// # Panics (debug only)
    ///
    /// Debug-asserts that `confidence` is in \[0.0, 1.0\].
    #[must_use]
    pub fn allow(confidence: f32) -> Self {
        debug_assert!(
            (0.0..=1.0).contains(&confidence),
            "confidence must be in [0.0, 1.0], got {confidence}",
        );
        Self::Allow { confidence }
    }

    /// Convenience constructor for a block.
    #[must_use]
    pub fn block(reason: impl Into<String>, severity: Severity) -> Self {
        Self::Block {
            reason: reason.into(),
            severity,
        }
    }

    /// Convenience constructor for a skip.
    #[must_use]
    pub fn skip(reason: impl Into<String>) -> Self {
        Self::Skip {
            reason: reason.into(),
        }
    }

    /// Convenience constructor for a transform.
    #[must_use]
    pub fn transform(content: Content, description: impl Into<String>) -> Self {
        Self::Transform {
            content,
            description: description.into(),
        }
    }

    /// Convenience constructor for an escalation.
    #[must_use]
    pub fn escalate(reason: impl Into<String>, timeout: Duration) -> Self {
        Self::Escalate {
            reason: reason.into(),
            timeout,
        }
    }
}

// ── StageError ─────────────────────────────────────────────────────────

/// An error encountered during guardrail stage evaluation.
///
/// Distinct from a "threat detected" block — this means the stage
/// *could not complete its analysis*. The pipeline consults the stage's
/// [`degradable()`](super::stage::GuardrailStage::degradable) flag to
/// decide whether to fail-closed or continue with degraded coverage.
#[derive(Debug, Error)]
pub enum StageError {
    /// The stage's backing collaborator (semantic analyzer, driver call)
    /// is unavailable.
    #[error("backend unavailable for stage '{stage}': {reason}")]
    BackendUnavailable {
        /// Stage identifier.
        stage: String,
        /// Human-readable reason.
        reason: String,
    },

    /// The content could not be processed by this stage (wrong shape,
    /// malformed DOM, etc.).
    #[error("invalid content for stage '{stage}': {reason}")]
    InvalidContent {
        /// Stage identifier.
        stage: String,
        /// What went wrong.
        reason: String,
    },

    /// Catch-all for unexpected failures.
    #[error("internal error in stage '{stage}': {source}")]
    Internal {
        /// Stage identifier.
        stage: String,
        /// Underlying error.
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

// ── Tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_ordering() {
        assert!(Severity::Info < Severity::Low);
        assert!(Severity::Low < Severity::Medium);
        assert!(Severity::Medium < Severity::High);
        assert!(Severity::High < Severity::Critical);
    }

    #[test]
    fn severity_from_score_buckets() {
        assert_eq!(Severity::from_score(75.0), Severity::Critical);
        assert_eq!(Severity::from_score(55.0), Severity::High);
        assert_eq!(Severity::from_score(35.0), Severity::Medium);
        assert_eq!(Severity::from_score(25.0), Severity::Low);
        assert_eq!(Severity::from_score(5.0), Severity::Info);
    }

    #[test]
    fn severity_display() {
        assert_eq!(Severity::Critical.to_string(), "CRITICAL");
    }

    #[test]
    fn outcome_is_methods() {
        assert!(StageOutcome::allow(0.99).is_allow());
        assert!(StageOutcome::block("bad", Severity::High).is_block());
        assert!(StageOutcome::skip("n/a").is_skip());
    }

    #[test]
    fn stage_error_display() {
        let err = StageError::BackendUnavailable {
            stage: "injection".into(),
            reason: "timeout".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("injection"));
        assert!(msg.contains("timeout"));
    }

    #[test]
    fn severity_round_trips_json() {
        let json = serde_json::to_string(&Severity::High).unwrap();
        assert_eq!(json, r#""HIGH""#);
        let parsed: Severity = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, Severity::High);
    }
}
