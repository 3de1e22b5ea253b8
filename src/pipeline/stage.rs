//! The [`GuardrailStage`] trait — the evaluation interface every detector
//! and policy check implements.
//!
//! A guardrail stage receives a [`Content`] value and a
//! [`SecurityContext`], and returns a [`StageOutcome`]. Stages are
//! composed into a [`PipelineExecutor`](super::executor::PipelineExecutor)
//! which orchestrates execution order, fail mode, and metrics.
//!
//! # Implementing a stage
//!
//! ```rust,ignore
//! use sentinel_core::pipeline::{
//!     content::Content,
//!     outcome::{StageOutcome, StageError},
//!     stage::{GuardrailStage, SecurityContext},
//! };
//!
//! struct MyDetector;
//!
//! #[async_trait::async_trait]
//! impl GuardrailStage for MyDetector {
//!     fn id(&self) -> &str { "my_detector" }
//!
//!     async fn evaluate(
//!         &self,
//!         content: &Content,
//!         _ctx: &SecurityContext,
//!     ) -> Result<StageOutcome, StageError> {
//!         Ok(StageOutcome::allow(1.0))
//!     }
//! }
//! ```

use super::content::Content;
use super::outcome::{StageError, StageOutcome};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Maximum depth for delegation parent chains. Beyond this limit,
/// [`SecurityContext::child`] omits the parent link to prevent unbounded
/// memory growth from deeply nested sub-agent delegation.
const MAX_DELEGATION_DEPTH: usize = 64;

// ── SecurityContext ────────────────────────────────────────────────────

/// Contextual information passed to every guardrail stage.
///
/// Carries session identity, the session's current risk and trust
/// scores, and a parent chain for sub-agent delegation tracking. The
/// context is **immutable** from a stage's perspective — stages
/// communicate downstream via their [`StageOutcome`].
///
/// ```rust
/// use sentinel_core::pipeline::stage::SecurityContext;
///
/// let ctx = SecurityContext::builder()
///     .session_id("sess-001")
///     .risk_score(0.0)
///     .build();
///
/// assert_eq!(ctx.session_id(), "sess-001");
/// ```
#[derive(Debug, Clone)]
pub struct SecurityContext {
    session_id: String,
    user_id: Option<String>,
    risk_score: f32,
    trust_score: f32,
    metadata: HashMap<String, serde_json::Value>,
    parent: Option<Arc<SecurityContext>>,
}

impl Default for SecurityContext {
    fn default() -> Self {
        Self {
            session_id: String::new(),
            user_id: None,
            risk_score: 0.0,
            trust_score: 75.0,
            metadata: HashMap::new(),
            parent: None,
        }
    }
}

impl SecurityContext {
    /// Start building a context.
    #[must_use]
    pub fn builder() -> SecurityContextBuilder {
        SecurityContextBuilder::default()
    }

    /// The session identifier.
    #[must_use]
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// The operator identifier, if the session is operator-attended.
    #[must_use]
    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    /// The session's current risk score (0–100) at the time this context
    /// was captured.
    #[must_use]
    pub fn risk_score(&self) -> f32 {
        self.risk_score
    }

    /// The session's current trust score (0–100) at the time this
    /// context was captured.
    #[must_use]
    pub fn trust_score(&self) -> f32 {
        self.trust_score
    }

    /// Arbitrary metadata attached to this evaluation.
    #[must_use]
    pub fn metadata(&self) -> &HashMap<String, serde_json::Value> {
        &self.metadata
    }

    /// Get a single metadata value.
    #[must_use]
    pub fn get_metadata(&self, key: &str) -> Option<&serde_json::Value> {
        self.metadata.get(key)
    }

    /// The parent context in a delegation chain (sub-agent flows).
    #[must_use]
    pub fn parent(&self) -> Option<&Arc<SecurityContext>> {
        self.parent.as_ref()
    }

    /// Walk the delegation chain and return the depth (0 = no parent).
    #[must_use]
    pub fn delegation_depth(&self) -> usize {
        let mut depth = 0;
        let mut current = self.parent.as_ref();
        while let Some(p) = current {
            depth += 1;
            current = p.parent.as_ref();
        }
        depth
    }

    /// Derive a child context for sub-agent delegation, creating a
    /// parent link.
    ///
    /// If the delegation chain has reached [`MAX_DELEGATION_DEPTH`], the
    /// parent link is **silently omitted**. The child is still created
    /// with inherited identity and scores — only the ancestry chain is
    /// truncated.
    #[must_use]
    pub fn child(&self, session_id: impl Into<String>) -> Self {
        let parent = if self.delegation_depth() >= MAX_DELEGATION_DEPTH {
            None
        } else {
            Some(Arc::new(self.clone()))
        };

        Self {
            session_id: session_id.into(),
            user_id: self.user_id.clone(),
            risk_score: self.risk_score,
            trust_score: self.trust_score,
            metadata: HashMap::new(),
            parent,
        }
    }

    /// Create a copy with an updated risk score.
    #[must_use]
    pub fn with_risk_score(mut self, score: f32) -> Self {
        self.risk_score = score;
        self
    }

    /// Create a copy with an updated trust score.
    #[must_use]
    pub fn with_trust_score(mut self, score: f32) -> Self {
        self.trust_score = score;
        self
    }

    /// Create a copy with additional metadata merged in.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}

// ── SecurityContextBuilder ─────────────────────────────────────────────

/// Builder for [`SecurityContext`].
#[derive(Debug, Default)]
pub struct SecurityContextBuilder {
    session_id: String,
    user_id: Option<String>,
    risk_score: f32,
    trust_score: Option<f32>,
    metadata: HashMap<String, serde_json::Value>,
    parent: Option<Arc<SecurityContext>>,
}

impl SecurityContextBuilder {
    /// Set the session identifier.
    #[must_use]
    pub fn session_id(mut self, id: impl Into<String>) -> Self {
        self.session_id = id.into();
        self
    }

    /// Set the operator identifier.
    #[must_use]
    pub fn user_id(mut self, id: impl Into<String>) -> Self {
        self.user_id = Some(id.into());
        self
    }

    /// Set the initial risk score (0–100).
    #[must_use]
    pub fn risk_score(mut self, score: f32) -> Self {
        self.risk_score = score;
        self
    }

    /// Set the initial trust score (0–100). Defaults to 75.0 (the
    /// session default) when not set.
    #[must_use]
    pub fn trust_score(mut self, score: f32) -> Self {
        self.trust_score = Some(score);
        self
    }

    /// Add a metadata entry.
    #[must_use]
    pub fn metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Link to a parent context (for delegation chains).
    #[must_use]
    pub fn parent(mut self, parent: Arc<SecurityContext>) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Build the context.
    #[must_use]
    pub fn build(self) -> SecurityContext {
        SecurityContext {
            session_id: self.session_id,
            user_id: self.user_id,
            risk_score: self.risk_score,
            trust_score: self.trust_score.unwrap_or(75.0),
            metadata: self.metadata,
            parent: self.parent,
        }
    }
}

// ── GuardrailStage trait ───────────────────────────────────────────────

/// A single composable security check in the pipeline.
///
/// # Contract
///
/// - [`evaluate`](Self::evaluate) must be **pure** with respect to
///   `self` — it must not mutate internal state between calls (matches
///   the detection library's stateless-detector invariant).
/// - If the stage encounters an internal error, return
///   `Err(StageError)`. The pipeline consults
///   [`degradable`](Self::degradable) to decide whether to skip the
///   stage or abort.
/// - Stages should complete within a few milliseconds; collaborators
///   that may be slow (a semantic analyzer, a driver round trip) should
///   be wrapped with [`crate::util::with_timeout`].
#[async_trait]
pub trait GuardrailStage: Send + Sync {
    /// Unique identifier for this stage (e.g. `"prompt_injection"`).
    fn id(&self) -> &str;

    /// Evaluate the given content against this guardrail.
    ///
    /// # Errors
    ///
    /// Returns [`StageError`] if the evaluation cannot complete.
    async fn evaluate(
        &self,
        content: &Content,
        ctx: &SecurityContext,
    ) -> Result<StageOutcome, StageError>;

    /// Whether the pipeline may skip this stage on error instead of
    /// aborting. Defaults to `true` (graceful degradation).
    fn degradable(&self) -> bool {
        true
    }

    /// Execution priority — lower values run first. Default is `100`.
    fn priority(&self) -> u32 {
        100
    }
}

// ── StageMetrics ───────────────────────────────────────────────────────

/// Metrics captured for a single stage execution within one pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageMetrics {
    /// Stage identifier.
    pub stage_id: String,
    /// Wall-clock execution time.
    pub duration: std::time::Duration,
    /// Whether the stage ran in degraded mode due to an error.
    pub degraded: bool,
    /// The outcome variant name (e.g. `"allow"`, `"block"`).
    pub outcome: String,
}

// ── Tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::outcome::Severity;

    struct AlwaysAllow;

    #[async_trait]
    impl GuardrailStage for AlwaysAllow {
        fn id(&self) -> &str {
            "always_allow"
        }

        async fn evaluate(
            &self,
            _content: &Content,
            _ctx: &SecurityContext,
        ) -> Result<StageOutcome, StageError> {
            Ok(StageOutcome::allow(1.0))
        }
    }

    struct AlwaysBlock;

    #[async_trait]
    impl GuardrailStage for AlwaysBlock {
        fn id(&self) -> &str {
            "always_block"
        }

        async fn evaluate(
            &self,
            _content: &Content,
            _ctx: &SecurityContext,
        ) -> Result<StageOutcome, StageError> {
            Ok(StageOutcome::block("threat detected", Severity::High))
        }

        fn degradable(&self) -> bool {
            false
        }

        fn priority(&self) -> u32 {
            10
        }
    }

    #[test]
    fn context_builder() {
        let ctx = SecurityContext::builder()
            .session_id("s1")
            .user_id("u1")
            .risk_score(42.0)
            .trust_score(60.0)
            .metadata("source", serde_json::json!("test"))
            .build();

        assert_eq!(ctx.session_id(), "s1");
        assert_eq!(ctx.user_id(), Some("u1"));
        assert!((ctx.risk_score() - 42.0).abs() < f32::EPSILON);
        assert!((ctx.trust_score() - 60.0).abs() < f32::EPSILON);
        assert_eq!(ctx.get_metadata("source"), Some(&serde_json::json!("test")));
    }

    #[test]
    fn default_trust_is_session_default() {
        let ctx = SecurityContext::builder().session_id("s1").build();
        assert!((ctx.trust_score() - 75.0).abs() < f32::EPSILON);
    }

    #[test]
    fn delegation_chain() {
        let root = SecurityContext::builder().session_id("root").build();
        let child = root.child("child-1");
        let grandchild = child.child("child-2");

        assert_eq!(root.delegation_depth(), 0);
        assert_eq!(child.delegation_depth(), 1);
        assert_eq!(grandchild.delegation_depth(), 2);
        assert_eq!(grandchild.parent().unwrap().session_id(), "child-1");
    }

    #[test]
    fn delegation_depth_limit() {
        let mut ctx = SecurityContext::builder().session_id("d-0").build();
        for i in 1..=MAX_DELEGATION_DEPTH + 1 {
            ctx = ctx.child(format!("d-{i}"));
        }
        assert!(ctx.delegation_depth() <= MAX_DELEGATION_DEPTH);
    }

    #[tokio::test]
    async fn always_allow_stage() {
        let stage = AlwaysAllow;
        let content = Content::Text("hello".into());
        let ctx = SecurityContext::default();
        let outcome = stage.evaluate(&content, &ctx).await.unwrap();
        assert!(outcome.is_allow());
    }

    #[tokio::test]
    async fn always_block_stage() {
        let stage = AlwaysBlock;
        assert_eq!(stage.priority(), 10);
        assert!(!stage.degradable());

        let content = Content::Text("malicious".into());
        let ctx = SecurityContext::default();
        let outcome = stage.evaluate(&content, &ctx).await.unwrap();
        assert!(outcome.is_block());
    }
}
