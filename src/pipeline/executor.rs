//! The [`PipelineExecutor`] — orchestrates multi-stage guardrail
//! execution for a single proposed action.
//!
//! # Execution model
//!
//! 1. Stages are sorted by [`GuardrailStage::priority`] (ascending).
//! 2. Each stage is evaluated sequentially against the supplied
//!    [`Content`].
//! 3. A [`Block`](StageOutcome::Block) or [`Escalate`](StageOutcome::Escalate)
//!    outcome short-circuits the remaining stages.
//! 4. If a stage returns `Err` and [`GuardrailStage::degradable`] is
//!    `true`, the pipeline records it as a degraded run and continues.
//!    Non-degradable errors propagate immediately.
//! 5. [`FailMode`] controls whether a blocking outcome actually blocks,
//!    logs it only, or lets the action through.
//!
//! # Example
//!
//! ```rust,ignore
//! use sentinel_core::pipeline::executor::PipelineExecutor;
//! use sentinel_core::pipeline::content::Content;
//! use sentinel_core::pipeline::stage::SecurityContext;
//! use sentinel_core::config::FailMode;
//!
//! let executor = PipelineExecutor::builder()
//!     .add_stage(my_stage)
//!     .fail_mode(FailMode::Closed)
//!     .build();
//!
//! let result = executor.run(&Content::Text("hi".into()), &ctx).await;
//! ```

use std::borrow::Cow;
use std::sync::Arc;
use std::time::Instant;

use crate::config::FailMode;

use super::content::Content;
use super::outcome::{StageError, StageOutcome};
use super::stage::{GuardrailStage, SecurityContext, StageMetrics};

/// Outcome label for stages that ran in degraded mode.
const OUTCOME_DEGRADED: &str = "degraded";
/// Outcome label for stages that failed fatally.
const OUTCOME_ERROR: &str = "error";

// ── PipelineResult ─────────────────────────────────────────────────────

/// The outcome of a full pipeline run against one proposed action.
#[derive(Debug, Clone)]
pub struct PipelineResult {
    /// The final merged outcome.
    pub outcome: StageOutcome,
    /// Per-stage execution metrics, in execution order.
    pub stage_metrics: Vec<StageMetrics>,
    /// Stages that ran in degraded mode (returned `Err` but `degradable`).
    pub degraded_stages: Vec<String>,
    /// Whether the pipeline was forced to allow by [`FailMode::Open`] or
    /// [`FailMode::LogOnly`] despite a blocking stage.
    pub overridden: bool,
}

impl PipelineResult {
    /// Convenience: true when the final outcome is [`StageOutcome::Allow`].
    #[must_use]
    pub fn is_allowed(&self) -> bool {
        self.outcome.is_allow()
    }

    /// True if any stage ran in degraded mode.
    #[must_use]
    pub fn has_degraded(&self) -> bool {
        !self.degraded_stages.is_empty()
    }

    /// Total wall-clock time across all stages.
    #[must_use]
    pub fn total_duration(&self) -> std::time::Duration {
        self.stage_metrics.iter().map(|m| m.duration).sum()
    }
}

// ── ExecutorError ──────────────────────────────────────────────────────

/// Errors that can prevent the pipeline from completing.
///
/// Distinct from [`StageError`], which represents per-stage failures
/// that may be recoverable via `degradable`.
#[derive(Debug, thiserror::Error)]
pub enum ExecutorError {
    /// A non-degradable stage returned an error.
    #[error("critical stage '{stage_id}' failed: {source}")]
    CriticalStageFailure {
        /// The stage that failed.
        stage_id: String,
        /// Underlying error.
        source: StageError,
    },

    /// The pipeline has no stages configured.
    #[error("pipeline has no stages")]
    Empty,
}

// ── PipelineExecutor ───────────────────────────────────────────────────

/// Orchestrates evaluation of a sequence of [`GuardrailStage`] instances
/// against one proposed action.
///
/// Created via [`ExecutorBuilder`].
pub struct PipelineExecutor {
    /// Stages sorted by priority ascending (lower runs first).
    stages: Vec<Arc<dyn GuardrailStage>>,
    /// Fail mode from [`crate::config::SentinelConfig`].
    fail_mode: FailMode,
}

impl PipelineExecutor {
    /// Start building an executor.
    #[must_use]
    pub fn builder() -> ExecutorBuilder {
        ExecutorBuilder::default()
    }

    /// Run all stages against the given content.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutorError::CriticalStageFailure`] if a
    /// non-degradable stage fails, or [`ExecutorError::Empty`] if no
    /// stages are registered.
    pub async fn run(
        &self,
        content: &Content,
        ctx: &SecurityContext,
    ) -> Result<PipelineResult, ExecutorError> {
        if self.stages.is_empty() {
            return Err(ExecutorError::Empty);
        }

        let mut stage_metrics = Vec::with_capacity(self.stages.len());
        let mut degraded_stages = Vec::new();
        let mut final_outcome = StageOutcome::allow(1.0);
        let mut overridden = false;
        let mut current_content = Cow::Borrowed(content);

        for stage in &self.stages {
            let start = Instant::now();
            let result = stage.evaluate(current_content.as_ref(), ctx).await;
            let duration = start.elapsed();

            match result {
                Ok(outcome) => {
                    let outcome_name = outcome.variant_name().to_owned();

                    stage_metrics.push(StageMetrics {
                        stage_id: stage.id().to_owned(),
                        duration,
                        degraded: false,
                        outcome: outcome_name,
                    });

                    if outcome.is_block() || outcome.is_escalate() {
                        final_outcome = self.apply_fail_mode(outcome, &mut overridden);
                        break;
                    }

                    match outcome {
                        StageOutcome::Allow { confidence } => {
                            if let StageOutcome::Allow {
                                confidence: ref mut prev,
                            } = final_outcome
                            {
                                *prev = prev.min(confidence);
                            }
                        }
                        StageOutcome::Transform {
                            content: new_content,
                            ..
                        } => {
                            current_content = Cow::Owned(new_content);
                            final_outcome = StageOutcome::allow(1.0);
                        }
                        other => {
                            final_outcome = other;
                        }
                    }
                }
                Err(err) => {
                    if stage.degradable() {
                        tracing::warn!(
                            stage = stage.id(),
                            error = %err,
                            "degradable stage failed — skipping",
                        );

                        degraded_stages.push(stage.id().to_owned());

                        stage_metrics.push(StageMetrics {
                            stage_id: stage.id().to_owned(),
                            duration,
                            degraded: true,
                            outcome: OUTCOME_DEGRADED.to_owned(),
                        });
                    } else {
                        stage_metrics.push(StageMetrics {
                            stage_id: stage.id().to_owned(),
                            duration,
                            degraded: false,
                            outcome: OUTCOME_ERROR.to_owned(),
                        });

                        return Err(ExecutorError::CriticalStageFailure {
                            stage_id: stage.id().to_owned(),
                            source: err,
                        });
                    }
                }
            }
        }

        Ok(PipelineResult {
            outcome: final_outcome,
            stage_metrics,
            degraded_stages,
            overridden,
        })
    }

    /// Apply [`FailMode`] policy to a terminal outcome.
    fn apply_fail_mode(&self, outcome: StageOutcome, overridden: &mut bool) -> StageOutcome {
        match self.fail_mode {
            FailMode::Closed => outcome,
            FailMode::Open => {
                tracing::warn!(
                    fail_mode = "open",
                    "blocking outcome overridden to allow by FailMode::Open"
                );
                *overridden = true;
                StageOutcome::allow(0.0)
            }
            FailMode::LogOnly => {
                tracing::info!(
                    fail_mode = "log_only",
                    "blocking outcome logged but allowed by FailMode::LogOnly"
                );
                *overridden = true;
                StageOutcome::allow(0.0)
            }
        }
    }
}

// ── ExecutorBuilder ────────────────────────────────────────────────────

/// Builder for [`PipelineExecutor`].
///
/// Stages are added in any order; the builder sorts them by
/// [`GuardrailStage::priority`] at `.build()` time.
#[derive(Default)]
pub struct ExecutorBuilder {
    stages: Vec<Arc<dyn GuardrailStage>>,
    fail_mode: FailMode,
}

impl ExecutorBuilder {
    /// Add a stage (sorted by priority at build time).
    #[must_use]
    pub fn add_stage(mut self, stage: impl GuardrailStage + 'static) -> Self {
        self.stages.push(Arc::new(stage));
        self
    }

    /// Add a pre-wrapped `Arc<dyn GuardrailStage>`.
    #[must_use]
    pub fn add_shared_stage(mut self, stage: Arc<dyn GuardrailStage>) -> Self {
        self.stages.push(stage);
        self
    }

    /// Set the [`FailMode`] (defaults to [`FailMode::Closed`]).
    #[must_use]
    pub fn fail_mode(mut self, mode: FailMode) -> Self {
        self.fail_mode = mode;
        self
    }

    /// Build the executor. Stages are sorted by priority ascending.
    #[must_use]
    pub fn build(mut self) -> PipelineExecutor {
        self.stages.sort_by_key(|s| s.priority());
        PipelineExecutor {
            stages: self.stages,
            fail_mode: self.fail_mode,
        }
    }
}

// ── Tests ──────────────────────────────────────────────────────────────
