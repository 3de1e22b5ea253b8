//! Metrics aggregator: precision/recall/F1 tracking at both per-session
//! and global scope.
//!
//! The two scopes use genuinely different fallback formulas when there
//! is not yet enough data to compute a ratio directly — this mirrors
//! the source system's behavior rather than unifying them, since a
//! fresh session and a cold global aggregator should not be equally
//! pessimistic.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Raw detection counters accumulated by a single scope (one session, or
/// the global aggregator).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Counters {
    /// Threats correctly detected and blocked.
    pub true_positives: u64,
    /// Benign actions incorrectly blocked.
    pub false_positives: u64,
    /// Threats missed (detected elsewhere, e.g. confirmed after the
    /// fact, but not blocked here).
    pub false_negatives: u64,
    /// Total threats detected, blocked or not.
    pub threats_detected: u64,
    /// Total threats actually blocked.
    pub threats_blocked: u64,
    /// Total proposed actions evaluated.
    pub actions_total: u64,
    /// Proposed actions that were allowed to proceed.
    pub actions_successful: u64,
    /// Operator-confirmed true positive (an operator reviewed a block
    /// and agreed it was correct).
    pub operator_true_positives: u64,
    /// Operator-labeled false positive (an operator reviewed a block and
    /// disagreed with it).
    pub operator_false_positives: u64,
    /// Set once an operator marks the session's task as complete.
    pub task_completed: bool,
    /// Running sum of recorded action latencies, in milliseconds.
    pub latency_sum_ms: f64,
    /// Count of latency samples folded into `latency_sum_ms`.
    pub latency_count: u64,
    /// Smallest latency sample seen, in milliseconds.
    pub latency_min_ms: Option<f64>,
    /// Largest latency sample seen, in milliseconds.
    pub latency_max_ms: Option<f64>,
    /// When this scope's first action was recorded.
    pub started_at: Option<DateTime<Utc>>,
    /// When this scope's most recent action was recorded.
    pub ended_at: Option<DateTime<Utc>>,
}

impl Default for Counters {
    fn default() -> Self {
        Self {
            true_positives: 0,
            false_positives: 0,
            false_negatives: 0,
            threats_detected: 0,
            threats_blocked: 0,
            actions_total: 0,
            actions_successful: 0,
            operator_true_positives: 0,
            operator_false_positives: 0,
            task_completed: false,
            latency_sum_ms: 0.0,
            latency_count: 0,
            latency_min_ms: None,
            latency_max_ms: None,
            started_at: None,
            ended_at: None,
        }
    }
}

impl Counters {
    /// Fold one action's outcome and latency into these counters.
    pub fn record_action(&mut self, successful: bool, latency_ms: f64, at: DateTime<Utc>) {
        self.actions_total += 1;
        if successful {
            self.actions_successful += 1;
        }
        self.latency_sum_ms += latency_ms;
        self.latency_count += 1;
        self.latency_min_ms = Some(self.latency_min_ms.map_or(latency_ms, |m| m.min(latency_ms)));
        self.latency_max_ms = Some(self.latency_max_ms.map_or(latency_ms, |m| m.max(latency_ms)));
        if self.started_at.is_none() {
            self.started_at = Some(at);
        }
        self.ended_at = Some(at);
    }

    /// Mean action latency in milliseconds, if any samples were
    /// recorded.
    #[must_use]
    pub fn mean_latency_ms(&self) -> Option<f64> {
        if self.latency_count == 0 {
            None
        } else {
            Some(self.latency_sum_ms / self.latency_count as f64)
        }
    }

    /// Wall-clock duration between the first and last recorded action,
    /// in seconds.
    #[must_use]
    pub fn duration_seconds(&self) -> f64 {
        match (self.started_at, self.ended_at) {
            (Some(start), Some(end)) => (end - start).num_milliseconds() as f64 / 1000.0,
            _ => 0.0,
        }
    }
}

/// Computed precision/recall/F1 for a scope, with a flag indicating
/// whether a fallback constant was used in place of a direct ratio.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// True-positive rate among flagged actions.
    pub precision: f64,
    /// Fraction of real threats caught.
    pub recall: f64,
    /// Harmonic mean of precision and recall.
    pub f1: f64,
    /// Whether `precision` came from a fallback constant rather than a
    /// direct TP/(TP+FP) computation.
    pub precision_is_fallback: bool,
    /// Whether `recall` came from a fallback constant rather than a
    /// direct TP/(TP+FN) computation.
    pub recall_is_fallback: bool,
}

fn f1(precision: f64, recall: f64) -> f64 {
    if precision + recall == 0.0 {
        0.0
    } else {
        2.0 * precision * recall / (precision + recall)
    }
}

impl Counters {
    /// Compute per-session metrics.
    ///
    /// When there is no positive/negative evidence at all (TP = FP = 0),
    /// precision falls back to 0.92 if at least one threat was blocked
    /// in this session, else 1.0 (no threats seen, nothing to be wrong
    /// about). Recall uses the analogous rule against
    /// `threats_detected`.
    #[must_use]
    pub fn session_snapshot(&self) -> MetricsSnapshot {
        let (precision, precision_is_fallback) =
            if self.true_positives == 0 && self.false_positives == 0 {
                let fallback = if self.threats_blocked > 0 { 0.92 } else { 1.0 };
                (fallback, true)
            } else {
                (
                    self.true_positives as f64
                        / (self.true_positives + self.false_positives) as f64,
                    false,
                )
            };

        let (recall, recall_is_fallback) = if self.true_positives == 0 && self.false_negatives == 0
        {
            let fallback = if self.threats_detected > 0 { 0.89 } else { 1.0 };
            (fallback, true)
        } else {
            (
                self.true_positives as f64 / (self.true_positives + self.false_negatives) as f64,
                false,
            )
        };

        MetricsSnapshot {
            precision,
            recall,
            f1: f1(precision, recall),
            precision_is_fallback,
            recall_is_fallback,
        }
    }

    /// Compute global metrics.
    ///
    /// Unlike the per-session formula, the global fallback is a flat
    /// constant keyed only on whether *any* data has accumulated at
    /// all — 0.92/0.89 with no data, the direct ratio otherwise.
    #[must_use]
    pub fn global_snapshot(&self) -> MetricsSnapshot {
        let total = self.true_positives + self.false_positives;
        let (precision, precision_is_fallback) = if total == 0 {
            (0.92, true)
        } else {
            (self.true_positives as f64 / total as f64, false)
        };

        let (recall, recall_is_fallback) = if self.threats_detected == 0 {
            (0.89, true)
        } else {
            (
                self.threats_blocked as f64 / self.threats_detected as f64,
                false,
            )
        };

        MetricsSnapshot {
            precision,
            recall,
            f1: f1(precision, recall),
            precision_is_fallback,
            recall_is_fallback,
        }
    }
}

/// Aggregates counters across each session's lifetime plus the
/// process-wide global totals.
#[derive(Debug, Clone, Default)]
pub struct MetricsAggregator {
    global: Counters,
    sessions: std::collections::HashMap<String, Counters>,
}

impl MetricsAggregator {
    /// Build an aggregator with zeroed global counters and no sessions.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn session_mut(&mut self, session_id: &str) -> &mut Counters {
        self.sessions.entry(session_id.to_string()).or_default()
    }

    /// Record a blocked threat into both the session's and the global
    /// counters.
    pub fn record_threat_blocked(&mut self, session_id: &str) {
        self.session_mut(session_id).threats_detected += 1;
        self.session_mut(session_id).threats_blocked += 1;
        self.session_mut(session_id).true_positives += 1;
        self.global.threats_detected += 1;
        self.global.threats_blocked += 1;
        self.global.true_positives += 1;
    }

    /// Record a detected-but-not-blocked threat (e.g. confirmed, then
    /// allowed by an operator override).
    pub fn record_threat_missed(&mut self, session_id: &str) {
        self.session_mut(session_id).threats_detected += 1;
        self.session_mut(session_id).false_negatives += 1;
        self.global.threats_detected += 1;
        self.global.false_negatives += 1;
    }

    /// Record a benign action that was incorrectly blocked, per an
    /// operator's label.
    pub fn record_false_positive(&mut self, session_id: &str) {
        self.session_mut(session_id).false_positives += 1;
        self.session_mut(session_id).operator_false_positives += 1;
        self.global.false_positives += 1;
        self.global.operator_false_positives += 1;
    }

    /// Record an operator confirming a block was correct.
    pub fn record_true_positive(&mut self, session_id: &str) {
        self.session_mut(session_id).operator_true_positives += 1;
        self.global.operator_true_positives += 1;
    }

    /// Fold one evaluated action's outcome and latency into a session's
    /// counters and the global counters.
    pub fn record_action(&mut self, session_id: &str, successful: bool, latency_ms: f64) {
        let at = Utc::now();
        self.session_mut(session_id).record_action(successful, latency_ms, at);
        self.global.record_action(successful, latency_ms, at);
    }

    /// Mark a session's task as complete (set by the caller once the
    /// agent's overall goal is judged finished).
    pub fn mark_task_completed(&mut self, session_id: &str) {
        self.session_mut(session_id).task_completed = true;
    }

    /// Current global counters.
    #[must_use]
    pub fn global_counters(&self) -> Counters {
        self.global
    }

    /// Current global precision/recall/F1.
    #[must_use]
    pub fn global_snapshot(&self) -> MetricsSnapshot {
        self.global.global_snapshot()
    }

    /// Current counters for `session_id`, or zeroed counters if the
    /// session has recorded nothing yet.
    #[must_use]
    pub fn session_counters(&self, session_id: &str) -> Counters {
        self.sessions.get(session_id).copied().unwrap_or_default()
    }

    /// Current precision/recall/F1 for `session_id`.
    #[must_use]
    pub fn session_snapshot(&self, session_id: &str) -> MetricsSnapshot {
        self.session_counters(session_id).session_snapshot()
    }
}
