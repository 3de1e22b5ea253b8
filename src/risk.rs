//! Risk aggregator: combines per-source detection scores into a single
//! session risk score, level, and decision.
//!
//! The honeypot is a hard short-circuit, not a weighted contributor — a
//! triggered trap is unambiguous ground truth and skips the weighting
//! math entirely.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::detection::{DetectionResult, ThreatKind};

/// Maximum number of points retained in a session's risk-evolution
/// series.
pub const RISK_EVOLUTION_CAPACITY: usize = 60;

/// A named contributor to a risk computation, with its own 0–100 score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RiskSource {
    /// Prompt-injection detector.
    PromptInjection,
    /// Policy engine violation.
    Policy,
    /// Deceptive UI detector.
    DeceptiveUi,
    /// Semantic goal/action divergence.
    Semantic,
    /// Hidden content detector.
    HiddenContent,
    /// Shadow-DOM / dynamic injection detector.
    ShadowDom,
}

impl RiskSource {
    /// Contribution weight, per the fixed weighting table.
    #[must_use]
    pub fn weight(self) -> f32 {
        match self {
            Self::PromptInjection => 1.5,
            Self::Policy => 1.4,
            Self::DeceptiveUi => 1.3,
            Self::Semantic => 1.2,
            Self::HiddenContent => 1.0,
            Self::ShadowDom => 0.8,
        }
    }
}

/// One source's contribution to a risk computation.
#[derive(Debug, Clone, Copy)]
pub struct RiskContribution {
    /// Which detector produced this score.
    pub source: RiskSource,
    /// The detector's own 0–100 score.
    pub score: f32,
}

impl RiskContribution {
    /// Map a detection library result onto a weighted risk source, where
    /// one exists.
    ///
    /// [`ThreatKind::Hallucination`] has no corresponding weight table
    /// entry — it feeds the semantic divergence check rather than
    /// contributing to risk directly — so this returns `None` for it.
    #[must_use]
    pub fn from_detection(result: &DetectionResult) -> Option<Self> {
        let source = match result.threat_kind {
            ThreatKind::PromptInjection => RiskSource::PromptInjection,
            ThreatKind::HiddenContent => RiskSource::HiddenContent,
            ThreatKind::DeceptiveUi => RiskSource::DeceptiveUi,
            ThreatKind::SemanticFirewall => RiskSource::Semantic,
            ThreatKind::DynamicInjection | ThreatKind::ShadowDom => RiskSource::ShadowDom,
            ThreatKind::Hallucination => return None,
        };
        Some(Self {
            source,
            score: result.score,
        })
    }
}

/// Overall risk level bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    /// Low risk.
    Low,
    /// Medium risk.
    Medium,
    /// High risk.
    High,
    /// Critical risk.
    Critical,
}

impl RiskLevel {
    #[must_use]
    fn from_score(score: f32) -> Self {
        if score >= 90.0 {
            Self::Critical
        } else if score >= 75.0 {
            Self::High
        } else if score >= 50.0 {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

/// The action the risk aggregator recommends taking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskDecision {
    /// Proceed normally.
    Allow,
    /// Require operator confirmation.
    Confirm,
    /// Block the action.
    Block,
}

impl RiskDecision {
    #[must_use]
    fn from_score(score: f32) -> Self {
        if score >= 70.0 {
            Self::Block
        } else if score >= 50.0 {
            Self::Confirm
        } else {
            Self::Allow
        }
    }
}

/// Result of a single risk aggregation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskAssessment {
    /// Combined score, 0–100.
    pub score: f32,
    /// Risk level bucket for `score`.
    pub level: RiskLevel,
    /// Recommended decision for `score`.
    pub decision: RiskDecision,
    /// Trust delta this assessment implies (applied by the trust engine).
    pub trust_delta: f32,
    /// Whether a honeypot short-circuit produced this assessment.
    pub honeypot_triggered: bool,
    /// Number of sources that contributed a non-zero score.
    pub active_sources: usize,
    /// Ordered per-contributor breakdown, the canonical representation —
    /// `breakdown()` projects this into a source → score map on demand.
    pub contributors: Vec<RiskContribution>,
}

impl RiskAssessment {
    /// Project the ordered contributor list into a `source → score` map,
    /// for callers that want the dict-shaped view rather than the
    /// ordered list.
    #[must_use]
    pub fn breakdown(&self) -> std::collections::HashMap<RiskSource, f32> {
        self.contributors.iter().map(|c| (c.source, c.score)).collect()
    }
}

/// A point in a session's risk-evolution series.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RiskPoint {
    /// Sequence index within the session (monotonic, not a timestamp).
    pub sequence: u64,
    /// The combined score recorded at this point.
    pub score: f32,
}

/// Per-session risk aggregator and evolution history.
#[derive(Debug, Clone)]
pub struct RiskAggregator {
    evolution: VecDeque<RiskPoint>,
    next_sequence: u64,
}

impl RiskAggregator {
    /// Build an aggregator with an empty evolution series.
    #[must_use]
    pub fn new() -> Self {
        Self {
            evolution: VecDeque::with_capacity(RISK_EVOLUTION_CAPACITY),
            next_sequence: 0,
        }
    }

    /// Honeypot short-circuit: always score 100, level CRITICAL, decision
    /// BLOCK, trust delta -100, bypassing the weighted combination.
    pub fn record_honeypot_trigger(&mut self) -> RiskAssessment {
        let assessment = RiskAssessment {
            score: 100.0,
            level: RiskLevel::Critical,
            decision: RiskDecision::Block,
            trust_delta: -100.0,
            honeypot_triggered: true,
            active_sources: 0,
            contributors: Vec::new(),
        };
        self.push_evolution(assessment.score);
        assessment
    }

    /// Combine `contributions` into a weighted-mean score, with a ×1.2
    /// escalation (capped at 100) when three or more sources are active.
    pub fn combine(&mut self, contributions: &[RiskContribution]) -> RiskAssessment {
        let active: Vec<&RiskContribution> =
            contributions.iter().filter(|c| c.score > 0.0).collect();

        let weight_sum: f32 = active.iter().map(|c| c.source.weight()).sum();
        let mut score = if weight_sum <= 0.0 {
            0.0
        } else {
            active
                .iter()
                .map(|c| c.score * c.source.weight())
                .sum::<f32>()
                / weight_sum
        };

        if active.len() >= 3 {
            score = (score * 1.2).min(100.0);
        }

        let trust_delta = if score >= 70.0 {
            -30.0
        } else if score >= 50.0 {
            -15.0
        } else if score >= 30.0 {
            -5.0
        } else {
            0.0
        };

        let assessment = RiskAssessment {
            score,
            level: RiskLevel::from_score(score),
            decision: RiskDecision::from_score(score),
            trust_delta,
            honeypot_triggered: false,
            active_sources: active.len(),
            contributors: active.iter().map(|c| **c).collect(),
        };
        self.push_evolution(assessment.score);
        assessment
    }

    fn push_evolution(&mut self, score: f32) {
        if self.evolution.len() == RISK_EVOLUTION_CAPACITY {
            self.evolution.pop_front();
        }
        self.evolution.push_back(RiskPoint {
            sequence: self.next_sequence,
            score,
        });
        self.next_sequence += 1;
    }

    /// The risk-evolution series, oldest first, capped at
    /// [`RISK_EVOLUTION_CAPACITY`] points.
    #[must_use]
    pub fn evolution(&self) -> Vec<RiskPoint> {
        self.evolution.iter().copied().collect()
    }
}

impl Default for RiskAggregator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_low_source_is_low_risk() {
        let mut agg = RiskAggregator::new();
        let assessment = agg.combine(&[RiskContribution {
            source: RiskSource::HiddenContent,
            score: 10.0,
        }]);
        assert_eq!(assessment.level, RiskLevel::Low);
        assert_eq!(assessment.decision, RiskDecision::Allow);
    }

    #[test]
    fn weighted_mean_favors_higher_weight_source() {
        let mut agg = RiskAggregator::new();
        let assessment = agg.combine(&[
            RiskContribution {
                source: RiskSource::PromptInjection,
                score: 90.0,
            },
            RiskContribution {
                source: RiskSource::ShadowDom,
                score: 10.0,
            },
        ]);
        // weight 1.5 vs 0.8 — result should lean toward 90.
        assert!(assessment.score > 50.0);
    }

    #[test]
    fn three_active_sources_escalate() {
        let mut agg = RiskAggregator::new();
        let unescalated = {
            let mut probe = RiskAggregator::new();
            probe.combine(&[
                RiskContribution { source: RiskSource::Policy, score: 60.0 },
                RiskContribution { source: RiskSource::Semantic, score: 60.0 },
            ]).score
        };
        let escalated = agg.combine(&[
            RiskContribution { source: RiskSource::Policy, score: 60.0 },
            RiskContribution { source: RiskSource::Semantic, score: 60.0 },
            RiskContribution { source: RiskSource::HiddenContent, score: 60.0 },
        ]).score;
        assert!(escalated > unescalated);
    }

    #[test]
    fn honeypot_short_circuits_to_critical_block() {
        let mut agg = RiskAggregator::new();
        let assessment = agg.record_honeypot_trigger();
        assert_eq!(assessment.score, 100.0);
        assert_eq!(assessment.level, RiskLevel::Critical);
        assert_eq!(assessment.decision, RiskDecision::Block);
        assert_eq!(assessment.trust_delta, -100.0);
        assert!(assessment.honeypot_triggered);
    }

    #[test]
    fn evolution_series_caps_at_capacity() {
        let mut agg = RiskAggregator::new();
        for _ in 0..(RISK_EVOLUTION_CAPACITY + 10) {
            agg.combine(&[RiskContribution {
                source: RiskSource::Semantic,
                score: 20.0,
            }]);
        }
        assert_eq!(agg.evolution().len(), RISK_EVOLUTION_CAPACITY);
    }

    #[test]
    fn hallucination_detections_do_not_contribute_to_risk() {
        use std::time::Duration;
        let result = DetectionResult::none(ThreatKind::Hallucination, Duration::from_micros(1));
        assert!(RiskContribution::from_detection(&result).is_none());
    }

    #[test]
    fn prompt_injection_detections_map_to_their_risk_source() {
        use std::time::Duration;
        let mut result = DetectionResult::none(ThreatKind::PromptInjection, Duration::from_micros(1));
        result.score = 42.0;
        let contribution = RiskContribution::from_detection(&result).unwrap();
        assert_eq!(contribution.source, RiskSource::PromptInjection);
        assert_eq!(contribution.score, 42.0);
    }

    #[test]
    fn combine_records_ordered_contributors_and_breakdown() {
        let mut agg = RiskAggregator::new();
        let assessment = agg.combine(&[
            RiskContribution { source: RiskSource::PromptInjection, score: 80.0 },
            RiskContribution { source: RiskSource::ShadowDom, score: 0.0 },
        ]);
        assert_eq!(assessment.contributors.len(), 1);
        assert_eq!(assessment.contributors[0].source, RiskSource::PromptInjection);
        let breakdown = assessment.breakdown();
        assert_eq!(breakdown.get(&RiskSource::PromptInjection), Some(&80.0));
        assert!(breakdown.get(&RiskSource::ShadowDom).is_none());
    }

    #[test]
    fn honeypot_trigger_has_no_contributors() {
        let mut agg = RiskAggregator::new();
        let assessment = agg.record_honeypot_trigger();
        assert!(assessment.contributors.is_empty());
    }

    #[test]
    fn no_contributions_scores_zero() {
        let mut agg = RiskAggregator::new();
        let assessment = agg.combine(&[]);
        assert_eq!(assessment.score, 0.0);
        assert_eq!(assessment.decision, RiskDecision::Allow);
    }
}
