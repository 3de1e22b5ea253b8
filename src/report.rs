//! Session report export: a structured summary built from a session's
//! forensic history, metrics, and policy decision log, with a Markdown
//! rendering produced mechanically from the same structure.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::forensics::{CriticalMoment, CriticalMomentType, ForensicBuffer};
use crate::metrics::Counters;
use crate::session::Session;

/// Most recent policy decisions kept in a report — older entries are
/// dropped once a session's log grows past this.
pub const POLICY_LOG_TAIL: usize = 20;

/// Most recent critical moments rendered in the Markdown report body.
pub const MARKDOWN_CRITICAL_MOMENTS_LIMIT: usize = 5;

/// One audited policy decision, in the order it was rendered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyDecisionRecord {
    /// When the decision was rendered.
    pub timestamp: DateTime<Utc>,
    /// Short description of the action evaluated.
    pub action: String,
    /// The rendered decision (`ALLOW`/`CONFIRM`/`BLOCK`).
    pub decision: String,
    /// The policy rule that fired, if any.
    pub rule: Option<String>,
    /// Human-readable explanation.
    pub reason: String,
}

/// A complete, exportable session report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionReport {
    /// The session this report covers.
    pub session_id: String,
    /// When this report was generated.
    pub generated_at: DateTime<Utc>,
    /// Report schema version.
    pub version: String,
    /// Wall-clock duration spanned by the session's recorded actions.
    pub duration_seconds: f64,
    /// Total actions evaluated.
    pub total_actions: u64,
    /// Total threats detected across the session.
    pub threats_detected: u64,
    /// Total actions blocked by policy.
    pub actions_blocked: u64,
    /// Operator-labeled false positives.
    pub false_positives: u64,
    /// Highest risk score observed.
    pub peak_risk_score: f32,
    /// Risk score at report generation time.
    pub final_risk_score: f32,
    /// Trust score at report generation time.
    pub final_trust_score: f32,
    /// Critical-moment kind → count.
    pub threat_breakdown: HashMap<String, u64>,
    /// Ordered policy decisions, most recent [`POLICY_LOG_TAIL`] only.
    pub policy_decisions: Vec<PolicyDecisionRecord>,
    /// The risk-evolution series, oldest first.
    pub risk_evolution: Vec<f32>,
    /// Derived critical moments, oldest first.
    pub critical_moments: Vec<CriticalMoment>,
}

impl SessionReport {
    /// Build a report from a session's current state, forensic buffer,
    /// accumulated metrics counters, and policy decision log.
    #[must_use]
    pub fn generate(
        session: &Session,
        forensics: &ForensicBuffer,
        counters: &Counters,
        policy_log: &[PolicyDecisionRecord],
    ) -> Self {
        let summary = forensics.session_summary();
        let critical_moments = forensics.critical_moments().to_vec();

        let mut threat_breakdown: HashMap<String, u64> = HashMap::new();
        for moment in &critical_moments {
            if matches!(
                moment.moment_type,
                CriticalMomentType::ThreatDetected | CriticalMomentType::HoneypotTrigger
            ) {
                *threat_breakdown.entry(moment_kind_label(moment.moment_type)).or_insert(0) += 1;
            }
        }

        let actions_blocked = policy_log
            .iter()
            .filter(|d| d.decision == "BLOCK")
            .count() as u64;

        let tail_start = policy_log.len().saturating_sub(POLICY_LOG_TAIL);

        Self {
            session_id: session.id.clone(),
            generated_at: Utc::now(),
            version: "1.0".to_string(),
            duration_seconds: summary.duration.num_milliseconds() as f64 / 1000.0,
            total_actions: counters.actions_total,
            threats_detected: summary.threat_count,
            actions_blocked,
            false_positives: counters.operator_false_positives,
            peak_risk_score: summary.peak_risk,
            final_risk_score: session.risk_score as f32,
            final_trust_score: session.trust_score,
            threat_breakdown,
            policy_decisions: policy_log[tail_start..].to_vec(),
            risk_evolution: forensics.risk_evolution_series(),
            critical_moments,
        }
    }

    /// Render this report as Markdown, mechanically from the same
    /// fields `generate` populated — no independent data path.
    #[must_use]
    pub fn to_markdown(&self) -> String {
        let status = if self.peak_risk_score >= 75.0 {
            "HIGH RISK"
        } else if self.peak_risk_score >= 50.0 {
            "MEDIUM RISK"
        } else {
            "LOW RISK"
        };

        let mut md = String::new();
        md.push_str("# Session Security Report\n\n");
        md.push_str(&format!("## Session: `{}`\n\n", self.session_id));
        md.push_str(&format!(
            "**Generated:** {}  \n**Status:** {status}\n\n---\n\n",
            self.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
        ));

        md.push_str("## Summary\n\n| Metric | Value |\n|--------|-------|\n");
        md.push_str(&format!("| Duration | {:.1}s |\n", self.duration_seconds));
        md.push_str(&format!("| Total Actions | {} |\n", self.total_actions));
        md.push_str(&format!("| Threats Detected | {} |\n", self.threats_detected));
        md.push_str(&format!("| Actions Blocked | {} |\n", self.actions_blocked));
        md.push_str(&format!("| False Positives | {} |\n\n---\n\n", self.false_positives));

        md.push_str("## Risk Scores\n\n| Metric | Value |\n|--------|-------|\n");
        md.push_str(&format!("| Peak Risk Score | **{:.0}** |\n", self.peak_risk_score));
        md.push_str(&format!("| Final Risk Score | {:.0} |\n", self.final_risk_score));
        md.push_str(&format!("| Final Trust Score | {:.1} |\n\n---\n\n", self.final_trust_score));

        md.push_str("## Threat Breakdown\n\n");
        if self.threat_breakdown.is_empty() {
            md.push_str("- No threats detected\n");
        } else {
            let mut entries: Vec<_> = self.threat_breakdown.iter().collect();
            entries.sort_by_key(|(kind, _)| kind.clone());
            for (kind, count) in entries {
                md.push_str(&format!("- **{kind}**: {count}\n"));
            }
        }

        md.push_str("\n---\n\n## Critical Moments\n\n");
        if self.critical_moments.is_empty() {
            md.push_str("- No critical moments recorded\n");
        } else {
            for (i, moment) in self
                .critical_moments
                .iter()
                .rev()
                .take(MARKDOWN_CRITICAL_MOMENTS_LIMIT)
                .rev()
                .enumerate()
            {
                md.push_str(&format!(
                    "{}. **{:?}** - {}\n",
                    i + 1,
                    moment.moment_type,
                    moment.description
                ));
            }
        }

        md.push_str("\n---\n\n*Generated by sentinel-core's session report export*\n");
        md
    }
}

fn moment_kind_label(kind: CriticalMomentType) -> String {
    format!("{kind:?}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forensics::SnapshotType;

    fn session() -> Session {
        Session::new(Some("https://example.com".to_string()))
    }

    #[test]
    fn generate_counts_blocked_actions_from_policy_log() {
        let sess = session();
        let forensics = ForensicBuffer::new(10);
        let counters = Counters::default();
        let log = vec![
            PolicyDecisionRecord {
                timestamp: Utc::now(),
                action: "navigate".to_string(),
                decision: "BLOCK".to_string(),
                rule: Some("blocked-domain".to_string()),
                reason: "blocked domain".to_string(),
            },
            PolicyDecisionRecord {
                timestamp: Utc::now(),
                action: "click".to_string(),
                decision: "ALLOW".to_string(),
                rule: None,
                reason: "ok".to_string(),
            },
        ];
        let report = SessionReport::generate(&sess, &forensics, &counters, &log);
        assert_eq!(report.actions_blocked, 1);
        assert_eq!(report.policy_decisions.len(), 2);
    }

    #[test]
    fn policy_log_is_truncated_to_tail() {
        let sess = session();
        let forensics = ForensicBuffer::new(10);
        let counters = Counters::default();
        let log: Vec<_> = (0..(POLICY_LOG_TAIL + 10))
            .map(|i| PolicyDecisionRecord {
                timestamp: Utc::now(),
                action: format!("action-{i}"),
                decision: "ALLOW".to_string(),
                rule: None,
                reason: String::new(),
            })
            .collect();
        let report = SessionReport::generate(&sess, &forensics, &counters, &log);
        assert_eq!(report.policy_decisions.len(), POLICY_LOG_TAIL);
        assert_eq!(report.policy_decisions[0].action, format!("action-{}", 10));
    }

    #[test]
    fn markdown_rendering_reflects_no_threats_and_no_moments() {
        let sess = session();
        let forensics = ForensicBuffer::new(10);
        let counters = Counters::default();
        let report = SessionReport::generate(&sess, &forensics, &counters, &[]);
        let md = report.to_markdown();
        assert!(md.contains("No threats detected"));
        assert!(md.contains("No critical moments recorded"));
        assert!(md.contains("LOW RISK"));
    }

    #[test]
    fn threat_breakdown_counts_critical_moments_by_kind() {
        let sess = session();
        let mut forensics = ForensicBuffer::new(10);
        forensics.record(SnapshotType::Threat, "ref-1", "prompt injection detected", Some(80.0), None, 4);
        let counters = Counters::default();
        let report = SessionReport::generate(&sess, &forensics, &counters, &[]);
        assert_eq!(report.threat_breakdown.get("ThreatDetected"), Some(&1));
    }
}
