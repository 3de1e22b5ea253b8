//! [`SentinelCore`] — the context object tying every component
//! together for a single process.
//!
//! Rather than a set of global singletons, one `SentinelCore` owns all
//! session-keyed state (policy, risk, trust, forensics, honeypots) plus
//! the shared config, event orchestrator, and metrics aggregator. The
//! straight-line control flow in [`SentinelCore::evaluate_action`] is
//! the single place that sequences them: policy first (a hard block
//! skips everything downstream), then the honeypot check, then risk
//! combination, trust adjustment, forensic capture, event emission, and
//! metrics bookkeeping.

use std::collections::HashMap;
use std::time::Instant;

use parking_lot::RwLock;
use serde_json::json;

use crate::action::ProposedAction;
use crate::config::SentinelConfig;
use crate::detection::DetectionResult;
use crate::error::SentinelError;
use crate::events::{EventOrchestrator, EventType};
use crate::forensics::{ForensicBuffer, SnapshotType};
use crate::honeypot::HoneypotRegistry;
use crate::metrics::MetricsAggregator;
use crate::policy::{PolicyDecision, PolicyStore};
use crate::report::{PolicyDecisionRecord, SessionReport};
use crate::risk::{RiskAggregator, RiskContribution, RiskDecision, RiskSource};
use crate::session::Session;
use crate::trust::{TrustEvent, TrustTrack};

/// The final decision rendered for a proposed action, after policy,
/// honeypot, and risk evaluation have all run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoreDecision {
    /// Proceed normally.
    Allow,
    /// Require operator confirmation before proceeding.
    Confirm,
    /// Block the action.
    Block,
}

impl CoreDecision {
    #[must_use]
    fn as_str(self) -> &'static str {
        match self {
            Self::Allow => "ALLOW",
            Self::Confirm => "CONFIRM",
            Self::Block => "BLOCK",
        }
    }
}

/// The full result of evaluating one proposed action through the
/// pipeline.
#[derive(Debug, Clone)]
pub struct ActionEvaluation {
    /// The rendered decision.
    pub decision: CoreDecision,
    /// Explanation of why this decision was reached.
    pub explanation: String,
    /// The policy rule that fired, if any.
    pub policy_rule: Option<String>,
    /// Combined risk score after this evaluation, 0–100.
    pub risk_score: f32,
    /// Session trust score after this evaluation, 0–100.
    pub trust_score: f32,
    /// Session DEFCON level after this evaluation.
    pub defcon_level: u8,
    /// Whether a honeypot trap fired during this evaluation.
    pub honeypot_triggered: bool,
}

struct SessionRecord {
    session: Session,
    trust: TrustTrack,
    risk: RiskAggregator,
    forensics: ForensicBuffer,
    honeypot: HoneypotRegistry,
    policy_log: Vec<PolicyDecisionRecord>,
}

/// Owns every session's state and the shared collaborators — policy
/// store, event orchestrator, metrics aggregator — for one process.
pub struct SentinelCore {
    config: SentinelConfig,
    policy: PolicyStore,
    events: EventOrchestrator,
    metrics: RwLock<MetricsAggregator>,
    sessions: RwLock<HashMap<String, SessionRecord>>,
}

impl SentinelCore {
    /// Build a core from `config`, with an empty policy store (seeded
    /// with the default global policy) and no sessions.
    #[must_use]
    pub fn new(config: SentinelConfig) -> Self {
        let event_capacity = config.event_history_capacity;
        Self {
            config,
            policy: PolicyStore::new(),
            events: EventOrchestrator::new(event_capacity),
            metrics: RwLock::new(MetricsAggregator::new()),
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// The process-wide pipeline configuration this core was built from.
    #[must_use]
    pub fn config(&self) -> &SentinelConfig {
        &self.config
    }

    /// Reference to the shared policy store, for out-of-band reads or
    /// hot reloads.
    #[must_use]
    pub fn policy(&self) -> &PolicyStore {
        &self.policy
    }

    /// Reference to the event orchestrator, for subscribing to a
    /// session's event stream.
    #[must_use]
    pub fn events(&self) -> &EventOrchestrator {
        &self.events
    }

    /// Create a new session targeting `target_url`, seeding its trust
    /// track, risk aggregator, forensic buffer, and honeypot registry.
    ///
    /// # Errors
    ///
    /// Returns [`SentinelError::Honeypot`] if the honeypot registry
    /// fails to build.
    pub fn create_session(&self, target_url: Option<String>) -> Result<String, SentinelError> {
        let session = Session::new(target_url);
        let id = session.id.clone();
        let honeypot = HoneypotRegistry::new(id.clone())?;

        let record = SessionRecord {
            session,
            trust: TrustTrack::session(),
            risk: RiskAggregator::new(),
            forensics: ForensicBuffer::new(self.config.forensic_ring_capacity),
            honeypot,
            policy_log: Vec::new(),
        };

        self.sessions.write().insert(id.clone(), record);
        Ok(id)
    }

    /// Look up a session's current public state.
    #[must_use]
    pub fn session(&self, session_id: &str) -> Option<Session> {
        self.sessions
            .read()
            .get(session_id)
            .map(|r| r.session.clone())
    }

    /// Terminate a session, rejecting all future actions against it.
    pub fn terminate_session(&self, session_id: &str) {
        if let Some(record) = self.sessions.write().get_mut(session_id) {
            record.session.terminate();
        }
    }

    /// Build a [`SessionReport`] from `session_id`'s current forensic
    /// history, metrics, and policy decision log.
    #[must_use]
    pub fn report(&self, session_id: &str) -> Option<SessionReport> {
        let sessions = self.sessions.read();
        let record = sessions.get(session_id)?;
        let counters = self.metrics.read().session_counters(session_id);
        Some(SessionReport::generate(
            &record.session,
            &record.forensics,
            &counters,
            &record.policy_log,
        ))
    }

    /// The DEFCON level `risk_score`/`honeypot_triggered` imply, per the
    /// same escalation table the event orchestrator uses for
    /// `RISK_UPDATE` events.
    fn implied_defcon(risk_score: f32, honeypot_triggered: bool) -> u8 {
        if honeypot_triggered {
            5
        } else if risk_score >= 90.0 {
            5
        } else if risk_score >= 75.0 {
            4
        } else if risk_score >= 50.0 {
            3
        } else {
            1
        }
    }

    /// Evaluate `action` proposed within `session_id`.
    ///
    /// `detections` carries pre-computed detection-library results for
    /// this action (DOM/script evidence scanned upstream by the
    /// detection library against the current page); core combines them
    /// with the policy outcome rather than re-running detectors itself.
    ///
    /// # Errors
    ///
    /// Returns [`SentinelError::UnknownSession`] if `session_id` does
    /// not exist, or [`SentinelError::SessionTerminated`] if the session
    /// is compromised or terminated.
    pub async fn evaluate_action(
        &self,
        session_id: &str,
        action: &ProposedAction,
        detections: &[DetectionResult],
    ) -> Result<ActionEvaluation, SentinelError> {
        let start = Instant::now();

        let current_trust = {
            let mut sessions = self.sessions.write();
            let record = sessions
                .get_mut(session_id)
                .ok_or_else(|| SentinelError::UnknownSession(session_id.to_string()))?;

            if record.session.rejects_actions() {
                return Err(SentinelError::SessionTerminated(session_id.to_string()));
            }

            record.session.record_action();
            record.trust.score()
        };

        let policy_eval = self.policy.evaluate(session_id, action, current_trust);

        if policy_eval.decision == PolicyDecision::Block {
            return self
                .finish(
                    session_id,
                    action,
                    CoreDecision::Block,
                    policy_eval.explanation.clone(),
                    policy_eval.rule_triggered.clone(),
                    policy_eval.score,
                    -30.0,
                    false,
                    start,
                )
                .await;
        }

        let honeypot_trigger = {
            let sessions = self.sessions.read();
            sessions
                .get(session_id)
                .and_then(|record| record.honeypot.evaluate(action))
        };

        if honeypot_trigger.is_some() {
            return self
                .finish(
                    session_id,
                    action,
                    CoreDecision::Block,
                    "honeypot trap triggered".to_string(),
                    None,
                    100.0,
                    -100.0,
                    true,
                    start,
                )
                .await;
        }

        let mut contributions: Vec<RiskContribution> = detections
            .iter()
            .filter_map(RiskContribution::from_detection)
            .collect();
        if policy_eval.score > 0.0 {
            contributions.push(RiskContribution {
                source: RiskSource::Policy,
                score: policy_eval.score,
            });
        }

        let assessment = {
            let mut sessions = self.sessions.write();
            let record = sessions
                .get_mut(session_id)
                .ok_or_else(|| SentinelError::UnknownSession(session_id.to_string()))?;
            record.risk.combine(&contributions)
        };

        let mut decision = if policy_eval.decision == PolicyDecision::Confirm {
            CoreDecision::Confirm
        } else {
            match assessment.decision {
                RiskDecision::Block => CoreDecision::Block,
                RiskDecision::Confirm => CoreDecision::Confirm,
                RiskDecision::Allow => CoreDecision::Allow,
            }
        };

        if decision == CoreDecision::Allow {
            let requires_confirmation = {
                let sessions = self.sessions.read();
                sessions
                    .get(session_id)
                    .is_some_and(|record| record.trust.should_require_confirmation(assessment.score))
            };
            if requires_confirmation {
                decision = CoreDecision::Confirm;
            }
        }

        let explanation = if decision == CoreDecision::Allow {
            "action permitted".to_string()
        } else {
            format!(
                "combined risk score {:.1} ({:?})",
                assessment.score, assessment.level
            )
        };

        self.finish(
            session_id,
            action,
            decision,
            explanation,
            policy_eval.rule_triggered.clone(),
            assessment.score,
            assessment.trust_delta,
            false,
            start,
        )
        .await
    }

    #[allow(clippy::too_many_arguments)]
    async fn finish(
        &self,
        session_id: &str,
        action: &ProposedAction,
        decision: CoreDecision,
        explanation: String,
        policy_rule: Option<String>,
        risk_score: f32,
        trust_delta: f32,
        honeypot_triggered: bool,
        start: Instant,
    ) -> Result<ActionEvaluation, SentinelError> {
        let proposed_defcon = Self::implied_defcon(risk_score, honeypot_triggered);
        let defcon_level = self.events.promote_defcon(session_id, proposed_defcon);

        let trust_score = {
            let mut sessions = self.sessions.write();
            let record = sessions
                .get_mut(session_id)
                .ok_or_else(|| SentinelError::UnknownSession(session_id.to_string()))?;

            if honeypot_triggered {
                record.trust.apply(TrustEvent::HoneypotTriggered, "honeypot trap fired");
                record.forensics.capture_honeypot_trigger(explanation.clone());
            } else {
                record.trust.apply_risk_delta(trust_delta, explanation.clone());
            }

            record.session.risk_score = risk_score.round().clamp(0.0, 100.0) as u8;
            record.session.trust_score = record.trust.score();
            record.session.defcon_level = defcon_level;

            if honeypot_triggered {
                record.session.mark_compromised();
            } else if decision == CoreDecision::Block {
                record.session.mark_blocked();
            }

            record.forensics.record(
                SnapshotType::Action,
                ForensicBuffer::content_hash(&format!("{action:?}")),
                explanation.clone(),
                Some(risk_score),
                Some(record.trust.score()),
                defcon_level,
            );

            record.policy_log.push(PolicyDecisionRecord {
                timestamp: chrono::Utc::now(),
                action: format!("{action:?}"),
                decision: decision.as_str().to_string(),
                rule: policy_rule.clone(),
                reason: explanation.clone(),
            });

            record.trust.score()
        };

        let latency_ms = start.elapsed().as_secs_f64() * 1000.0;

        self.events
            .emit(
                EventType::ActionDecision,
                session_id,
                json!({
                    "decision": decision.as_str(),
                    "explanation": explanation,
                    "policyRule": policy_rule,
                    "riskScore": risk_score,
                    "trustScore": trust_score,
                    "honeypotTriggered": honeypot_triggered,
                }),
                latency_ms,
            )
            .await;

        if honeypot_triggered {
            self.events
                .emit(EventType::HoneyPromptTriggered, session_id, json!({}), latency_ms)
                .await;
            // Honeypot triggers pre-empt the rest of the pipeline and
            // terminate the session outright, rather than merely
            // blocking a single action.
            self.events
                .emit(
                    EventType::SessionTerminated,
                    session_id,
                    json!({"reason": "honeypot trap triggered"}),
                    latency_ms,
                )
                .await;
        }

        let successful = decision == CoreDecision::Allow;
        let mut metrics = self.metrics.write();
        if decision == CoreDecision::Block && (honeypot_triggered || risk_score >= 70.0) {
            metrics.record_threat_blocked(session_id);
        }
        metrics.record_action(session_id, successful, latency_ms);
        drop(metrics);

        Ok(ActionEvaluation {
            decision,
            explanation,
            policy_rule,
            risk_score,
            trust_score,
            defcon_level,
            honeypot_triggered,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn core() -> SentinelCore {
        SentinelCore::new(SentinelConfig::default())
    }

    #[tokio::test]
    async fn benign_action_is_allowed() {
        let core = core();
        let session_id = core
            .create_session(Some("https://example.com".to_string()))
            .unwrap();
        let action = ProposedAction::navigate("https://example.com/about");
        let result = core.evaluate_action(&session_id, &action, &[]).await.unwrap();
        assert_eq!(result.decision, CoreDecision::Allow);
    }

    #[tokio::test]
    async fn unknown_session_errors() {
        let core = core();
        let action = ProposedAction::navigate("https://example.com");
        let result = core.evaluate_action("does-not-exist", &action, &[]).await;
        assert!(matches!(result, Err(SentinelError::UnknownSession(_))));
    }

    #[tokio::test]
    async fn blocked_domain_is_blocked_before_risk_combination() {
        let core = core();
        let session_id = core.create_session(None).unwrap();
        let action = ProposedAction::navigate("https://totally-evil.xyz");
        let result = core.evaluate_action(&session_id, &action, &[]).await.unwrap();
        assert_eq!(result.decision, CoreDecision::Block);
    }

    #[tokio::test]
    async fn terminated_session_rejects_further_actions() {
        let core = core();
        let session_id = core.create_session(None).unwrap();
        core.terminate_session(&session_id);
        let action = ProposedAction::navigate("https://example.com");
        let result = core.evaluate_action(&session_id, &action, &[]).await;
        assert!(matches!(result, Err(SentinelError::SessionTerminated(_))));
    }

    #[tokio::test]
    async fn report_reflects_evaluated_actions() {
        let core = core();
        let session_id = core.create_session(None).unwrap();
        let action = ProposedAction::navigate("https://totally-evil.xyz");
        core.evaluate_action(&session_id, &action, &[]).await.unwrap();
        let report = core.report(&session_id).unwrap();
        assert_eq!(report.session_id, session_id);
        assert_eq!(report.policy_decisions.len(), 1);
        assert_eq!(report.actions_blocked, 1);
    }

    #[tokio::test]
    async fn honeypot_trigger_blocks_and_zeroes_trust() {
        let core = core();
        let session_id = core.create_session(None).unwrap();
        let trap_id = {
            let sessions = core.sessions.read();
            sessions.get(&session_id).unwrap().honeypot.traps()[0].id.clone()
        };
        let action = ProposedAction::click(format!("#{trap_id}"));
        let result = core.evaluate_action(&session_id, &action, &[]).await.unwrap();
        assert!(result.honeypot_triggered);
        assert_eq!(result.decision, CoreDecision::Block);
        assert_eq!(result.trust_score, 0.0);
        assert_eq!(result.defcon_level, 5);
    }

    #[tokio::test]
    async fn honeypot_trigger_marks_session_compromised_and_emits_termination() {
        let core = core();
        let session_id = core.create_session(None).unwrap();
        let trap_id = {
            let sessions = core.sessions.read();
            sessions.get(&session_id).unwrap().honeypot.traps()[0].id.clone()
        };
        let action = ProposedAction::click(format!("#{trap_id}"));
        core.evaluate_action(&session_id, &action, &[]).await.unwrap();

        let session = core.session(&session_id).unwrap();
        assert_eq!(session.state, crate::session::SessionState::Compromised);

        let history = core.events().history(&session_id);
        assert!(history.iter().any(|e| e.event_type == EventType::SessionTerminated));
    }

    #[tokio::test]
    async fn deeply_untrusted_session_requires_confirmation_regardless_of_risk() {
        let core = core();
        let session_id = core.create_session(None).unwrap();
        {
            let mut sessions = core.sessions.write();
            let record = sessions.get_mut(&session_id).unwrap();
            // Drain trust below 25, where `should_require_confirmation`
            // always fires, even for a benign, otherwise-Allow action.
            for _ in 0..11 {
                record.trust.apply(TrustEvent::FalsePositive, "drain");
            }
        }
        let action = ProposedAction::navigate("https://example.com/benign");
        let result = core.evaluate_action(&session_id, &action, &[]).await.unwrap();
        assert_eq!(result.decision, CoreDecision::Confirm);
    }

    #[tokio::test]
    async fn session_rejects_actions_after_being_marked_compromised() {
        let core = core();
        let session_id = core.create_session(None).unwrap();
        {
            let mut sessions = core.sessions.write();
            sessions.get_mut(&session_id).unwrap().session.mark_compromised();
        }
        let action = ProposedAction::navigate("https://example.com");
        let result = core.evaluate_action(&session_id, &action, &[]).await;
        assert!(matches!(result, Err(SentinelError::SessionTerminated(_))));
    }
}
