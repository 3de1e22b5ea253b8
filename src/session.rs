//! Session data model: the per-agent-run state the core tracks across
//! a sequence of proposed actions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The agent's current phase of activity within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionState {
    /// Session created, no actions observed yet.
    Initializing,
    /// Passively observing the page, no actions proposed.
    Observing,
    /// Actively proposing and executing actions.
    Acting,
    /// An action was blocked; the session is paused pending resolution.
    Blocked,
    /// The session has been judged compromised — no further actions are
    /// accepted.
    Compromised,
    /// The session has ended.
    Terminated,
}

impl SessionState {
    /// `true` for states that must reject every further proposed
    /// action — [`Self::Compromised`] and [`Self::Terminated`].
    #[must_use]
    pub fn rejects_actions(self) -> bool {
        matches!(self, Self::Compromised | Self::Terminated)
    }
}

/// A single agent-driving session under sentinel supervision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Opaque session identifier.
    pub id: String,
    /// The page the agent was initially pointed at, if known.
    pub target_url: Option<String>,
    /// Current phase of activity.
    pub state: SessionState,
    /// Current aggregate risk score, 0–100.
    pub risk_score: u8,
    /// Current trust score, 0–100 (real-valued; the trust engine tracks
    /// finer precision internally, this is the session's rounded public
    /// snapshot).
    pub trust_score: f32,
    /// Current DEFCON level, 1 (calm) to 5 (critical).
    pub defcon_level: u8,
    /// Total proposed actions evaluated so far.
    pub action_count: u64,
    /// When the session was created.
    pub created_at: DateTime<Utc>,
    /// When the session was terminated, if it has been.
    pub terminated_at: Option<DateTime<Utc>>,
    /// The operator's cross-session trust score, injected from outside
    /// the core (the core does not own operator-trust storage — see
    /// [`crate::trust::TrustTrack::operator`]) so that
    /// `should_require_confirmation` has a value to read per session.
    pub operator_trust: f32,
}

impl Session {
    /// Start a new session in [`SessionState::Initializing`] with a
    /// freshly generated id.
    #[must_use]
    pub fn new(target_url: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            target_url,
            state: SessionState::Initializing,
            risk_score: 0,
            trust_score: crate::trust::INITIAL_SESSION_TRUST,
            defcon_level: 1,
            action_count: 0,
            created_at: Utc::now(),
            terminated_at: None,
            operator_trust: crate::trust::INITIAL_OPERATOR_TRUST,
        }
    }

    /// `true` if this session must reject further actions.
    #[must_use]
    pub fn rejects_actions(&self) -> bool {
        self.state.rejects_actions()
    }

    /// Record that an action was evaluated, incrementing the counter and
    /// moving out of `Initializing` into `Acting` if this is the first
    /// one.
    pub fn record_action(&mut self) {
        self.action_count += 1;
        if self.state == SessionState::Initializing {
            self.state = SessionState::Acting;
        }
    }

    /// Transition into [`SessionState::Blocked`].
    pub fn mark_blocked(&mut self) {
        self.state = SessionState::Blocked;
    }

    /// Transition into [`SessionState::Compromised`] — terminal, no
    /// further actions accepted.
    pub fn mark_compromised(&mut self) {
        self.state = SessionState::Compromised;
    }

    /// Transition into [`SessionState::Terminated`], stamping
    /// `terminated_at`.
    pub fn terminate(&mut self) {
        self.state = SessionState::Terminated;
        self.terminated_at = Some(Utc::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_session_starts_initializing_with_default_scores() {
        let session = Session::new(Some("https://example.com".to_string()));
        assert_eq!(session.state, SessionState::Initializing);
        assert_eq!(session.risk_score, 0);
        assert_eq!(session.trust_score, crate::trust::INITIAL_SESSION_TRUST);
        assert_eq!(session.defcon_level, 1);
        assert!(!session.rejects_actions());
    }

    #[test]
    fn recording_first_action_moves_to_acting() {
        let mut session = Session::new(None);
        session.record_action();
        assert_eq!(session.state, SessionState::Acting);
        assert_eq!(session.action_count, 1);
    }

    #[test]
    fn compromised_and_terminated_reject_actions() {
        let mut session = Session::new(None);
        session.mark_compromised();
        assert!(session.rejects_actions());

        let mut other = Session::new(None);
        other.terminate();
        assert!(other.rejects_actions());
        assert!(other.terminated_at.is_some());
    }

    #[test]
    fn blocked_session_still_accepts_future_resolution() {
        let mut session = Session::new(None);
        session.mark_blocked();
        assert!(!session.rejects_actions());
        assert_eq!(session.state, SessionState::Blocked);
    }
}
