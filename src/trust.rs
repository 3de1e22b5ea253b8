//! Trust engine: tracks session and operator trust scores and decides
//! when an action needs human confirmation.

use serde::{Deserialize, Serialize};

/// Initial trust score assigned to a new session.
pub const INITIAL_SESSION_TRUST: f32 = 75.0;
/// Initial trust score assigned to a new operator.
pub const INITIAL_OPERATOR_TRUST: f32 = 50.0;

/// An event that adjusts a trust score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TrustEvent {
    /// A human operator manually overrode a decision in the agent's
    /// favor.
    HumanOverride,
    /// A previously flagged threat was confirmed real.
    ConfirmedThreat,
    /// An attack attempt was successfully blocked.
    AttackBlocked,
    /// The session completed without incident.
    SessionComplete,
    /// A flagged detection turned out to be a false positive.
    FalsePositive,
    /// An operator overrode policy to let an action through.
    PolicyOverride,
    /// A honeypot trap fired.
    HoneypotTriggered,
    /// A risk-aggregator-driven adjustment whose magnitude varies per
    /// assessment rather than being a fixed constant.
    RiskAdjustment,
}

impl TrustEvent {
    /// Raw delta before operator half-weighting, or `None` for
    /// [`Self::HoneypotTriggered`] which clamps to zero instead of
    /// applying a delta.
    #[must_use]
    fn delta(self) -> Option<f32> {
        match self {
            Self::HumanOverride => Some(10.0),
            Self::ConfirmedThreat => Some(15.0),
            Self::AttackBlocked => Some(5.0),
            Self::SessionComplete => Some(2.0),
            Self::FalsePositive => Some(-5.0),
            Self::PolicyOverride => Some(-3.0),
            Self::HoneypotTriggered | Self::RiskAdjustment => None,
        }
    }
}

/// Named trust tiers, derived from score thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TrustLevel {
    /// Score ≤ 25.
    Untrusted,
    /// Score ≤ 50.
    Cautious,
    /// Score ≤ 75.
    Trusted,
    /// Score > 75.
    Autonomous,
}

impl TrustLevel {
    #[must_use]
    fn from_score(score: f32) -> Self {
        if score <= 25.0 {
            Self::Untrusted
        } else if score <= 50.0 {
            Self::Cautious
        } else if score <= 75.0 {
            Self::Trusted
        } else {
            Self::Autonomous
        }
    }
}

/// A single recorded adjustment to a trust score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrustUpdate {
    /// The event that triggered this update.
    pub event: TrustEvent,
    /// Score before the update.
    pub previous: f32,
    /// Score after the update, clamped to \[0, 100\].
    pub new: f32,
    /// Signed delta actually applied.
    pub delta: f32,
    /// Human-readable reason, for forensic/event payloads.
    pub reason: String,
}

/// Tracks one principal's (session or operator) trust score and its
/// update history.
#[derive(Debug, Clone)]
pub struct TrustTrack {
    score: f32,
    is_operator: bool,
    history: Vec<TrustUpdate>,
}

impl TrustTrack {
    /// A new session trust track, initialized to
    /// [`INITIAL_SESSION_TRUST`].
    #[must_use]
    pub fn session() -> Self {
        Self {
            score: INITIAL_SESSION_TRUST,
            is_operator: false,
            history: Vec::new(),
        }
    }

    /// A new operator trust track, initialized to
    /// [`INITIAL_OPERATOR_TRUST`]. Operator adjustments apply at half
    /// weight — an operator's trust moves more conservatively than a
    /// session's.
    #[must_use]
    pub fn operator() -> Self {
        Self {
            score: INITIAL_OPERATOR_TRUST,
            is_operator: true,
            history: Vec::new(),
        }
    }

    /// Current trust score, 0–100.
    #[must_use]
    pub fn score(&self) -> f32 {
        self.score
    }

    /// Named tier for the current score.
    #[must_use]
    pub fn level(&self) -> TrustLevel {
        TrustLevel::from_score(self.score)
    }

    /// Full update history, oldest first.
    #[must_use]
    pub fn history(&self) -> &[TrustUpdate] {
        &self.history
    }

    /// Apply `event`, recording the resulting [`TrustUpdate`] and
    /// returning it.
    pub fn apply(&mut self, event: TrustEvent, reason: impl Into<String>) -> &TrustUpdate {
        let previous = self.score;

        let new_score = match event {
            TrustEvent::HoneypotTriggered => 0.0,
            _ => {
                let raw = event.delta().unwrap_or(0.0);
                let applied = if self.is_operator { raw * 0.5 } else { raw };
                (previous + applied).clamp(0.0, 100.0)
            }
        };

        let delta = new_score - previous;
        self.score = new_score;
        self.history.push(TrustUpdate {
            event,
            previous,
            new: new_score,
            delta,
            reason: reason.into(),
        });
        self.history.last().expect("just pushed")
    }

    /// Apply a risk-aggregator-derived delta of variable magnitude,
    /// recorded under [`TrustEvent::RiskAdjustment`].
    pub fn apply_risk_delta(&mut self, delta: f32, reason: impl Into<String>) -> &TrustUpdate {
        let previous = self.score;
        let applied = if self.is_operator { delta * 0.5 } else { delta };
        let new_score = (previous + applied).clamp(0.0, 100.0);
        self.score = new_score;
        self.history.push(TrustUpdate {
            event: TrustEvent::RiskAdjustment,
            previous,
            new: new_score,
            delta: new_score - previous,
            reason: reason.into(),
        });
        self.history.last().expect("just pushed")
    }

    /// Whether an action from this principal should require operator
    /// confirmation, given the current `risk_score` (0–100).
    ///
    /// Trust below 25 always requires confirmation. Between 25 and 50 it
    /// requires confirmation once risk exceeds 30; between 50 and 75,
    /// once risk exceeds 70. Above 75, the principal is autonomous and
    /// confirmation is never forced by trust alone.
    #[must_use]
    pub fn should_require_confirmation(&self, risk_score: f32) -> bool {
        if self.score < 25.0 {
            true
        } else if self.score < 50.0 {
            risk_score > 30.0
        } else if self.score < 75.0 {
            risk_score > 70.0
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_starts_at_seventy_five() {
        let track = TrustTrack::session();
        assert_eq!(track.score(), INITIAL_SESSION_TRUST);
        assert_eq!(track.level(), TrustLevel::Autonomous);
    }

    #[test]
    fn operator_starts_at_fifty() {
        let track = TrustTrack::operator();
        assert_eq!(track.score(), INITIAL_OPERATOR_TRUST);
        assert_eq!(track.level(), TrustLevel::Trusted);
    }

    #[test]
    fn operator_adjustment_applies_half_weight() {
        let mut track = TrustTrack::operator();
        track.apply(TrustEvent::HumanOverride, "manual approve");
        assert_eq!(track.score(), INITIAL_OPERATOR_TRUST + 5.0);
    }

    #[test]
    fn session_adjustment_applies_full_weight() {
        let mut track = TrustTrack::session();
        track.apply(TrustEvent::FalsePositive, "detector retracted");
        assert_eq!(track.score(), INITIAL_SESSION_TRUST - 5.0);
    }

    #[test]
    fn honeypot_trigger_zeroes_trust() {
        let mut track = TrustTrack::session();
        track.apply(TrustEvent::HoneypotTriggered, "trap fired");
        assert_eq!(track.score(), 0.0);
        assert_eq!(track.level(), TrustLevel::Untrusted);
    }

    #[test]
    fn score_clamps_to_one_hundred() {
        let mut track = TrustTrack::session();
        for _ in 0..10 {
            track.apply(TrustEvent::ConfirmedThreat, "repeated confirmations");
        }
        assert_eq!(track.score(), 100.0);
    }

    #[test]
    fn confirmation_required_below_twenty_five_regardless_of_risk() {
        let mut track = TrustTrack::session();
        track.apply(TrustEvent::HoneypotTriggered, "trap fired");
        assert!(track.should_require_confirmation(0.0));
    }

    #[test]
    fn cautious_tier_requires_confirmation_above_risk_threshold() {
        let mut track = TrustTrack::session();
        track.apply(TrustEvent::HoneypotTriggered, "zeroed for test");
        track.apply(TrustEvent::AttackBlocked, "recovering trust");
        // score now 5.0 -> still untrusted tier, always confirm.
        assert!(track.should_require_confirmation(10.0));
    }

    #[test]
    fn risk_delta_applies_full_weight_for_sessions() {
        let mut track = TrustTrack::session();
        track.apply_risk_delta(-30.0, "high combined risk");
        assert_eq!(track.score(), INITIAL_SESSION_TRUST - 30.0);
    }

    #[test]
    fn risk_delta_applies_half_weight_for_operators() {
        let mut track = TrustTrack::operator();
        track.apply_risk_delta(-30.0, "high combined risk");
        assert_eq!(track.score(), INITIAL_OPERATOR_TRUST - 15.0);
    }

    #[test]
    fn history_records_every_update() {
        let mut track = TrustTrack::session();
        track.apply(TrustEvent::AttackBlocked, "one");
        track.apply(TrustEvent::SessionComplete, "two");
        assert_eq!(track.history().len(), 2);
    }
}
