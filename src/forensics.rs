//! Forensic ring buffer: a bounded, queryable audit trail of snapshots
//! and derived critical moments for a session.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use rustc_hash::FxHasher;
use serde::{Deserialize, Serialize};
use std::hash::Hasher;

/// Default ring buffer capacity, per
/// [`crate::config::SentinelConfig::forensic_ring_capacity`].
pub const DEFAULT_CAPACITY: usize = 120;

/// The kind of state a [`Snapshot`] records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SnapshotType {
    /// A DOM tree observation.
    DomState,
    /// A visual screenshot reference.
    Screenshot,
    /// A proposed or executed action.
    Action,
    /// A detected threat.
    Threat,
    /// A risk score update.
    RiskUpdate,
    /// A trust score update.
    TrustUpdate,
    /// A policy engine decision.
    PolicyDecision,
    /// A session state transition.
    StateChange,
}

/// A single recorded observation in the forensic ring buffer.
///
/// Large payloads (DOM trees, screenshots) are stored by reference — a
/// content hash or external id — never inline, so the buffer's memory
/// footprint stays bounded regardless of page size.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    /// Monotonic index within the session, assigned at insertion.
    pub index: u64,
    /// When this snapshot was recorded.
    pub timestamp: DateTime<Utc>,
    /// What kind of state this snapshot records.
    pub snapshot_type: SnapshotType,
    /// Reference to the payload (content hash, forensic store key, …) —
    /// never the payload itself.
    pub payload_ref: String,
    /// Risk score at the time of this snapshot, if relevant.
    pub risk_score: Option<f32>,
    /// Trust score at the time of this snapshot, if relevant.
    pub trust_score: Option<f32>,
    /// DEFCON level at the time of this snapshot.
    pub defcon_level: u8,
    /// Free-form summary for display/audit.
    pub summary: String,
}

/// The kind of derived critical moment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CriticalMomentType {
    /// A sharp increase in risk score.
    RiskSpike,
    /// A threat was detected.
    ThreatDetected,
    /// An action was blocked.
    ActionBlocked,
    /// A honeypot trap fired.
    HoneypotTrigger,
    /// A sharp decrease in trust score.
    TrustDrop,
    /// A session state transition.
    StateTransition,
}

/// A critical moment derived from the snapshot stream — the subset of
/// history worth surfacing to an operator without replaying everything.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CriticalMoment {
    /// Index of the snapshot this moment was derived from.
    pub snapshot_index: u64,
    /// When it occurred.
    pub timestamp: DateTime<Utc>,
    /// What kind of critical moment this is.
    pub moment_type: CriticalMomentType,
    /// Severity, 1 (least) to 5 (most) — matches
    /// [`crate::pipeline::outcome::Severity::as_rank`]'s scale.
    pub severity: u8,
    /// Human-readable description.
    pub description: String,
}

/// Aggregate statistics for a session's recorded history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSummary {
    /// Highest risk score observed.
    pub peak_risk: f32,
    /// Mean risk score across all risk-bearing snapshots.
    pub average_risk: f32,
    /// Wall-clock duration spanned by the buffer's contents.
    pub duration: chrono::Duration,
    /// Count of `Threat` snapshots.
    pub threat_count: u64,
    /// Count of actions blocked (derived from `ActionBlocked` critical
    /// moments).
    pub block_count: u64,
}

/// Bounded per-session ring buffer of [`Snapshot`]s plus derived
/// [`CriticalMoment`]s.
pub struct ForensicBuffer {
    capacity: usize,
    snapshots: VecDeque<Snapshot>,
    critical_moments: Vec<CriticalMoment>,
    next_index: u64,
    last_risk: Option<f32>,
    last_trust: Option<f32>,
}

impl ForensicBuffer {
    /// Build a buffer with the given ring capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            snapshots: VecDeque::with_capacity(capacity),
            critical_moments: Vec::new(),
            next_index: 0,
            last_risk: None,
            last_trust: None,
        }
    }

    /// Hash arbitrary DOM/script content into a short, content-addressed
    /// reference suitable for `Snapshot::payload_ref`.
    #[must_use]
    pub fn content_hash(content: &str) -> String {
        let mut hasher = FxHasher::default();
        hasher.write(content.as_bytes());
        format!("{:016x}", hasher.finish())
    }

    /// Record a snapshot, deriving any critical moments it implies, and
    /// evicting the oldest entry if the buffer is at capacity.
    pub fn record(
        &mut self,
        snapshot_type: SnapshotType,
        payload_ref: impl Into<String>,
        summary: impl Into<String>,
        risk_score: Option<f32>,
        trust_score: Option<f32>,
        defcon_level: u8,
    ) -> u64 {
        let index = self.next_index;
        self.next_index += 1;

        let snapshot = Snapshot {
            index,
            timestamp: Utc::now(),
            snapshot_type,
            payload_ref: payload_ref.into(),
            risk_score,
            trust_score,
            defcon_level,
            summary: summary.into(),
        };

        self.derive_critical_moments(&snapshot);

        if self.snapshots.len() == self.capacity {
            self.snapshots.pop_front();
        }
        self.snapshots.push_back(snapshot);

        index
    }

    /// A dedicated, always-severity-5 critical moment for a honeypot
    /// trigger — bypasses the general derivation rules since a trap fire
    /// is unambiguous ground truth.
    pub fn capture_honeypot_trigger(&mut self, description: impl Into<String>) {
        self.critical_moments.push(CriticalMoment {
            snapshot_index: self.next_index.saturating_sub(1),
            timestamp: Utc::now(),
            moment_type: CriticalMomentType::HoneypotTrigger,
            severity: 5,
            description: description.into(),
        });
    }

    fn derive_critical_moments(&mut self, snapshot: &Snapshot) {
        if let (Some(risk), Some(last)) = (snapshot.risk_score, self.last_risk) {
            let delta = risk - last;
            if delta >= 50.0 {
                self.push_moment(snapshot, CriticalMomentType::RiskSpike, 4, format!(
                    "risk jumped by {delta:.1} to {risk:.1}"
                ));
            } else if delta >= 30.0 {
                self.push_moment(snapshot, CriticalMomentType::RiskSpike, 3, format!(
                    "risk jumped by {delta:.1} to {risk:.1}"
                ));
            }
        }
        if let Some(risk) = snapshot.risk_score {
            self.last_risk = Some(risk);
        }

        if let (Some(trust), Some(last)) = (snapshot.trust_score, self.last_trust) {
            let delta = last - trust;
            if delta >= 40.0 {
                self.push_moment(snapshot, CriticalMomentType::TrustDrop, 4, format!(
                    "trust dropped by {delta:.1} to {trust:.1}"
                ));
            } else if delta >= 20.0 {
                self.push_moment(snapshot, CriticalMomentType::TrustDrop, 3, format!(
                    "trust dropped by {delta:.1} to {trust:.1}"
                ));
            }
        }
        if let Some(trust) = snapshot.trust_score {
            self.last_trust = Some(trust);
        }

        match snapshot.snapshot_type {
            SnapshotType::Threat => {
                let severity = match snapshot.risk_score {
                    Some(score) if score >= 70.0 => 5,
                    Some(score) if score >= 50.0 => 4,
                    _ => 3,
                };
                self.push_moment(
                    snapshot,
                    CriticalMomentType::ThreatDetected,
                    severity,
                    snapshot.summary.clone(),
                );
            }
            SnapshotType::Action => {
                if snapshot.summary.to_lowercase().contains("block") {
                    self.push_moment(
                        snapshot,
                        CriticalMomentType::ActionBlocked,
                        3,
                        snapshot.summary.clone(),
                    );
                }
            }
            SnapshotType::StateChange => {
                self.push_moment(
                    snapshot,
                    CriticalMomentType::StateTransition,
                    2,
                    snapshot.summary.clone(),
                );
            }
            _ => {}
        }

        if snapshot.defcon_level >= 4 {
            self.push_moment(
                snapshot,
                CriticalMomentType::StateTransition,
                snapshot.defcon_level,
                format!("DEFCON escalated to {}", snapshot.defcon_level),
            );
        }
    }

    fn push_moment(
        &mut self,
        snapshot: &Snapshot,
        moment_type: CriticalMomentType,
        severity: u8,
        description: String,
    ) {
        self.critical_moments.push(CriticalMoment {
            snapshot_index: snapshot.index,
            timestamp: snapshot.timestamp,
            moment_type,
            severity,
            description,
        });
    }

    /// Full timeline, oldest first.
    #[must_use]
    pub fn timeline(&self) -> Vec<&Snapshot> {
        self.snapshots.iter().collect()
    }

    /// Look up a snapshot by its assigned index, if still retained.
    #[must_use]
    pub fn by_index(&self, index: u64) -> Option<&Snapshot> {
        self.snapshots.iter().find(|s| s.index == index)
    }

    /// The snapshot whose timestamp is closest to `when`.
    #[must_use]
    pub fn closest_to(&self, when: DateTime<Utc>) -> Option<&Snapshot> {
        self.snapshots
            .iter()
            .min_by_key(|s| (s.timestamp - when).num_milliseconds().abs())
    }

    /// All derived critical moments, oldest first.
    #[must_use]
    pub fn critical_moments(&self) -> &[CriticalMoment] {
        &self.critical_moments
    }

    /// Summarize the buffer's current contents.
    #[must_use]
    pub fn session_summary(&self) -> SessionSummary {
        let risk_scores: Vec<f32> = self.snapshots.iter().filter_map(|s| s.risk_score).collect();
        let peak_risk = risk_scores.iter().copied().fold(0.0_f32, f32::max);
        let average_risk = if risk_scores.is_empty() {
            0.0
        } else {
            risk_scores.iter().sum::<f32>() / risk_scores.len() as f32
        };
        let duration = match (self.snapshots.front(), self.snapshots.back()) {
            (Some(first), Some(last)) => last.timestamp - first.timestamp,
            _ => chrono::Duration::zero(),
        };
        let threat_count = self
            .snapshots
            .iter()
            .filter(|s| s.snapshot_type == SnapshotType::Threat)
            .count() as u64;
        let block_count = self
            .critical_moments
            .iter()
            .filter(|m| m.moment_type == CriticalMomentType::ActionBlocked)
            .count() as u64;

        SessionSummary {
            peak_risk,
            average_risk,
            duration,
            threat_count,
            block_count,
        }
    }

    /// The risk-score series across recorded snapshots, oldest first.
    #[must_use]
    pub fn risk_evolution_series(&self) -> Vec<f32> {
        self.snapshots.iter().filter_map(|s| s.risk_score).collect()
    }
}

impl Default for ForensicBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ring_buffer_evicts_oldest_at_capacity() {
        let mut buffer = ForensicBuffer::new(3);
        for i in 0..5 {
            buffer.record(
                SnapshotType::Action,
                format!("ref-{i}"),
                "action",
                None,
                None,
                1,
            );
        }
        assert_eq!(buffer.timeline().len(), 3);
        assert_eq!(buffer.timeline()[0].payload_ref, "ref-2");
    }

    #[test]
    fn risk_spike_recorded_as_critical_moment() {
        let mut buffer = ForensicBuffer::new(DEFAULT_CAPACITY);
        buffer.record(SnapshotType::RiskUpdate, "r0", "baseline", Some(10.0), None, 1);
        buffer.record(SnapshotType::RiskUpdate, "r1", "spike", Some(70.0), None, 3);
        let spikes: Vec<_> = buffer
            .critical_moments()
            .iter()
            .filter(|m| m.moment_type == CriticalMomentType::RiskSpike)
            .collect();
        assert_eq!(spikes.len(), 1);
        assert_eq!(spikes[0].severity, 4);
    }

    #[test]
    fn trust_drop_recorded_as_critical_moment() {
        let mut buffer = ForensicBuffer::new(DEFAULT_CAPACITY);
        buffer.record(SnapshotType::TrustUpdate, "t0", "baseline", None, Some(75.0), 1);
        buffer.record(SnapshotType::TrustUpdate, "t1", "drop", None, Some(30.0), 2);
        let drops: Vec<_> = buffer
            .critical_moments()
            .iter()
            .filter(|m| m.moment_type == CriticalMomentType::TrustDrop)
            .collect();
        assert_eq!(drops.len(), 1);
        assert_eq!(drops[0].severity, 4);
    }

    #[test]
    fn defcon_escalation_recorded_with_its_own_level_as_severity() {
        let mut buffer = ForensicBuffer::new(DEFAULT_CAPACITY);
        buffer.record(SnapshotType::StateChange, "s0", "escalate", None, None, 5);
        let moments = buffer.critical_moments();
        assert!(moments.iter().any(|m| m.severity == 5));
    }

    #[test]
    fn honeypot_capture_is_always_severity_five() {
        let mut buffer = ForensicBuffer::new(DEFAULT_CAPACITY);
        buffer.record(SnapshotType::Action, "a0", "click", None, None, 1);
        buffer.capture_honeypot_trigger("trap fired on click");
        let last = buffer.critical_moments().last().unwrap();
        assert_eq!(last.moment_type, CriticalMomentType::HoneypotTrigger);
        assert_eq!(last.severity, 5);
    }

    #[test]
    fn session_summary_computes_peak_and_average() {
        let mut buffer = ForensicBuffer::new(DEFAULT_CAPACITY);
        buffer.record(SnapshotType::RiskUpdate, "r0", "a", Some(10.0), None, 1);
        buffer.record(SnapshotType::RiskUpdate, "r1", "b", Some(90.0), None, 1);
        let summary = buffer.session_summary();
        assert_eq!(summary.peak_risk, 90.0);
        assert_eq!(summary.average_risk, 50.0);
    }

    #[test]
    fn content_hash_is_stable_and_short() {
        let a = ForensicBuffer::content_hash("<div>hello</div>");
        let b = ForensicBuffer::content_hash("<div>hello</div>");
        assert_eq!(a, b);
        assert_eq!(a.len(), 16);
    }

    #[test]
    fn by_index_finds_retained_snapshot() {
        let mut buffer = ForensicBuffer::new(DEFAULT_CAPACITY);
        let idx = buffer.record(SnapshotType::Action, "ref", "click", None, None, 1);
        assert!(buffer.by_index(idx).is_some());
    }
}
