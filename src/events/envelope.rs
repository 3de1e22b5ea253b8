//! Event envelope: the wire format every emitted event is wrapped in.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The closed set of event kinds the orchestrator can emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    /// A subscriber connected.
    Connected,
    /// A subscriber disconnected.
    Disconnected,
    /// The session was terminated.
    SessionTerminated,
    /// A page finished loading.
    PageLoaded,
    /// An agent attempted an action.
    ActionAttempted,
    /// A decision was rendered for an attempted action.
    ActionDecision,
    /// A threat was detected.
    ThreatDetected,
    /// A honeypot trap fired.
    HoneyPromptTriggered,
    /// Results from an X-ray / deep content scan.
    XrayResults,
    /// A risk score update.
    RiskUpdate,
    /// A trust score update.
    TrustUpdate,
    /// A screenshot was captured.
    Screenshot,
    /// The orchestrator itself restarted.
    SystemReboot,
    /// A human operator took manual control.
    HumanControlGranted,
    /// An action requires operator confirmation.
    ConfirmationRequired,
    /// Periodic liveness signal.
    SystemHeartbeat,
    /// A region of the page could not be fully analyzed.
    LowVisibilityZone,
    /// Demo/synthetic event, for UI testing.
    DemoEvent,
}

/// Metadata attached to every envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventMeta {
    /// How long the originating operation took, in milliseconds.
    pub latency_ms: f64,
    /// DEFCON level at emission time.
    pub defcon: u8,
    /// Best-effort process CPU load sample, 0.0–1.0, if available.
    pub cpu_load: Option<f32>,
    /// Emission timestamp, Unix epoch milliseconds.
    pub timestamp: i64,
    /// Emission timestamp, ISO 8601 UTC.
    pub timestamp_iso: DateTime<Utc>,
}

/// A single event, wrapped for transport to subscribers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    /// The kind of event.
    #[serde(rename = "type")]
    pub event_type: EventType,
    /// Session this event pertains to.
    #[serde(rename = "sessionId")]
    pub session_id: String,
    /// Emission timestamp, ISO 8601 UTC.
    pub timestamp: DateTime<Utc>,
    /// Event-specific payload.
    pub payload: Value,
    /// Envelope metadata.
    pub meta: EventMeta,
}

impl EventEnvelope {
    /// Build a new envelope, stamping `timestamp`/`meta.timestamp*` from
    /// the current time.
    #[must_use]
    pub fn new(
        event_type: EventType,
        session_id: impl Into<String>,
        payload: Value,
        defcon: u8,
        latency_ms: f64,
    ) -> Self {
        let now = Utc::now();
        Self {
            event_type,
            session_id: session_id.into(),
            timestamp: now,
            payload,
            meta: EventMeta {
                latency_ms,
                defcon,
                cpu_load: None,
                timestamp: now.timestamp_millis(),
                timestamp_iso: now,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn envelope_serializes_camel_case_keys() {
        let envelope = EventEnvelope::new(
            EventType::ActionDecision,
            "sess-1",
            json!({"decision": "ALLOW"}),
            1,
            4.2,
        );
        let json = serde_json::to_value(&envelope).unwrap();
        assert!(json.get("sessionId").is_some());
        assert_eq!(json["type"], "ACTION_DECISION");
    }

    #[test]
    fn meta_carries_both_timestamp_representations() {
        let envelope = EventEnvelope::new(EventType::SystemHeartbeat, "sess-1", json!({}), 1, 0.0);
        assert!(envelope.meta.timestamp > 0);
    }
}
