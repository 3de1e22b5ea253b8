//! Event orchestrator: per-session subscriber fan-out with best-effort,
//! non-blocking delivery.
//!
//! Deliberately simpler than a general-purpose broadcast bus: each
//! session owns its own bounded subscriber list, delivery failures are
//! logged and never propagate, and DEFCON only ever ratchets upward.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;

use super::envelope::{EventEnvelope, EventType};
use crate::util::with_timeout;

/// Delivery deadline for a single subscriber send.
const DISPATCH_TIMEOUT: Duration = Duration::from_millis(50);

/// An event subscriber registered by callback rather than by polling a
/// [`flume::Receiver`] — for consumers (a UI push layer, an external
/// audit sink) that want to be driven rather than to poll.
///
/// Registration is keyed by session id, same as the channel-based
/// [`EventOrchestrator::subscribe`] path; both mechanisms fan out from
/// the same `emit` call.
#[async_trait]
pub trait EventSubscriber: Send + Sync {
    /// Handle one fully-formed envelope. Implementations should not
    /// block indefinitely — `emit` bounds each notification at
    /// [`DISPATCH_TIMEOUT`] and drops a slow subscriber's delivery
    /// rather than waiting on it.
    async fn notify(&self, envelope: &EventEnvelope);
}

struct SessionChannel {
    subscribers: Vec<flume::Sender<EventEnvelope>>,
    callbacks: Vec<Arc<dyn EventSubscriber>>,
    history: std::collections::VecDeque<EventEnvelope>,
    defcon: u8,
}

impl SessionChannel {
    fn new() -> Self {
        Self {
            subscribers: Vec::new(),
            callbacks: Vec::new(),
            history: std::collections::VecDeque::new(),
            defcon: 1,
        }
    }
}

/// Orchestrates event emission and subscription for all active sessions.
pub struct EventOrchestrator {
    sessions: RwLock<HashMap<String, SessionChannel>>,
    history_capacity: usize,
}

impl EventOrchestrator {
    /// Build an orchestrator retaining up to `history_capacity` events
    /// per session.
    #[must_use]
    pub fn new(history_capacity: usize) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            history_capacity,
        }
    }

    /// Subscribe to `session_id`'s events, receiving a channel that will
    /// receive every envelope emitted from this point forward.
    #[must_use]
    pub fn subscribe(&self, session_id: &str) -> flume::Receiver<EventEnvelope> {
        let (tx, rx) = flume::unbounded();
        let mut sessions = self.sessions.write();
        let channel = sessions
            .entry(session_id.to_string())
            .or_insert_with(SessionChannel::new);
        channel.subscribers.push(tx);
        rx
    }

    /// Register `subscriber` to be notified of every future envelope
    /// emitted for `session_id`, as an alternative to the channel-based
    /// [`subscribe`](Self::subscribe).
    pub fn subscribe_callback(&self, session_id: &str, subscriber: Arc<dyn EventSubscriber>) {
        let mut sessions = self.sessions.write();
        let channel = sessions
            .entry(session_id.to_string())
            .or_insert_with(SessionChannel::new);
        channel.callbacks.push(subscriber);
    }

    /// Promote `session_id`'s DEFCON level to at most `proposed` —
    /// DEFCON never decreases, so this is a no-op if `proposed` is not
    /// higher than the current level.
    pub fn promote_defcon(&self, session_id: &str, proposed: u8) -> u8 {
        let mut sessions = self.sessions.write();
        let channel = sessions
            .entry(session_id.to_string())
            .or_insert_with(SessionChannel::new);
        channel.defcon = channel.defcon.max(proposed).min(5);
        channel.defcon
    }

    /// Current DEFCON level for `session_id`, 1 if no events have been
    /// emitted yet.
    #[must_use]
    pub fn defcon(&self, session_id: &str) -> u8 {
        self.sessions
            .read()
            .get(session_id)
            .map_or(1, |c| c.defcon)
    }

    /// The DEFCON level `event_type`/`payload` would promote to, per the
    /// fixed escalation table. Does not apply the promotion itself.
    #[must_use]
    pub fn implied_defcon(event_type: EventType, payload: &Value, current: u8) -> u8 {
        match event_type {
            EventType::HoneyPromptTriggered => 5,
            EventType::ThreatDetected => {
                let severity = payload
                    .get("severity")
                    .and_then(Value::as_u64)
                    .unwrap_or(0);
                if severity >= 4 {
                    current.max(severity as u8)
                } else {
                    current
                }
            }
            EventType::RiskUpdate => {
                let score = payload.get("score").and_then(Value::as_f64).unwrap_or(0.0);
                if score >= 90.0 {
                    current.max(5)
                } else if score >= 75.0 {
                    current.max(4)
                } else if score >= 50.0 {
                    current.max(3)
                } else {
                    current
                }
            }
            _ => current,
        }
    }

    /// Emit `event_type` for `session_id`, attaching DEFCON and best-effort
    /// dispatching to every subscriber. Delivery to a slow or closed
    /// subscriber is dropped silently after [`DISPATCH_TIMEOUT`] — it
    /// never blocks the caller or other subscribers.
    pub async fn emit(
        &self,
        event_type: EventType,
        session_id: &str,
        payload: Value,
        latency_ms: f64,
    ) -> EventEnvelope {
        let current = self.defcon(session_id);
        let defcon = Self::implied_defcon(event_type, &payload, current);
        self.promote_defcon(session_id, defcon);

        let envelope = EventEnvelope::new(event_type, session_id, payload, defcon, latency_ms);

        let (subscribers, callbacks): (Vec<flume::Sender<EventEnvelope>>, Vec<Arc<dyn EventSubscriber>>) = {
            let mut sessions = self.sessions.write();
            let channel = sessions
                .entry(session_id.to_string())
                .or_insert_with(SessionChannel::new);
            if channel.history.len() == self.history_capacity {
                channel.history.pop_front();
            }
            channel.history.push_back(envelope.clone());
            channel.subscribers.retain(|s| !s.is_disconnected());
            (channel.subscribers.clone(), channel.callbacks.clone())
        };

        for subscriber in subscribers {
            let envelope = envelope.clone();
            let (_, timed_out) = with_timeout(
                async move { subscriber.send_async(envelope).await.is_ok() },
                DISPATCH_TIMEOUT,
                false,
            )
            .await;
            if timed_out {
                tracing::warn!(session_id, "event dispatch to subscriber timed out");
            }
        }

        for callback in callbacks {
            let envelope = envelope.clone();
            let ((), timed_out) = with_timeout(
                async move { callback.notify(&envelope).await },
                DISPATCH_TIMEOUT,
                (),
            )
            .await;
            if timed_out {
                tracing::warn!(session_id, "event dispatch to callback subscriber timed out");
            }
        }

        envelope
    }

    /// The retained event history for `session_id`, oldest first.
    #[must_use]
    pub fn history(&self, session_id: &str) -> Vec<EventEnvelope> {
        self.sessions
            .read()
            .get(session_id)
            .map(|c| c.history.iter().cloned().collect())
            .unwrap_or_default()
    }
}

impl Default for EventOrchestrator {
    fn default() -> Self {
        Self::new(100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn subscriber_receives_emitted_event() {
        let orchestrator = EventOrchestrator::default();
        let rx = orchestrator.subscribe("sess-1");
        orchestrator
            .emit(EventType::PageLoaded, "sess-1", json!({}), 1.0)
            .await;
        let received = rx.recv_async().await.unwrap();
        assert_eq!(received.event_type, EventType::PageLoaded);
    }

    #[tokio::test]
    async fn honeypot_trigger_forces_defcon_five() {
        let orchestrator = EventOrchestrator::default();
        orchestrator
            .emit(EventType::HoneyPromptTriggered, "sess-1", json!({}), 1.0)
            .await;
        assert_eq!(orchestrator.defcon("sess-1"), 5);
    }

    #[tokio::test]
    async fn defcon_never_decreases() {
        let orchestrator = EventOrchestrator::default();
        orchestrator
            .emit(EventType::RiskUpdate, "sess-1", json!({"score": 95.0}), 1.0)
            .await;
        assert_eq!(orchestrator.defcon("sess-1"), 5);
        orchestrator
            .emit(EventType::RiskUpdate, "sess-1", json!({"score": 1.0}), 1.0)
            .await;
        assert_eq!(orchestrator.defcon("sess-1"), 5);
    }

    #[tokio::test]
    async fn history_caps_at_capacity() {
        let orchestrator = EventOrchestrator::new(5);
        for _ in 0..10 {
            orchestrator
                .emit(EventType::SystemHeartbeat, "sess-1", json!({}), 0.1)
                .await;
        }
        assert_eq!(orchestrator.history("sess-1").len(), 5);
    }

    struct RecordingSubscriber {
        seen: std::sync::Mutex<Vec<EventType>>,
    }

    #[async_trait::async_trait]
    impl EventSubscriber for RecordingSubscriber {
        async fn notify(&self, envelope: &EventEnvelope) {
            self.seen.lock().unwrap().push(envelope.event_type);
        }
    }

    #[tokio::test]
    async fn callback_subscriber_is_notified_on_emit() {
        let orchestrator = EventOrchestrator::default();
        let subscriber = std::sync::Arc::new(RecordingSubscriber {
            seen: std::sync::Mutex::new(Vec::new()),
        });
        orchestrator.subscribe_callback("sess-1", subscriber.clone());
        orchestrator
            .emit(EventType::PageLoaded, "sess-1", json!({}), 1.0)
            .await;
        assert_eq!(subscriber.seen.lock().unwrap().as_slice(), &[EventType::PageLoaded]);
    }

    #[tokio::test]
    async fn dropped_receiver_does_not_break_future_emits() {
        let orchestrator = EventOrchestrator::default();
        {
            let _rx = orchestrator.subscribe("sess-1");
        }
        let envelope = orchestrator
            .emit(EventType::PageLoaded, "sess-1", json!({}), 1.0)
            .await;
        assert_eq!(envelope.session_id, "sess-1");
    }
}
