//! ```text
//! BrowserDriver ──► Core::evaluate_action ──┬─► PolicyEngine ──────► decision
//!                                            ├─► Detection Library ──► evidence
//!                                            ├─► HoneypotRegistry ───► trigger?
//!                                            ├─► RiskAggregator ─────► assessment
//!                                            ├─► TrustEngine ────────► confirmation?
//!                                            ├─► ForensicBuffer ─────► snapshot
//!                                            ├─► EventOrchestrator ──► envelopes
//!                                            └─► MetricsAggregator ──► counters
//! ```
//!
//! # sentinel-core
//!
//! **Security mediation layer for browser-driving AI agents.**
//!
//! `sentinel-core` intercepts every navigation, click, type, and scroll a
//! browser-driving agent proposes, evaluates it against a multi-signal threat
//! model, and returns `ALLOW`, `BLOCK`, or `CONFIRM`. It targets attacks
//! unique to agentic browsing: prompt injection embedded in page content,
//! CSS-hidden adversarial instructions, deceptive overlays, dynamic script
//! injection, goal-action divergence, and hallucinated UI references.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use sentinel_core::prelude::*;
//!
//! let config = SentinelConfig::default();
//! let core = SentinelCore::new(config);
//! let session_id = core.create_session(Some("https://example.com".to_string()))?;
//! ```
//!
//! ## Modules
//!
//! - [`config`] – layered process configuration (`SentinelConfig`, `FailMode`)
//! - [`pipeline`] – guardrail stage framework (`Content`, `StageOutcome`, `GuardrailStage`, `PipelineExecutor`)
//! - [`detection`] – stateless scorers (injection, hidden content, deceptive UI, dynamic injection, hallucination, semantic)
//! - [`dom`] – flat, arena-backed DOM snapshot
//! - [`driver`] – `BrowserDriver`/`ElementHandle` contract consumed by the core
//! - [`honeypot`] – per-session honey trap registry
//! - [`policy`] – scoped policy store and action evaluation
//! - [`risk`] – weighted risk aggregation
//! - [`trust`] – per-session/operator trust scoring
//! - [`forensics`] – bounded forensic snapshot ring and critical-moment extraction
//! - [`events`] – standardized event envelope, per-session subscriber fan-out, `EventSubscriber` callback contract
//! - [`metrics`] – per-session/global counters and precision/recall/F1 aggregation
//! - [`report`] – session report export (JSON-ready struct plus mechanical Markdown rendering)
//! - [`session`] – session data model
//! - [`core`] – the `SentinelCore` context object tying every component together

#![warn(missing_docs, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

pub mod action;
pub mod config;
pub mod core;
pub mod detection;
pub mod dom;
pub mod driver;
pub mod error;
pub mod events;
pub mod forensics;
pub mod honeypot;
pub mod metrics;
pub mod pipeline;
pub mod policy;
pub mod report;
pub mod risk;
pub mod session;
pub mod telemetry;
pub mod trust;
pub mod util;

/// Re-exports for convenient access to core types.
pub mod prelude {
    pub use crate::action::{ActionKind, ProposedAction};
    pub use crate::config::{FailMode, SentinelConfig};
    pub use crate::core::SentinelCore;
    pub use crate::dom::{DomNode, DomTree};
    pub use crate::driver::{BrowserDriver, DriverError, ElementHandle, NavigateOutcome};
    pub use crate::error::SentinelError;
    pub use crate::events::{EventEnvelope, EventOrchestrator, EventSubscriber, EventType};
    pub use crate::pipeline::content::Content;
    pub use crate::pipeline::executor::{ExecutorBuilder, PipelineExecutor, PipelineResult};
    pub use crate::pipeline::outcome::{Severity, StageError, StageOutcome};
    pub use crate::pipeline::stage::{GuardrailStage, SecurityContext};
    pub use crate::report::SessionReport;
    pub use crate::session::{Session, SessionState};
}
