//! The [`BrowserDriver`] contract — the interface a concrete browser
//! automation backend (Playwright, CDP, or a test double) implements so
//! the core can mediate its actions without depending on any one
//! automation stack.
//!
//! # Implementing a driver
//!
//! ```rust,ignore
//! use sentinel_core::driver::{BrowserDriver, DriverError, ElementHandle, NavigateOutcome};
//! use sentinel_core::dom::DomTree;
//!
//! struct MyDriver;
//!
//! #[async_trait::async_trait]
//! impl BrowserDriver for MyDriver {
//!     async fn navigate(&self, url: &str) -> Result<NavigateOutcome, DriverError> {
//!         Ok(NavigateOutcome { url: url.to_string(), success: true })
//!     }
//!     // ...
//! }
//! ```

use async_trait::async_trait;
use thiserror::Error;

use crate::dom::{BoundingBox, DomTree};

/// Errors a [`BrowserDriver`] implementation may surface. The core
/// treats every variant as a degraded-evaluation signal rather than a
/// fatal one — a driver failure on one action should not take down the
/// session.
#[derive(Debug, Error)]
pub enum DriverError {
    /// The underlying automation backend returned an error.
    #[error("driver operation failed: {0}")]
    BackendError(String),

    /// The requested selector matched no element.
    #[error("selector '{0}' matched no element")]
    NoSuchElement(String),

    /// The driver operation did not complete within its deadline.
    #[error("driver operation timed out")]
    Timeout,
}

/// Outcome of a [`BrowserDriver::navigate`] call.
#[derive(Debug, Clone)]
pub struct NavigateOutcome {
    /// The URL the driver actually ended up on (may differ from the
    /// requested URL after redirects).
    pub url: String,
    /// Whether navigation completed successfully.
    pub success: bool,
}

/// A handle to a single DOM element resolved by
/// [`BrowserDriver::query_selector`].
///
/// Mirrors [`crate::dom::DomNode`]'s fields as live, driver-backed
/// queries rather than a static snapshot — a detector holding a
/// `DomTree` reads `DomNode` fields directly; an actuator holding an
/// `ElementHandle` re-queries the live page.
#[async_trait]
pub trait ElementHandle: Send + Sync {
    /// The element's current bounding box in page coordinates, if it is
    /// laid out.
    async fn bounding_box(&self) -> Option<BoundingBox>;

    /// The named attribute's current value, if present.
    async fn get_attribute(&self, name: &str) -> Option<String>;

    /// Whether the element is currently visible (laid out, not
    /// `display: none`/`visibility: hidden`, non-zero area).
    async fn is_visible(&self) -> bool;

    /// The element's rendered text content.
    async fn text_content(&self) -> Option<String>;
}

/// Driver contract consumed by the core: every action the agent
/// proposes is ultimately carried out through one of these methods,
/// after the core has evaluated it.
///
/// # Contract
///
/// - Every method is fallible — a real automation backend can always
///   fail (navigation timeout, detached frame, closed page). Implementors
///   return [`DriverError`] rather than panicking.
/// - [`extract_dom`](Self::extract_dom) is the sole source of truth the
///   detection library scans; it should reflect the live DOM at call
///   time, not a cached snapshot.
/// - [`inject_init_script`](Self::inject_init_script) runs on every
///   subsequent navigation within the session (the honeypot registry
///   uses this to seed [`crate::honeypot::HoneypotRegistry::init_script`]
///   into the page before agent-visible scripts run).
#[async_trait]
pub trait BrowserDriver: Send + Sync {
    /// Navigate the controlled page to `url`.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError`] if navigation fails outright (DNS
    /// failure, connection refused, timeout).
    async fn navigate(&self, url: &str) -> Result<NavigateOutcome, DriverError>;

    /// Click the element matching `selector`.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::NoSuchElement`] if nothing matches.
    async fn click(&self, selector: &str) -> Result<(), DriverError>;

    /// Type `text` into the element matching `selector`.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::NoSuchElement`] if nothing matches.
    async fn type_text(&self, selector: &str, text: &str) -> Result<(), DriverError>;

    /// Extract the current DOM as a flat, arena-backed snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError`] if the page cannot be inspected.
    async fn extract_dom(&self) -> Result<DomTree, DriverError>;

    /// Capture a screenshot, returning an opaque reference (a forensic
    /// store key or file path — never the raw image bytes, to keep
    /// evaluation cheap).
    ///
    /// # Errors
    ///
    /// Returns [`DriverError`] if capture fails.
    async fn capture_screenshot(&self) -> Result<String, DriverError>;

    /// Inject `script` to run before any other script on every
    /// subsequent navigation in this session.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError`] if the backend rejects the injection.
    async fn inject_init_script(&self, script: &str) -> Result<(), DriverError>;

    /// Resolve `selector` to a live element handle.
    ///
    /// Returns `Ok(None)` rather than an error when the selector simply
    /// matches nothing — callers that need that distinction from a hard
    /// backend failure can match on [`DriverError::NoSuchElement`]
    /// instead by using a selector-existence check first.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError`] if the backend cannot be queried at all.
    async fn query_selector(
        &self,
        selector: &str,
    ) -> Result<Option<Box<dyn ElementHandle>>, DriverError>;
}
