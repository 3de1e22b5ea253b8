//! Top-level error aggregation.
//!
//! Individual modules define their own focused error enums
//! (`ConfigError`, `PipelineError`, `ExecutorError`, `HoneypotError`,
//! `PolicyError`). [`SentinelError`] wraps them for callers who want a
//! single error type across the public API surface, without forcing
//! every internal function to return the aggregate.

use thiserror::Error;

use crate::config::ConfigError;
use crate::honeypot::HoneypotError;
use crate::pipeline::executor::ExecutorError;
use crate::pipeline::outcome::StageError;
use crate::policy::PolicyError;

/// Aggregate error type for `sentinel-core`'s public API.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SentinelError {
    /// Configuration loading or validation failed.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A guardrail stage could not complete its evaluation.
    #[error(transparent)]
    Stage(#[from] StageError),

    /// The pipeline executor could not complete a run.
    #[error(transparent)]
    Executor(#[from] ExecutorError),

    /// The honeypot registry encountered an internal error.
    #[error(transparent)]
    Honeypot(#[from] HoneypotError),

    /// The policy engine encountered an internal error.
    #[error(transparent)]
    Policy(#[from] PolicyError),

    /// The session referenced by a call does not exist.
    #[error("unknown session '{0}'")]
    UnknownSession(String),

    /// An action was proposed against a session that is
    /// `COMPROMISED` or `TERMINATED` — such sessions reject all
    /// further proposed actions.
    #[error("session '{0}' is terminated and rejects further actions")]
    SessionTerminated(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_session_display() {
        let err = SentinelError::UnknownSession("sess-1".into());
        assert!(err.to_string().contains("sess-1"));
    }

    #[test]
    fn config_error_converts() {
        let cfg_err = ConfigError::UnsupportedFormat {
            message: "bad extension".into(),
        };
        let err: SentinelError = cfg_err.into();
        assert!(matches!(err, SentinelError::Config(_)));
    }
}
