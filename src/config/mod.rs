//! Process-wide configuration for the security pipeline.
//!
//! This is distinct from [`crate::policy::Policy`], which is *data* —
//! scoped allow/block rules loaded and hot-reloaded independently of the
//! process. `SentinelConfig` governs pipeline mechanics: fail mode,
//! resource bounds, and rate limiting.
//!
//! ## Configuration hierarchy
//!
//! Resolved in order (later wins):
//!
//! 1. Compiled defaults (secure by default)
//! 2. Config file (`sentinel.toml`, `.yaml`, or `.json`)
//! 3. Environment variables (`SENTINEL_*`)
//!
//! ## Example
//!
//! ```rust,ignore
//! use sentinel_core::config::ConfigLoader;
//!
//! let config = ConfigLoader::new()
//!     .with_file("config/sentinel.toml")?
//!     .with_env()
//!     .build()?;
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use validator::Validate;

/// Errors that can occur while loading or validating [`SentinelConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file at {path}: {source}")]
    FileRead {
        /// Path that failed to read.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to parse the configuration file contents.
    #[error("failed to parse {format} config: {source}")]
    ParseError {
        /// Format that failed to parse (YAML, TOML, JSON).
        format: String,
        /// Underlying parse error.
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The config file extension is not recognized.
    #[error("unsupported config file format: {message}")]
    UnsupportedFormat {
        /// Description of the problem.
        message: String,
    },

    /// Validation of the final configuration failed.
    #[error("config validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),

    /// An environment variable could not be parsed into its target type.
    #[error("failed to parse environment variable {key}: {message}")]
    EnvParse {
        /// Environment variable key.
        key: String,
        /// Error message.
        message: String,
    },
}

/// Behavior when a guardrail stage produces a blocking outcome.
///
/// Distinct from a [`crate::policy::PolicyDecision`] — `FailMode`
/// governs whether a blocking *pipeline* outcome is honored at all,
/// independent of what any single policy check decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailMode {
    /// Block the action and return the blocking outcome.
    Closed,
    /// Allow the action through but log the would-be block.
    Open,
    /// Log the would-be block and continue (audit mode).
    LogOnly,
}

impl Default for FailMode {
    fn default() -> Self {
        Self::Closed
    }
}

/// Process-wide pipeline configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "snake_case")]
pub struct SentinelConfig {
    /// Configuration schema version, for compatibility tracking.
    #[validate(length(min = 1))]
    pub version: String,

    /// Default behavior when a stage blocks.
    pub fail_mode: FailMode,

    /// Forensic ring capacity per session (spec default: 120).
    #[validate(range(min = 1))]
    pub forensic_ring_capacity: usize,

    /// Risk-evolution series cap per session (spec default: 60).
    #[validate(range(min = 1))]
    pub risk_evolution_capacity: usize,

    /// Latency sample cap per session (spec default: 1000).
    #[validate(range(min = 1))]
    pub latency_samples_per_session: usize,

    /// Latency sample cap, global (spec default: 5000).
    #[validate(range(min = 1))]
    pub latency_samples_global: usize,

    /// Event history cap (spec default: 100).
    #[validate(range(min = 1))]
    pub event_history_capacity: usize,

    /// Proposed actions admitted per session per minute (spec default: 30).
    #[validate(range(min = 1))]
    pub max_actions_per_minute: u32,
}

impl Default for SentinelConfig {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            fail_mode: FailMode::Closed,
            forensic_ring_capacity: 120,
            risk_evolution_capacity: 60,
            latency_samples_per_session: 1000,
            latency_samples_global: 5000,
            event_history_capacity: 100,
            max_actions_per_minute: 30,
        }
    }
}

/// Builder for [`SentinelConfig`], loading from file and environment.
#[derive(Debug, Default)]
pub struct ConfigLoader {
    base: SentinelConfig,
    use_env: bool,
}

impl ConfigLoader {
    /// Start a loader with compiled defaults.
    #[must_use]
    pub fn new() -> Self {
        Self {
            base: SentinelConfig::default(),
            use_env: false,
        }
    }

    /// Load configuration from a file (YAML, TOML, or JSON), replacing
    /// the current base.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or parsed.
    pub fn with_file(mut self, path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;

        let config: SentinelConfig = match path.extension().and_then(|e| e.to_str()) {
            Some("yaml" | "yml") => {
                serde_yaml::from_str(&content).map_err(|e| ConfigError::ParseError {
                    format: "YAML".to_string(),
                    source: Box::new(e),
                })?
            }
            Some("toml") => toml::from_str(&content).map_err(|e| ConfigError::ParseError {
                format: "TOML".to_string(),
                source: Box::new(e),
            })?,
            Some("json") => {
                serde_json::from_str(&content).map_err(|e| ConfigError::ParseError {
                    format: "JSON".to_string(),
                    source: Box::new(e),
                })?
            }
            _ => {
                return Err(ConfigError::UnsupportedFormat {
                    message: "file extension must be .yaml, .yml, .toml, or .json".to_string(),
                });
            }
        };

        self.base = config;
        Ok(self)
    }

    /// Enable loading overrides from environment variables prefixed
    /// `SENTINEL_`, e.g. `SENTINEL_FAIL_MODE=open`.
    #[must_use]
    pub fn with_env(mut self) -> Self {
        self.use_env = true;
        self
    }

    /// Build and validate the final configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if validation fails or an environment
    /// variable cannot be parsed.
    pub fn build(mut self) -> Result<SentinelConfig, ConfigError> {
        if self.use_env {
            dotenvy::dotenv().ok();

            if let Ok(mode) = std::env::var("SENTINEL_FAIL_MODE") {
                self.base.fail_mode = match mode.to_lowercase().as_str() {
                    "closed" => FailMode::Closed,
                    "open" => FailMode::Open,
                    "log_only" | "logonly" => FailMode::LogOnly,
                    _ => {
                        return Err(ConfigError::EnvParse {
                            key: "SENTINEL_FAIL_MODE".to_string(),
                            message: "must be 'closed', 'open', or 'log_only'".to_string(),
                        });
                    }
                };
            }

            if let Ok(rate) = std::env::var("SENTINEL_MAX_ACTIONS_PER_MINUTE") {
                self.base.max_actions_per_minute =
                    rate.parse().map_err(|_| ConfigError::EnvParse {
                        key: "SENTINEL_MAX_ACTIONS_PER_MINUTE".to_string(),
                        message: "must be a positive integer".to_string(),
                    })?;
            }
        }

        self.base.validate()?;
        Ok(self.base)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = SentinelConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.fail_mode, FailMode::Closed);
        assert_eq!(config.forensic_ring_capacity, 120);
        assert_eq!(config.risk_evolution_capacity, 60);
        assert_eq!(config.max_actions_per_minute, 30);
    }

    #[test]
    fn loader_builds_defaults() {
        let config = ConfigLoader::new().build().unwrap();
        assert_eq!(config.event_history_capacity, 100);
    }

    #[test]
    fn fail_mode_serializes_snake_case() {
        let json = serde_json::to_string(&FailMode::LogOnly).unwrap();
        assert_eq!(json, r#""log_only""#);
    }

    #[test]
    fn env_override_fail_mode() {
        // SAFETY: test runs single-threaded within this process's test
        // harness slot; no other test reads this key.
        unsafe {
            std::env::set_var("SENTINEL_FAIL_MODE", "open");
        }
        let config = ConfigLoader::new().with_env().build().unwrap();
        assert_eq!(config.fail_mode, FailMode::Open);
        unsafe {
            std::env::remove_var("SENTINEL_FAIL_MODE");
        }
    }
}
