mod controller;
mod logging;
mod sessions;
mod worker;

pub use controller::*;
pub use logging::*;
pub use sessions::*;
pub use worker::*;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

use crate::error::{Error, Result};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Top-level config
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub worker: WorkerConfig,
    #[serde(default)]
    pub sessions: SessionsConfig,
    #[serde(default)]
    pub controller: ControllerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Parse a config from TOML text. Missing sections take their defaults.
    pub fn from_toml(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    /// Load and validate the config file at `path`.
    ///
    /// Validation warnings are logged; any error-severity issue fails the
    /// load with every error message joined.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config = Self::from_toml(&raw)?;

        let issues = config.validate();
        let mut errors = Vec::new();
        for issue in &issues {
            match issue.severity {
                ConfigSeverity::Warning => {
                    tracing::warn!(field = %issue.field, "{}", issue.message)
                }
                ConfigSeverity::Error => errors.push(issue.to_string()),
            }
        }
        if !errors.is_empty() {
            return Err(Error::Config(errors.join("; ")));
        }

        tracing::info!(
            path = %path.display(),
            worker = %config.worker.name,
            "config loaded"
        );
        Ok(config)
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Config validation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Severity level for a configuration issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSeverity {
    Error,
    Warning,
}

/// A single configuration validation issue.
#[derive(Debug, Clone)]
pub struct ConfigError {
    pub severity: ConfigSeverity,
    pub field: String,
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.severity {
            ConfigSeverity::Error => "ERROR",
            ConfigSeverity::Warning => "WARN",
        };
        write!(f, "[{tag}] {}: {}", self.field, self.message)
    }
}

impl Config {
    /// Validate the configuration and return a list of issues.
    ///
    /// Returns an empty vec when everything looks good.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        if self.worker.name.trim().is_empty() {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "worker.name".into(),
                message: "worker name must not be empty".into(),
            });
        }

        // The controller mints session ids with this prefix; the worker
        // cannot pick its own.
        if self.sessions.server_name_prefix != SESSION_ID_PREFIX {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "sessions.server_name_prefix".into(),
                message: format!("must be \"{SESSION_ID_PREFIX}\""),
            });
        }

        if self.sessions.lookup_timeout_secs == 0 {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "sessions.lookup_timeout_secs".into(),
                message: "lookup timeout must be greater than 0".into(),
            });
        }

        if self.sessions.rpc_timeout_secs == 0 {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "sessions.rpc_timeout_secs".into(),
                message: "rpc timeout must be greater than 0".into(),
            });
        }

        if self.sessions.sweep_interval_secs == 0 {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "sessions.sweep_interval_secs".into(),
                message: "sweep interval must be greater than 0".into(),
            });
        }

        if self.controller.backoff_factor < 1.0 {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "controller.backoff_factor".into(),
                message: "backoff factor must be at least 1.0".into(),
            });
        }

        if self.controller.initial_delay_ms > self.controller.max_delay_ms {
            errors.push(ConfigError {
                severity: ConfigSeverity::Warning,
                field: "controller.initial_delay_ms".into(),
                message: "initial delay exceeds max delay; every attempt waits max_delay_ms"
                    .into(),
            });
        }

        errors
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
