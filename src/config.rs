//! Gateway configuration parsing and validation.
//!
//! Configuration is optional: every field has a usable default so the
//! binary runs without a TOML file. When a file is supplied, unknown
//! fields are rejected by validation of the values that matter.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::{AppError, Result};

fn default_max_sessions() -> usize {
    100
}

fn default_session_timeout_seconds() -> u64 {
    3600
}

fn default_sweep_interval_seconds() -> u64 {
    300
}

fn default_request_timeout_seconds() -> u64 {
    30
}

fn default_http_host() -> String {
    "127.0.0.1".into()
}

fn default_http_port() -> u16 {
    8095
}

fn default_working_directory() -> PathBuf {
    PathBuf::from(".")
}

fn default_model() -> String {
    "qwen3:latest".into()
}

fn default_available_models() -> Vec<String> {
    vec![
        "qwen3:latest".into(),
        "gpt-4".into(),
        "claude-3-sonnet".into(),
    ]
}

fn default_true() -> bool {
    true
}

/// Global configuration parsed from `config.toml`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct GatewayConfig {
    /// Maximum concurrent live sessions admitted by `session/new`.
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,
    /// Seconds of inactivity after which a session is expired.
    #[serde(default = "default_session_timeout_seconds")]
    pub session_timeout_seconds: u64,
    /// Interval between background expiry sweeps.
    #[serde(default = "default_sweep_interval_seconds")]
    pub sweep_interval_seconds: u64,
    /// Deadline for outbound client-role requests.
    #[serde(default = "default_request_timeout_seconds")]
    pub request_timeout_seconds: u64,
    /// Bind host for the socket transport.
    #[serde(default = "default_http_host")]
    pub http_host: String,
    /// Bind port for the socket transport.
    #[serde(default = "default_http_port")]
    pub http_port: u16,
    /// Default working directory for new sessions.
    #[serde(default = "default_working_directory")]
    pub working_directory: PathBuf,
    /// Model assigned to sessions that do not request one.
    #[serde(default = "default_model")]
    pub default_model: String,
    /// Models advertised in `session/new` results.
    #[serde(default = "default_available_models")]
    pub available_models: Vec<String>,
    /// Classify tool output that starts with `Error:`/`Exception:` or
    /// contains `failed` as an error result. Carried over from the wire
    /// contract this gateway replaces; disable once clients rely on the
    /// structured success/failure contract instead.
    #[serde(default = "default_true")]
    pub legacy_error_heuristic: bool,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            max_sessions: default_max_sessions(),
            session_timeout_seconds: default_session_timeout_seconds(),
            sweep_interval_seconds: default_sweep_interval_seconds(),
            request_timeout_seconds: default_request_timeout_seconds(),
            http_host: default_http_host(),
            http_port: default_http_port(),
            working_directory: default_working_directory(),
            default_model: default_model(),
            available_models: default_available_models(),
            legacy_error_heuristic: default_true(),
        }
    }
}

impl GatewayConfig {
    /// Load and validate configuration from a TOML file path.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the file cannot be read or contains
    /// invalid TOML, or if validation fails.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .map_err(|err| AppError::Config(format!("failed to read config: {err}")))?;
        Self::from_toml_str(&raw)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if parsing or validation fails.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Session inactivity timeout as a `chrono::Duration`.
    #[must_use]
    pub fn session_timeout(&self) -> chrono::Duration {
        chrono::Duration::seconds(i64::try_from(self.session_timeout_seconds).unwrap_or(i64::MAX))
    }

    /// Expiry sweep interval as a `std::time::Duration`.
    #[must_use]
    pub fn sweep_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.sweep_interval_seconds)
    }

    /// Outbound request deadline as a `std::time::Duration`.
    #[must_use]
    pub fn request_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.request_timeout_seconds)
    }

    fn validate(&self) -> Result<()> {
        if self.max_sessions == 0 {
            return Err(AppError::Config(
                "max_sessions must be greater than zero".into(),
            ));
        }

        if self.session_timeout_seconds == 0 {
            return Err(AppError::Config(
                "session_timeout_seconds must be greater than zero".into(),
            ));
        }

        if self.sweep_interval_seconds == 0 {
            return Err(AppError::Config(
                "sweep_interval_seconds must be greater than zero".into(),
            ));
        }

        if self.available_models.is_empty() {
            return Err(AppError::Config(
                "available_models must not be empty".into(),
            ));
        }

        if !self.available_models.contains(&self.default_model) {
            return Err(AppError::Config(format!(
                "default_model '{}' is not in available_models",
                self.default_model
            )));
        }

        Ok(())
    }
}
