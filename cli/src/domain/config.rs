//! Domain types and validators for vch-debug configuration.
//!
//! Pure functions only: no I/O, no async, no filesystem access.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::error::ConfigError;
use crate::domain::logging::LogLevel;

// ── Constants ────────────────────────────────────────────────────────────────

pub const VALID_LOG_LEVELS: &[&str] = &["error", "warn", "info", "debug", "trace"];

/// Budget for collecting diagnostics after a failure.
pub const DEFAULT_DIAGNOSTICS_TIMEOUT: Duration = Duration::from_secs(120);

/// Program used to talk to the platform when none is configured.
pub const DEFAULT_GOVC: &str = "govc";

// ── Config schema ────────────────────────────────────────────────────────────

/// Top-level configuration stored in `~/.vch-debug/config.yaml`.
///
/// Every field is optional; command-line flags override file values.
/// Passwords are deliberately absent.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct VchDebugConfig {
    pub target: TargetSection,
    /// Overall workflow timeout, humantime syntax (`3m`, `90s`).
    pub timeout: Option<String>,
    pub diagnostics: DiagnosticsSection,
    pub log: LogSection,
    pub platform: PlatformSection,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct TargetSection {
    pub url: Option<String>,
    pub user: Option<String>,
    pub thumbprint: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct DiagnosticsSection {
    /// Parent directory for diagnostic bundles; defaults to the working directory.
    pub output_dir: Option<PathBuf>,
    pub timeout: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct LogSection {
    pub level: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct PlatformSection {
    /// Path to the `govc` binary.
    pub govc: Option<PathBuf>,
}

impl VchDebugConfig {
    /// Workflow timeout from the file, if set.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is not a non-zero humantime duration.
    pub fn timeout(&self) -> Result<Option<Duration>, ConfigError> {
        self.timeout
            .as_deref()
            .map(|v| parse_timeout("timeout", v))
            .transpose()
    }

    /// Diagnostics budget, falling back to [`DEFAULT_DIAGNOSTICS_TIMEOUT`].
    ///
    /// # Errors
    ///
    /// Returns an error if the value is not a non-zero humantime duration.
    pub fn diagnostics_timeout(&self) -> Result<Duration, ConfigError> {
        Ok(self
            .diagnostics
            .timeout
            .as_deref()
            .map(|v| parse_timeout("diagnostics.timeout", v))
            .transpose()?
            .unwrap_or(DEFAULT_DIAGNOSTICS_TIMEOUT))
    }

    /// # Errors
    ///
    /// Returns an error if the level is not one of [`VALID_LOG_LEVELS`].
    pub fn log_level(&self) -> Result<Option<LogLevel>, ConfigError> {
        self.log.level.as_deref().map(validate_log_level).transpose()
    }

    #[must_use]
    pub fn govc_path(&self) -> PathBuf {
        self.platform
            .govc
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_GOVC))
    }

    #[must_use]
    pub fn output_dir(&self) -> PathBuf {
        self.diagnostics
            .output_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("."))
    }

    /// Validates every value up front so a bad file fails before any work.
    ///
    /// # Errors
    ///
    /// Returns the first invalid value found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.timeout()?;
        self.diagnostics_timeout()?;
        self.log_level()?;
        Ok(())
    }
}

// ── Validators ───────────────────────────────────────────────────────────────

/// Parses a humantime duration that must be greater than zero.
///
/// # Errors
///
/// Returns an error if the value does not parse or is zero.
pub fn parse_timeout(key: &str, value: &str) -> Result<Duration, ConfigError> {
    let invalid = || ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
        valid: "a non-zero duration such as 90s, 3m or 1h".to_string(),
    };
    let parsed = humantime::parse_duration(value.trim()).map_err(|_| invalid())?;
    if parsed.is_zero() {
        return Err(invalid());
    }
    Ok(parsed)
}

/// Validates a log level name.
///
/// # Errors
///
/// Returns an error if the value is not in [`VALID_LOG_LEVELS`].
pub fn validate_log_level(value: &str) -> Result<LogLevel, ConfigError> {
    LogLevel::parse(value).ok_or_else(|| ConfigError::InvalidValue {
        key: "log.level".to_string(),
        value: value.to_string(),
        valid: VALID_LOG_LEVELS.join(", "),
    })
}

// ── Unit tests ───────────────────────────────────────────────────────────────
