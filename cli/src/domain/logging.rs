//! Log level selection.
//!
//! The result is a plain [`LogConfig`] value; infrastructure turns it into a
//! `tracing` dispatcher scoped to the workflow.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "error" => Some(Self::Error),
            "warn" | "warning" => Some(Self::Warn),
            "info" => Some(Self::Info),
            "debug" => Some(Self::Debug),
            "trace" => Some(Self::Trace),
            _ => None,
        }
    }

    /// Level requested by repeating `--debug`: once for debug, twice for trace.
    #[must_use]
    pub fn from_verbosity(count: u8) -> Option<Self> {
        match count {
            0 => None,
            1 => Some(Self::Debug),
            _ => Some(Self::Trace),
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the workflow's log stream is set up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    pub level: LogLevel,
    pub ansi: bool,
    /// Raw filter from `VCH_DEBUG_LOG`; replaces the level-based filter.
    pub env_override: Option<String>,
}

impl LogConfig {
    /// Picks the level: `--debug` count, then the config file, then `warn`.
    #[must_use]
    pub fn resolve(
        env_override: Option<String>,
        verbosity: u8,
        configured: Option<LogLevel>,
        ansi: bool,
    ) -> Self {
        let level = LogLevel::from_verbosity(verbosity)
            .or(configured)
            .unwrap_or(LogLevel::Warn);
        Self {
            level,
            ansi,
            env_override: env_override.filter(|f| !f.trim().is_empty()),
        }
    }

    /// `EnvFilter` directive. Dependencies stay at `warn`; this crate
    /// follows the selected level.
    #[must_use]
    pub fn filter_directive(&self) -> String {
        match &self.env_override {
            Some(raw) => raw.clone(),
            None => format!("warn,vch_debug={}", self.level),
        }
    }
}
