//! Validated platform session and the environment checks behind it.

use std::fmt;

use crate::domain::request::TargetConnection;

/// Oldest platform API version this tool is tested against.
pub const MIN_API_VERSION: (u32, u32) = (6, 0);

/// Kind of endpoint behind the target URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiType {
    /// Central management server.
    VirtualCenter,
    /// Standalone host.
    HostAgent,
    Other(String),
}

impl ApiType {
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "VirtualCenter" => Self::VirtualCenter,
            "HostAgent" => Self::HostAgent,
            other => Self::Other(other.to_string()),
        }
    }
}

impl fmt::Display for ApiType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::VirtualCenter => f.write_str("VirtualCenter"),
            Self::HostAgent => f.write_str("HostAgent"),
            Self::Other(s) => f.write_str(s),
        }
    }
}

/// What the platform reports about itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformAbout {
    pub full_name: String,
    pub api_type: ApiType,
    pub api_version: String,
}

impl PlatformAbout {
    /// `(major, minor)` of the API version, if it parses.
    #[must_use]
    pub fn api_version_pair(&self) -> Option<(u32, u32)> {
        let mut parts = self.api_version.trim().split('.');
        let major = parts.next()?.parse().ok()?;
        let minor = parts.next().map_or(Some(0), |m| m.parse().ok())?;
        Some((major, minor))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationFinding {
    pub severity: Severity,
    pub message: String,
}

/// Checks what the platform reported against what the workflow needs.
#[must_use]
pub fn check_platform(about: &PlatformAbout) -> Vec<ValidationFinding> {
    let mut findings = Vec::new();

    if let ApiType::Other(kind) = &about.api_type {
        findings.push(ValidationFinding {
            severity: Severity::Error,
            message: format!("unsupported endpoint type '{kind}'"),
        });
    }

    match about.api_version_pair() {
        Some(v) if v < MIN_API_VERSION => findings.push(ValidationFinding {
            severity: Severity::Warning,
            message: format!(
                "API version {} is older than the minimum supported {}.{}",
                about.api_version, MIN_API_VERSION.0, MIN_API_VERSION.1
            ),
        }),
        Some(_) => {}
        None => findings.push(ValidationFinding {
            severity: Severity::Warning,
            message: format!("cannot interpret API version '{}'", about.api_version),
        }),
    }

    findings
}

/// Findings that stop the workflow: errors always, warnings unless forced.
#[must_use]
pub fn blocking_findings(findings: &[ValidationFinding], force: bool) -> Vec<&ValidationFinding> {
    findings
        .iter()
        .filter(|f| f.severity == Severity::Error || !force)
        .collect()
}

/// Validated context shared by every later step.
#[derive(Debug, Clone)]
pub struct Session {
    pub target: TargetConnection,
    pub about: PlatformAbout,
    /// TLS verification is skipped; always set for this workflow.
    pub insecure: bool,
}
