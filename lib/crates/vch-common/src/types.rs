use std::fmt;

use serde::{Deserialize, Serialize};

/// Workflow step, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Validate,
    Resolve,
    Configure,
    Inspect,
}

impl Step {
    #[must_use]
    pub fn describe(self) -> &'static str {
        match self {
            Step::Validate => "environment validation",
            Step::Resolve => "target resolution",
            Step::Configure => "debug configuration",
            Step::Inspect => "appliance inspection",
        }
    }

    /// Steps that touch the appliance; failures here warrant diagnostics.
    #[must_use]
    pub fn touches_appliance(self) -> bool {
        matches!(self, Step::Configure | Step::Inspect)
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.describe())
    }
}

/// Failure classification reported to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    InputError,
    ValidationFailed,
    ResolutionFailed,
    ConfigurationFailed,
    InspectionFailed,
    Timeout,
    Cancelled,
}

impl FailureKind {
    /// Stable machine-readable code, matching the serde representation.
    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            FailureKind::InputError => "input_error",
            FailureKind::ValidationFailed => "validation_failed",
            FailureKind::ResolutionFailed => "resolution_failed",
            FailureKind::ConfigurationFailed => "configuration_failed",
            FailureKind::InspectionFailed => "inspection_failed",
            FailureKind::Timeout => "timeout",
            FailureKind::Cancelled => "cancelled",
        }
    }
}

/// Reachable endpoints of a VCH appliance.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoints {
    /// Docker API endpoint, e.g. `tcp://10.0.0.5:2376`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub docker_api: Option<String>,
    /// VCH admin portal, e.g. `https://10.0.0.5:2378`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_portal: Option<String>,
    /// SSH endpoint when the appliance SSH server is enabled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ssh: Option<String>,
    /// Digest of the authorized key installed for root, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authorized_key_digest: Option<String>,
}

impl Endpoints {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.docker_api.is_none() && self.admin_portal.is_none() && self.ssh.is_none()
    }
}

/// Successful `vch-debug debug` run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebugReport {
    pub appliance_id: String,
    pub appliance_name: String,
    pub installer_version: String,
    pub appliance_version: String,
    pub ssh_enabled: bool,
    /// Whether a root password was set during this run (valid until reboot).
    pub root_password_set: bool,
    pub endpoints: Endpoints,
}

/// Diagnostic bundle left on disk for the operator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticsSummary {
    pub path: String,
    pub files: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub missing: Vec<String>,
}

/// Failed `vch-debug debug` run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureReport {
    pub kind: FailureKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step: Option<Step>,
    /// Short summary, e.g. "Debug failed".
    pub summary: String,
    /// Full error with its cause chain.
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub appliance_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnostics: Option<DiagnosticsSummary>,
}
