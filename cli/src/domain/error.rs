//! Typed domain error enums.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, `std::process`, or `std::net`.
//! Workflow failures are a closed set of kinds, each carrying its cause.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use vch_common::{FailureKind, Step};

// ── Input errors ──────────────────────────────────────────────────────────────

/// Problems with the request itself, detected before any remote call.
#[derive(Debug, Error)]
pub enum InputError {
    #[error("no target appliance selected: supply --id, or both --compute-resource and --name")]
    MissingSelector,

    #[error("incomplete target selector: {0} is also required")]
    IncompleteSelector(&'static str),

    #[error("missing target: supply --target or set target.url in the config file")]
    MissingTarget,

    #[error("invalid target '{target}': {reason}")]
    InvalidTarget { target: String, reason: String },

    #[error("missing credentials for {0}: supply --user and --password")]
    MissingCredentials(String),

    #[error("unable to read public key from {path}: {source}")]
    UnreadableKey {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid public key in {path}: {reason}")]
    InvalidKey { path: PathBuf, reason: String },

    #[error("timeout must be greater than zero")]
    ZeroTimeout,
}

// ── Resolution errors ─────────────────────────────────────────────────────────

/// Reasons a selector does not identify exactly one running appliance.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResolveError {
    #[error("no Virtual Container Host found for {0}")]
    NotFound(String),

    #[error("{selector} matches {count} Virtual Container Hosts ({names}); use --id to pick one")]
    Ambiguous {
        selector: String,
        count: usize,
        names: String,
    },

    #[error("Virtual Container Host '{0}' is not powered on")]
    NotRunning(String),
}

// ── Config errors ─────────────────────────────────────────────────────────────

/// Errors related to configuration file values.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value}\n\nValid values: {valid}")]
    InvalidValue {
        key: String,
        value: String,
        valid: String,
    },
}

// ── Workflow errors ───────────────────────────────────────────────────────────

/// Terminal failure of one debug workflow run.
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error(transparent)]
    Input(#[from] InputError),

    #[error("environment validation failed")]
    ValidationFailed(#[source] anyhow::Error),

    #[error("failed to resolve Virtual Container Host")]
    ResolutionFailed(#[source] anyhow::Error),

    #[error("failed to configure Virtual Container Host for debug")]
    ConfigurationFailed(#[source] anyhow::Error),

    #[error("debug configuration was applied but the appliance could not be inspected")]
    InspectionFailed(#[source] anyhow::Error),

    #[error("{step} timed out ({}s budget exhausted)", .after.as_secs())]
    Timeout { step: Step, after: Duration },

    #[error("{step} was cancelled")]
    Cancelled { step: Step },
}

impl WorkflowError {
    #[must_use]
    pub fn kind(&self) -> FailureKind {
        match self {
            WorkflowError::Input(_) => FailureKind::InputError,
            WorkflowError::ValidationFailed(_) => FailureKind::ValidationFailed,
            WorkflowError::ResolutionFailed(_) => FailureKind::ResolutionFailed,
            WorkflowError::ConfigurationFailed(_) => FailureKind::ConfigurationFailed,
            WorkflowError::InspectionFailed(_) => FailureKind::InspectionFailed,
            WorkflowError::Timeout { .. } => FailureKind::Timeout,
            WorkflowError::Cancelled { .. } => FailureKind::Cancelled,
        }
    }

    /// The step that was in flight, if the failure happened inside one.
    #[must_use]
    pub fn step(&self) -> Option<Step> {
        match self {
            WorkflowError::Input(_) => None,
            WorkflowError::ValidationFailed(_) => Some(Step::Validate),
            WorkflowError::ResolutionFailed(_) => Some(Step::Resolve),
            WorkflowError::ConfigurationFailed(_) => Some(Step::Configure),
            WorkflowError::InspectionFailed(_) => Some(Step::Inspect),
            WorkflowError::Timeout { step, .. } | WorkflowError::Cancelled { step } => Some(*step),
        }
    }

    /// Whether diagnostic logs must be gathered before surfacing this error.
    ///
    /// Only failures after the appliance has been touched qualify; an
    /// operator interrupt never does.
    #[must_use]
    pub fn collects_diagnostics(&self) -> bool {
        match self {
            WorkflowError::ConfigurationFailed(_) | WorkflowError::InspectionFailed(_) => true,
            WorkflowError::Timeout { step, .. } => step.touches_appliance(),
            _ => false,
        }
    }

    /// One-line summary shown to the operator.
    #[must_use]
    pub fn summary(&self) -> &'static str {
        match self {
            WorkflowError::Input(InputError::UnreadableKey { .. } | InputError::InvalidKey { .. }) => {
                "unable to load public key"
            }
            WorkflowError::Input(_) => "invalid arguments",
            WorkflowError::InspectionFailed(_) => "inspect failed",
            WorkflowError::Timeout { step: Step::Inspect, .. } => "inspect failed",
            _ => "Debug failed",
        }
    }
}
