//! Application service: configure a VCH appliance for debug access.
//!
//! Imports only from `crate::domain` and `crate::application::ports`.
//! All I/O is routed through injected port traits.
//!
//! Steps run strictly in order: validate, resolve, configure, inspect. A
//! failure in configure or inspect (including a timeout there) collects
//! diagnostics exactly once before the error is returned. Nothing is
//! retried.

use std::error::Error as _;
use std::time::Duration;

use anyhow::Context;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use vch_common::{BuildVersion, DebugReport, FailureReport, Step};

use crate::application::ports::{ProgressReporter, ValidationParams, VchPlatform};
use crate::application::services::deadline::Deadline;
use crate::application::services::diagnostics::collect_best_effort;
use crate::application::services::resolve::resolve_appliance;
use crate::domain::session::{Severity, blocking_findings, check_platform};
use crate::domain::{
    ApplianceConfig, ApplianceHandle, AuthorizedKey, DebugRequest, DiagnosticBundle, Session,
    WorkflowError,
};

pub struct DebugOptions<'a, R: ProgressReporter> {
    pub reporter: &'a R,
    pub installer_version: &'a BuildVersion,
    /// Budget for diagnostic collection, separate from the request timeout.
    pub diagnostics_budget: Duration,
    /// Operator interrupt; cancelling it aborts the in-flight step.
    pub cancel: &'a CancellationToken,
}

/// Successful run.
#[derive(Debug)]
pub struct DebugOutcome {
    pub appliance: ApplianceHandle,
    pub report: DebugReport,
    /// Non-fatal findings raised along the way.
    pub warnings: Vec<String>,
}

/// Failed run: the tagged error plus whatever was learned before it.
#[derive(Debug)]
pub struct WorkflowFailure {
    pub error: WorkflowError,
    pub appliance: Option<ApplianceHandle>,
    pub diagnostics: Option<DiagnosticBundle>,
}

impl WorkflowFailure {
    fn new(error: WorkflowError) -> Self {
        Self {
            error,
            appliance: None,
            diagnostics: None,
        }
    }

    /// The error followed by its causes, `: `-separated.
    #[must_use]
    pub fn message(&self) -> String {
        let mut message = self.error.to_string();
        let mut source = self.error.source();
        while let Some(cause) = source {
            message.push_str(": ");
            message.push_str(&cause.to_string());
            source = cause.source();
        }
        message
    }

    #[must_use]
    pub fn report(&self) -> FailureReport {
        FailureReport {
            kind: self.error.kind(),
            step: self.error.step(),
            summary: self.error.summary().to_string(),
            message: self.message(),
            appliance_id: self.appliance.as_ref().map(|a| a.id.clone()),
            diagnostics: self.diagnostics.as_ref().map(DiagnosticBundle::summary),
        }
    }
}

impl From<WorkflowError> for WorkflowFailure {
    fn from(error: WorkflowError) -> Self {
        Self::new(error)
    }
}

/// Runs the debug workflow for one appliance.
///
/// Accepts port trait bounds so the caller can inject real or mock
/// implementations. The service never touches `OutputContext` or any
/// presentation type.
///
/// # Errors
///
/// Returns a [`WorkflowFailure`] describing the first step that failed.
pub async fn debug_vch(
    platform: &impl VchPlatform,
    request: &DebugRequest,
    opts: DebugOptions<'_, impl ProgressReporter>,
) -> Result<DebugOutcome, WorkflowFailure> {
    let DebugOptions {
        reporter,
        installer_version,
        diagnostics_budget,
        cancel,
    } = opts;
    request.check().map_err(WorkflowError::from)?;

    let started = Instant::now();
    let deadline = Deadline::start(request.timeout, cancel);
    let budget = deadline.budget();
    let changes = request.changes();
    let mut warnings = Vec::new();

    info!(host = %request.target.host(), selector = %request.selector, "configuring VCH for debug");

    // ── Validate ──────────────────────────────────────────────────────────
    reporter.step("validating environment...");
    let session = deadline
        .run(validate_environment(platform, request, &mut warnings, deadline.token()))
        .await
        .map_err(|e| e.into_workflow(Step::Validate, budget, WorkflowError::ValidationFailed))?;
    for warning in &warnings {
        reporter.warn(warning);
    }

    // ── Resolve ───────────────────────────────────────────────────────────
    reporter.step(&format!("resolving Virtual Container Host {}...", request.selector));
    let handle = deadline
        .run(resolve_appliance(platform, &session, &request.selector, deadline.token()))
        .await
        .map_err(|e| e.into_workflow(Step::Resolve, budget, WorkflowError::ResolutionFailed))?;
    reporter.success(&format!("VCH ID: {}", handle.reference()));

    let config = deadline
        .run(async {
            platform
                .read_config(&session, &handle, deadline.token())
                .await
                .context("failed to get Virtual Container Host configuration")
        })
        .await
        .map_err(|e| WorkflowFailure {
            error: e.into_workflow(Step::Resolve, budget, WorkflowError::ResolutionFailed),
            appliance: Some(handle.clone()),
            diagnostics: None,
        })?;

    reporter.info(&format!("Installer version: {installer_version}"));
    reporter.info(&format!("VCH version: {}", config.version_label()));
    if let Some(appliance_version) = &config.version {
        if appliance_version.is_newer_than(installer_version) {
            let msg = format!(
                "VCH version {appliance_version} is newer than installer version {installer_version}"
            );
            warn!("{msg}");
            reporter.warn(&msg);
            warnings.push(msg);
        }
    }

    // Context shared by the failure paths below.
    let recover = Recovery {
        platform,
        session: &session,
        handle: &handle,
        config: &config,
        budget: diagnostics_budget,
        root: cancel,
        reporter,
    };

    // ── Configure ─────────────────────────────────────────────────────────
    reporter.step("configuring appliance for debug access...");
    let key_digest = changes.authorized_key.map(AuthorizedKey::digest);
    debug!(
        appliance = %handle.id,
        enable_ssh = changes.enables_ssh(),
        key = key_digest.as_deref().unwrap_or("none"),
        root_password = changes.root_password.is_some(),
        "applying debug changes"
    );
    if let Err(e) = deadline
        .run(platform.apply(&session, &handle, &config, &changes, deadline.token()))
        .await
    {
        let error = e.into_workflow(Step::Configure, budget, WorkflowError::ConfigurationFailed);
        return Err(recover.fail(error).await);
    }
    if changes.enables_ssh() {
        reporter.success("SSH server enabled");
    }
    if changes.authorized_key.is_some() {
        reporter.success("authorized key installed for root");
    }
    if changes.root_password.is_some() {
        reporter.success("root password set (valid until the appliance reboots)");
    }

    // ── Inspect ───────────────────────────────────────────────────────────
    reporter.step("inspecting appliance...");
    let fresh = match deadline
        .run(platform.inspect(&session, &handle, &config, deadline.token()))
        .await
    {
        Ok(fresh) => fresh,
        Err(e) => {
            let error = e.into_workflow(Step::Inspect, budget, WorkflowError::InspectionFailed);
            return Err(recover.fail(error).await);
        }
    };
    if changes.enables_ssh() && !fresh.ssh_enabled {
        let msg = "SSH was requested but the appliance does not report it enabled".to_string();
        warn!(appliance = %handle.id, "{msg}");
        reporter.warn(&msg);
        warnings.push(msg);
    }

    let report = DebugReport {
        appliance_id: handle.id.clone(),
        appliance_name: handle.name.clone(),
        installer_version: installer_version.short_version(),
        appliance_version: fresh.version_label(),
        ssh_enabled: fresh.ssh_enabled,
        root_password_set: changes.root_password.is_some(),
        endpoints: fresh.endpoints(),
    };
    info!(
        appliance = %handle.id,
        elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
        "completed successfully"
    );
    reporter.success("Completed successfully");

    Ok(DebugOutcome {
        appliance: handle,
        report,
        warnings,
    })
}

async fn validate_environment(
    platform: &impl VchPlatform,
    request: &DebugRequest,
    warnings: &mut Vec<String>,
    cancel: &CancellationToken,
) -> anyhow::Result<Session> {
    let params = ValidationParams {
        target: &request.target,
        insecure: true,
    };
    let session = platform.validate(&params, cancel).await?;
    debug!(
        platform = %session.about.full_name,
        api_type = %session.about.api_type,
        api_version = %session.about.api_version,
        "connected"
    );

    let findings = check_platform(&session.about);
    let blocking = blocking_findings(&findings, request.force);
    if !blocking.is_empty() {
        let messages: Vec<&str> = blocking.iter().map(|f| f.message.as_str()).collect();
        let hint = if blocking.iter().all(|f| f.severity == Severity::Warning) {
            " (use --force to continue anyway)"
        } else {
            ""
        };
        anyhow::bail!("{}{hint}", messages.join("; "));
    }
    warnings.extend(findings.into_iter().map(|f| f.message));
    Ok(session)
}

/// Everything needed to collect diagnostics after an appliance-touching
/// failure.
struct Recovery<'a, P, R> {
    platform: &'a P,
    session: &'a Session,
    handle: &'a ApplianceHandle,
    config: &'a ApplianceConfig,
    budget: Duration,
    root: &'a CancellationToken,
    reporter: &'a R,
}

impl<P: VchPlatform, R: ProgressReporter> Recovery<'_, P, R> {
    async fn fail(&self, error: WorkflowError) -> WorkflowFailure {
        warn!(appliance = %self.handle.id, kind = error.kind().code(), "{error}");
        let diagnostics = if error.collects_diagnostics() {
            collect_best_effort(
                self.platform,
                self.session,
                self.handle,
                self.config,
                self.budget,
                self.root,
                self.reporter,
            )
            .await
        } else {
            None
        };
        WorkflowFailure {
            error,
            appliance: Some(self.handle.clone()),
            diagnostics,
        }
    }
}
