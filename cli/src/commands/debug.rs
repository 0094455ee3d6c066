//! `vch-debug debug`: put one VCH appliance into a debuggable state.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::Result;
use clap::Args;
use tracing::error;
use tracing::instrument::WithSubscriber as _;
use vch_common::BuildVersion;

use crate::app::{AppContext, OutputMode, installer_version};
use crate::application::ports::{ProgressReporter, VchPlatform};
use crate::application::services::debug_vch::{
    DebugOptions, DebugOutcome, WorkflowFailure, debug_vch,
};
use crate::application::services::request::{RequestInputs, build_request};
use crate::domain::request::DEFAULT_TIMEOUT;
use crate::domain::{DebugRequest, VchDebugConfig, WorkflowError};
use crate::infra::command_runner::TokioCommandRunner;
use crate::infra::fs::LocalFs;
use crate::infra::govc::GovcPlatform;
use crate::infra::logging;
use crate::infra::shutdown::cancel_on_interrupt;
use crate::output::{SilentReporter, TerminalReporter};

/// Arguments for the debug command.
#[derive(Args, Debug)]
pub struct DebugArgs {
    /// Platform endpoint: host name or URL, e.g. vc.example.com
    #[arg(short, long, env = "VCH_TARGET")]
    pub target: Option<String>,

    /// User name on the target
    #[arg(short, long, env = "VCH_USER")]
    pub user: Option<String>,

    /// Password for the target user
    #[arg(short, long, env = "VCH_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Expected certificate thumbprint of the target
    #[arg(long, env = "VCH_THUMBPRINT")]
    pub thumbprint: Option<String>,

    /// Managed object id of the appliance, e.g. vm-42
    #[arg(long)]
    pub id: Option<String>,

    /// Inventory path of the compute resource holding the appliance
    #[arg(short = 'r', long = "compute-resource", value_name = "PATH")]
    pub compute_resource: Option<String>,

    /// Appliance name (with --compute-resource)
    #[arg(short, long)]
    pub name: Option<String>,

    /// Enable the SSH server on the appliance
    #[arg(long)]
    pub enable_ssh: bool,

    /// Public key file to authorize for root (implies --enable-ssh)
    #[arg(long, value_name = "FILE")]
    pub authorized_key: Option<PathBuf>,

    /// Root password for the appliance; lost on reboot
    #[arg(long = "rootpw", value_name = "PASSWORD")]
    pub root_password: Option<String>,

    /// Overall time limit, e.g. 3m or 90s [default: 3m]
    #[arg(long, value_name = "DURATION")]
    pub timeout: Option<humantime::Duration>,

    /// Continue past non-fatal validation findings
    #[arg(short, long)]
    pub force: bool,
}

impl DebugArgs {
    /// Flags first, then the config file.
    fn inputs<'a>(&'a self, config: &'a VchDebugConfig, timeout: Duration) -> RequestInputs<'a> {
        RequestInputs {
            target: self.target.as_deref().or(config.target.url.as_deref()),
            user: self.user.as_deref().or(config.target.user.as_deref()),
            password: self.password.as_deref(),
            thumbprint: self
                .thumbprint
                .as_deref()
                .or(config.target.thumbprint.as_deref()),
            id: self.id.as_deref(),
            compute_path: self.compute_resource.as_deref(),
            name: self.name.as_deref(),
            enable_ssh: self.enable_ssh,
            authorized_key: self.authorized_key.as_deref(),
            root_password: self.root_password.as_deref(),
            timeout,
            force: self.force,
        }
    }
}

/// Run `vch-debug debug`.
///
/// Workflow failures are rendered here and turned into a failing exit code.
///
/// # Errors
///
/// Returns an error if the config file holds an invalid timeout or the
/// final report cannot be rendered.
pub async fn run(app: &AppContext, args: DebugArgs) -> Result<ExitCode> {
    let timeout = match args.timeout {
        Some(t) => t.into(),
        None => app.config.timeout()?.unwrap_or(DEFAULT_TIMEOUT),
    };
    let diagnostics_budget = app.config.diagnostics_timeout()?;
    let installer = installer_version();

    let result = async {
        let interrupt = cancel_on_interrupt(app.cancel.clone());
        let result = match build_request(&LocalFs, args.inputs(&app.config, timeout)).await {
            Ok(request) => {
                let platform = GovcPlatform::new(
                    TokioCommandRunner::default(),
                    &app.config.govc_path(),
                    app.config.output_dir(),
                );
                execute(app, &platform, &request, &installer, diagnostics_budget).await
            }
            Err(e) => Err(WorkflowFailure::from(WorkflowError::from(e))),
        };
        if let Err(failure) = &result {
            error!(kind = failure.error.kind().code(), "{}", failure.message());
        }
        interrupt.abort();
        result
    }
    .with_subscriber(logging::dispatch(&app.log))
    .await;

    let renderer = app.renderer();
    match result {
        Ok(outcome) => {
            renderer.render_debug_report(&outcome.report, &outcome.warnings)?;
            Ok(ExitCode::SUCCESS)
        }
        Err(failure) => {
            renderer.render_failure(&failure.report())?;
            Ok(ExitCode::FAILURE)
        }
    }
}

/// Progress goes to the terminal in human mode and nowhere in JSON mode,
/// so stdout stays a single JSON document.
async fn execute(
    app: &AppContext,
    platform: &impl VchPlatform,
    request: &DebugRequest,
    installer: &BuildVersion,
    diagnostics_budget: Duration,
) -> Result<DebugOutcome, WorkflowFailure> {
    match app.mode {
        OutputMode::Human => {
            let reporter = TerminalReporter::new(&app.output);
            debug_vch(platform, request, options(app, &reporter, installer, diagnostics_budget))
                .await
        }
        OutputMode::Json => {
            debug_vch(
                platform,
                request,
                options(app, &SilentReporter, installer, diagnostics_budget),
            )
            .await
        }
    }
}

fn options<'a, R: ProgressReporter>(
    app: &'a AppContext,
    reporter: &'a R,
    installer_version: &'a BuildVersion,
    diagnostics_budget: Duration,
) -> DebugOptions<'a, R> {
    DebugOptions {
        reporter,
        installer_version,
        diagnostics_budget,
        cancel: &app.cancel,
    }
}
