//! Human-readable terminal renderer.

use owo_colors::OwoColorize as _;
use vch_common::{BuildVersion, DebugReport, Endpoints, FailureReport};

use crate::output::OutputContext;

/// Renders reports as human-readable terminal output using `OutputContext`.
pub struct HumanRenderer<'a> {
    ctx: &'a OutputContext,
}

impl<'a> HumanRenderer<'a> {
    /// Create a new `HumanRenderer` wrapping the given output context.
    #[must_use]
    pub fn new(ctx: &'a OutputContext) -> Self {
        Self { ctx }
    }

    /// Render the installer version.
    pub fn render_version(&self, version: &BuildVersion) {
        println!("vch-debug {version}");
    }

    /// Render a successful debug run. Suppressed when `quiet`.
    ///
    /// Warnings were already shown as they happened.
    pub fn render_debug_report(&self, report: &DebugReport) {
        if self.ctx.quiet {
            return;
        }
        println!();
        self.ctx.header(&format!("{} ({})", report.appliance_name, report.appliance_id));
        for (key, value) in report_lines(report) {
            self.ctx.kv(&format!("{key:<18}"), &value);
        }

        println!();
        if report.endpoints.is_empty() {
            self.ctx
                .warn("no client address published yet; endpoints unavailable");
            return;
        }
        self.ctx.header("Endpoints:");
        for (key, value) in endpoint_lines(&report.endpoints) {
            println!(
                "  {}  {}",
                format!("{key:<18}").style(self.ctx.styles.dim),
                value.style(self.ctx.styles.endpoint)
            );
        }
    }

    /// Render a failed run to stderr. Never suppressed.
    ///
    /// The detailed cause has already gone to the log stream; this is the
    /// one-line summary plus where to find the diagnostics.
    pub fn render_failure(&self, failure: &FailureReport) {
        eprintln!("Error: {}", failure.summary);
        if let Some(bundle) = &failure.diagnostics {
            eprintln!(
                "  {} {}",
                "diagnostic logs:".style(self.ctx.styles.dim),
                bundle.path
            );
        }
    }
}

/// Key/value lines describing the appliance.
#[must_use]
pub fn report_lines(report: &DebugReport) -> Vec<(&'static str, String)> {
    let mut lines = vec![
        ("Installer version:", report.installer_version.clone()),
        ("VCH version:", report.appliance_version.clone()),
        (
            "SSH:",
            if report.ssh_enabled { "enabled" } else { "disabled" }.to_string(),
        ),
    ];
    if report.root_password_set {
        lines.push(("Root password:", "set until next reboot".to_string()));
    }
    lines
}

/// Key/value lines for the known endpoints, in a fixed order.
#[must_use]
pub fn endpoint_lines(endpoints: &Endpoints) -> Vec<(&'static str, &str)> {
    [
        ("Docker API:", endpoints.docker_api.as_deref()),
        ("Admin portal:", endpoints.admin_portal.as_deref()),
        ("SSH:", endpoints.ssh.as_deref()),
        ("Authorized key:", endpoints.authorized_key_digest.as_deref()),
    ]
    .into_iter()
    .filter_map(|(k, v)| v.map(|v| (k, v)))
    .collect()
}
