//! Application service: best-effort diagnostic collection.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::application::ports::{DiagnosticCollector, ProgressReporter};
use crate::application::services::deadline::{Deadline, StepError};
use crate::domain::{ApplianceConfig, ApplianceHandle, DiagnosticBundle, Session};

/// Collects diagnostic logs after a failure without ever failing itself.
///
/// Runs under its own `budget` with a fresh child of `root`, since the
/// workflow deadline may already be spent. Collector errors are logged and
/// swallowed so the original failure stays visible.
pub async fn collect_best_effort(
    collector: &impl DiagnosticCollector,
    session: &Session,
    handle: &ApplianceHandle,
    config: &ApplianceConfig,
    budget: Duration,
    root: &CancellationToken,
    reporter: &impl ProgressReporter,
) -> Option<DiagnosticBundle> {
    reporter.step("collecting diagnostic logs...");
    let logs = config.diagnostic_logs();
    if logs.is_none() {
        warn!(appliance = %handle.id, "appliance log location unknown");
    }

    let deadline = Deadline::start(budget, root);
    match deadline
        .run(collector.collect(session, handle, logs.as_ref(), deadline.token()))
        .await
    {
        Ok(bundle) => {
            info!(
                path = %bundle.path.display(),
                files = bundle.files.len(),
                missing = bundle.missing.len(),
                "diagnostic bundle written"
            );
            reporter.info(&format!("diagnostic logs saved to {}", bundle.path.display()));
            if !bundle.missing.is_empty() {
                reporter.warn(&format!("could not collect: {}", bundle.missing.join(", ")));
            }
            Some(bundle)
        }
        Err(err) => {
            let reason = match err {
                StepError::Failed(cause) => format!("{cause:#}"),
                StepError::TimedOut => format!("timed out after {}s", budget.as_secs()),
                StepError::Cancelled => "cancelled".to_string(),
            };
            warn!(appliance = %handle.id, %reason, "diagnostic collection failed");
            reporter.warn(&format!("diagnostic collection failed: {reason}"));
            None
        }
    }
}
