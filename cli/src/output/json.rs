//! JSON output helpers.
//!
//! Every `--json` code path prints exactly one pretty-printed document to
//! stdout: the report on success, the error object on failure.

use anyhow::{Context, Result};
use serde::Serialize;
use vch_common::{BuildVersion, DebugReport, FailureReport};

/// Renders reports as JSON documents.
pub struct JsonRenderer;

impl JsonRenderer {
    /// Print a successful debug run, with any warnings raised on the way.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn render_debug_report(&self, report: &DebugReport, warnings: &[String]) -> Result<()> {
        #[derive(Serialize)]
        struct Success<'a> {
            #[serde(flatten)]
            report: &'a DebugReport,
            #[serde(skip_serializing_if = "<[String]>::is_empty")]
            warnings: &'a [String],
        }
        println!("{}", to_pretty(&Success { report, warnings })?);
        Ok(())
    }

    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn render_failure(&self, failure: &FailureReport) -> Result<()> {
        println!("{}", format_failure(failure)?);
        Ok(())
    }

    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn render_version(&self, version: &BuildVersion) -> Result<()> {
        let obj = serde_json::json!({
            "version": version.short_version(),
            "release": version.version,
            "build": version.build_number,
            "commit": version.commit,
        });
        println!("{}", to_pretty(&obj)?);
        Ok(())
    }
}

fn to_pretty<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).context("JSON serialization failed")
}

/// Format a JSON error object for a failed workflow.
///
/// Output (pretty-printed):
/// ```json
/// {
///   "error": true,
///   "summary": "Debug failed",
///   "message": "...",
///   "code": "configuration_failed",
///   "step": "configure",
///   "appliance_id": "vm-42",
///   "diagnostics": { "path": "...", "files": [...] }
/// }
/// ```
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn format_failure(failure: &FailureReport) -> Result<String> {
    let obj = serde_json::json!({
        "error": true,
        "summary": failure.summary,
        "message": failure.message,
        "code": failure.kind.code(),
        "step": failure.step,
        "appliance_id": failure.appliance_id,
        "diagnostics": failure.diagnostics,
    });
    to_pretty(&obj)
}

/// Format a JSON error object for errors raised outside the workflow
/// (config file problems, invalid arguments).
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn format_error(message: &str, code: &str) -> Result<String> {
    let obj = serde_json::json!({
        "error": true,
        "message": message,
        "code": code,
    });
    to_pretty(&obj)
}
