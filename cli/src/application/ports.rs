//! Port trait definitions for the Application layer.
//!
//! Ports are the interfaces (contracts) that infrastructure must fulfill.
//! This file imports only from `crate::domain`: never from `crate::infra`,
//! `crate::commands`, or `crate::output`.
//!
//! Every remote call takes a [`CancellationToken`]; implementations must stop
//! promptly (killing any child process) once it is cancelled.

use std::path::{Path, PathBuf};
use std::process::Output;
use std::time::Duration;

use anyhow::Result;
use tokio_util::sync::CancellationToken;

use crate::domain::{
    ApplianceCandidate, ApplianceConfig, ApplianceHandle, DebugChanges, DiagnosticBundle,
    DiagnosticLogs, Session, TargetConnection, VchDebugConfig,
};

// ── Value Types ───────────────────────────────────────────────────────────────

/// Connection parameters handed to the environment validator.
pub struct ValidationParams<'a> {
    pub target: &'a TargetConnection,
    /// Skip TLS certificate verification.
    pub insecure: bool,
}

// ── Platform Port Traits ──────────────────────────────────────────────────────

/// Establishes a session against the platform.
#[allow(async_fn_in_trait)]
pub trait EnvironmentValidator {
    /// Connect, authenticate and report what the platform is.
    async fn validate(
        &self,
        params: &ValidationParams<'_>,
        cancel: &CancellationToken,
    ) -> Result<Session>;
}

/// Read-only appliance lookups. Results are unfiltered; the caller decides
/// which candidates count.
#[allow(async_fn_in_trait)]
pub trait ApplianceLocator {
    /// VMs with the given managed-object id (zero or one).
    async fn find_by_id(
        &self,
        session: &Session,
        id: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<ApplianceCandidate>>;

    /// VMs named `display_name` under the compute resource at `compute_path`.
    async fn find_by_compute_path(
        &self,
        session: &Session,
        compute_path: &str,
        display_name: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<ApplianceCandidate>>;
}

/// Fetches an appliance configuration snapshot.
#[allow(async_fn_in_trait)]
pub trait ApplianceConfigReader {
    async fn read_config(
        &self,
        session: &Session,
        handle: &ApplianceHandle,
        cancel: &CancellationToken,
    ) -> Result<ApplianceConfig>;
}

/// Applies debug-access changes to a resolved appliance.
#[allow(async_fn_in_trait)]
pub trait DebugConfigurator {
    /// Applying the same changes twice must leave the same end state. The
    /// root password lasts until the appliance next reboots.
    async fn apply(
        &self,
        session: &Session,
        handle: &ApplianceHandle,
        config: &ApplianceConfig,
        changes: &DebugChanges<'_>,
        cancel: &CancellationToken,
    ) -> Result<()>;
}

/// Re-reads the appliance after configuration.
#[allow(async_fn_in_trait)]
pub trait ApplianceInspector {
    async fn inspect(
        &self,
        session: &Session,
        handle: &ApplianceHandle,
        previous: &ApplianceConfig,
        cancel: &CancellationToken,
    ) -> Result<ApplianceConfig>;
}

/// Gathers appliance logs into a local bundle.
#[allow(async_fn_in_trait)]
pub trait DiagnosticCollector {
    /// Best effort: files that cannot be fetched are listed as missing
    /// rather than failing the call. `logs` is `None` when the log
    /// location is unknown.
    async fn collect(
        &self,
        session: &Session,
        handle: &ApplianceHandle,
        logs: Option<&DiagnosticLogs>,
        cancel: &CancellationToken,
    ) -> Result<DiagnosticBundle>;
}

/// Composite trait: any type implementing every platform sub-trait is a `VchPlatform`.
pub trait VchPlatform:
    EnvironmentValidator
    + ApplianceLocator
    + ApplianceConfigReader
    + DebugConfigurator
    + ApplianceInspector
    + DiagnosticCollector
{
}

/// Blanket implementation: any type implementing all six sub-traits is a `VchPlatform`.
impl<T> VchPlatform for T where
    T: EnvironmentValidator
        + ApplianceLocator
        + ApplianceConfigReader
        + DebugConfigurator
        + ApplianceInspector
        + DiagnosticCollector
{
}

// ── Command Runner Port ───────────────────────────────────────────────────────

/// Abstracts process execution so infrastructure can be swapped or mocked.
#[allow(async_fn_in_trait)]
pub trait CommandRunner {
    /// Run a program and capture its output.
    ///
    /// Implementations should delegate to `run_with_timeout` using the
    /// instance's configured default timeout.
    async fn run(
        &self,
        program: &str,
        args: &[&str],
        envs: &[(&str, &str)],
        cancel: &CancellationToken,
    ) -> Result<Output>;

    /// Run a program with a custom timeout override.
    ///
    /// # Errors
    ///
    /// Returns an error if the process cannot be spawned, exceeds `timeout`,
    /// or `cancel` fires first. In the last two cases the child process must
    /// be killed (not left orphaned).
    async fn run_with_timeout(
        &self,
        program: &str,
        args: &[&str],
        envs: &[(&str, &str)],
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<Output>;
}

// ── Progress Reporting Port ───────────────────────────────────────────────────

/// Abstracts progress reporting so services can emit events without
/// depending on the Presentation layer. Sync trait: no async needed.
pub trait ProgressReporter {
    /// Emit an in-progress step message.
    fn step(&self, message: &str);
    /// Emit a success message.
    fn success(&self, message: &str);
    /// Emit an informational line.
    fn info(&self, message: &str);
    /// Emit a warning message.
    fn warn(&self, message: &str);
}

// ── Local Ports ───────────────────────────────────────────────────────────────

/// Loads the optional configuration file.
pub trait ConfigStore {
    /// Load the configuration, returning defaults if no file exists.
    fn load(&self) -> Result<VchDebugConfig>;
    /// Path of the configuration file.
    fn path(&self) -> Result<PathBuf>;
}

/// Reads public key files. Returns the raw I/O error so the caller can
/// classify it.
#[allow(async_fn_in_trait)]
pub trait KeyFileReader {
    async fn read_key_file(&self, path: &Path) -> std::io::Result<Vec<u8>>;
}
