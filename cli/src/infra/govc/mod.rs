//! `govc`-backed implementation of the platform ports.
//!
//! Every call shells out through a [`CommandRunner`]. Connection details go
//! in `GOVC_*` environment variables so credentials never appear in argv;
//! the one exception is the root password, which the guest program takes as
//! an argument.

pub mod model;

use std::path::{Path, PathBuf};
use std::process::Output;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::application::ports::{
    ApplianceConfigReader, ApplianceInspector, ApplianceLocator, CommandRunner, DebugConfigurator,
    DiagnosticCollector, EnvironmentValidator, ValidationParams,
};
use crate::domain::appliance::{
    KEY_AUTHORIZED_KEY_DIGEST, KEY_DEBUG_LEVEL, KEY_SSH_ENABLED, bundle_dir_name,
};
use crate::domain::{
    ApplianceCandidate, ApplianceConfig, ApplianceHandle, DebugChanges, DiagnosticBundle,
    DiagnosticLogs, Session, TargetConnection,
};

use self::model::{AboutResponse, VmInfoResponse, VirtualMachine};

/// Guest program that starts sshd and optionally installs a root key.
pub const ENABLE_SSH_PROGRAM: &str = "enable-ssh";
/// Guest program that sets the root password for the current boot.
pub const PASSWD_PROGRAM: &str = "passwd";
/// Guest operations log in as root with an empty password.
const GUEST_LOGIN: &str = "root:";
/// `guest.start` waits for the appliance toolbox, which can be slow.
const GUEST_TIMEOUT: Duration = Duration::from_secs(120);
/// Log downloads move whole files.
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(90);
/// Saved alongside the logs in every bundle.
const VM_INFO_FILE: &str = "vm-info.json";

/// Platform adapter driving the `govc` CLI.
pub struct GovcPlatform<R: CommandRunner> {
    runner: R,
    program: String,
    output_dir: PathBuf,
}

impl<R: CommandRunner> GovcPlatform<R> {
    /// `govc` is the program to run; bundles are written under `output_dir`.
    pub fn new(runner: R, govc: &Path, output_dir: PathBuf) -> Self {
        Self {
            runner,
            program: govc.to_string_lossy().into_owned(),
            output_dir,
        }
    }

    fn env(target: &TargetConnection, insecure: bool) -> Vec<(&'static str, String)> {
        let mut env = vec![
            ("GOVC_URL", target.url().to_string()),
            ("GOVC_USERNAME", target.user().to_string()),
            ("GOVC_PASSWORD", target.password().to_string()),
        ];
        if insecure {
            env.push(("GOVC_INSECURE", "1".to_string()));
        }
        env
    }

    async fn govc(
        &self,
        session: &Session,
        args: &[&str],
        timeout: Option<Duration>,
        cancel: &CancellationToken,
    ) -> Result<Output> {
        self.govc_with(&session.target, session.insecure, args, timeout, cancel)
            .await
    }

    async fn govc_with(
        &self,
        target: &TargetConnection,
        insecure: bool,
        args: &[&str],
        timeout: Option<Duration>,
        cancel: &CancellationToken,
    ) -> Result<Output> {
        let env = Self::env(target, insecure);
        let env: Vec<(&str, &str)> = env.iter().map(|(k, v)| (*k, v.as_str())).collect();
        debug!(command = args.first().copied().unwrap_or_default(), "govc");
        match timeout {
            Some(t) => {
                self.runner
                    .run_with_timeout(&self.program, args, &env, t, cancel)
                    .await
            }
            None => self.runner.run(&self.program, args, &env, cancel).await,
        }
    }

    /// Runs a command that must succeed; stderr becomes the error.
    async fn govc_ok(
        &self,
        session: &Session,
        args: &[&str],
        timeout: Option<Duration>,
        cancel: &CancellationToken,
    ) -> Result<Output> {
        let command = args.first().copied().unwrap_or_default();
        let output = self.govc(session, args, timeout, cancel).await?;
        anyhow::ensure!(
            output.status.success(),
            "govc {command} failed: {}",
            stderr_line(&output)
        );
        Ok(output)
    }

    async fn vm_info(
        &self,
        session: &Session,
        refs: &[&str],
        cancel: &CancellationToken,
    ) -> Result<Vec<VirtualMachine>> {
        let mut args = vec!["vm.info", "-json", "-e"];
        args.extend_from_slice(refs);
        let output = self.govc_ok(session, &args, None, cancel).await?;
        let parsed: VmInfoResponse =
            serde_json::from_slice(&output.stdout).context("cannot parse vm.info output")?;
        Ok(parsed.into_machines())
    }

    async fn snapshot(
        &self,
        session: &Session,
        handle: &ApplianceHandle,
        cancel: &CancellationToken,
    ) -> Result<ApplianceConfig> {
        let reference = handle.reference();
        let vm = self
            .vm_info(session, &[reference.as_str()], cancel)
            .await?
            .into_iter()
            .next()
            .with_context(|| format!("{reference} no longer exists"))?;
        Ok(vm.appliance_config())
    }

    async fn set_extra_config(
        &self,
        session: &Session,
        handle: &ApplianceHandle,
        entries: &[String],
        cancel: &CancellationToken,
    ) -> Result<()> {
        let reference = handle.reference();
        let mut args = vec!["vm.change", "-vm", reference.as_str()];
        for entry in entries {
            args.push("-e");
            args.push(entry);
        }
        self.govc_ok(session, &args, None, cancel).await?;
        Ok(())
    }

    async fn guest_start(
        &self,
        session: &Session,
        handle: &ApplianceHandle,
        program: &str,
        program_args: &[&str],
        cancel: &CancellationToken,
    ) -> Result<()> {
        let reference = handle.reference();
        let mut args = vec!["guest.start", "-vm", reference.as_str(), "-l", GUEST_LOGIN, program];
        args.extend_from_slice(program_args);
        self.govc_ok(session, &args, Some(GUEST_TIMEOUT), cancel)
            .await
            .with_context(|| format!("running {program} on {}", handle.name))?;
        Ok(())
    }
}

fn stderr_line(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let line = stderr.trim();
    if line.is_empty() {
        format!("exit status {}", output.status.code().unwrap_or(-1))
    } else {
        line.to_string()
    }
}

impl<R: CommandRunner> EnvironmentValidator for GovcPlatform<R> {
    async fn validate(
        &self,
        params: &ValidationParams<'_>,
        cancel: &CancellationToken,
    ) -> Result<Session> {
        if params.target.thumbprint().is_some() && params.insecure {
            debug!("thumbprint ignored: certificate verification is disabled");
        }
        let output = self
            .govc_with(params.target, params.insecure, &["about", "-json"], None, cancel)
            .await?;
        anyhow::ensure!(
            output.status.success(),
            "cannot connect to {}: {}",
            params.target.host(),
            stderr_line(&output)
        );
        let about: AboutResponse =
            serde_json::from_slice(&output.stdout).context("cannot parse about output")?;
        Ok(Session {
            target: params.target.clone(),
            about: about.about.into(),
            insecure: params.insecure,
        })
    }
}

impl<R: CommandRunner> ApplianceLocator for GovcPlatform<R> {
    async fn find_by_id(
        &self,
        session: &Session,
        id: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<ApplianceCandidate>> {
        let reference = if id.contains(':') {
            id.to_string()
        } else {
            format!("VirtualMachine:{id}")
        };
        let output = self
            .govc(session, &["vm.info", "-json", "-e", &reference], None, cancel)
            .await?;
        if !output.status.success() {
            let err = stderr_line(&output);
            if err.contains("not found") {
                return Ok(Vec::new());
            }
            anyhow::bail!("govc vm.info failed: {err}");
        }
        let parsed: VmInfoResponse =
            serde_json::from_slice(&output.stdout).context("cannot parse vm.info output")?;
        Ok(parsed
            .into_machines()
            .iter()
            .map(VirtualMachine::candidate)
            .collect())
    }

    async fn find_by_compute_path(
        &self,
        session: &Session,
        compute_path: &str,
        display_name: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<ApplianceCandidate>> {
        let output = self
            .govc_ok(
                session,
                &["find", "-i", compute_path, "-type", "m", "-name", display_name],
                None,
                cancel,
            )
            .await?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        let refs: Vec<&str> = stdout.lines().map(str::trim).filter(|l| !l.is_empty()).collect();
        if refs.is_empty() {
            return Ok(Vec::new());
        }
        let machines = self.vm_info(session, &refs, cancel).await?;
        Ok(machines.iter().map(VirtualMachine::candidate).collect())
    }
}

impl<R: CommandRunner> ApplianceConfigReader for GovcPlatform<R> {
    async fn read_config(
        &self,
        session: &Session,
        handle: &ApplianceHandle,
        cancel: &CancellationToken,
    ) -> Result<ApplianceConfig> {
        self.snapshot(session, handle, cancel).await
    }
}

impl<R: CommandRunner> DebugConfigurator for GovcPlatform<R> {
    async fn apply(
        &self,
        session: &Session,
        handle: &ApplianceHandle,
        config: &ApplianceConfig,
        changes: &DebugChanges<'_>,
        cancel: &CancellationToken,
    ) -> Result<()> {
        if config.debug_level == 0 {
            self.set_extra_config(session, handle, &[format!("{KEY_DEBUG_LEVEL}=1")], cancel)
                .await
                .context("raising appliance debug level")?;
        }

        if changes.enables_ssh() {
            let key_arg: Vec<&str> = changes.authorized_key.map(|k| k.as_str()).into_iter().collect();
            self.guest_start(session, handle, ENABLE_SSH_PROGRAM, &key_arg, cancel)
                .await
                .context("enabling SSH")?;
        }

        if let Some(password) = changes.root_password {
            self.guest_start(session, handle, PASSWD_PROGRAM, &[password], cancel)
                .await
                .context("setting root password")?;
        }

        if changes.enables_ssh() {
            let mut entries = vec![format!("{KEY_SSH_ENABLED}=true")];
            if let Some(key) = changes.authorized_key {
                entries.push(format!("{KEY_AUTHORIZED_KEY_DIGEST}={}", key.digest()));
            }
            self.set_extra_config(session, handle, &entries, cancel)
                .await
                .context("recording SSH state")?;
        }
        Ok(())
    }
}

impl<R: CommandRunner> ApplianceInspector for GovcPlatform<R> {
    async fn inspect(
        &self,
        session: &Session,
        handle: &ApplianceHandle,
        previous: &ApplianceConfig,
        cancel: &CancellationToken,
    ) -> Result<ApplianceConfig> {
        let fresh = self.snapshot(session, handle, cancel).await?;
        if fresh.client_ip != previous.client_ip {
            debug!(
                before = ?previous.client_ip,
                after = ?fresh.client_ip,
                "client address changed"
            );
        }
        Ok(fresh)
    }
}

impl<R: CommandRunner> DiagnosticCollector for GovcPlatform<R> {
    async fn collect(
        &self,
        session: &Session,
        handle: &ApplianceHandle,
        logs: Option<&DiagnosticLogs>,
        cancel: &CancellationToken,
    ) -> Result<DiagnosticBundle> {
        let stamp = chrono::Local::now().format("%Y%m%d-%H%M%S").to_string();
        let dir = self.output_dir.join(bundle_dir_name(&handle.name, &stamp));
        tokio::fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("creating {}", dir.display()))?;

        let mut bundle = DiagnosticBundle {
            path: dir.clone(),
            files: Vec::new(),
            missing: Vec::new(),
        };

        let reference = handle.reference();
        let info = self
            .govc_ok(session, &["vm.info", "-json", "-e", &reference], None, cancel)
            .await;
        match info {
            Ok(output) => {
                let path = dir.join(VM_INFO_FILE);
                match tokio::fs::write(&path, &output.stdout).await {
                    Ok(()) => bundle.files.push(VM_INFO_FILE.to_string()),
                    Err(e) => {
                        warn!(path = %path.display(), error = %e, "cannot write vm info");
                        bundle.missing.push(VM_INFO_FILE.to_string());
                    }
                }
            }
            Err(e) => {
                warn!(error = %format!("{e:#}"), "cannot fetch vm info");
                bundle.missing.push(VM_INFO_FILE.to_string());
            }
        }

        let Some(logs) = logs else {
            return Ok(bundle);
        };
        for file in &logs.files {
            let remote = logs.remote_path(file);
            let local = dir.join(file);
            let local_arg = local.to_string_lossy();
            let result = self
                .govc_ok(
                    session,
                    &["datastore.download", "-ds", &logs.datastore, &remote, &local_arg],
                    Some(DOWNLOAD_TIMEOUT),
                    cancel,
                )
                .await;
            match result {
                Ok(_) => bundle.files.push(file.clone()),
                Err(e) => {
                    warn!(file = %remote, error = %format!("{e:#}"), "cannot download log");
                    bundle.missing.push(file.clone());
                }
            }
        }
        Ok(bundle)
    }
}
