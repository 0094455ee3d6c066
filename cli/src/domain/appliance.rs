//! Appliance handles, configuration snapshots and endpoint derivation.
//!
//! Snapshots are built from the appliance's `guestinfo.vice./*` extra-config
//! keys. Everything here is pure: the platform adapter hands the raw values
//! in and gets typed data out.

use std::collections::BTreeMap;
use std::path::PathBuf;

use vch_common::{BuildVersion, DiagnosticsSummary, Endpoints};

use crate::domain::error::ResolveError;
use crate::domain::request::TargetSelector;

// ── Guestinfo keys ────────────────────────────────────────────────────────────

/// Prefix shared by every VCH guestinfo key; its presence marks a VM as a VCH.
pub const GUESTINFO_PREFIX: &str = "guestinfo.vice./";
pub const KEY_VERSION: &str = "guestinfo.vice./init/version";
pub const KEY_CLIENT_IP: &str = "guestinfo.vice./network/client/ip";
pub const KEY_MANAGEMENT_IP: &str = "guestinfo.vice./network/management/ip";
pub const KEY_DOCKER_TLS: &str = "guestinfo.vice./docker/tls";
pub const KEY_DEBUG_LEVEL: &str = "guestinfo.vice./diagnostics/debug";
pub const KEY_SSH_ENABLED: &str = "guestinfo.vice./diagnostics/ssh";
pub const KEY_AUTHORIZED_KEY_DIGEST: &str = "guestinfo.vice./diagnostics/authorized_key_digest";

pub const DOCKER_TLS_PORT: u16 = 2376;
pub const DOCKER_PLAIN_PORT: u16 = 2375;
pub const ADMIN_PORTAL_PORT: u16 = 2378;
pub const SSH_PORT: u16 = 22;

/// Log files kept next to the appliance's `.vmx`.
pub const APPLIANCE_LOG_FILES: &[&str] = &["vmware.log", "tether.debug", "output.log"];

/// Whether a VM's extra-config keys identify it as a VCH appliance.
pub fn is_vch<'a>(mut keys: impl Iterator<Item = &'a str>) -> bool {
    keys.any(|k| k.starts_with(GUESTINFO_PREFIX))
}

// ── Handles ───────────────────────────────────────────────────────────────────

/// Resolved reference to one appliance VM.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplianceHandle {
    /// Managed-object id, e.g. `vm-42`.
    pub id: String,
    pub name: String,
    pub inventory_path: Option<String>,
}

impl ApplianceHandle {
    /// Managed-object reference in `Type:value` form.
    #[must_use]
    pub fn reference(&self) -> String {
        format!("VirtualMachine:{}", self.id)
    }
}

/// One VM returned by a lookup, before filtering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplianceCandidate {
    pub handle: ApplianceHandle,
    pub powered_on: bool,
    pub is_vch: bool,
}

/// Narrows lookup results to exactly one running VCH.
///
/// Non-VCH candidates are dropped before counting.
///
/// # Errors
///
/// Returns [`ResolveError`] for zero matches, several matches, or a single
/// match that is not powered on.
pub fn select_unique(
    candidates: Vec<ApplianceCandidate>,
    selector: &TargetSelector,
) -> Result<ApplianceHandle, ResolveError> {
    let mut vchs: Vec<ApplianceCandidate> = candidates.into_iter().filter(|c| c.is_vch).collect();
    match vchs.len() {
        0 => Err(ResolveError::NotFound(selector.to_string())),
        1 => {
            let only = vchs.remove(0);
            if only.powered_on {
                Ok(only.handle)
            } else {
                Err(ResolveError::NotRunning(only.handle.name))
            }
        }
        count => Err(ResolveError::Ambiguous {
            selector: selector.to_string(),
            count,
            names: vchs
                .iter()
                .map(|c| format!("{} ({})", c.handle.name, c.handle.id))
                .collect::<Vec<_>>()
                .join(", "),
        }),
    }
}

// ── Configuration snapshot ────────────────────────────────────────────────────

/// Immutable configuration snapshot of one appliance.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplianceConfig {
    pub version: Option<BuildVersion>,
    pub client_ip: Option<String>,
    pub management_ip: Option<String>,
    pub docker_tls: bool,
    /// `0` only when the key is absent or reads as zero.
    pub debug_level: u32,
    pub ssh_enabled: bool,
    pub authorized_key_digest: Option<String>,
    /// Datastore path of the `.vmx`, e.g. `[datastore1] vch-42/vch-42.vmx`.
    pub vmx_path: Option<String>,
}

impl ApplianceConfig {
    /// Builds a snapshot from guestinfo values.
    ///
    /// `guest_ip` (reported by VM tools) stands in for the client IP when
    /// the appliance has not published one.
    #[must_use]
    pub fn from_guestinfo(
        guestinfo: &BTreeMap<String, String>,
        guest_ip: Option<&str>,
        vmx_path: Option<&str>,
    ) -> Self {
        let get = |key: &str| {
            guestinfo
                .get(key)
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
        };
        let flag = |key: &str| get(key).is_some_and(|v| matches!(v, "true" | "1"));

        Self {
            version: get(KEY_VERSION).and_then(|v| BuildVersion::parse(v).ok()),
            client_ip: get(KEY_CLIENT_IP)
                .or(guest_ip.map(str::trim).filter(|ip| !ip.is_empty()))
                .map(str::to_string),
            management_ip: get(KEY_MANAGEMENT_IP).map(str::to_string),
            // Appliances without the key predate plain-HTTP support.
            docker_tls: get(KEY_DOCKER_TLS).is_none_or(|v| v != "false"),
            // A value we cannot read is left alone rather than lowered.
            debug_level: get(KEY_DEBUG_LEVEL).map_or(0, |v| v.parse().unwrap_or(1)),
            ssh_enabled: flag(KEY_SSH_ENABLED),
            authorized_key_digest: get(KEY_AUTHORIZED_KEY_DIGEST).map(str::to_string),
            vmx_path: vmx_path.map(str::to_string),
        }
    }

    /// Short version string, or `unknown`.
    #[must_use]
    pub fn version_label(&self) -> String {
        self.version
            .as_ref()
            .map_or_else(|| "unknown".to_string(), BuildVersion::short_version)
    }

    /// Endpoints reachable on the appliance's client network.
    #[must_use]
    pub fn endpoints(&self) -> Endpoints {
        let Some(ip) = self.client_ip.as_deref() else {
            return Endpoints::default();
        };
        let host = if ip.contains(':') {
            format!("[{ip}]")
        } else {
            ip.to_string()
        };
        let docker_port = if self.docker_tls {
            DOCKER_TLS_PORT
        } else {
            DOCKER_PLAIN_PORT
        };

        Endpoints {
            docker_api: Some(format!("tcp://{host}:{docker_port}")),
            admin_portal: Some(format!("https://{host}:{ADMIN_PORTAL_PORT}")),
            ssh: self
                .ssh_enabled
                .then(|| format!("ssh://root@{host}:{SSH_PORT}")),
            authorized_key_digest: self
                .authorized_key_digest
                .clone()
                .filter(|_| self.ssh_enabled),
        }
    }

    /// Where the appliance keeps its log files, derived from the `.vmx` path.
    #[must_use]
    pub fn diagnostic_logs(&self) -> Option<DiagnosticLogs> {
        let (datastore, path) = parse_datastore_path(self.vmx_path.as_deref()?)?;
        let folder = path.rsplit_once('/').map_or("", |(dir, _)| dir);
        Some(DiagnosticLogs {
            datastore: datastore.to_string(),
            folder: folder.to_string(),
            files: APPLIANCE_LOG_FILES.iter().map(|f| (*f).to_string()).collect(),
        })
    }
}

/// Splits `[datastore] path/in/datastore` into its two halves.
fn parse_datastore_path(raw: &str) -> Option<(&str, &str)> {
    let rest = raw.trim().strip_prefix('[')?;
    let (datastore, path) = rest.split_once(']')?;
    let datastore = datastore.trim();
    if datastore.is_empty() {
        return None;
    }
    Some((datastore, path.trim()))
}

// ── Diagnostics ───────────────────────────────────────────────────────────────

/// Remote locations of the appliance log files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosticLogs {
    pub datastore: String,
    /// Folder inside the datastore; empty for the datastore root.
    pub folder: String,
    pub files: Vec<String>,
}

impl DiagnosticLogs {
    #[must_use]
    pub fn remote_path(&self, file: &str) -> String {
        if self.folder.is_empty() {
            file.to_string()
        } else {
            format!("{}/{file}", self.folder)
        }
    }
}

/// Logs gathered into a local directory after a failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosticBundle {
    pub path: PathBuf,
    pub files: Vec<String>,
    pub missing: Vec<String>,
}

impl DiagnosticBundle {
    #[must_use]
    pub fn summary(&self) -> DiagnosticsSummary {
        DiagnosticsSummary {
            path: self.path.display().to_string(),
            files: self.files.clone(),
            missing: self.missing.clone(),
        }
    }
}

/// Directory name for a bundle: `vch-debug-<name>-<timestamp>`, with any
/// character outside `[A-Za-z0-9._-]` replaced by `_`.
#[must_use]
pub fn bundle_dir_name(appliance_name: &str, timestamp: &str) -> String {
    let name: String = appliance_name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || "._-".contains(c) {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("vch-debug-{name}-{timestamp}")
}
