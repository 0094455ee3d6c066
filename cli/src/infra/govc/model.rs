//! Serde models for the subset of `govc ... -json` output we read.
//!
//! Older govc releases emit capitalised keys, newer ones camelCase; both are
//! accepted through aliases.

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::domain::appliance::{ApplianceCandidate, ApplianceConfig, ApplianceHandle, is_vch};
use crate::domain::session::{ApiType, PlatformAbout};

// ── about ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct AboutResponse {
    #[serde(alias = "About")]
    pub about: About,
}

#[derive(Debug, Deserialize)]
pub struct About {
    #[serde(alias = "FullName", alias = "fullName", default)]
    pub full_name: String,
    #[serde(alias = "ApiType", alias = "apiType", default)]
    pub api_type: String,
    #[serde(alias = "ApiVersion", alias = "apiVersion", default)]
    pub api_version: String,
}

impl From<About> for PlatformAbout {
    fn from(about: About) -> Self {
        Self {
            full_name: about.full_name,
            api_type: ApiType::parse(&about.api_type),
            api_version: about.api_version,
        }
    }
}

// ── vm.info ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct VmInfoResponse {
    #[serde(alias = "VirtualMachines", alias = "virtualMachines", default)]
    pub virtual_machines: Option<Vec<VirtualMachine>>,
}

impl VmInfoResponse {
    pub fn into_machines(self) -> Vec<VirtualMachine> {
        self.virtual_machines.unwrap_or_default()
    }
}

#[derive(Debug, Deserialize)]
pub struct VirtualMachine {
    #[serde(alias = "Self", rename = "self")]
    pub reference: ManagedObjectRef,
    #[serde(alias = "Name", default)]
    pub name: String,
    #[serde(alias = "Config", default)]
    pub config: Option<VmConfig>,
    #[serde(alias = "Runtime", default)]
    pub runtime: Option<VmRuntime>,
    #[serde(alias = "Guest", default)]
    pub guest: Option<GuestInfo>,
}

#[derive(Debug, Deserialize)]
pub struct ManagedObjectRef {
    #[serde(alias = "Type", rename = "type", default)]
    pub kind: String,
    #[serde(alias = "Value", default)]
    pub value: String,
}

#[derive(Debug, Deserialize)]
pub struct VmConfig {
    #[serde(alias = "Files", default)]
    pub files: Option<VmFiles>,
    #[serde(alias = "ExtraConfig", alias = "extraConfig", default)]
    pub extra_config: Option<Vec<ExtraConfigEntry>>,
}

#[derive(Debug, Deserialize)]
pub struct VmFiles {
    #[serde(alias = "VmPathName", alias = "vmPathName", default)]
    pub vm_path_name: Option<String>,
}

/// Values are typed loosely by the platform; only strings are kept.
#[derive(Debug, Deserialize)]
pub struct ExtraConfigEntry {
    #[serde(alias = "Key")]
    pub key: String,
    #[serde(alias = "Value", default)]
    pub value: serde_json::Value,
}

#[derive(Debug, Deserialize)]
pub struct VmRuntime {
    #[serde(alias = "PowerState", alias = "powerState", default)]
    pub power_state: String,
}

#[derive(Debug, Deserialize)]
pub struct GuestInfo {
    #[serde(alias = "IpAddress", alias = "ipAddress", default)]
    pub ip_address: Option<String>,
}

impl VirtualMachine {
    /// String-valued extra-config entries.
    pub fn extra_config(&self) -> BTreeMap<String, String> {
        self.config
            .iter()
            .flat_map(|c| c.extra_config.iter().flatten())
            .filter_map(|e| match &e.value {
                serde_json::Value::String(v) => Some((e.key.clone(), v.clone())),
                _ => None,
            })
            .collect()
    }

    pub fn powered_on(&self) -> bool {
        self.runtime
            .as_ref()
            .is_some_and(|r| r.power_state == "poweredOn")
    }

    pub fn handle(&self) -> ApplianceHandle {
        ApplianceHandle {
            id: self.reference.value.clone(),
            name: self.name.clone(),
            inventory_path: None,
        }
    }

    pub fn candidate(&self) -> ApplianceCandidate {
        let extra = self.extra_config();
        ApplianceCandidate {
            handle: self.handle(),
            powered_on: self.powered_on(),
            is_vch: is_vch(extra.keys().map(String::as_str)),
        }
    }

    pub fn appliance_config(&self) -> ApplianceConfig {
        let vmx_path = self
            .config
            .as_ref()
            .and_then(|c| c.files.as_ref())
            .and_then(|f| f.vm_path_name.as_deref());
        let guest_ip = self.guest.as_ref().and_then(|g| g.ip_address.as_deref());
        ApplianceConfig::from_guestinfo(&self.extra_config(), guest_ip, vmx_path)
    }
}
