//! Everything a wizard session collects before deployment.
//!
//! `WizardData` is target-discriminated: only the option bundle matching
//! `target` is meaningful, the others keep their defaults and are ignored by
//! downstream consumers.

use crate::target::DeploymentTarget;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEFAULT_USERNAME: &str = "ubuntu";
pub const DEFAULT_HOSTNAME: &str = "ubuntu-server";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultipassOptions {
    pub name: String,
    /// Multipass image alias, e.g. `24.04`
    pub image: String,
    pub cpus: u32,
    /// Memory with unit suffix as multipass expects it, e.g. `4G`
    pub memory: String,
    /// Disk size with unit suffix, e.g. `20G`
    pub disk: String,
    pub keep_on_failure: bool,
}

impl Default for MultipassOptions {
    fn default() -> Self {
        Self {
            name: "ubuntu-dev".to_string(),
            image: "24.04".to_string(),
            cpus: 2,
            memory: "4G".to_string(),
            disk: "20G".to_string(),
            keep_on_failure: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerraformOptions {
    pub name: String,
    pub cpus: u32,
    pub memory_mb: u32,
    pub disk_gb: u32,
    /// Base cloud image (qcow2) on the libvirt host
    pub image_path: String,
    pub libvirt_uri: String,
}

impl Default for TerraformOptions {
    fn default() -> Self {
        Self {
            name: "ubuntu-vm".to_string(),
            cpus: 2,
            memory_mb: 4096,
            disk_gb: 20,
            image_path: "/var/lib/libvirt/images/noble-server-cloudimg-amd64.img".to_string(),
            libvirt_uri: "qemu:///system".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsbOptions {
    pub source_iso: String,
    pub output_path: String,
    /// Autoinstall storage layout: `lvm`, `direct` or `zfs`
    pub storage_layout: String,
    pub timezone: String,
}

impl Default for UsbOptions {
    fn default() -> Self {
        Self {
            source_iso: String::new(),
            output_path: "ubuntu-autoinstall.iso".to_string(),
            storage_layout: "lvm".to_string(),
            timezone: "UTC".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateOptions {
    pub output_dir: PathBuf,
    pub generate_cloud_init: bool,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("output"),
            generate_cloud_init: true,
        }
    }
}

/// Data accumulated across the wizard phases.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WizardData {
    pub target: DeploymentTarget,

    pub multipass: MultipassOptions,
    pub terraform: TerraformOptions,
    pub usb: UsbOptions,
    pub generate: GenerateOptions,

    /// Selected SSH public keys, local and GitHub-imported, deduplicated
    pub ssh_keys: Vec<String>,
    pub github_username: String,

    pub git_name: String,
    pub git_email: String,

    pub display_name: String,
    pub username: String,
    pub hostname: String,

    /// Selected package names, sorted
    pub packages: Vec<String>,

    pub tailscale_auth_key: String,
    pub github_pat: String,
}

impl WizardData {
    /// Username with the `ubuntu` fallback applied.
    pub fn effective_username(&self) -> &str {
        if self.username.trim().is_empty() {
            DEFAULT_USERNAME
        } else {
            &self.username
        }
    }

    /// Hostname with the `ubuntu-server` fallback applied.
    pub fn effective_hostname(&self) -> &str {
        if self.hostname.trim().is_empty() {
            DEFAULT_HOSTNAME
        } else {
            &self.hostname
        }
    }

    /// Name of the machine being created, as shown on Review.
    pub fn machine_name(&self) -> &str {
        match self.target {
            DeploymentTarget::Multipass => &self.multipass.name,
            DeploymentTarget::Terraform => &self.terraform.name,
            DeploymentTarget::Usb | DeploymentTarget::ConfigOnly => self.effective_hostname(),
        }
    }

    /// Timezone used in generated configs; only USB images ask for one.
    pub fn timezone(&self) -> &str {
        match self.target {
            DeploymentTarget::Usb if !self.usb.timezone.trim().is_empty() => &self.usb.timezone,
            _ => "UTC",
        }
    }
}

/// Linux login name: lowercase letter or `_` first, then `[a-z0-9_-]`,
/// at most 32 characters.
pub fn valid_username(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_lowercase() || c == '_' => {}
        _ => return false,
    }
    name.len() <= 32
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-')
}

/// RFC 1123 hostname: dot-separated labels of `[A-Za-z0-9-]`, no label
/// starting or ending with `-`.
pub fn valid_hostname(name: &str) -> bool {
    if name.is_empty() || name.len() > 253 {
        return false;
    }
    name.split('.').all(|label| {
        !label.is_empty()
            && label.len() <= 63
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_identity_falls_back_to_defaults() {
        let data = WizardData {
            username: "  ".to_string(),
            ..Default::default()
        };
        assert_eq!(data.effective_username(), "ubuntu");
        assert_eq!(data.effective_hostname(), "ubuntu-server");
    }

    #[test]
    fn machine_name_follows_target() {
        let mut data = WizardData::default();
        data.multipass.name = "mp".to_string();
        data.terraform.name = "tf".to_string();
        data.hostname = "box".to_string();

        assert_eq!(data.machine_name(), "mp");
        data.target = DeploymentTarget::Terraform;
        assert_eq!(data.machine_name(), "tf");
        data.target = DeploymentTarget::ConfigOnly;
        assert_eq!(data.machine_name(), "box");
    }

    #[test]
    fn username_rules() {
        assert!(valid_username("ada"));
        assert!(valid_username("_svc-1"));
        assert!(!valid_username("Ada"));
        assert!(!valid_username("1ada"));
        assert!(!valid_username("ada lovelace"));
        assert!(!valid_username(&"a".repeat(33)));
    }

    #[test]
    fn hostname_rules() {
        assert!(valid_hostname("ubuntu-server"));
        assert!(valid_hostname("lab.example.com"));
        assert!(!valid_hostname("-edge"));
        assert!(!valid_hostname("a..b"));
        assert!(!valid_hostname("under_score"));
    }
}
