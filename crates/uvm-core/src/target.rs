use serde::{Deserialize, Serialize};
use std::fmt;

/// Where the reviewed wizard data ends up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeploymentTarget {
    /// Local VM via Multipass
    #[default]
    Multipass,
    /// libvirt VM provisioned through Terraform
    Terraform,
    /// Bootable USB autoinstall image
    Usb,
    /// Only write config files and (optionally) cloud-init
    ConfigOnly,
}

impl DeploymentTarget {
    pub fn all() -> &'static [DeploymentTarget] {
        &[
            DeploymentTarget::Multipass,
            DeploymentTarget::Terraform,
            DeploymentTarget::Usb,
            DeploymentTarget::ConfigOnly,
        ]
    }

    /// Position in [`DeploymentTarget::all`]; the Target phase selection index.
    pub fn index(&self) -> usize {
        match self {
            DeploymentTarget::Multipass => 0,
            DeploymentTarget::Terraform => 1,
            DeploymentTarget::Usb => 2,
            DeploymentTarget::ConfigOnly => 3,
        }
    }

    pub fn from_index(index: usize) -> Option<DeploymentTarget> {
        Self::all().get(index).copied()
    }

    pub fn title(&self) -> &'static str {
        match self {
            DeploymentTarget::Multipass => "Multipass VM",
            DeploymentTarget::Terraform => "Terraform / libvirt VM",
            DeploymentTarget::Usb => "Bootable USB image",
            DeploymentTarget::ConfigOnly => "Generate files only",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            DeploymentTarget::Multipass => "Launch a local Ubuntu VM with multipass",
            DeploymentTarget::Terraform => "Apply a libvirt Terraform module on a KVM host",
            DeploymentTarget::Usb => "Remaster an Ubuntu ISO with an autoinstall config",
            DeploymentTarget::ConfigOnly => "Write config.env, secrets.env and cloud-init",
        }
    }
}

impl fmt::Display for DeploymentTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeploymentTarget::Multipass => write!(f, "multipass"),
            DeploymentTarget::Terraform => write!(f, "terraform"),
            DeploymentTarget::Usb => write!(f, "usb"),
            DeploymentTarget::ConfigOnly => write!(f, "config-only"),
        }
    }
}
