use anyhow::{anyhow, Result};
use std::path::PathBuf;
use uvm_core::packages::PackageRegistry;
use uvm_core::provision::ProvisionConfig;
use uvm_core::settings::Settings;
use uvm_core::wizard_data::{GenerateOptions, MultipassOptions, TerraformOptions, UsbOptions};
use uvm_core::{DeploymentTarget, WizardData};

/// Normalized input to a deployer. Only the bundle for `target` is set.
#[derive(Debug, Clone, PartialEq)]
pub struct DeployOptions {
    pub target: DeploymentTarget,
    pub multipass: Option<MultipassOptions>,
    pub terraform: Option<TerraformOptions>,
    pub usb: Option<UsbOptions>,
    pub generate: Option<GenerateOptions>,
    pub config: ProvisionConfig,
    /// Per-machine scratch directory for generated files
    pub work_dir: PathBuf,
    pub terraform_module_dir: PathBuf,
}

impl DeployOptions {
    pub fn multipass(&self) -> Result<&MultipassOptions> {
        self.multipass
            .as_ref()
            .ok_or_else(|| anyhow!("multipass options missing"))
    }

    pub fn terraform(&self) -> Result<&TerraformOptions> {
        self.terraform
            .as_ref()
            .ok_or_else(|| anyhow!("terraform options missing"))
    }

    pub fn usb(&self) -> Result<&UsbOptions> {
        self.usb.as_ref().ok_or_else(|| anyhow!("usb options missing"))
    }

    pub fn generate(&self) -> Result<&GenerateOptions> {
        self.generate
            .as_ref()
            .ok_or_else(|| anyhow!("output options missing"))
    }
}

/// Build deploy options from reviewed wizard data.
pub fn build_deploy_options(
    data: &WizardData,
    registry: Option<&dyn PackageRegistry>,
    settings: &Settings,
) -> DeployOptions {
    let mut opts = DeployOptions {
        target: data.target,
        multipass: None,
        terraform: None,
        usb: None,
        generate: None,
        config: ProvisionConfig::from_wizard(data, registry),
        work_dir: settings.work_dir.join(sanitize(data.machine_name())),
        terraform_module_dir: settings.terraform_module_dir.clone(),
    };
    match data.target {
        DeploymentTarget::Multipass => opts.multipass = Some(data.multipass.clone()),
        DeploymentTarget::Terraform => opts.terraform = Some(data.terraform.clone()),
        DeploymentTarget::Usb => opts.usb = Some(data.usb.clone()),
        DeploymentTarget::ConfigOnly => opts.generate = Some(data.generate.clone()),
    }
    opts
}

fn sanitize(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '-' })
        .collect();
    if cleaned.is_empty() {
        "default".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uvm_core::packages::{Catalogue, Package};

    fn registry() -> Catalogue {
        let pkg = |name: &str| Package {
            name: name.to_string(),
            description: String::new(),
            category: "core".to_string(),
            apt: vec![],
            default_selected: false,
        };
        Catalogue::from_packages(vec![pkg("a"), pkg("b"), pkg("c")], vec![])
    }

    #[test]
    fn only_selected_target_bundle_is_set() {
        let data = WizardData {
            target: DeploymentTarget::Usb,
            ..Default::default()
        };
        let opts = build_deploy_options(&data, None, &Settings::default());
        assert!(opts.usb.is_some());
        assert!(opts.multipass.is_none());
        assert!(opts.terraform.is_none());
        assert!(opts.generate.is_none());
        assert!(opts.multipass().is_err());
    }

    #[test]
    fn disabled_packages_complement_registry() {
        let data = WizardData {
            packages: vec!["a".to_string()],
            ..Default::default()
        };
        let registry = registry();
        let opts = build_deploy_options(&data, Some(&registry), &Settings::default());
        let mut disabled = opts.config.disabled_packages.clone();
        disabled.sort();
        assert_eq!(disabled, vec!["b", "c"]);
    }

    #[test]
    fn work_dir_is_per_machine() {
        let mut data = WizardData::default();
        data.multipass.name = "my vm".to_string();
        let settings = Settings {
            work_dir: PathBuf::from("/tmp/uvm-work"),
            ..Default::default()
        };
        let opts = build_deploy_options(&data, None, &settings);
        assert_eq!(opts.work_dir, PathBuf::from("/tmp/uvm-work/my-vm"));
    }
}
