//! Config-only backend: renders provisioning files to disk, creates nothing.

use crate::deployer::{write_artifact, write_secret_artifact, DeployResult, Deployer, ResultBuilder};
use crate::options::DeployOptions;
use crate::progress::{ProgressCallback, ProgressEvent};
use crate::summary::render_summary;
use anyhow::{Context, Result};
use std::sync::Arc;
use uvm_core::cloud_init::render_cloud_init;
use uvm_core::packages::PackageRegistry;
use uvm_core::{DeploymentTarget, UvmError};

pub const CONFIG_ENV: &str = "config.env";
pub const SECRETS_ENV: &str = "secrets.env";
pub const SUMMARY_MD: &str = "summary.md";
pub const CLOUD_INIT_YAML: &str = "cloud-init.yaml";

pub struct ConfigDeployer {
    registry: Option<Arc<dyn PackageRegistry>>,
}

impl ConfigDeployer {
    pub fn new(registry: Option<Arc<dyn PackageRegistry>>) -> Self {
        Self { registry }
    }

    fn write_all(
        &self,
        opts: &DeployOptions,
        result: &mut ResultBuilder,
        progress: ProgressCallback<'_>,
    ) -> Result<()> {
        let generate = opts.generate()?;
        let dir = &generate.output_dir;
        let registry = self.registry.as_deref();

        progress(ProgressEvent::new(
            "prepare",
            format!("Preparing {}", dir.display()),
            10.0,
        ));
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
        result.output("output_dir", dir.display().to_string());

        let path = dir.join(CONFIG_ENV);
        progress(ProgressEvent::new("config", "Writing config.env", 25.0));
        write_artifact(&path, &opts.config.to_config_env())?;
        result.log(format!("wrote {}", path.display()));
        result.output(CONFIG_ENV, path.display().to_string());

        let path = dir.join(SECRETS_ENV);
        progress(ProgressEvent::new("secrets", "Writing secrets.env", 40.0));
        write_secret_artifact(&path, &opts.config.to_secrets_env())?;
        result.log(format!("wrote {} (0600)", path.display()));
        result.output(SECRETS_ENV, path.display().to_string());

        let path = dir.join(SUMMARY_MD);
        progress(ProgressEvent::new("summary", "Writing summary.md", 55.0));
        write_artifact(&path, &render_summary(opts, registry))?;
        result.log(format!("wrote {}", path.display()));
        result.output(SUMMARY_MD, path.display().to_string());

        if generate.generate_cloud_init {
            let path = dir.join(CLOUD_INIT_YAML);
            progress(ProgressEvent::new("cloud-init", "Rendering cloud-init.yaml", 75.0));
            let yaml = render_cloud_init(&opts.config, registry)?;
            // user-data carries ssh keys and tokens in runcmd
            write_secret_artifact(&path, &yaml)?;
            result.log(format!("wrote {}", path.display()));
            result.output(CLOUD_INIT_YAML, path.display().to_string());
        }

        progress(ProgressEvent::new("done", "Configuration generated", 100.0));
        Ok(())
    }
}

impl Deployer for ConfigDeployer {
    fn name(&self) -> &'static str {
        "config-only"
    }

    fn target(&self) -> DeploymentTarget {
        DeploymentTarget::ConfigOnly
    }

    fn validate(&self, opts: &DeployOptions) -> Result<()> {
        if self.registry.is_none() {
            return Err(UvmError::MissingRegistry.into());
        }
        let generate = opts.generate()?;
        if generate.output_dir.as_os_str().is_empty() {
            return Err(UvmError::ValidationFailed("output directory is empty".to_string()).into());
        }
        Ok(())
    }

    fn deploy(&self, opts: &DeployOptions, progress: ProgressCallback<'_>) -> Result<DeployResult> {
        let mut result = ResultBuilder::start();
        result.log(format!("generating config for {}", opts.config.hostname));
        match self.write_all(opts, &mut result, progress) {
            Ok(()) => Ok(result.success()),
            Err(err) => Ok(result.failure(format!("{:#}", err))),
        }
    }

    fn cleanup(&self, _opts: &DeployOptions) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::build_deploy_options;
    use tempfile::tempdir;
    use uvm_core::settings::Settings;
    use uvm_core::{Catalogue, WizardData};

    fn options(dir: &std::path::Path, cloud_init: bool) -> DeployOptions {
        let mut data = WizardData {
            target: DeploymentTarget::ConfigOnly,
            packages: vec!["git".to_string(), "tmux".to_string()],
            ssh_keys: vec!["ssh-ed25519 AAAA test@host".to_string()],
            github_pat: "ghp_secret".to_string(),
            ..Default::default()
        };
        data.generate.output_dir = dir.to_path_buf();
        data.generate.generate_cloud_init = cloud_init;
        let catalogue = Catalogue::builtin();
        build_deploy_options(&data, Some(&catalogue), &Settings::default())
    }

    fn deployer() -> ConfigDeployer {
        ConfigDeployer::new(Some(Arc::new(Catalogue::builtin())))
    }

    #[test]
    fn validate_requires_registry() {
        let dir = tempdir().unwrap();
        let err = ConfigDeployer::new(None)
            .validate(&options(dir.path(), false))
            .unwrap_err();
        assert!(matches!(err.downcast_ref::<UvmError>(), Some(UvmError::MissingRegistry)));
    }

    #[test]
    fn writes_expected_files_with_progress() {
        let dir = tempdir().unwrap();
        let opts = options(dir.path(), true);
        let mut percents = Vec::new();
        let result = deployer()
            .deploy(&opts, &mut |e: ProgressEvent| percents.push(e.percent as u32))
            .unwrap();

        assert!(result.success, "{:?}", result.error);
        assert_eq!(percents, vec![10, 25, 40, 55, 75, 100]);
        for file in [CONFIG_ENV, SECRETS_ENV, SUMMARY_MD, CLOUD_INIT_YAML] {
            assert!(dir.path().join(file).exists(), "missing {}", file);
        }
        assert!(result.outputs.contains_key(CLOUD_INIT_YAML));

        let config = std::fs::read_to_string(dir.path().join(CONFIG_ENV)).unwrap();
        assert!(config.contains("UVM_PACKAGES='git tmux'"));
        assert!(!config.contains("ghp_secret"));

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(dir.path().join(SECRETS_ENV))
                .unwrap()
                .permissions()
                .mode();
            assert_eq!(mode & 0o777, 0o600);
        }
    }

    #[test]
    fn cloud_init_is_optional() {
        let dir = tempdir().unwrap();
        let opts = options(dir.path(), false);
        let mut percents = Vec::new();
        let result = deployer()
            .deploy(&opts, &mut |e: ProgressEvent| percents.push(e.percent as u32))
            .unwrap();
        assert!(result.success);
        assert!(!dir.path().join(CLOUD_INIT_YAML).exists());
        assert!(!percents.contains(&75));
    }

    #[test]
    fn write_failure_keeps_partial_logs() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, "x").unwrap();
        let opts = options(&blocker.join("nested"), false);
        let result = deployer().deploy(&opts, &mut |_| {}).unwrap();
        assert!(!result.success);
        assert!(result.error.is_some());
        assert!(!result.logs.is_empty());
    }
}
