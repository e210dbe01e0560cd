//! Multipass backend: launches a local Ubuntu instance with our cloud-init.

use crate::deployer::{write_secret_artifact, DeployResult, Deployer, ResultBuilder};
use crate::options::DeployOptions;
use crate::progress::{ProgressCallback, ProgressEvent};
use crate::runner::{display_command, CommandRunner};
use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use uvm_core::cloud_init::render_cloud_init;
use uvm_core::packages::PackageRegistry;
use uvm_core::{DeploymentTarget, UvmError};

const PROGRAM: &str = "multipass";
const QUICK_TIMEOUT: Duration = Duration::from_secs(30);
const LAUNCH_TIMEOUT: Duration = Duration::from_secs(20 * 60);

pub struct MultipassDeployer {
    runner: Arc<dyn CommandRunner>,
    registry: Option<Arc<dyn PackageRegistry>>,
}

fn args(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

/// First IPv4 address for `name` in `multipass info --format json` output.
pub fn parse_ipv4(info_json: &str, name: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(info_json).ok()?;
    value
        .get("info")?
        .get(name)?
        .get("ipv4")?
        .as_array()?
        .first()?
        .as_str()
        .map(str::to_string)
}

/// Whether `multipass list --format json` output names an instance `name`.
///
/// Empty output means no instances; anything else must parse.
pub fn instance_listed(list_json: &str, name: &str) -> Result<bool> {
    if list_json.trim().is_empty() {
        return Ok(false);
    }
    let value: serde_json::Value =
        serde_json::from_str(list_json).context("Failed to parse multipass list output")?;
    let listed = value
        .get("list")
        .and_then(|l| l.as_array())
        .map(|list| {
            list.iter()
                .any(|entry| entry.get("name").and_then(|n| n.as_str()) == Some(name))
        })
        .unwrap_or(false);
    Ok(listed)
}

/// Multipass instance names: a letter first, then letters, digits and `-`.
pub fn valid_instance_name(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic())
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
        && !name.ends_with('-')
}

impl MultipassDeployer {
    pub fn new(runner: Arc<dyn CommandRunner>, registry: Option<Arc<dyn PackageRegistry>>) -> Self {
        Self { runner, registry }
    }

    fn run(
        &self,
        step: ProgressEvent,
        argv: Vec<String>,
        timeout: Duration,
        result: &mut ResultBuilder,
        progress: ProgressCallback<'_>,
    ) -> Result<String> {
        let line = display_command(PROGRAM, &argv);
        progress(step.with_command(line.clone()));
        result.log(format!("$ {}", line));
        let out = self.runner.run_checked(PROGRAM, &argv, None, timeout)?;
        Ok(out.stdout)
    }

    fn launch(
        &self,
        opts: &DeployOptions,
        result: &mut ResultBuilder,
        progress: ProgressCallback<'_>,
    ) -> Result<()> {
        let mp = opts.multipass()?;
        let cloud_init = opts.work_dir.join("cloud-init.yaml");

        let version = self.run(
            ProgressEvent::new("preflight", "Checking multipass", 15.0),
            args(&["version"]),
            QUICK_TIMEOUT,
            result,
            progress,
        )?;
        if let Some(first) = version.lines().next() {
            result.log(first.to_string());
        }

        let listed = self.run(
            ProgressEvent::new("preflight", "Checking existing instances", 20.0),
            args(&["list", "--format", "json"]),
            QUICK_TIMEOUT,
            result,
            progress,
        )?;
        if instance_listed(&listed, &mp.name)? {
            return Err(UvmError::ValidationFailed(format!(
                "instance {} already exists; pick another name or delete it first",
                mp.name
            ))
            .into());
        }

        let argv = vec![
            "launch".to_string(),
            mp.image.clone(),
            "--name".to_string(),
            mp.name.clone(),
            "--cpus".to_string(),
            mp.cpus.to_string(),
            "--memory".to_string(),
            mp.memory.clone(),
            "--disk".to_string(),
            mp.disk.clone(),
            "--cloud-init".to_string(),
            cloud_init.display().to_string(),
            "--timeout".to_string(),
            LAUNCH_TIMEOUT.as_secs().to_string(),
        ];
        result.mark_creating();
        self.run(
            ProgressEvent::new("launch", format!("Launching {} ({})", mp.name, mp.image), 30.0),
            argv,
            LAUNCH_TIMEOUT,
            result,
            progress,
        )?;
        result.output("instance", mp.name.clone());

        let info = self.run(
            ProgressEvent::new("info", "Querying instance address", 80.0),
            args(&["info", &mp.name, "--format", "json"]),
            QUICK_TIMEOUT,
            result,
            progress,
        )?;
        match parse_ipv4(&info, &mp.name) {
            Some(ip) => {
                result.output("ipv4", ip.clone());
                result.output("ssh", format!("ssh {}@{}", opts.config.username, ip));
            }
            None => result.log("instance reported no IPv4 address"),
        }
        Ok(())
    }
}

impl Deployer for MultipassDeployer {
    fn name(&self) -> &'static str {
        "multipass"
    }

    fn target(&self) -> DeploymentTarget {
        DeploymentTarget::Multipass
    }

    fn validate(&self, opts: &DeployOptions) -> Result<()> {
        let mp = opts.multipass()?;
        if !valid_instance_name(&mp.name) {
            return Err(UvmError::ValidationFailed(format!(
                "invalid instance name {:?}: use letters, digits and '-'",
                mp.name
            ))
            .into());
        }
        if mp.cpus == 0 {
            return Err(UvmError::ValidationFailed("cpus must be at least 1".to_string()).into());
        }
        if mp.image.trim().is_empty() {
            return Err(UvmError::ValidationFailed("image is empty".to_string()).into());
        }
        Ok(())
    }

    fn deploy(&self, opts: &DeployOptions, progress: ProgressCallback<'_>) -> Result<DeployResult> {
        let mp = opts.multipass()?;
        let mut result = ResultBuilder::start();

        progress(ProgressEvent::new("prepare", "Rendering cloud-init", 5.0));
        let cloud_init = opts.work_dir.join("cloud-init.yaml");
        let yaml = render_cloud_init(&opts.config, self.registry.as_deref())?;
        write_secret_artifact(&cloud_init, &yaml)
            .with_context(|| format!("writing {}", cloud_init.display()))?;
        result.output("cloud_init", cloud_init.display().to_string());

        match self.launch(opts, &mut result, progress) {
            Ok(()) => {
                progress(ProgressEvent::new("done", format!("{} is running", mp.name), 100.0));
                Ok(result.success())
            }
            Err(err) => {
                let message = format!("{:#}", err);
                progress(
                    ProgressEvent::error("launch", "Multipass launch failed", 100.0)
                        .with_detail(message.clone()),
                );
                if !result.needs_rollback() {
                    result.log(format!("{} was not launched; nothing to delete", mp.name));
                } else if mp.keep_on_failure {
                    result.log(format!("keeping {} for inspection", mp.name));
                } else if let Err(cleanup_err) = self.cleanup(opts) {
                    result.log(format!("cleanup failed: {:#}", cleanup_err));
                } else {
                    result.log(format!("deleted {}", mp.name));
                }
                Ok(result.failure(message))
            }
        }
    }

    fn cleanup(&self, opts: &DeployOptions) -> Result<()> {
        let mp = opts.multipass()?;
        let argv = args(&["delete", "--purge", &mp.name]);
        log::info!("$ {}", display_command(PROGRAM, &argv));
        self.runner.run_checked(PROGRAM, &argv, None, QUICK_TIMEOUT)?;
        Ok(())
    }
}
