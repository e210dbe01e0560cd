//! Terraform backend: applies a libvirt module with generated variables.
//!
//! The module lives in `Settings::terraform_module_dir`; state for each
//! machine is kept in its own work dir so several machines can share one
//! module checkout.

use crate::deployer::{write_artifact, write_secret_artifact, DeployResult, Deployer, ResultBuilder};
use crate::options::DeployOptions;
use crate::progress::{ProgressCallback, ProgressEvent};
use crate::runner::{display_command, CommandOutput, CommandRunner};
use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use uvm_core::cloud_init::render_cloud_init;
use uvm_core::packages::PackageRegistry;
use uvm_core::{DeploymentTarget, UvmError};

const PROGRAM: &str = "terraform";
const INIT_TIMEOUT: Duration = Duration::from_secs(5 * 60);
const APPLY_TIMEOUT: Duration = Duration::from_secs(30 * 60);
const OUTPUT_TIMEOUT: Duration = Duration::from_secs(60);

pub const TFVARS_FILE: &str = "terraform.tfvars.json";
pub const STATE_FILE: &str = "terraform.tfstate";

#[derive(Debug, Serialize)]
struct TfVars<'a> {
    name: &'a str,
    vcpu: u32,
    memory_mb: u32,
    disk_gb: u32,
    base_image: &'a str,
    libvirt_uri: &'a str,
    cloud_init_path: String,
}

pub struct TerraformDeployer {
    runner: Arc<dyn CommandRunner>,
    registry: Option<Arc<dyn PackageRegistry>>,
}

/// Flatten `terraform output -json` into name → display value.
pub fn parse_outputs(raw: &str) -> Result<BTreeMap<String, String>> {
    let value: BTreeMap<String, serde_json::Value> =
        serde_json::from_str(raw).context("Failed to parse terraform output")?;
    Ok(value
        .into_iter()
        .filter(|(_, v)| !v.get("sensitive").and_then(|s| s.as_bool()).unwrap_or(false))
        .map(|(k, v)| {
            let shown = match v.get("value") {
                Some(serde_json::Value::String(s)) => s.clone(),
                Some(other) => other.to_string(),
                None => String::new(),
            };
            (k, shown)
        })
        .collect())
}

impl TerraformDeployer {
    pub fn new(runner: Arc<dyn CommandRunner>, registry: Option<Arc<dyn PackageRegistry>>) -> Self {
        Self { runner, registry }
    }

    fn chdir(opts: &DeployOptions) -> String {
        format!("-chdir={}", opts.terraform_module_dir.display())
    }

    fn state(opts: &DeployOptions) -> String {
        format!("-state={}", opts.work_dir.join(STATE_FILE).display())
    }

    fn var_file(opts: &DeployOptions) -> String {
        format!("-var-file={}", opts.work_dir.join(TFVARS_FILE).display())
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

    fn destroy_args(opts: &DeployOptions) -> Vec<String> {
        vec![
            Self::chdir(opts),
            "destroy".to_string(),
            "-auto-approve".to_string(),
            "-input=false".to_string(),
            Self::state(opts),
            Self::var_file(opts),
        ]
    }

    fn destroy(&self, opts: &DeployOptions) -> Result<CommandOutput> {
        let argv = Self::destroy_args(opts);
        log::info!("$ {}", display_command(PROGRAM, &argv));
        self.runner.run_checked(PROGRAM, &argv, None, APPLY_TIMEOUT)
    }

    /// Tear down what a failed apply created, keeping the destroy output.
    fn roll_back(&self, opts: &DeployOptions, result: &mut ResultBuilder, progress: ProgressCallback<'_>) {
        let line = display_command(PROGRAM, &Self::destroy_args(opts));
        progress(
            ProgressEvent::error("rollback", "Destroying partially created resources", 100.0)
                .with_command(line.clone()),
        );
        result.log(format!("$ {}", line));
        match self.destroy(opts) {
            Ok(out) => {
                for l in out.stdout.lines().filter(|l| !l.trim().is_empty()) {
                    result.log(l.to_string());
                }
            }
            Err(err) => result.log(format!("rollback failed: {:#}", err)),
        }
    }

    fn write_inputs(&self, opts: &DeployOptions, result: &mut ResultBuilder) -> Result<PathBuf> {
        let tf = opts.terraform()?;
        let cloud_init = opts.work_dir.join("cloud-init.yaml");
        let yaml = render_cloud_init(&opts.config, self.registry.as_deref())?;
        write_secret_artifact(&cloud_init, &yaml)?;
        result.output("cloud_init", cloud_init.display().to_string());

        let vars = TfVars {
            name: &tf.name,
            vcpu: tf.cpus,
            memory_mb: tf.memory_mb,
            disk_gb: tf.disk_gb,
            base_image: &tf.image_path,
            libvirt_uri: &tf.libvirt_uri,
            cloud_init_path: cloud_init.display().to_string(),
        };
        let tfvars = opts.work_dir.join(TFVARS_FILE);
        write_artifact(&tfvars, &serde_json::to_string_pretty(&vars)?)?;
        result.log(format!("wrote {}", tfvars.display()));
        Ok(tfvars)
    }

    fn apply(
        &self,
        opts: &DeployOptions,
        result: &mut ResultBuilder,
        progress: ProgressCallback<'_>,
    ) -> Result<()> {
        self.run(
            ProgressEvent::new("init", "Initializing terraform module", 20.0),
            vec![Self::chdir(opts), "init".to_string(), "-input=false".to_string()],
            INIT_TIMEOUT,
            result,
            progress,
        )?;

        result.mark_creating();
        self.run(
            ProgressEvent::new("apply", "Applying plan", 40.0),
            vec![
                Self::chdir(opts),
                "apply".to_string(),
                "-auto-approve".to_string(),
                "-input=false".to_string(),
                Self::state(opts),
                Self::var_file(opts),
            ],
            APPLY_TIMEOUT,
            result,
            progress,
        )?;
        result.output("state", opts.work_dir.join(STATE_FILE).display().to_string());

        let raw = self.run(
            ProgressEvent::new("output", "Reading outputs", 90.0),
            vec![
                Self::chdir(opts),
                "output".to_string(),
                Self::state(opts),
                "-json".to_string(),
            ],
            OUTPUT_TIMEOUT,
            result,
            progress,
        )?;
        for (name, value) in parse_outputs(&raw)? {
            result.output(&name, value);
        }
        Ok(())
    }
}

fn is_dir(path: &Path) -> bool {
    std::fs::metadata(path).map(|m| m.is_dir()).unwrap_or(false)
}

impl Deployer for TerraformDeployer {
    fn name(&self) -> &'static str {
        "terraform"
    }

    fn target(&self) -> DeploymentTarget {
        DeploymentTarget::Terraform
    }

    fn validate(&self, opts: &DeployOptions) -> Result<()> {
        let tf = opts.terraform()?;
        if tf.name.trim().is_empty() {
            return Err(UvmError::ValidationFailed("domain name is empty".to_string()).into());
        }
        if tf.image_path.trim().is_empty() {
            return Err(UvmError::ValidationFailed("base image path is empty".to_string()).into());
        }
        if tf.cpus == 0 || tf.memory_mb == 0 || tf.disk_gb == 0 {
            return Err(
                UvmError::ValidationFailed("cpu, memory and disk must be non-zero".to_string()).into(),
            );
        }
        if !is_dir(&opts.terraform_module_dir) {
            return Err(UvmError::ValidationFailed(format!(
                "terraform module directory not found: {}",
                opts.terraform_module_dir.display()
            ))
            .into());
        }
        Ok(())
    }

    fn deploy(&self, opts: &DeployOptions, progress: ProgressCallback<'_>) -> Result<DeployResult> {
        let mut result = ResultBuilder::start();
        progress(ProgressEvent::new("prepare", "Writing terraform variables", 5.0));
        let tfvars = self.write_inputs(opts, &mut result)?;
        result.output("tfvars", tfvars.display().to_string());

        match self.apply(opts, &mut result, progress) {
            Ok(()) => {
                progress(ProgressEvent::new("done", "Terraform apply complete", 100.0));
                Ok(result.success())
            }
            Err(err) => {
                let message = format!("{:#}", err);
                progress(
                    ProgressEvent::error("apply", "Terraform failed", 100.0)
                        .with_detail(message.clone()),
                );
                if result.needs_rollback() {
                    self.roll_back(opts, &mut result, progress);
                }
                Ok(result.failure(message))
            }
        }
    }

    fn cleanup(&self, opts: &DeployOptions) -> Result<()> {
        self.destroy(opts)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::build_deploy_options;
    use crate::runner::fake::FakeRunner;
    use tempfile::{tempdir, TempDir};
    use uvm_core::settings::Settings;
    use uvm_core::WizardData;

    const OUTPUTS: &str = r#"{
        "ip": {"sensitive": false, "type": "string", "value": "192.168.122.50"},
        "vcpu": {"sensitive": false, "type": "number", "value": 2},
        "token": {"sensitive": true, "type": "string", "value": "hidden"}
    }"#;

    fn options(root: &TempDir) -> DeployOptions {
        let module = root.path().join("module");
        std::fs::create_dir_all(&module).unwrap();
        let data = WizardData {
            target: DeploymentTarget::Terraform,
            ..Default::default()
        };
        let settings = Settings {
            work_dir: root.path().join("work"),
            terraform_module_dir: module,
            ..Default::default()
        };
        build_deploy_options(&data, None, &settings)
    }

    #[test]
    fn outputs_skip_sensitive_values() {
        let outputs = parse_outputs(OUTPUTS).unwrap();
        assert_eq!(outputs.get("ip").map(String::as_str), Some("192.168.122.50"));
        assert_eq!(outputs.get("vcpu").map(String::as_str), Some("2"));
        assert!(!outputs.contains_key("token"));
    }

    #[test]
    fn validate_requires_module_dir() {
        let root = tempdir().unwrap();
        let mut opts = options(&root);
        let deployer = TerraformDeployer::new(Arc::new(FakeRunner::new()), None);
        assert!(deployer.validate(&opts).is_ok());
        opts.terraform_module_dir = root.path().join("missing");
        assert!(deployer.validate(&opts).is_err());
    }

    #[test]
    fn init_apply_output_sequence() {
        let root = tempdir().unwrap();
        let opts = options(&root);
        let runner = FakeRunner::new().ok("terraform", "").ok(
            &format!("terraform -chdir={} output", opts.terraform_module_dir.display()),
            OUTPUTS,
        );
        let deployer = TerraformDeployer::new(Arc::new(runner.clone()), None);
        let result = deployer.deploy(&opts, &mut |_| {}).unwrap();

        assert!(result.success, "{:?}", result.error);
        let verbs: Vec<String> = runner
            .calls()
            .iter()
            .map(|c| c.args.get(1).cloned().unwrap_or_default())
            .collect();
        assert_eq!(verbs, vec!["init", "apply", "output"]);
        assert!(runner.calls()[1].args.contains(&"-auto-approve".to_string()));
        assert_eq!(result.outputs.get("ip").map(String::as_str), Some("192.168.122.50"));

        let tfvars = std::fs::read_to_string(opts.work_dir.join(TFVARS_FILE)).unwrap();
        let vars: serde_json::Value = serde_json::from_str(&tfvars).unwrap();
        assert_eq!(vars["name"], "ubuntu-vm");
        assert_eq!(vars["memory_mb"], 4096);
    }

    #[test]
    fn apply_failure_destroys_partial_resources() {
        let root = tempdir().unwrap();
        let opts = options(&root);
        let chdir = format!("terraform -chdir={}", opts.terraform_module_dir.display());
        let runner = FakeRunner::new()
            .fail(&format!("{} apply", chdir), 1, "Error: libvirt unreachable")
            .ok(&format!("{} destroy", chdir), "Destroy complete! Resources: 1 destroyed.\n");
        let deployer = TerraformDeployer::new(Arc::new(runner.clone()), None);
        let mut stages = Vec::new();
        let result = deployer
            .deploy(&opts, &mut |e: ProgressEvent| stages.push(e.stage))
            .unwrap();

        assert!(!result.success);
        assert!(result.outputs.contains_key("tfvars"));
        assert!(result.error.clone().unwrap_or_default().contains("libvirt unreachable"));
        let verbs: Vec<String> = runner.calls().iter().map(|c| c.args[1].clone()).collect();
        assert_eq!(verbs, vec!["init", "apply", "destroy"]);
        assert!(stages.contains(&"rollback".to_string()));
        assert!(result.logs.iter().any(|l| l.contains("1 destroyed")));
    }

    #[test]
    fn init_failure_destroys_nothing() {
        let root = tempdir().unwrap();
        let opts = options(&root);
        let runner = FakeRunner::new().fail(
            &format!("terraform -chdir={} init", opts.terraform_module_dir.display()),
            1,
            "Error: provider not found",
        );
        let deployer = TerraformDeployer::new(Arc::new(runner.clone()), None);
        let result = deployer.deploy(&opts, &mut |_| {}).unwrap();

        assert!(!result.success);
        assert_eq!(runner.calls().len(), 1);
    }

    #[test]
    fn cleanup_runs_destroy() {
        let root = tempdir().unwrap();
        let opts = options(&root);
        let runner = FakeRunner::new();
        let deployer = TerraformDeployer::new(Arc::new(runner.clone()), None);
        deployer.cleanup(&opts).unwrap();
        assert_eq!(runner.calls()[0].args[1], "destroy");
    }
}
