use crate::options::DeployOptions;
use crate::progress::ProgressCallback;
use anyhow::Result;
use std::collections::BTreeMap;
use std::time::Duration;
use uvm_core::DeploymentTarget;

/// Terminal record of one deployment.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeployResult {
    pub success: bool,
    pub error: Option<String>,
    /// Named artifacts (paths, instance names, addresses)
    pub outputs: BTreeMap<String, String>,
    pub logs: Vec<String>,
    pub duration: Duration,
}

impl DeployResult {
    /// Failure with no outputs, used when a deployer returned no result at all.
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            ..Default::default()
        }
    }
}

/// A backend that turns reviewed options into a VM or generated files.
///
/// `deploy` runs synchronously; the dispatcher puts it on a worker thread.
/// Returning `Err` means "no result"; failures after side effects should
/// return `Ok` with `success == false` so partial outputs and logs survive.
pub trait Deployer: Send {
    fn name(&self) -> &'static str;

    fn target(&self) -> DeploymentTarget;

    /// Checks that must pass before any side effect.
    fn validate(&self, opts: &DeployOptions) -> Result<()>;

    fn deploy(&self, opts: &DeployOptions, progress: ProgressCallback<'_>) -> Result<DeployResult>;

    /// Roll back what `deploy` created. Deployers only call this once the
    /// creating step has started, so pre-existing resources are never touched.
    fn cleanup(&self, opts: &DeployOptions) -> Result<()>;
}

/// Accumulates logs/outputs while a deployer works, then seals the result.
pub(crate) struct ResultBuilder {
    started: std::time::Instant,
    outputs: BTreeMap<String, String>,
    logs: Vec<String>,
    /// Set when the step that creates the VM or image has been started.
    creating: bool,
}

impl ResultBuilder {
    pub(crate) fn start() -> Self {
        Self {
            started: std::time::Instant::now(),
            outputs: BTreeMap::new(),
            logs: Vec::new(),
            creating: false,
        }
    }

    pub(crate) fn mark_creating(&mut self) {
        self.creating = true;
    }

    /// Whether a failure may have left something behind to roll back.
    pub(crate) fn needs_rollback(&self) -> bool {
        self.creating
    }

    pub(crate) fn log(&mut self, line: impl Into<String>) {
        let line = line.into();
        log::info!("{}", line);
        self.logs.push(line);
    }

    pub(crate) fn output(&mut self, name: &str, value: impl Into<String>) {
        self.outputs.insert(name.to_string(), value.into());
    }

    pub(crate) fn success(self) -> DeployResult {
        DeployResult {
            success: true,
            error: None,
            outputs: self.outputs,
            logs: self.logs,
            duration: self.started.elapsed(),
        }
    }

    pub(crate) fn failure(mut self, error: impl Into<String>) -> DeployResult {
        let error = error.into();
        log::error!("deploy failed: {}", error);
        self.logs.push(format!("ERROR: {}", error));
        DeployResult {
            success: false,
            error: Some(error),
            outputs: self.outputs,
            logs: self.logs,
            duration: self.started.elapsed(),
        }
    }
}

/// Write a generated file, creating parent directories.
pub(crate) fn write_artifact(path: &std::path::Path, contents: &str) -> Result<()> {
    use anyhow::Context;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    std::fs::write(path, contents).with_context(|| format!("Failed to write {}", path.display()))
}

/// Like [`write_artifact`] but the file is only readable by the owner.
pub(crate) fn write_secret_artifact(path: &std::path::Path, contents: &str) -> Result<()> {
    use anyhow::Context;
    use std::io::Write;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let mut file = uvm_core::profile::private_file(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    // The open mode only applies on create; tighten files that already existed.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(std::fs::Permissions::from_mode(0o600))
            .with_context(|| format!("Failed to chmod {}", path.display()))?;
    }
    file.write_all(contents.as_bytes())
        .with_context(|| format!("Failed to write {}", path.display()))
}
