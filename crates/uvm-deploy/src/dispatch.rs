//! Runs a deployer on a worker thread and streams progress back.

use crate::config_only::ConfigDeployer;
use crate::deployer::{DeployResult, Deployer};
use crate::multipass::MultipassDeployer;
use crate::options::DeployOptions;
use crate::progress::ProgressEvent;
use crate::runner::CommandRunner;
use crate::terraform::TerraformDeployer;
use crate::usb::UsbDeployer;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::sync::Arc;
use std::thread;
use uvm_core::packages::PackageRegistry;
use uvm_core::DeploymentTarget;

/// Bound of the progress channel; a slow UI back-pressures the deployer.
pub const PROGRESS_CAPACITY: usize = 100;

pub fn select_deployer(
    target: DeploymentTarget,
    registry: Option<Arc<dyn PackageRegistry>>,
    runner: Arc<dyn CommandRunner>,
) -> Box<dyn Deployer> {
    match target {
        DeploymentTarget::Multipass => Box::new(MultipassDeployer::new(runner, registry)),
        DeploymentTarget::Terraform => Box::new(TerraformDeployer::new(runner, registry)),
        DeploymentTarget::Usb => Box::new(UsbDeployer::new(runner, registry)),
        DeploymentTarget::ConfigOnly => Box::new(ConfigDeployer::new(registry)),
    }
}

/// Validate then deploy, folding any `Err` into a failed result.
pub fn run_deployer(
    deployer: &dyn Deployer,
    opts: &DeployOptions,
    progress: &mut dyn FnMut(ProgressEvent),
) -> DeployResult {
    log::info!("deploying with {} backend", deployer.name());
    let outcome = deployer
        .validate(opts)
        .and_then(|()| deployer.deploy(opts, progress));
    match outcome {
        Ok(result) => {
            if result.success {
                log::info!("{} deploy finished in {:?}", deployer.name(), result.duration);
            }
            result
        }
        Err(err) => {
            log::error!("{} deploy error: {:#}", deployer.name(), err);
            DeployResult::failed(err.to_string())
        }
    }
}

/// Channels connecting a running deployment to the UI.
pub struct DeployHandle {
    pub progress: Receiver<ProgressEvent>,
    pub done: Receiver<DeployResult>,
}

/// What one poll of a [`DeployHandle`] produced.
#[derive(Debug, Clone, PartialEq)]
pub enum DeployPoll {
    Progress(ProgressEvent),
    /// Nothing new yet.
    Idle,
    Finished(DeployResult),
}

impl DeployHandle {
    /// Take at most one message. Progress drains before the result; the
    /// result is only looked at once the progress sender is gone.
    pub fn poll(&self) -> DeployPoll {
        match self.progress.try_recv() {
            Ok(event) => return DeployPoll::Progress(event),
            Err(TryRecvError::Empty) => return DeployPoll::Idle,
            Err(TryRecvError::Disconnected) => {}
        }
        match self.done.try_recv() {
            Ok(result) => DeployPoll::Finished(result),
            Err(TryRecvError::Empty) => DeployPoll::Idle,
            Err(TryRecvError::Disconnected) => {
                DeployPoll::Finished(DeployResult::failed("deployment worker exited without a result"))
            }
        }
    }

    /// Block until the deployment finishes, feeding every event to `on_event`.
    pub fn wait(self, mut on_event: impl FnMut(ProgressEvent)) -> DeployResult {
        for event in self.progress.iter() {
            on_event(event);
        }
        self.done
            .recv()
            .unwrap_or_else(|_| DeployResult::failed("deployment worker exited without a result"))
    }
}

pub fn spawn_deploy(deployer: Box<dyn Deployer>, opts: DeployOptions) -> DeployHandle {
    let (progress_tx, progress_rx) = mpsc::sync_channel(PROGRESS_CAPACITY);
    let (done_tx, done_rx) = mpsc::sync_channel(1);

    thread::spawn(move || {
        let mut send = move |event: ProgressEvent| {
            // UI gone; keep deploying, nobody is listening
            let _ = progress_tx.send(event);
        };
        let result = run_deployer(deployer.as_ref(), &opts, &mut send);
        // closes the progress channel before the result is sent
        drop(send);
        let _ = done_tx.send(result);
    });

    DeployHandle {
        progress: progress_rx,
        done: done_rx,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::build_deploy_options;
    use crate::progress::ProgressCallback;
    use crate::runner::fake::FakeRunner;
    use anyhow::{anyhow, Result};
    use tempfile::tempdir;
    use uvm_core::settings::Settings;
    use uvm_core::{Catalogue, WizardData};

    struct Broken;

    impl Deployer for Broken {
        fn name(&self) -> &'static str {
            "broken"
        }
        fn target(&self) -> DeploymentTarget {
            DeploymentTarget::ConfigOnly
        }
        fn validate(&self, _opts: &DeployOptions) -> Result<()> {
            Ok(())
        }
        fn deploy(&self, _opts: &DeployOptions, progress: ProgressCallback<'_>) -> Result<DeployResult> {
            progress(ProgressEvent::new("start", "starting", 1.0));
            Err(anyhow!("disk on fire"))
        }
        fn cleanup(&self, _opts: &DeployOptions) -> Result<()> {
            Ok(())
        }
    }

    fn drain(handle: DeployHandle) -> (Vec<ProgressEvent>, DeployResult) {
        let mut events = Vec::new();
        loop {
            match handle.poll() {
                DeployPoll::Progress(event) => events.push(event),
                DeployPoll::Idle => thread::sleep(std::time::Duration::from_millis(5)),
                DeployPoll::Finished(result) => return (events, result),
            }
        }
    }

    #[test]
    fn selects_backend_per_target() {
        let runner: Arc<dyn CommandRunner> = Arc::new(FakeRunner::new());
        for target in DeploymentTarget::all() {
            let deployer = select_deployer(*target, None, runner.clone());
            assert_eq!(deployer.target(), *target);
        }
    }

    #[test]
    fn deploy_error_becomes_failed_result() {
        let data = WizardData {
            target: DeploymentTarget::ConfigOnly,
            ..Default::default()
        };
        let opts = build_deploy_options(&data, None, &Settings::default());
        let (events, result) = drain(spawn_deploy(Box::new(Broken), opts));

        assert_eq!(events.len(), 1);
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("disk on fire"));
        assert!(result.outputs.is_empty());
    }

    #[test]
    fn validation_error_becomes_failed_result() {
        let data = WizardData {
            target: DeploymentTarget::ConfigOnly,
            ..Default::default()
        };
        let opts = build_deploy_options(&data, None, &Settings::default());
        let deployer = select_deployer(DeploymentTarget::ConfigOnly, None, Arc::new(FakeRunner::new()));
        let (events, result) = drain(spawn_deploy(deployer, opts));

        assert!(events.is_empty());
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("No package registry available"));
    }

    #[test]
    fn config_only_happy_path_streams_progress() {
        let dir = tempdir().unwrap();
        let mut data = WizardData {
            target: DeploymentTarget::ConfigOnly,
            ..Default::default()
        };
        data.generate.output_dir = dir.path().to_path_buf();
        data.generate.generate_cloud_init = true;
        let registry: Arc<dyn PackageRegistry> = Arc::new(Catalogue::builtin());
        let opts = build_deploy_options(&data, Some(registry.as_ref()), &Settings::default());
        let deployer = select_deployer(data.target, Some(registry), Arc::new(FakeRunner::new()));

        let result = spawn_deploy(deployer, opts).wait(|_| {});
        assert!(result.success, "{:?}", result.error);
        for key in ["config.env", "secrets.env", "summary.md", "cloud-init.yaml"] {
            assert!(result.outputs.contains_key(key), "missing output {}", key);
        }
    }
}
