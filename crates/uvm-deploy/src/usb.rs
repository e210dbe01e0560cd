//! USB backend: remasters an Ubuntu live-server ISO for unattended install.
//!
//! The autoinstall seed is placed at `/autoinstall` on the image and the
//! grub kernel lines are pointed at it with `ds=nocloud`.

use crate::deployer::{write_artifact, write_secret_artifact, DeployResult, Deployer, ResultBuilder};
use crate::options::DeployOptions;
use crate::progress::{ProgressCallback, ProgressEvent};
use crate::runner::{display_command, CommandRunner};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use uvm_core::cloud_init::render_autoinstall;
use uvm_core::packages::PackageRegistry;
use uvm_core::{DeploymentTarget, UvmError};

const PROGRAM: &str = "xorriso";
const QUICK_TIMEOUT: Duration = Duration::from_secs(30);
const REMASTER_TIMEOUT: Duration = Duration::from_secs(15 * 60);

const GRUB_CFG: &str = "/boot/grub/grub.cfg";
const SEED_DIR: &str = "/autoinstall";
const KERNEL_ARGS: &str = r"autoinstall ds=nocloud\;s=/cdrom/autoinstall/";

pub const STORAGE_LAYOUTS: &[&str] = &["lvm", "direct", "zfs"];

pub struct UsbDeployer {
    runner: Arc<dyn CommandRunner>,
    registry: Option<Arc<dyn PackageRegistry>>,
}

/// Add the autoinstall kernel arguments to every casper `linux` line.
pub fn patch_grub_config(grub: &str) -> String {
    let mut out = String::with_capacity(grub.len() + 128);
    for line in grub.lines() {
        let trimmed = line.trim_start();
        if trimmed.starts_with("linux") && trimmed.contains("/casper/") && !line.contains("autoinstall") {
            match line.find(" ---") {
                Some(idx) => {
                    out.push_str(&line[..idx]);
                    out.push(' ');
                    out.push_str(KERNEL_ARGS);
                    out.push_str(&line[idx..]);
                }
                None => {
                    out.push_str(line);
                    out.push(' ');
                    out.push_str(KERNEL_ARGS);
                }
            }
        } else {
            out.push_str(line);
        }
        out.push('\n');
    }
    out
}

impl UsbDeployer {
    pub fn new(runner: Arc<dyn CommandRunner>, registry: Option<Arc<dyn PackageRegistry>>) -> Self {
        Self { runner, registry }
    }

    fn seed_dir(opts: &DeployOptions) -> PathBuf {
        opts.work_dir.join("autoinstall")
    }

    fn grub_copy(opts: &DeployOptions) -> PathBuf {
        opts.work_dir.join("grub.cfg")
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

    fn write_seed(&self, opts: &DeployOptions, result: &mut ResultBuilder) -> Result<()> {
        let usb = opts.usb()?;
        let seed = Self::seed_dir(opts);
        let user_data = render_autoinstall(&opts.config, self.registry.as_deref(), &usb.storage_layout)?;
        write_secret_artifact(&seed.join("user-data"), &user_data)?;
        write_artifact(
            &seed.join("meta-data"),
            &format!("instance-id: {}\n", opts.config.hostname),
        )?;
        result.log(format!("wrote autoinstall seed to {}", seed.display()));
        result.output("user_data", seed.join("user-data").display().to_string());
        Ok(())
    }

    fn remaster(
        &self,
        opts: &DeployOptions,
        result: &mut ResultBuilder,
        progress: ProgressCallback<'_>,
    ) -> Result<()> {
        let usb = opts.usb()?;
        let grub = Self::grub_copy(opts);

        self.run(
            ProgressEvent::new("preflight", "Checking xorriso", 20.0),
            vec!["-version".to_string()],
            QUICK_TIMEOUT,
            result,
            progress,
        )?;

        self.run(
            ProgressEvent::new("extract", "Extracting boot config", 35.0),
            vec![
                "-osirrox".to_string(),
                "on".to_string(),
                "-indev".to_string(),
                usb.source_iso.clone(),
                "-extract".to_string(),
                GRUB_CFG.to_string(),
                grub.display().to_string(),
            ],
            QUICK_TIMEOUT,
            result,
            progress,
        )?;

        progress(ProgressEvent::new("patch", "Enabling autoinstall in grub", 45.0));
        let original = std::fs::read_to_string(&grub)
            .with_context(|| format!("Failed to read {}", grub.display()))?;
        // extracted files keep the ISO's read-only mode
        let _ = std::fs::remove_file(&grub);
        write_artifact(&grub, &patch_grub_config(&original))?;

        let output = PathBuf::from(&usb.output_path);
        result.mark_creating();
        if output.exists() {
            std::fs::remove_file(&output)
                .with_context(|| format!("Failed to replace {}", output.display()))?;
        }
        self.run(
            ProgressEvent::new("remaster", format!("Writing {}", output.display()), 55.0),
            vec![
                "-indev".to_string(),
                usb.source_iso.clone(),
                "-outdev".to_string(),
                output.display().to_string(),
                "-map".to_string(),
                Self::seed_dir(opts).display().to_string(),
                SEED_DIR.to_string(),
                "-map".to_string(),
                grub.display().to_string(),
                GRUB_CFG.to_string(),
                "-boot_image".to_string(),
                "any".to_string(),
                "replay".to_string(),
            ],
            REMASTER_TIMEOUT,
            result,
            progress,
        )?;
        result.output("iso", output.display().to_string());
        result.output(
            "next_step",
            format!("sudo dd if={} of=/dev/sdX bs=4M status=progress", output.display()),
        );
        Ok(())
    }
}

fn is_file(path: &Path) -> bool {
    std::fs::metadata(path).map(|m| m.is_file()).unwrap_or(false)
}

impl Deployer for UsbDeployer {
    fn name(&self) -> &'static str {
        "usb"
    }

    fn target(&self) -> DeploymentTarget {
        DeploymentTarget::Usb
    }

    fn validate(&self, opts: &DeployOptions) -> Result<()> {
        let usb = opts.usb()?;
        if usb.source_iso.trim().is_empty() {
            return Err(UvmError::ValidationFailed("source ISO path is empty".to_string()).into());
        }
        if !is_file(Path::new(&usb.source_iso)) {
            return Err(
                UvmError::ValidationFailed(format!("source ISO not found: {}", usb.source_iso)).into(),
            );
        }
        if usb.output_path.trim().is_empty() {
            return Err(UvmError::ValidationFailed("output path is empty".to_string()).into());
        }
        if usb.output_path == usb.source_iso {
            return Err(UvmError::ValidationFailed(
                "output path must differ from the source ISO".to_string(),
            )
            .into());
        }
        if !STORAGE_LAYOUTS.contains(&usb.storage_layout.as_str()) {
            return Err(UvmError::ValidationFailed(format!(
                "unknown storage layout {:?}",
                usb.storage_layout
            ))
            .into());
        }
        Ok(())
    }

    fn deploy(&self, opts: &DeployOptions, progress: ProgressCallback<'_>) -> Result<DeployResult> {
        let mut result = ResultBuilder::start();
        progress(ProgressEvent::new("prepare", "Rendering autoinstall seed", 5.0));
        self.write_seed(opts, &mut result)?;

        match self.remaster(opts, &mut result, progress) {
            Ok(()) => {
                progress(ProgressEvent::new("done", "Installer image ready", 100.0));
                Ok(result.success())
            }
            Err(err) => {
                let message = format!("{:#}", err);
                progress(
                    ProgressEvent::error("remaster", "Image build failed", 100.0)
                        .with_detail(message.clone()),
                );
                if result.needs_rollback() {
                    if let Err(cleanup_err) = self.cleanup(opts) {
                        result.log(format!("cleanup failed: {:#}", cleanup_err));
                    }
                }
                Ok(result.failure(message))
            }
        }
    }

    /// Remove a half-written output image.
    fn cleanup(&self, opts: &DeployOptions) -> Result<()> {
        let usb = opts.usb()?;
        let output = Path::new(&usb.output_path);
        if is_file(output) {
            std::fs::remove_file(output)
                .with_context(|| format!("Failed to remove {}", output.display()))?;
        }
        Ok(())
    }
}
