//! Saved wizard profiles.
//!
//! A profile is a named, timestamped snapshot of [`WizardData`] reduced to
//! plain scalars plus the option bundle of the chosen target.

use crate::errors::UvmError;
use crate::target::DeploymentTarget;
use crate::wizard_data::{
    GenerateOptions, MultipassOptions, TerraformOptions, UsbOptions, WizardData,
};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

const PROFILE_EXT: &str = "json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ProfileOptions {
    Multipass(MultipassOptions),
    Terraform(TerraformOptions),
    Usb(UsbOptions),
    ConfigOnly(GenerateOptions),
}

impl ProfileOptions {
    pub fn target(&self) -> DeploymentTarget {
        match self {
            ProfileOptions::Multipass(_) => DeploymentTarget::Multipass,
            ProfileOptions::Terraform(_) => DeploymentTarget::Terraform,
            ProfileOptions::Usb(_) => DeploymentTarget::Usb,
            ProfileOptions::ConfigOnly(_) => DeploymentTarget::ConfigOnly,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WizardProfile {
    pub name: String,
    pub saved_at: DateTime<Utc>,
    pub target: DeploymentTarget,

    pub display_name: String,
    pub username: String,
    pub hostname: String,
    pub git_name: String,
    pub git_email: String,
    pub github_username: String,
    #[serde(default)]
    pub ssh_keys: Vec<String>,
    #[serde(default)]
    pub packages: Vec<String>,
    #[serde(default)]
    pub tailscale_auth_key: String,
    #[serde(default)]
    pub github_pat: String,

    pub options: ProfileOptions,
}

impl WizardProfile {
    /// Snapshot `data` under `name`.
    pub fn snapshot(name: &str, data: &WizardData) -> WizardProfile {
        let options = match data.target {
            DeploymentTarget::Multipass => ProfileOptions::Multipass(data.multipass.clone()),
            DeploymentTarget::Terraform => ProfileOptions::Terraform(data.terraform.clone()),
            DeploymentTarget::Usb => ProfileOptions::Usb(data.usb.clone()),
            DeploymentTarget::ConfigOnly => ProfileOptions::ConfigOnly(data.generate.clone()),
        };
        WizardProfile {
            name: name.to_string(),
            saved_at: Utc::now(),
            target: data.target,
            display_name: data.display_name.clone(),
            username: data.username.clone(),
            hostname: data.hostname.clone(),
            git_name: data.git_name.clone(),
            git_email: data.git_email.clone(),
            github_username: data.github_username.clone(),
            ssh_keys: data.ssh_keys.clone(),
            packages: data.packages.clone(),
            tailscale_auth_key: data.tailscale_auth_key.clone(),
            github_pat: data.github_pat.clone(),
            options,
        }
    }

    /// Rebuild wizard data. Bundles for other targets keep their defaults.
    pub fn to_wizard_data(&self) -> WizardData {
        let mut data = WizardData {
            target: self.options.target(),
            display_name: self.display_name.clone(),
            username: self.username.clone(),
            hostname: self.hostname.clone(),
            git_name: self.git_name.clone(),
            git_email: self.git_email.clone(),
            github_username: self.github_username.clone(),
            ssh_keys: self.ssh_keys.clone(),
            packages: self.packages.clone(),
            tailscale_auth_key: self.tailscale_auth_key.clone(),
            github_pat: self.github_pat.clone(),
            ..Default::default()
        };
        if data.target != self.target {
            log::warn!(
                "profile {} says target {} but carries {} options; using the options",
                self.name,
                self.target,
                data.target
            );
        }
        match &self.options {
            ProfileOptions::Multipass(o) => data.multipass = o.clone(),
            ProfileOptions::Terraform(o) => data.terraform = o.clone(),
            ProfileOptions::Usb(o) => data.usb = o.clone(),
            ProfileOptions::ConfigOnly(o) => data.generate = o.clone(),
        }
        data
    }
}

/// Profile names become file names, so keep them boring.
pub fn validate_profile_name(name: &str) -> Result<(), UvmError> {
    let valid = !name.is_empty()
        && !name.starts_with('.')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if valid {
        Ok(())
    } else {
        Err(UvmError::InvalidProfileName(name.to_string()))
    }
}

/// Directory of `<name>.json` profiles.
#[derive(Debug, Clone)]
pub struct ProfileStore {
    dir: PathBuf,
}

impl ProfileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", name, PROFILE_EXT))
    }

    /// Sorted names of all saved profiles.
    pub fn list(&self) -> Result<Vec<String>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }
        let mut names = fs::read_dir(&self.dir)
            .with_context(|| format!("Failed to read profiles: {}", self.dir.display()))?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.extension().and_then(|e| e.to_str()) == Some(PROFILE_EXT))
            .filter_map(|path| path.file_stem().and_then(|s| s.to_str()).map(String::from))
            .collect::<Vec<_>>();
        names.sort();
        Ok(names)
    }

    pub fn load(&self, name: &str) -> Result<WizardProfile> {
        validate_profile_name(name)?;
        let path = self.path_for(name);
        if !path.exists() {
            return Err(UvmError::ProfileNotFound(name.to_string()).into());
        }
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read profile: {}", path.display()))?;
        let profile = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse profile: {}", path.display()))?;
        Ok(profile)
    }

    /// Write atomically (temp file + rename); profiles may hold secrets, so 0600.
    pub fn save(&self, profile: &WizardProfile) -> Result<PathBuf> {
        validate_profile_name(&profile.name)?;
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create profiles dir: {}", self.dir.display()))?;

        let path = self.path_for(&profile.name);
        let tmp_path = self.dir.join(format!(".{}.{}.tmp", profile.name, PROFILE_EXT));
        let payload = serde_json::to_string_pretty(profile).context("Failed to serialize profile")?;

        let mut file = private_file(&tmp_path)
            .with_context(|| format!("Failed to create temp profile: {}", tmp_path.display()))?;
        file.write_all(payload.as_bytes())
            .context("Failed to write profile")?;
        file.sync_all().context("Failed to flush profile")?;

        fs::rename(&tmp_path, &path)
            .with_context(|| format!("Failed to replace profile: {}", path.display()))?;
        log::info!("saved profile {} to {}", profile.name, path.display());
        Ok(path)
    }

    pub fn delete(&self, name: &str) -> Result<()> {
        validate_profile_name(name)?;
        let path = self.path_for(name);
        if !path.exists() {
            return Err(UvmError::ProfileNotFound(name.to_string()).into());
        }
        fs::remove_file(&path)
            .with_context(|| format!("Failed to delete profile: {}", path.display()))
    }
}

/// Create (truncating) a file readable only by the owner.
pub fn private_file(path: &Path) -> std::io::Result<File> {
    let mut opts = OpenOptions::new();
    opts.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        opts.mode(0o600);
    }
    opts.open(path)
}
