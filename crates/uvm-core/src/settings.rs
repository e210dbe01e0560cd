//! User settings (`config.toml`).

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_GITHUB_API: &str = "https://api.github.com";
pub const DEFAULT_GITHUB_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Where saved wizard profiles live
    pub profiles_dir: PathBuf,
    /// Scratch space for generated cloud-init and tfvars
    pub work_dir: PathBuf,
    /// Default output directory for the generate-only target
    pub output_dir: PathBuf,
    /// Terraform/libvirt module applied by the Terraform target
    pub terraform_module_dir: PathBuf,
    /// Directory scanned for `*.pub` keys
    pub ssh_dir: PathBuf,
    pub github_api_url: String,
    pub github_timeout_secs: u64,
    /// Accept j/k for up/down on non-text fields
    pub vim_keys: bool,
    pub log_file: Option<PathBuf>,
}

fn config_root() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("uvm")
}

fn data_root() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("uvm")
}

impl Default for Settings {
    fn default() -> Self {
        let ssh_dir = dirs::home_dir()
            .map(|home| home.join(".ssh"))
            .unwrap_or_else(|| PathBuf::from(".ssh"));
        Self {
            profiles_dir: config_root().join("profiles"),
            work_dir: data_root().join("work"),
            output_dir: PathBuf::from("output"),
            terraform_module_dir: data_root().join("terraform"),
            ssh_dir,
            github_api_url: DEFAULT_GITHUB_API.to_string(),
            github_timeout_secs: DEFAULT_GITHUB_TIMEOUT_SECS,
            vim_keys: true,
            log_file: None,
        }
    }
}

impl Settings {
    pub fn default_path() -> PathBuf {
        config_root().join("config.toml")
    }

    /// Load settings from `path`, or from the default location.
    ///
    /// A missing file yields the defaults; a malformed one is an error.
    pub fn load(path: Option<&Path>) -> Result<Settings> {
        let path = path
            .map(Path::to_path_buf)
            .unwrap_or_else(Settings::default_path);
        if !path.exists() {
            log::debug!("no settings at {}; using defaults", path.display());
            return Ok(Settings::default());
        }
        let raw = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read settings: {}", path.display()))?;
        let settings = toml::from_str(&raw)
            .with_context(|| format!("Failed to parse settings: {}", path.display()))?;
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let settings = Settings::load(Some(&dir.path().join("nope.toml"))).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.github_timeout_secs, 10);
    }

    #[test]
    fn partial_file_overrides_only_given_keys() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "vim_keys = false\noutput_dir = \"/tmp/uvm-out\"\n").unwrap();

        let settings = Settings::load(Some(&path)).unwrap();
        assert!(!settings.vim_keys);
        assert_eq!(settings.output_dir, PathBuf::from("/tmp/uvm-out"));
        assert_eq!(settings.github_api_url, DEFAULT_GITHUB_API);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "vim_keys = \"sometimes\"").unwrap();
        assert!(Settings::load(Some(&path)).is_err());
    }
}
