//! The shared provisioning record every deployer consumes.

use crate::packages::{disabled_packages, PackageRegistry};
use crate::wizard_data::WizardData;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisionConfig {
    pub display_name: String,
    pub username: String,
    pub hostname: String,
    pub timezone: String,

    pub ssh_keys: Vec<String>,
    pub github_username: String,
    pub git_name: String,
    pub git_email: String,

    pub packages: Vec<String>,
    /// Registry packages the user did not select
    pub disabled_packages: Vec<String>,

    pub tailscale_auth_key: String,
    pub github_pat: String,
}

impl ProvisionConfig {
    /// Build the record from reviewed wizard data.
    ///
    /// Identity defaults are applied here so every backend sees the same
    /// username and hostname.
    pub fn from_wizard(data: &WizardData, registry: Option<&dyn PackageRegistry>) -> Self {
        let mut packages = data.packages.clone();
        packages.sort();
        packages.dedup();
        let disabled = registry
            .map(|r| disabled_packages(r, &packages))
            .unwrap_or_default();

        Self {
            display_name: data.display_name.trim().to_string(),
            username: data.effective_username().to_string(),
            hostname: data.effective_hostname().to_string(),
            timezone: data.timezone().to_string(),
            ssh_keys: data.ssh_keys.clone(),
            github_username: data.github_username.trim().to_string(),
            git_name: data.git_name.trim().to_string(),
            git_email: data.git_email.trim().to_string(),
            packages,
            disabled_packages: disabled,
            tailscale_auth_key: data.tailscale_auth_key.trim().to_string(),
            github_pat: data.github_pat.trim().to_string(),
        }
    }

    /// Non-secret settings as a shell-sourceable env file.
    pub fn to_config_env(&self) -> String {
        let mut out = String::from("# Generated by uvm. Non-secret settings.\n");
        push_var(&mut out, "UVM_DISPLAY_NAME", &self.display_name);
        push_var(&mut out, "UVM_USERNAME", &self.username);
        push_var(&mut out, "UVM_HOSTNAME", &self.hostname);
        push_var(&mut out, "UVM_TIMEZONE", &self.timezone);
        push_var(&mut out, "UVM_GITHUB_USERNAME", &self.github_username);
        push_var(&mut out, "UVM_GIT_NAME", &self.git_name);
        push_var(&mut out, "UVM_GIT_EMAIL", &self.git_email);
        push_var(&mut out, "UVM_PACKAGES", &self.packages.join(" "));
        push_var(
            &mut out,
            "UVM_DISABLED_PACKAGES",
            &self.disabled_packages.join(" "),
        );
        out
    }

    /// SSH keys and tokens. Callers must write this with 0600 permissions.
    pub fn to_secrets_env(&self) -> String {
        let mut out = String::from("# Generated by uvm. Keep this file private.\n");
        push_var(&mut out, "UVM_SSH_AUTHORIZED_KEYS", &self.ssh_keys.join("\n"));
        push_var(&mut out, "UVM_TAILSCALE_AUTH_KEY", &self.tailscale_auth_key);
        push_var(&mut out, "UVM_GITHUB_PAT", &self.github_pat);
        out
    }
}

fn push_var(out: &mut String, key: &str, value: &str) {
    out.push_str(key);
    out.push('=');
    out.push_str(&shell_quote(value));
    out.push('\n');
}

/// Single-quote a value for POSIX shells.
pub fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}
