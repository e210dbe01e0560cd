//! cloud-init and Ubuntu autoinstall document rendering.

use crate::packages::PackageRegistry;
use crate::provision::{shell_quote, ProvisionConfig};
use anyhow::{Context, Result};
use serde::Serialize;

const CLOUD_CONFIG_HEADER: &str = "#cloud-config\n";

#[derive(Debug, Serialize)]
struct CloudConfig {
    hostname: String,
    timezone: String,
    users: Vec<CloudUser>,
    package_update: bool,
    package_upgrade: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    packages: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    write_files: Vec<WriteFile>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    runcmd: Vec<String>,
}

#[derive(Debug, Serialize)]
struct CloudUser {
    name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    gecos: String,
    groups: Vec<String>,
    shell: String,
    sudo: String,
    lock_passwd: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    ssh_authorized_keys: Vec<String>,
}

#[derive(Debug, Serialize)]
struct WriteFile {
    path: String,
    permissions: String,
    content: String,
}

/// apt packages to install for the selected catalogue entries.
///
/// Without a registry the selected names are used as-is.
pub fn apt_packages(config: &ProvisionConfig, registry: Option<&dyn PackageRegistry>) -> Vec<String> {
    let mut apt = Vec::new();
    for name in &config.packages {
        match registry.and_then(|r| r.get(name)) {
            Some(pkg) => apt.extend(pkg.apt.iter().cloned()),
            None if registry.is_none() => apt.push(name.clone()),
            None => log::warn!("package {} is not in the registry; skipping", name),
        }
    }
    apt.sort();
    apt.dedup();
    apt
}

fn first_boot_commands(config: &ProvisionConfig) -> Vec<String> {
    let mut cmds = Vec::new();
    let as_user = |cmd: String| format!("su - {} -c {}", config.username, shell_quote(&cmd));

    if !config.git_name.is_empty() {
        cmds.push(as_user(format!(
            "git config --global user.name {}",
            shell_quote(&config.git_name)
        )));
    }
    if !config.git_email.is_empty() {
        cmds.push(as_user(format!(
            "git config --global user.email {}",
            shell_quote(&config.git_email)
        )));
    }
    if config.packages.iter().any(|p| p == "tailscale") {
        cmds.push("curl -fsSL https://tailscale.com/install.sh | sh".to_string());
        if !config.tailscale_auth_key.is_empty() {
            cmds.push(format!(
                "tailscale up --authkey={} --hostname={}",
                shell_quote(&config.tailscale_auth_key),
                shell_quote(&config.hostname)
            ));
        }
    }
    if config.packages.iter().any(|p| p == "rust") {
        cmds.push(as_user(
            "curl --proto '=https' --tlsv1.2 -sSf https://sh.rustup.rs | sh -s -- -y".to_string(),
        ));
    }
    cmds
}

fn cloud_user(config: &ProvisionConfig) -> CloudUser {
    CloudUser {
        name: config.username.clone(),
        gecos: config.display_name.clone(),
        groups: vec!["sudo".to_string(), "adm".to_string()],
        shell: "/bin/bash".to_string(),
        sudo: "ALL=(ALL) NOPASSWD:ALL".to_string(),
        lock_passwd: true,
        ssh_authorized_keys: config.ssh_keys.clone(),
    }
}

/// Render a `#cloud-config` user-data document.
pub fn render_cloud_init(
    config: &ProvisionConfig,
    registry: Option<&dyn PackageRegistry>,
) -> Result<String> {
    let doc = CloudConfig {
        hostname: config.hostname.clone(),
        timezone: config.timezone.clone(),
        users: vec![cloud_user(config)],
        package_update: true,
        package_upgrade: true,
        packages: apt_packages(config, registry),
        write_files: vec![WriteFile {
            path: "/etc/uvm/config.env".to_string(),
            permissions: "0644".to_string(),
            content: config.to_config_env(),
        }],
        runcmd: first_boot_commands(config),
    };
    let body = serde_yaml::to_string(&doc).context("Failed to serialize cloud-init")?;
    Ok(format!("{}{}", CLOUD_CONFIG_HEADER, body))
}

#[derive(Debug, Serialize)]
struct AutoinstallDoc {
    autoinstall: Autoinstall,
}

#[derive(Debug, Serialize)]
struct Autoinstall {
    version: u32,
    identity: Identity,
    ssh: AutoinstallSsh,
    storage: Storage,
    timezone: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    packages: Vec<String>,
    #[serde(rename = "user-data")]
    user_data: UserData,
}

#[derive(Debug, Serialize)]
struct Identity {
    hostname: String,
    username: String,
    realname: String,
    /// Locked password; access is key-only.
    password: String,
}

#[derive(Debug, Serialize)]
struct AutoinstallSsh {
    #[serde(rename = "install-server")]
    install_server: bool,
    #[serde(rename = "authorized-keys")]
    authorized_keys: Vec<String>,
    #[serde(rename = "allow-pw")]
    allow_pw: bool,
}

#[derive(Debug, Serialize)]
struct Storage {
    layout: StorageLayout,
}

#[derive(Debug, Serialize)]
struct StorageLayout {
    name: String,
}

#[derive(Debug, Serialize)]
struct UserData {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    runcmd: Vec<String>,
    write_files: Vec<WriteFile>,
}

/// Render Ubuntu autoinstall user-data for a USB installer image.
pub fn render_autoinstall(
    config: &ProvisionConfig,
    registry: Option<&dyn PackageRegistry>,
    storage_layout: &str,
) -> Result<String> {
    let layout = match storage_layout {
        "lvm" | "direct" | "zfs" => storage_layout.to_string(),
        other => {
            log::warn!("unknown storage layout {:?}; using lvm", other);
            "lvm".to_string()
        }
    };
    let doc = AutoinstallDoc {
        autoinstall: Autoinstall {
            version: 1,
            identity: Identity {
                hostname: config.hostname.clone(),
                username: config.username.clone(),
                realname: config.display_name.clone(),
                password: "!".to_string(),
            },
            ssh: AutoinstallSsh {
                install_server: true,
                authorized_keys: config.ssh_keys.clone(),
                allow_pw: false,
            },
            storage: Storage {
                layout: StorageLayout { name: layout },
            },
            timezone: config.timezone.clone(),
            packages: apt_packages(config, registry),
            user_data: UserData {
                runcmd: first_boot_commands(config),
                write_files: vec![WriteFile {
                    path: "/etc/uvm/config.env".to_string(),
                    permissions: "0644".to_string(),
                    content: config.to_config_env(),
                }],
            },
        },
    };
    let body = serde_yaml::to_string(&doc).context("Failed to serialize autoinstall config")?;
    Ok(format!("{}{}", CLOUD_CONFIG_HEADER, body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packages::{Catalogue, Package};

    fn config() -> ProvisionConfig {
        ProvisionConfig {
            username: "dev".to_string(),
            hostname: "devbox".to_string(),
            timezone: "UTC".to_string(),
            ssh_keys: vec!["ssh-ed25519 AAAAkey dev@laptop".to_string()],
            git_name: "Dev Person".to_string(),
            packages: vec!["docker".to_string(), "git".to_string()],
            ..Default::default()
        }
    }

    fn registry() -> Catalogue {
        let pkg = |name: &str, apt: &[&str]| Package {
            name: name.to_string(),
            description: String::new(),
            category: "core".to_string(),
            apt: apt.iter().map(|s| s.to_string()).collect(),
            default_selected: false,
        };
        Catalogue::from_packages(
            vec![pkg("docker", &["docker.io", "docker-compose-v2"]), pkg("git", &["git"])],
            vec![],
        )
    }

    #[test]
    fn cloud_init_has_header_user_and_keys() {
        let registry = registry();
        let doc = render_cloud_init(&config(), Some(&registry)).unwrap();
        assert!(doc.starts_with("#cloud-config\n"));

        let parsed: serde_yaml::Value = serde_yaml::from_str(&doc).unwrap();
        assert_eq!(parsed["hostname"].as_str(), Some("devbox"));
        assert_eq!(parsed["users"][0]["name"].as_str(), Some("dev"));
        assert_eq!(
            parsed["users"][0]["ssh_authorized_keys"][0].as_str(),
            Some("ssh-ed25519 AAAAkey dev@laptop")
        );
        let packages: Vec<&str> = parsed["packages"]
            .as_sequence()
            .unwrap()
            .iter()
            .filter_map(|v| v.as_str())
            .collect();
        assert_eq!(packages, vec!["docker-compose-v2", "docker.io", "git"]);
    }

    #[test]
    fn git_identity_becomes_runcmd() {
        let doc = render_cloud_init(&config(), None).unwrap();
        assert!(doc.contains("git config --global user.name"));
    }

    #[test]
    fn autoinstall_uses_requested_layout() {
        let doc = render_autoinstall(&config(), None, "zfs").unwrap();
        let parsed: serde_yaml::Value = serde_yaml::from_str(&doc).unwrap();
        assert_eq!(
            parsed["autoinstall"]["storage"]["layout"]["name"].as_str(),
            Some("zfs")
        );
        assert_eq!(
            parsed["autoinstall"]["identity"]["hostname"].as_str(),
            Some("devbox")
        );
    }
}
