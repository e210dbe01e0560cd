use crate::options::DeployOptions;
use std::fmt::Write as _;
use uvm_core::packages::PackageRegistry;
use uvm_core::DeploymentTarget;

fn or_dash(value: &str) -> &str {
    if value.trim().is_empty() {
        "-"
    } else {
        value
    }
}

fn mask(value: &str) -> &'static str {
    if value.is_empty() {
        "not set"
    } else {
        "set (see secrets.env)"
    }
}

/// Human-readable markdown summary written next to generated config.
/// Secrets are never included.
pub fn render_summary(opts: &DeployOptions, registry: Option<&dyn PackageRegistry>) -> String {
    let cfg = &opts.config;
    let mut out = String::new();
    let _ = writeln!(out, "# uvm configuration: {}", cfg.hostname);
    let _ = writeln!(out);
    let _ = writeln!(out, "## Target");
    let _ = writeln!(out);
    let _ = writeln!(out, "- Target: {}", opts.target.title());
    match opts.target {
        DeploymentTarget::Multipass => {
            if let Some(mp) = &opts.multipass {
                let _ = writeln!(out, "- Instance: {}", mp.name);
                let _ = writeln!(out, "- Image: {}", mp.image);
                let _ = writeln!(
                    out,
                    "- Resources: {} CPU, {} memory, {} disk",
                    mp.cpus, mp.memory, mp.disk
                );
            }
        }
        DeploymentTarget::Terraform => {
            if let Some(tf) = &opts.terraform {
                let _ = writeln!(out, "- Domain: {}", tf.name);
                let _ = writeln!(out, "- Libvirt URI: {}", tf.libvirt_uri);
                let _ = writeln!(
                    out,
                    "- Resources: {} CPU, {} MB memory, {} GB disk",
                    tf.cpus, tf.memory_mb, tf.disk_gb
                );
            }
        }
        DeploymentTarget::Usb => {
            if let Some(usb) = &opts.usb {
                let _ = writeln!(out, "- Source ISO: {}", or_dash(&usb.source_iso));
                let _ = writeln!(out, "- Output: {}", usb.output_path);
                let _ = writeln!(out, "- Storage layout: {}", usb.storage_layout);
            }
        }
        DeploymentTarget::ConfigOnly => {
            if let Some(gen) = &opts.generate {
                let _ = writeln!(out, "- Output directory: {}", gen.output_dir.display());
            }
        }
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "## Identity");
    let _ = writeln!(out);
    let _ = writeln!(out, "- Display name: {}", or_dash(&cfg.display_name));
    let _ = writeln!(out, "- Username: {}", cfg.username);
    let _ = writeln!(out, "- Hostname: {}", cfg.hostname);
    let _ = writeln!(out, "- Timezone: {}", cfg.timezone);
    let _ = writeln!(out, "- Git: {} <{}>", or_dash(&cfg.git_name), or_dash(&cfg.git_email));
    let _ = writeln!(out, "- GitHub: {}", or_dash(&cfg.github_username));
    let _ = writeln!(out, "- SSH keys: {}", cfg.ssh_keys.len());

    let _ = writeln!(out);
    let _ = writeln!(out, "## Packages");
    let _ = writeln!(out);
    if cfg.packages.is_empty() {
        let _ = writeln!(out, "_none selected_");
    }
    for name in &cfg.packages {
        let description = registry
            .and_then(|r| r.get(name))
            .map(|p| p.description.as_str())
            .unwrap_or("");
        if description.is_empty() {
            let _ = writeln!(out, "- {}", name);
        } else {
            let _ = writeln!(out, "- {}: {}", name, description);
        }
    }
    if !cfg.disabled_packages.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "Disabled: {}", cfg.disabled_packages.join(", "));
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "## Secrets");
    let _ = writeln!(out);
    let _ = writeln!(out, "- Tailscale auth key: {}", mask(&cfg.tailscale_auth_key));
    let _ = writeln!(out, "- GitHub PAT: {}", mask(&cfg.github_pat));
    out
}
