//! Scripted subcommands: profile housekeeping and headless generation.

use crate::cli::ProfilesCommand;
use anyhow::{anyhow, Context, Result};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use uvm_core::packages::PackageRegistry;
use uvm_core::profile::{ProfileOptions, ProfileStore, WizardProfile};
use uvm_core::settings::Settings;
use uvm_core::{Catalogue, DeploymentTarget};
use uvm_deploy::{build_deploy_options, run_deployer, select_deployer, DeployResult, SystemRunner};

const MASK: &str = "********";

pub fn profiles(store: &ProfileStore, action: &ProfilesCommand, out: &mut dyn Write) -> Result<()> {
    match action {
        ProfilesCommand::List => {
            let names = store.list()?;
            if names.is_empty() {
                writeln!(out, "No saved profiles in {}", store.dir().display())?;
            }
            for name in names {
                writeln!(out, "{}", name)?;
            }
        }
        ProfilesCommand::Show { name } => {
            let profile = masked(store.load(name)?);
            let json = serde_json::to_string_pretty(&profile).context("Failed to render profile")?;
            writeln!(out, "{}", json)?;
        }
        ProfilesCommand::Delete { name } => {
            store.delete(name)?;
            log::info!("deleted profile {}", name);
            writeln!(out, "Deleted profile {}", name)?;
        }
    }
    Ok(())
}

fn masked(mut profile: WizardProfile) -> WizardProfile {
    for secret in [&mut profile.tailscale_auth_key, &mut profile.github_pat] {
        if !secret.is_empty() {
            *secret = MASK.to_string();
        }
    }
    profile
}

/// Run the config-only deployer for a saved profile, printing progress.
///
/// Output goes to `output`, else the profile's own directory when it was saved
/// for the config-only target, else the settings' `output_dir`.
pub fn generate(
    settings: &Settings,
    store: &ProfileStore,
    name: &str,
    output: Option<PathBuf>,
    out: &mut dyn Write,
) -> Result<DeployResult> {
    let profile = store.load(name)?;
    let mut data = profile.to_wizard_data();
    let saved_dir = match &profile.options {
        ProfileOptions::ConfigOnly(generate) => Some(generate.output_dir.clone()),
        _ => None,
    };
    data.target = DeploymentTarget::ConfigOnly;
    data.generate.output_dir = output
        .or(saved_dir)
        .unwrap_or_else(|| settings.output_dir.clone());

    let registry: Arc<dyn PackageRegistry> = Arc::new(Catalogue::builtin());
    let opts = build_deploy_options(&data, Some(registry.as_ref()), settings);
    let deployer = select_deployer(opts.target, Some(registry), Arc::new(SystemRunner));
    log::info!(
        "generating {} into {}",
        name,
        data.generate.output_dir.display()
    );

    let mut write_err = None;
    let result = run_deployer(deployer.as_ref(), &opts, &mut |event| {
        let mark = if event.is_error { "!" } else { " " };
        let line = format!(
            "{}[{:>3}%] {}: {}",
            mark,
            event.clamped_percent(),
            event.stage,
            event.message
        );
        if let Err(err) = writeln!(out, "{}", line) {
            write_err.get_or_insert(err);
        }
    });
    if let Some(err) = write_err {
        return Err(err.into());
    }

    if !result.success {
        return Err(anyhow!(
            "generate failed: {}",
            result.error.as_deref().unwrap_or("unknown error")
        ));
    }
    for (key, value) in &result.outputs {
        writeln!(out, "{}: {}", key, value)?;
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use uvm_core::WizardData;

    fn store_with(dir: &std::path::Path, data: &WizardData) -> ProfileStore {
        let store = ProfileStore::new(dir.join("profiles"));
        store
            .save(&WizardProfile::snapshot("lab", data))
            .unwrap();
        store
    }

    #[test]
    fn show_masks_secrets() {
        let dir = tempdir().unwrap();
        let data = WizardData {
            tailscale_auth_key: "tskey-secret".to_string(),
            ..Default::default()
        };
        let store = store_with(dir.path(), &data);
        let mut out = Vec::new();
        profiles(
            &store,
            &ProfilesCommand::Show {
                name: "lab".to_string(),
            },
            &mut out,
        )
        .unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(!text.contains("tskey-secret"));
        assert!(text.contains(MASK));
        // empty secrets stay empty so "not set" is visible
        assert!(text.contains("\"github_pat\": \"\""));
    }

    #[test]
    fn list_then_delete() {
        let dir = tempdir().unwrap();
        let store = store_with(dir.path(), &WizardData::default());
        let mut out = Vec::new();
        profiles(&store, &ProfilesCommand::List, &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "lab\n");

        let delete = ProfilesCommand::Delete {
            name: "lab".to_string(),
        };
        profiles(&store, &delete, &mut Vec::new()).unwrap();
        assert!(store.list().unwrap().is_empty());
        assert!(profiles(&store, &delete, &mut Vec::new()).is_err());
    }

    #[test]
    fn generate_overrides_target_and_output() {
        let dir = tempdir().unwrap();
        let data = WizardData {
            target: DeploymentTarget::Multipass,
            hostname: "lab-box".to_string(),
            ..Default::default()
        };
        let store = store_with(dir.path(), &data);
        let settings = Settings {
            work_dir: dir.path().join("work"),
            ..Default::default()
        };
        let output = dir.path().join("out");

        let mut out = Vec::new();
        let result = generate(&settings, &store, "lab", Some(output.clone()), &mut out).unwrap();
        assert!(result.success);
        assert!(output.join("config.env").exists());
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("[100%]"), "{}", text);
    }

    #[test]
    fn generate_unknown_profile_fails() {
        let dir = tempdir().unwrap();
        let store = ProfileStore::new(dir.path());
        let err = generate(&Settings::default(), &store, "ghost", None, &mut Vec::new())
            .unwrap_err();
        assert!(err.to_string().contains("ghost"));
    }
}
