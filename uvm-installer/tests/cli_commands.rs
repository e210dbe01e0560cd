use clap::Parser;
use std::fs;
use std::path::Path;
use tempfile::tempdir;
use uvm_core::profile::{ProfileStore, WizardProfile};
use uvm_core::{DeploymentTarget, WizardData};
use uvm_installer::cli::Cli;
use uvm_installer::run_with;

fn write_config(root: &Path) -> String {
    let path = root.join("config.toml");
    let body = format!(
        "profiles_dir = {:?}\nwork_dir = {:?}\noutput_dir = {:?}\nssh_dir = {:?}\nlog_file = {:?}\n",
        root.join("profiles").display().to_string(),
        root.join("work").display().to_string(),
        root.join("default-out").display().to_string(),
        root.join("ssh").display().to_string(),
        root.join("uvm.log").display().to_string(),
    );
    fs::write(&path, body).unwrap();
    path.display().to_string()
}

fn save_profile(root: &Path, data: &WizardData) {
    ProfileStore::new(root.join("profiles"))
        .save(&WizardProfile::snapshot("lab", data))
        .unwrap();
}

#[test]
fn generate_uses_settings_output_for_non_generate_profiles() {
    let dir = tempdir().unwrap();
    let config = write_config(dir.path());
    save_profile(
        dir.path(),
        &WizardData {
            target: DeploymentTarget::Terraform,
            ..Default::default()
        },
    );

    let cli = Cli::parse_from(["uvm", "--config", &config, "generate", "--profile", "lab"]);
    run_with(cli).unwrap();

    let out = dir.path().join("default-out");
    for name in ["config.env", "secrets.env", "summary.md", "cloud-init.yaml"] {
        assert!(out.join(name).exists(), "{} missing", name);
    }
}

#[test]
fn profiles_delete_removes_file() {
    let dir = tempdir().unwrap();
    let config = write_config(dir.path());
    save_profile(dir.path(), &WizardData::default());

    run_with(Cli::parse_from(["uvm", "--config", &config, "profiles", "list"])).unwrap();
    run_with(Cli::parse_from([
        "uvm", "--config", &config, "profiles", "delete", "lab",
    ]))
    .unwrap();
    assert!(!dir.path().join("profiles/lab.json").exists());
}

#[test]
fn missing_profile_is_an_error() {
    let dir = tempdir().unwrap();
    let config = write_config(dir.path());
    let cli = Cli::parse_from(["uvm", "--config", &config, "profiles", "show", "ghost"]);
    let err = run_with(cli).unwrap_err();
    assert!(err.to_string().contains("Profile not found"));
}

#[test]
fn dump_tui_runs_without_a_terminal() {
    let dir = tempdir().unwrap();
    let config = write_config(dir.path());
    run_with(Cli::parse_from(["uvm", "--config", &config, "--dump-tui"])).unwrap();
}
