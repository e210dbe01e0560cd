use tempfile::tempdir;
use uvm_core::cloud_init::{render_autoinstall, render_cloud_init};
use uvm_core::profile::{ProfileStore, WizardProfile};
use uvm_core::provision::ProvisionConfig;
use uvm_core::{Catalogue, DeploymentTarget, PackageRegistry, WizardData};

fn sample() -> WizardData {
    WizardData {
        target: DeploymentTarget::Usb,
        display_name: "Ada Lovelace".to_string(),
        username: "ada".to_string(),
        hostname: "engine".to_string(),
        git_name: "Ada Lovelace".to_string(),
        git_email: "ada@example.com".to_string(),
        ssh_keys: vec!["ssh-ed25519 AAAAC3NzaC1lZDI1NTE5AAAAIada ada@home".to_string()],
        packages: vec!["git".to_string(), "docker".to_string(), "git".to_string()],
        tailscale_auth_key: "tskey-auth-hidden".to_string(),
        ..Default::default()
    }
}

#[test]
fn cloud_init_carries_identity_and_apt_packages() {
    let catalogue = Catalogue::builtin();
    let registry: &dyn PackageRegistry = &catalogue;
    let config = ProvisionConfig::from_wizard(&sample(), Some(registry));
    assert_eq!(config.packages, vec!["docker", "git"]);
    assert!(config.disabled_packages.contains(&"curl".to_string()));

    let rendered = render_cloud_init(&config, Some(registry)).unwrap();
    assert!(rendered.starts_with("#cloud-config\n"));
    let doc: serde_yaml::Value = serde_yaml::from_str(&rendered).unwrap();
    assert_eq!(doc["hostname"].as_str(), Some("engine"));
    let user = &doc["users"][0];
    assert_eq!(user["name"].as_str(), Some("ada"));
    assert_eq!(user["ssh_authorized_keys"].as_sequence().map(Vec::len), Some(1));

    let apt: Vec<&str> = doc["packages"]
        .as_sequence()
        .unwrap()
        .iter()
        .filter_map(|p| p.as_str())
        .collect();
    assert!(apt.contains(&"docker.io"));
    assert!(apt.contains(&"git"));

    // tailscale wasn't selected, so its key never reaches user-data
    assert!(!rendered.contains("tskey-auth-hidden"));
    assert!(!config.to_config_env().contains("tskey-auth-hidden"));
    assert!(config.to_secrets_env().contains("tskey-auth-hidden"));
}

#[test]
fn autoinstall_falls_back_to_lvm_for_unknown_layouts() {
    let config = ProvisionConfig::from_wizard(&sample(), None);
    let rendered = render_autoinstall(&config, None, "raid9").unwrap();
    let doc: serde_yaml::Value = serde_yaml::from_str(&rendered).unwrap();
    let auto = &doc["autoinstall"];
    assert_eq!(auto["storage"]["layout"]["name"].as_str(), Some("lvm"));
    assert_eq!(auto["identity"]["hostname"].as_str(), Some("engine"));
}

#[test]
fn saved_profile_restores_the_session() {
    let dir = tempdir().unwrap();
    let store = ProfileStore::new(dir.path());
    let data = sample();
    store.save(&WizardProfile::snapshot("engine", &data)).unwrap();

    assert_eq!(store.list().unwrap(), vec!["engine"]);
    let restored = store.load("engine").unwrap().to_wizard_data();
    assert_eq!(restored, data);

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = std::fs::metadata(dir.path().join("engine.json"))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
