use std::sync::Arc;
use std::time::Duration;
use tempfile::tempdir;
use uvm_core::settings::Settings;
use uvm_core::{Catalogue, DeploymentTarget, PackageRegistry, WizardData};
use uvm_deploy::runner::fake::FakeRunner;
use uvm_deploy::{build_deploy_options, select_deployer, spawn_deploy, DeployPoll};

fn poll_to_end(handle: uvm_deploy::DeployHandle) -> (Vec<uvm_deploy::ProgressEvent>, uvm_deploy::DeployResult) {
    let mut events = Vec::new();
    loop {
        match handle.poll() {
            DeployPoll::Progress(event) => events.push(event),
            DeployPoll::Idle => std::thread::sleep(Duration::from_millis(5)),
            DeployPoll::Finished(result) => return (events, result),
        }
    }
}

#[test]
fn multipass_pipeline_reports_commands_in_order() {
    let work = tempdir().unwrap();
    let mut data = WizardData::default();
    data.multipass.name = "pipeline".to_string();
    data.packages = vec!["git".to_string()];
    let settings = Settings {
        work_dir: work.path().to_path_buf(),
        ..Default::default()
    };
    let registry: Arc<dyn PackageRegistry> = Arc::new(Catalogue::builtin());
    let opts = build_deploy_options(&data, Some(registry.as_ref()), &settings);

    let runner = FakeRunner::new().ok(
        "multipass info",
        r#"{"info":{"pipeline":{"ipv4":["10.0.0.7"]}}}"#,
    );
    let deployer = select_deployer(DeploymentTarget::Multipass, Some(registry), Arc::new(runner));
    let (events, result) = poll_to_end(spawn_deploy(deployer, opts));

    assert!(result.success, "{:?}", result.error);
    assert_eq!(result.outputs.get("ipv4").map(String::as_str), Some("10.0.0.7"));

    let percents: Vec<f64> = events.iter().map(|e| e.percent).collect();
    let mut sorted = percents.clone();
    sorted.sort_by(|a, b| a.total_cmp(b));
    assert_eq!(percents, sorted, "progress must be FIFO and monotonic");
    assert_eq!(events.last().map(|e| e.percent), Some(100.0));

    let commands: Vec<&str> = events.iter().filter_map(|e| e.command.as_deref()).collect();
    assert_eq!(commands.len(), 4);
    assert!(commands[1].starts_with("multipass list"));
    assert!(commands[2].starts_with("multipass launch"));
}

#[test]
fn config_only_writes_to_requested_dir() {
    let out = tempdir().unwrap();
    let mut data = WizardData {
        target: DeploymentTarget::ConfigOnly,
        ..Default::default()
    };
    data.generate.output_dir = out.path().join("x");
    data.generate.generate_cloud_init = true;
    let registry: Arc<dyn PackageRegistry> = Arc::new(Catalogue::builtin());
    let opts = build_deploy_options(&data, Some(registry.as_ref()), &Settings::default());
    let deployer = select_deployer(data.target, Some(registry), Arc::new(FakeRunner::new()));

    let (events, result) = poll_to_end(spawn_deploy(deployer, opts));
    assert!(result.success);
    assert_eq!(events.len(), 6);
    for key in ["config.env", "secrets.env", "summary.md", "cloud-init.yaml"] {
        let path = result.outputs.get(key).expect("output recorded");
        assert!(std::path::Path::new(path).exists());
    }
}
