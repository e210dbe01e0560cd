use crate::widgets::spinner_frame;
use crate::wizard::app::App;
use crate::wizard::phase::Phase;
use crate::wizard::state::StatusKind;

/// Right-hand panel: choices so far and deployment progress.
pub(super) fn build_info_panel(app: &App) -> String {
    let state = &app.state;
    let data = &state.data;
    let mut lines = vec![
        "Selections:".to_string(),
        format!("Target: {}", data.target.title()),
    ];
    if Phase::TargetOptions.is_before(state.phase) {
        lines.push(format!("Machine: {}", data.machine_name()));
    }
    if Phase::Ssh.is_before(state.phase) {
        lines.push(format!("SSH keys: {}", data.ssh_keys.len()));
    }
    if Phase::Host.is_before(state.phase) {
        lines.push(format!(
            "Login: {}@{}",
            data.effective_username(),
            data.effective_hostname()
        ));
    }
    if Phase::Packages.is_before(state.phase) {
        lines.push(format!("Packages: {}", data.packages.len()));
    }
    if let Some(profile) = &state.loaded_profile {
        lines.push(format!("Profile: {}", profile));
    }
    if state.github.in_flight {
        lines.push(String::new());
        lines.push(format!("{} GitHub lookup…", spinner_frame(state.deploy.spinner_tick)));
    }
    if state.deploy.running {
        lines.push(String::new());
        lines.push("Progress:".to_string());
        lines.push(format!("Overall: {}%", state.deploy.percent()));
        if let Some(event) = state.deploy.events.last() {
            lines.push(format!("Stage: {}", event.stage));
        }
    }
    lines.join("\n")
}

pub(super) fn status_message(app: &App) -> String {
    match &app.state.status {
        Some(status) => {
            let icon = match status.kind {
                StatusKind::Info => "ℹ️",
                StatusKind::Warning => "⚠️",
                StatusKind::Error => "❌",
            };
            format!("{} {}", icon, status.text)
        }
        None => format!(
            "Step {}/{}: {}",
            app.state.phase.number(),
            Phase::all().len(),
            app.state.phase.title()
        ),
    }
}
