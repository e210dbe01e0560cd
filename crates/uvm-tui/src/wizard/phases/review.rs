use crate::input::TextInput;
use crate::keymap::Action;
use crate::widgets::marker;
use crate::wizard::handler::{Command, FieldCount, PhaseHandler};
use crate::wizard::state::WizardState;
use crossterm::event::KeyEvent;
use uvm_core::profile::validate_profile_name;
use uvm_core::{DeploymentTarget, WizardData};

const PROFILE_INPUT: &str = "profile_name";
const PROFILE_ROW: usize = 0;
const DEPLOY_ROW: usize = 1;

pub struct ReviewPhase;

fn set_or_not(value: &str) -> &'static str {
    if value.is_empty() {
        "not set"
    } else {
        "set"
    }
}

/// Read-only summary of everything collected so far.
pub(crate) fn summary_lines(data: &WizardData) -> Vec<String> {
    let mut lines = vec![format!("Target:    {}", data.target.title())];
    match data.target {
        DeploymentTarget::Multipass => {
            let mp = &data.multipass;
            lines.push(format!(
                "Instance:  {} ({}, {} CPU, {} RAM, {} disk)",
                mp.name, mp.image, mp.cpus, mp.memory, mp.disk
            ));
            if mp.keep_on_failure {
                lines.push("           kept on failure".to_string());
            }
        }
        DeploymentTarget::Terraform => {
            let tf = &data.terraform;
            lines.push(format!(
                "Domain:    {} ({} vCPU, {} MiB, {} GiB)",
                tf.name, tf.cpus, tf.memory_mb, tf.disk_gb
            ));
            lines.push(format!("Image:     {}", tf.image_path));
            lines.push(format!("libvirt:   {}", tf.libvirt_uri));
        }
        DeploymentTarget::Usb => {
            let usb = &data.usb;
            lines.push(format!("Source:    {}", usb.source_iso));
            lines.push(format!("Output:    {}", usb.output_path));
            lines.push(format!(
                "Storage:   {}, timezone {}",
                usb.storage_layout, usb.timezone
            ));
        }
        DeploymentTarget::ConfigOnly => {
            let generate = &data.generate;
            lines.push(format!("Output:    {}", generate.output_dir.display()));
            lines.push(format!(
                "cloud-init: {}",
                if generate.generate_cloud_init { "yes" } else { "no" }
            ));
        }
    }
    lines.push(String::new());
    lines.push(format!(
        "User:      {} @ {}",
        data.effective_username(),
        data.effective_hostname()
    ));
    if !data.display_name.is_empty() {
        lines.push(format!("Name:      {}", data.display_name));
    }
    lines.push(format!("SSH keys:  {}", data.ssh_keys.len()));
    if !data.github_username.is_empty() {
        lines.push(format!("GitHub:    {}", data.github_username));
    }
    if !data.git_name.is_empty() || !data.git_email.is_empty() {
        lines.push(format!("Git:       {} <{}>", data.git_name, data.git_email));
    }
    lines.push(format!(
        "Packages:  {}",
        if data.packages.is_empty() {
            "(none)".to_string()
        } else {
            data.packages.join(" ")
        }
    ));
    lines.push(format!(
        "Tailscale: {}   GitHub token: {}",
        set_or_not(&data.tailscale_auth_key),
        set_or_not(&data.github_pat)
    ));
    lines
}

impl PhaseHandler for ReviewPhase {
    fn name(&self) -> &'static str {
        "review"
    }

    fn init(&self, state: &mut WizardState) {
        let seed = state
            .loaded_profile
            .clone()
            .unwrap_or_else(|| state.data.machine_name().to_string());
        state.set_input(PROFILE_INPUT, TextInput::new(&seed, "profile name"));
        state.focused_field = PROFILE_ROW;
        state.focus(Some(PROFILE_INPUT));
    }

    fn update(&self, state: &mut WizardState, key: KeyEvent) -> (bool, Option<Command>) {
        let action = state.keymap.action(&key, state.editing());
        match action {
            Action::Up | Action::PrevField => state.navigate_field(-1, DEPLOY_ROW),
            Action::Down | Action::NextField => state.navigate_field(1, DEPLOY_ROW),
            Action::Confirm if state.focused_field == DEPLOY_ROW => {
                return (true, Some(Command::StartDeploy));
            }
            Action::Confirm => {
                let name = state.input_value(PROFILE_INPUT);
                return match validate_profile_name(&name) {
                    Ok(()) => (false, Some(Command::SaveProfile(name))),
                    Err(err) => {
                        state.error(err.to_string());
                        (false, None)
                    }
                };
            }
            Action::Other if state.focused_field == PROFILE_ROW => {
                if let Some(input) = state.input_mut(PROFILE_INPUT) {
                    input.handle_key(key);
                }
            }
            _ => {}
        }
        let editing = state.focused_field == PROFILE_ROW;
        state.focus(editing.then_some(PROFILE_INPUT));
        (false, None)
    }

    fn view(&self, state: &WizardState) -> Vec<String> {
        let mut lines = vec!["Review before deploying:".to_string(), String::new()];
        lines.extend(summary_lines(&state.data).into_iter().map(|l| format!("  {}", l)));
        lines.push(String::new());
        let input = state
            .input(PROFILE_INPUT)
            .map(|i| i.display_with_cursor())
            .unwrap_or_default();
        lines.push(format!(
            "{} Save as profile: {}  (Enter saves)",
            marker(state.focused_field == PROFILE_ROW),
            input
        ));
        lines.push(format!(
            "{} [ Deploy ]",
            marker(state.focused_field == DEPLOY_ROW)
        ));
        lines
    }

    fn save(&self, _state: &mut WizardState) {}

    fn field_count(&self, _state: &WizardState) -> FieldCount {
        FieldCount::Fixed(2)
    }

    fn key_help(&self) -> &'static str {
        "↑/↓ Tab: move  Enter: save profile / deploy  Esc: back"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keymap::Keymap;
    use crossterm::event::{KeyCode, KeyModifiers};

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn deploy_button_starts_deploy() {
        let mut state = WizardState::new(None, vec![], Keymap::default());
        ReviewPhase.init(&mut state);
        ReviewPhase.update(&mut state, key(KeyCode::Tab));
        assert_eq!(
            ReviewPhase.update(&mut state, key(KeyCode::Enter)),
            (true, Some(Command::StartDeploy))
        );
    }

    #[test]
    fn profile_name_is_validated() {
        let mut state = WizardState::new(None, vec![], Keymap::default());
        ReviewPhase.init(&mut state);
        if let Some(input) = state.input_mut(PROFILE_INPUT) {
            input.set_value("bad name");
        }
        assert_eq!(ReviewPhase.update(&mut state, key(KeyCode::Enter)), (false, None));
        assert!(state.status.is_some());

        if let Some(input) = state.input_mut(PROFILE_INPUT) {
            input.set_value("lab-1");
        }
        assert_eq!(
            ReviewPhase.update(&mut state, key(KeyCode::Enter)),
            (false, Some(Command::SaveProfile("lab-1".to_string())))
        );
    }

    #[test]
    fn secrets_never_shown() {
        let data = WizardData {
            tailscale_auth_key: "tskey-abc".to_string(),
            ..Default::default()
        };
        let text = summary_lines(&data).join("\n");
        assert!(!text.contains("tskey-abc"));
        assert!(text.contains("Tailscale: set"));
    }
}
