use crate::input::TextInput;
use crate::keymap::Action;
use crate::widgets::{marker, CheckboxState};
use crate::wizard::handler::{Command, FieldCount, PhaseHandler};
use crate::wizard::state::WizardState;
use crossterm::event::KeyEvent;
use uvm_core::github::valid_github_username;
use uvm_core::ssh::{dedup_keys, same_key, SshKeyOption};

const GITHUB_INPUT: &str = "github_user";

/// Local public keys and GitHub imports as one checklist, then a GitHub
/// username field.
pub struct SshPhase;

struct KeyRow {
    label: String,
    key: String,
}

impl SshPhase {
    /// Local keys first, then anything else in the selection (GitHub or profile keys).
    fn rows(state: &WizardState) -> Vec<KeyRow> {
        let mut rows: Vec<KeyRow> = state
            .local_keys
            .iter()
            .map(|k| KeyRow {
                label: k.label(),
                key: k.key.clone(),
            })
            .collect();
        for key in state.ssh_selection.keys() {
            if rows.iter().any(|r| same_key(&r.key, key)) {
                continue;
            }
            let origin = if state.github.keys.contains(key) {
                format!("github:{}", state.github.username)
            } else {
                "saved".to_string()
            };
            let option = SshKeyOption {
                source: origin,
                key: key.clone(),
            };
            rows.push(KeyRow {
                label: option.label(),
                key: option.key,
            });
        }
        rows
    }

    fn input_row(state: &WizardState) -> usize {
        Self::rows(state).len()
    }

    fn sync_focus(state: &mut WizardState) {
        let on_input = state.focused_field == Self::input_row(state);
        state.focus(on_input.then_some(GITHUB_INPUT));
    }
}

impl PhaseHandler for SshPhase {
    fn name(&self) -> &'static str {
        "ssh"
    }

    fn init(&self, state: &mut WizardState) {
        let first_visit = state.data.ssh_keys.is_empty() && state.ssh_selection.is_empty();
        for key in state.data.ssh_keys.clone() {
            state.ssh_selection.insert(key, true);
        }
        let local: Vec<String> = state.local_keys.iter().map(|k| k.key.clone()).collect();
        for key in local {
            state.ssh_selection.entry(key).or_insert(first_visit);
        }
        let username = state.data.github_username.clone();
        state.set_input(GITHUB_INPUT, TextInput::new(&username, "GitHub username (optional)"));
        state.focused_field = 0;
        Self::sync_focus(state);
    }

    fn update(&self, state: &mut WizardState, key: KeyEvent) -> (bool, Option<Command>) {
        if state.github.in_flight {
            return (false, None);
        }
        let input_row = Self::input_row(state);
        let on_input = state.focused_field == input_row;
        let action = state.keymap.action(&key, state.editing());
        match action {
            Action::Up | Action::PrevField => state.navigate_field(-1, input_row),
            Action::Down | Action::NextField => state.navigate_field(1, input_row),
            Action::Toggle if !on_input => {
                if let Some(row) = Self::rows(state).get(state.focused_field) {
                    let selected = state.ssh_selection.entry(row.key.clone()).or_insert(false);
                    *selected = !*selected;
                }
            }
            Action::Confirm if on_input => {
                let username = state.input_value(GITHUB_INPUT);
                if username.is_empty() || username == state.github.username {
                    return (true, None);
                }
                if !valid_github_username(&username) {
                    state.error(format!("{:?} is not a valid GitHub username", username));
                    return (false, None);
                }
                state.github.in_flight = true;
                state.info(format!("Fetching keys and profile for {}…", username));
                return (false, Some(Command::FetchGithub(username)));
            }
            Action::Confirm => state.navigate_field(1, input_row),
            Action::Other if on_input => {
                if let Some(input) = state.input_mut(GITHUB_INPUT) {
                    input.handle_key(key);
                }
            }
            _ => {}
        }
        Self::sync_focus(state);
        (false, None)
    }

    fn view(&self, state: &WizardState) -> Vec<String> {
        let mut lines = vec![
            "Public keys to authorize for the new user:".to_string(),
            String::new(),
        ];
        let rows = Self::rows(state);
        if rows.is_empty() {
            lines.push("  (no public keys found in ~/.ssh)".to_string());
        }
        for (index, row) in rows.iter().enumerate() {
            let checked = state.ssh_selection.get(&row.key).copied().unwrap_or(false);
            lines.push(format!(
                "{} {} {}",
                marker(index == state.focused_field),
                CheckboxState::from(checked).symbol(),
                row.label
            ));
        }
        lines.push(String::new());
        let input = state
            .input(GITHUB_INPUT)
            .map(|i| i.display_with_cursor())
            .unwrap_or_default();
        lines.push(format!(
            "{} Import from GitHub: {}",
            marker(state.focused_field == rows.len()),
            input
        ));
        if state.github.in_flight {
            lines.push("  fetching…".to_string());
        } else if let Some(warning) = state.github.warning() {
            lines.push(format!("  ⚠ {}", warning));
        }
        lines
    }

    fn save(&self, state: &mut WizardState) {
        let selected = Self::rows(state)
            .into_iter()
            .filter(|row| state.ssh_selection.get(&row.key).copied().unwrap_or(false))
            .map(|row| row.key);
        state.data.ssh_keys = dedup_keys(selected);
        state.data.github_username = state.input_value(GITHUB_INPUT);
    }

    fn field_count(&self, _state: &WizardState) -> FieldCount {
        FieldCount::Dynamic
    }

    fn key_help(&self) -> &'static str {
        "↑/↓ or j/k: move  Space: toggle key  Enter on GitHub field: import & continue  Esc: back"
    }
}
