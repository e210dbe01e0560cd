use super::form::{self, FormEvent, FormField};
use crate::input::TextInput;
use crate::wizard::handler::{Command, FieldCount, PhaseHandler};
use crate::wizard::state::WizardState;
use crossterm::event::KeyEvent;
use uvm_core::wizard_data::{valid_hostname, valid_username, DEFAULT_HOSTNAME, DEFAULT_USERNAME};

pub struct HostPhase;

impl HostPhase {
    fn fields() -> Vec<FormField> {
        vec![
            FormField::text("display_name", "Full name"),
            FormField::text("username", "Username"),
            FormField::text("hostname", "Hostname"),
        ]
    }

    fn validate(state: &WizardState) -> Result<(), String> {
        let username = state.input_value("username");
        if !username.is_empty() && !valid_username(&username) {
            return Err(format!(
                "Invalid username {:?}: lowercase letters, digits, '_' and '-'",
                username
            ));
        }
        let hostname = state.input_value("hostname");
        if !hostname.is_empty() && !valid_hostname(&hostname) {
            return Err(format!("Invalid hostname {:?}", hostname));
        }
        Ok(())
    }
}

impl PhaseHandler for HostPhase {
    fn name(&self) -> &'static str {
        "host"
    }

    fn init(&self, state: &mut WizardState) {
        let data = state.data.clone();
        let display = if data.display_name.is_empty() {
            state
                .github
                .profile
                .as_ref()
                .and_then(|p| p.name.clone())
                .unwrap_or_default()
        } else {
            data.display_name
        };
        state.set_input("display_name", TextInput::new(&display, "Ubuntu User"));
        state.set_input("username", TextInput::new(&data.username, DEFAULT_USERNAME));
        state.set_input("hostname", TextInput::new(&data.hostname, DEFAULT_HOSTNAME));
        state.focused_field = 0;
        form::sync_focus(state, &Self::fields());
    }

    fn update(&self, state: &mut WizardState, key: KeyEvent) -> (bool, Option<Command>) {
        match form::update(state, &Self::fields(), key) {
            FormEvent::Submit => match Self::validate(state) {
                Ok(()) => (true, None),
                Err(msg) => {
                    state.error(msg);
                    (false, None)
                }
            },
            FormEvent::Handled => (false, None),
        }
    }

    fn view(&self, state: &WizardState) -> Vec<String> {
        let mut lines = vec![
            "Login account and machine name:".to_string(),
            String::new(),
        ];
        lines.extend(form::view(state, &Self::fields()));
        lines.push(String::new());
        lines.push(format!(
            "Blank username/hostname means {} / {}",
            DEFAULT_USERNAME, DEFAULT_HOSTNAME
        ));
        lines
    }

    /// Blank username and hostname are stored as the defaults.
    fn save(&self, state: &mut WizardState) {
        state.data.display_name = state.input_value("display_name");
        let username = state.input_value("username");
        state.data.username = if username.is_empty() {
            DEFAULT_USERNAME.to_string()
        } else {
            username
        };
        let hostname = state.input_value("hostname");
        state.data.hostname = if hostname.is_empty() {
            DEFAULT_HOSTNAME.to_string()
        } else {
            hostname
        };
    }

    fn field_count(&self, _state: &WizardState) -> FieldCount {
        FieldCount::Fixed(3)
    }

    fn key_help(&self) -> &'static str {
        form::FORM_HELP
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
    fn invalid_username_blocks_advance() {
        let mut state = WizardState::new(None, vec![], Keymap::default());
        state.data.username = "Bad Name".to_string();
        HostPhase.init(&mut state);
        HostPhase.update(&mut state, key(KeyCode::Tab));
        HostPhase.update(&mut state, key(KeyCode::Tab));
        let (advance, _) = HostPhase.update(&mut state, key(KeyCode::Enter));
        assert!(!advance);
        assert!(state
            .status
            .as_ref()
            .is_some_and(|s| s.text.contains("Invalid username")));
    }
}
