use super::form::{self, FormEvent, FormField};
use crate::input::TextInput;
use crate::wizard::handler::{Command, FieldCount, PhaseHandler};
use crate::wizard::state::WizardState;
use crossterm::event::KeyEvent;

/// Secrets that end up in secrets.env; both optional and masked.
pub struct OptionalPhase;

impl OptionalPhase {
    fn fields() -> Vec<FormField> {
        vec![
            FormField::text("tailscale_key", "Tailscale auth key"),
            FormField::text("github_pat", "GitHub token"),
        ]
    }
}

impl PhaseHandler for OptionalPhase {
    fn name(&self) -> &'static str {
        "optional"
    }

    fn init(&self, state: &mut WizardState) {
        let data = state.data.clone();
        state.set_input(
            "tailscale_key",
            TextInput::secret(&data.tailscale_auth_key, "tskey-auth-… (optional)"),
        );
        state.set_input(
            "github_pat",
            TextInput::secret(&data.github_pat, "ghp_… (optional)"),
        );
        state.focused_field = 0;
        form::sync_focus(state, &Self::fields());
    }

    fn update(&self, state: &mut WizardState, key: KeyEvent) -> (bool, Option<Command>) {
        match form::update(state, &Self::fields(), key) {
            FormEvent::Submit => (true, None),
            FormEvent::Handled => (false, None),
        }
    }

    fn view(&self, state: &WizardState) -> Vec<String> {
        let mut lines = vec![
            "Optional services. Leave blank to skip.".to_string(),
            String::new(),
        ];
        lines.extend(form::view(state, &Self::fields()));
        lines
    }

    fn save(&self, state: &mut WizardState) {
        state.data.tailscale_auth_key = state.input_value("tailscale_key");
        state.data.github_pat = state.input_value("github_pat");
    }

    fn field_count(&self, _state: &WizardState) -> FieldCount {
        FieldCount::Fixed(2)
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

    #[test]
    fn secrets_are_masked_in_view() {
        let mut state = WizardState::new(None, vec![], Keymap::default());
        state.data.github_pat = "ghp_secret".to_string();
        OptionalPhase.init(&mut state);
        let view = OptionalPhase.view(&state).join("\n");
        assert!(!view.contains("ghp_secret"));
        OptionalPhase.update(&mut state, KeyEvent::new(KeyCode::Tab, KeyModifiers::NONE));
        OptionalPhase.save(&mut state);
        assert_eq!(state.data.github_pat, "ghp_secret");
    }
}
