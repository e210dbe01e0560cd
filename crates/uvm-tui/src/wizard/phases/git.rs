use super::form::{self, FormEvent, FormField};
use crate::input::TextInput;
use crate::wizard::handler::{Command, FieldCount, PhaseHandler};
use crate::wizard::state::WizardState;
use crossterm::event::KeyEvent;

pub struct GitPhase;

impl GitPhase {
    fn fields() -> Vec<FormField> {
        vec![
            FormField::text("git_name", "Name"),
            FormField::text("git_email", "Email"),
        ]
    }
}

impl PhaseHandler for GitPhase {
    fn name(&self) -> &'static str {
        "git"
    }

    /// Seeds from earlier answers, else from the fetched GitHub profile.
    fn init(&self, state: &mut WizardState) {
        let profile = state.github.profile.clone().unwrap_or_default();
        let name = if state.data.git_name.is_empty() {
            profile.name.unwrap_or_default()
        } else {
            state.data.git_name.clone()
        };
        let email = if state.data.git_email.is_empty() {
            profile.email.unwrap_or_default()
        } else {
            state.data.git_email.clone()
        };
        state.set_input("git_name", TextInput::new(&name, "Ada Lovelace"));
        state.set_input("git_email", TextInput::new(&email, "ada@example.com"));
        state.focused_field = 0;
        form::sync_focus(state, &Self::fields());
    }

    fn update(&self, state: &mut WizardState, key: KeyEvent) -> (bool, Option<Command>) {
        match form::update(state, &Self::fields(), key) {
            FormEvent::Submit => {
                let email = state.input_value("git_email");
                if !email.is_empty() && !email.contains('@') {
                    state.error(format!("{:?} doesn't look like an email address", email));
                    return (false, None);
                }
                (true, None)
            }
            FormEvent::Handled => (false, None),
        }
    }

    fn view(&self, state: &WizardState) -> Vec<String> {
        let mut lines = vec![
            "Identity for git commits on the new machine (optional):".to_string(),
            String::new(),
        ];
        lines.extend(form::view(state, &Self::fields()));
        lines
    }

    fn save(&self, state: &mut WizardState) {
        state.data.git_name = state.input_value("git_name");
        state.data.git_email = state.input_value("git_email");
    }

    fn field_count(&self, _state: &WizardState) -> FieldCount {
        FieldCount::Fixed(2)
    }

    fn key_help(&self) -> &'static str {
        form::FORM_HELP
    }
}
