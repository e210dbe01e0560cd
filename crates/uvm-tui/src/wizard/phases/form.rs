//! Fixed-layout forms: text inputs, choice fields and checkboxes in a column.

use crate::keymap::Action;
use crate::widgets::{marker, CheckboxState};
use crate::wizard::state::WizardState;
use crossterm::event::KeyEvent;

pub(crate) enum FieldKind {
    Text,
    Choice(Vec<String>),
    Checkbox,
}

pub(crate) struct FormField {
    pub name: &'static str,
    pub label: &'static str,
    pub kind: FieldKind,
}

impl FormField {
    pub fn text(name: &'static str, label: &'static str) -> Self {
        Self {
            name,
            label,
            kind: FieldKind::Text,
        }
    }

    pub fn choice(name: &'static str, label: &'static str, options: Vec<String>) -> Self {
        Self {
            name,
            label,
            kind: FieldKind::Choice(options),
        }
    }

    pub fn checkbox(name: &'static str, label: &'static str) -> Self {
        Self {
            name,
            label,
            kind: FieldKind::Checkbox,
        }
    }
}

/// What a key did to the form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FormEvent {
    Handled,
    /// Enter on the last field
    Submit,
}

/// Choice list built from `base`, with `current` appended when it isn't one
/// of them so editing never loses a value.
pub(crate) fn options_with(base: &[&str], current: &str) -> Vec<String> {
    let mut options: Vec<String> = base.iter().map(|s| s.to_string()).collect();
    if !current.is_empty() && !options.iter().any(|o| o == current) {
        options.push(current.to_string());
    }
    options
}

pub(crate) fn index_of(options: &[String], value: &str) -> usize {
    options.iter().position(|o| o == value).unwrap_or(0)
}

pub(crate) fn choice_value(state: &WizardState, field: &FormField) -> String {
    match &field.kind {
        FieldKind::Choice(options) => options
            .get(state.select(field.name))
            .cloned()
            .unwrap_or_default(),
        _ => String::new(),
    }
}

/// Give the keyboard to the focused field if it is a text input.
pub(crate) fn sync_focus(state: &mut WizardState, fields: &[FormField]) {
    let focused = fields
        .get(state.focused_field)
        .filter(|f| matches!(f.kind, FieldKind::Text))
        .map(|f| f.name);
    state.focus(focused);
}

pub(crate) fn update(state: &mut WizardState, fields: &[FormField], key: KeyEvent) -> FormEvent {
    if fields.is_empty() {
        return FormEvent::Submit;
    }
    let last = fields.len() - 1;
    let action = state.keymap.action(&key, state.editing());
    let Some(field) = fields.get(state.focused_field) else {
        state.focused_field = 0;
        sync_focus(state, fields);
        return FormEvent::Handled;
    };

    match action {
        Action::Up | Action::PrevField => state.navigate_field(-1, last),
        Action::Down | Action::NextField => state.navigate_field(1, last),
        Action::Confirm if state.focused_field == last => return FormEvent::Submit,
        Action::Confirm => state.navigate_field(1, last),
        Action::Left | Action::Right => {
            if let FieldKind::Choice(options) = &field.kind {
                let delta = if action == Action::Left { -1 } else { 1 };
                state.cycle_select(field.name, options.len(), delta);
            }
        }
        Action::Toggle => {
            if matches!(field.kind, FieldKind::Checkbox) {
                state.toggle_checkbox(field.name);
            }
        }
        Action::Other => {
            if matches!(field.kind, FieldKind::Text) {
                if let Some(input) = state.input_mut(field.name) {
                    input.handle_key(key);
                }
            }
        }
        Action::Back | Action::Quit => {}
    }
    sync_focus(state, fields);
    FormEvent::Handled
}

pub(crate) fn view(state: &WizardState, fields: &[FormField]) -> Vec<String> {
    let width = fields.iter().map(|f| f.label.len()).max().unwrap_or(0);
    fields
        .iter()
        .enumerate()
        .map(|(index, field)| {
            let focused = index == state.focused_field;
            let value = match &field.kind {
                FieldKind::Text => state
                    .input(field.name)
                    .map(|i| i.display_with_cursor())
                    .unwrap_or_default(),
                FieldKind::Choice(_) => format!("◀ {} ▶", choice_value(state, field)),
                FieldKind::Checkbox => {
                    CheckboxState::from(state.checkbox(field.name)).symbol().to_string()
                }
            };
            format!(
                "{} {:<width$}  {}",
                marker(focused),
                field.label,
                value,
                width = width
            )
        })
        .collect()
}

pub(crate) const FORM_HELP: &str =
    "↑/↓ Tab: move  ←/→: change choice  Space: toggle  Enter: next/continue  Esc: back";

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::TextInput;
    use crate::keymap::Keymap;
    use crossterm::event::{KeyCode, KeyModifiers};

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn fields() -> Vec<FormField> {
        vec![
            FormField::text("name", "Name"),
            FormField::choice("size", "Size", vec!["s".into(), "m".into(), "l".into()]),
            FormField::checkbox("keep", "Keep"),
        ]
    }

    fn state() -> WizardState {
        let mut state = WizardState::new(None, vec![], Keymap::default());
        state.set_input("name", TextInput::new("", ""));
        sync_focus(&mut state, &fields());
        state
    }

    #[test]
    fn text_field_takes_vim_letters() {
        let mut state = state();
        let fields = fields();
        update(&mut state, &fields, key(KeyCode::Char('j')));
        assert_eq!(state.input_value("name"), "j");
        assert_eq!(state.focused_field, 0);
    }

    #[test]
    fn choice_cycles_and_checkbox_toggles() {
        let mut state = state();
        let fields = fields();
        update(&mut state, &fields, key(KeyCode::Tab));
        assert!(!state.editing());
        update(&mut state, &fields, key(KeyCode::Left));
        assert_eq!(choice_value(&state, &fields[1]), "l");
        update(&mut state, &fields, key(KeyCode::Down));
        update(&mut state, &fields, key(KeyCode::Char(' ')));
        assert!(state.checkbox("keep"));
        assert_eq!(
            update(&mut state, &fields, key(KeyCode::Enter)),
            FormEvent::Submit
        );
    }

    #[test]
    fn current_value_is_kept_in_options() {
        let options = options_with(&["2", "4"], "3");
        assert_eq!(options, vec!["2", "4", "3"]);
        assert_eq!(index_of(&options, "3"), 2);
        assert_eq!(options_with(&["2"], "2").len(), 1);
    }
}
