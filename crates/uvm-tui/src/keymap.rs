//! Key bindings, built once from settings and handed to the app.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// What a key means to a wizard phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Up,
    Down,
    Left,
    Right,
    NextField,
    PrevField,
    Confirm,
    Toggle,
    Back,
    Quit,
    /// Anything else; text fields consume it.
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Keymap {
    /// h/j/k/l move focus when no text field is being edited
    pub vim_keys: bool,
}

impl Default for Keymap {
    fn default() -> Self {
        Self { vim_keys: true }
    }
}

impl Keymap {
    pub fn new(vim_keys: bool) -> Self {
        Self { vim_keys }
    }

    pub fn from_settings(settings: &uvm_core::settings::Settings) -> Self {
        Self::new(settings.vim_keys)
    }

    pub fn is_quit(key: &KeyEvent) -> bool {
        key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c')
    }

    /// Resolve a key. `editing` is true while a text input has focus, in
    /// which case printable characters stay with the input.
    pub fn action(&self, key: &KeyEvent, editing: bool) -> Action {
        if Self::is_quit(key) {
            return Action::Quit;
        }
        match key.code {
            KeyCode::Up => Action::Up,
            KeyCode::Down => Action::Down,
            KeyCode::Tab => Action::NextField,
            KeyCode::BackTab => Action::PrevField,
            KeyCode::Enter => Action::Confirm,
            KeyCode::Esc => Action::Back,
            // Left/Right move the caret inside text fields
            KeyCode::Left if !editing => Action::Left,
            KeyCode::Right if !editing => Action::Right,
            KeyCode::Char(' ') if !editing => Action::Toggle,
            KeyCode::Char(c) if self.vim_keys && !editing => match c {
                'k' => Action::Up,
                'j' => Action::Down,
                'h' => Action::Left,
                'l' => Action::Right,
                _ => Action::Other,
            },
            _ => Action::Other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn vim_keys_only_outside_text_fields() {
        let map = Keymap::new(true);
        assert_eq!(map.action(&key(KeyCode::Char('j')), false), Action::Down);
        assert_eq!(map.action(&key(KeyCode::Char('j')), true), Action::Other);
        assert_eq!(map.action(&key(KeyCode::Char(' ')), true), Action::Other);
        assert_eq!(map.action(&key(KeyCode::Left), true), Action::Other);
    }

    #[test]
    fn vim_keys_can_be_disabled() {
        let map = Keymap::new(false);
        assert_eq!(map.action(&key(KeyCode::Char('k')), false), Action::Other);
        assert_eq!(map.action(&key(KeyCode::Up), false), Action::Up);
    }

    #[test]
    fn ctrl_c_is_quit_everywhere() {
        let map = Keymap::default();
        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(map.action(&ctrl_c, true), Action::Quit);
    }
}
