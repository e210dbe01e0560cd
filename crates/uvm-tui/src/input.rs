//! Text entry for wizard fields.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Whether a field is receiving keystrokes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputMode {
    #[default]
    Normal,
    Editing,
}

/// Single-line text input with a byte-index cursor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextInput {
    value: String,
    cursor: usize,
    pub placeholder: String,
    pub mode: InputMode,
    /// Render as `*` (tokens, keys)
    pub secret: bool,
}

impl TextInput {
    pub fn new(value: &str, placeholder: &str) -> Self {
        Self {
            value: value.to_string(),
            cursor: value.len(),
            placeholder: placeholder.to_string(),
            mode: InputMode::Normal,
            secret: false,
        }
    }

    pub fn secret(value: &str, placeholder: &str) -> Self {
        Self {
            secret: true,
            ..Self::new(value, placeholder)
        }
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn trimmed(&self) -> &str {
        self.value.trim()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_focused(&self) -> bool {
        self.mode == InputMode::Editing
    }

    pub fn set_value(&mut self, value: &str) {
        self.value = value.to_string();
        self.cursor = self.value.len();
    }

    /// Value as shown on screen: masked if secret, placeholder if empty.
    pub fn display(&self) -> String {
        if self.value.is_empty() {
            return if self.is_focused() {
                String::new()
            } else {
                self.placeholder.clone()
            };
        }
        if self.secret {
            "*".repeat(self.value.chars().count())
        } else {
            self.value.clone()
        }
    }

    /// Display string with a `|` caret at the cursor, for the focused field.
    pub fn display_with_cursor(&self) -> String {
        if !self.is_focused() {
            return self.display();
        }
        let shown = if self.secret {
            "*".repeat(self.value.chars().count())
        } else {
            self.value.clone()
        };
        let caret_at = if self.secret {
            self.value[..self.cursor].chars().count()
        } else {
            self.cursor
        };
        let mut out = shown;
        out.insert(caret_at, '|');
        out
    }

    /// Apply a key. Returns false for keys the input doesn't use.
    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match (key.code, ctrl) {
            (KeyCode::Char('a'), true) | (KeyCode::Home, _) => self.cursor = 0,
            (KeyCode::Char('e'), true) | (KeyCode::End, _) => self.cursor = self.value.len(),
            (KeyCode::Char('u'), true) => {
                self.value.clear();
                self.cursor = 0;
            }
            (KeyCode::Char('k'), true) => self.value.truncate(self.cursor),
            (KeyCode::Char('w'), true) => self.delete_word_backward(),
            (KeyCode::Char(_), true) => return false,
            (KeyCode::Char(c), false) => self.insert_char(c),
            (KeyCode::Backspace, _) => self.delete_char_backward(),
            (KeyCode::Delete, _) => self.delete_char_forward(),
            (KeyCode::Left, true) => self.cursor = self.word_start_before(self.cursor),
            (KeyCode::Left, false) => self.cursor = self.prev_boundary(),
            (KeyCode::Right, true) => self.cursor = self.word_end_after(self.cursor),
            (KeyCode::Right, false) => self.cursor = self.next_boundary(),
            _ => return false,
        }
        true
    }

    fn insert_char(&mut self, c: char) {
        self.value.insert(self.cursor, c);
        self.cursor += c.len_utf8();
    }

    fn prev_boundary(&self) -> usize {
        self.value[..self.cursor]
            .char_indices()
            .last()
            .map(|(i, _)| i)
            .unwrap_or(0)
    }

    fn next_boundary(&self) -> usize {
        self.value[self.cursor..]
            .chars()
            .next()
            .map(|c| self.cursor + c.len_utf8())
            .unwrap_or(self.value.len())
    }

    fn delete_char_backward(&mut self) {
        if self.cursor > 0 {
            let prev = self.prev_boundary();
            self.value.remove(prev);
            self.cursor = prev;
        }
    }

    fn delete_char_forward(&mut self) {
        if self.cursor < self.value.len() {
            self.value.remove(self.cursor);
        }
    }

    /// Start of the word left of `pos`, skipping whitespace first.
    fn word_start_before(&self, pos: usize) -> usize {
        let head = &self.value[..pos];
        let trimmed = head.trim_end();
        trimmed
            .char_indices()
            .rev()
            .find(|(_, c)| c.is_whitespace())
            .map(|(i, c)| i + c.len_utf8())
            .unwrap_or(0)
    }

    /// Start of the next word right of `pos`.
    fn word_end_after(&self, pos: usize) -> usize {
        let tail = &self.value[pos..];
        let word_len = tail.find(char::is_whitespace).unwrap_or(tail.len());
        let rest = &tail[word_len..];
        let gap = rest.len() - rest.trim_start().len();
        pos + word_len + gap
    }

    fn delete_word_backward(&mut self) {
        let start = self.word_start_before(self.cursor);
        self.value.drain(start..self.cursor);
        self.cursor = start;
    }
}
