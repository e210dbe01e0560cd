//! Small, reusable UI helpers used by multiple phases.

/// Checkbox state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CheckboxState {
    #[default]
    Unchecked,
    Checked,
}

impl CheckboxState {
    pub fn toggle(&mut self) {
        *self = match self {
            CheckboxState::Unchecked => CheckboxState::Checked,
            CheckboxState::Checked => CheckboxState::Unchecked,
        };
    }

    pub fn is_checked(&self) -> bool {
        matches!(self, CheckboxState::Checked)
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            CheckboxState::Unchecked => "[ ]",
            CheckboxState::Checked => "[x]",
        }
    }
}

impl From<bool> for CheckboxState {
    fn from(b: bool) -> Self {
        if b {
            CheckboxState::Checked
        } else {
            CheckboxState::Unchecked
        }
    }
}

const SPINNER_FRAMES: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

/// Braille spinner frame for a tick counter.
pub fn spinner_frame(tick: usize) -> &'static str {
    SPINNER_FRAMES[tick % SPINNER_FRAMES.len()]
}

/// Cursor marker for list rows.
pub fn marker(focused: bool) -> &'static str {
    if focused {
        "▶"
    } else {
        " "
    }
}

/// Text progress bar, e.g. `[#####-----] 50%`.
pub fn text_bar(percent: u16, width: usize) -> String {
    let percent = percent.min(100) as usize;
    let filled = percent * width / 100;
    format!(
        "[{}{}] {}%",
        "#".repeat(filled),
        "-".repeat(width - filled),
        percent
    )
}
