use crate::keymap::Action;
use crate::widgets::marker;
use crate::wizard::handler::{Command, FieldCount, PhaseHandler};
use crate::wizard::state::WizardState;
use crossterm::event::KeyEvent;
use uvm_core::DeploymentTarget;

/// Target list, plus a saved-profile row when profiles exist.
pub struct TargetPhase;

impl TargetPhase {
    fn profile_row(state: &WizardState) -> Option<usize> {
        if state.profile_names.is_empty() {
            None
        } else {
            Some(DeploymentTarget::all().len())
        }
    }
}

impl PhaseHandler for TargetPhase {
    fn name(&self) -> &'static str {
        "target"
    }

    fn init(&self, state: &mut WizardState) {
        state.focused_field = 0;
        state.set_select("target", state.data.target.index());
        state.focus(None);
    }

    fn update(&self, state: &mut WizardState, key: KeyEvent) -> (bool, Option<Command>) {
        let max = match self.field_count(state).max_field() {
            Some(max) => max,
            None => return (false, None),
        };
        let action = state.keymap.action(&key, false);
        match action {
            Action::Up | Action::PrevField => state.navigate_field(-1, max),
            Action::Down | Action::NextField => state.navigate_field(1, max),
            Action::Left | Action::Right if Self::profile_row(state) == Some(state.focused_field) => {
                let delta = if action == Action::Left { -1 } else { 1 };
                let count = state.profile_names.len();
                state.cycle_select("profile", count, delta);
            }
            Action::Confirm => {
                if Self::profile_row(state) == Some(state.focused_field) {
                    let name = state.profile_names.get(state.select("profile")).cloned();
                    return (false, name.map(Command::LoadProfile));
                }
                state.set_select("target", state.focused_field);
                return (true, None);
            }
            _ => {}
        }
        (false, None)
    }

    fn view(&self, state: &WizardState) -> Vec<String> {
        let mut lines = vec!["Where should the machine go?".to_string(), String::new()];
        let chosen = state.select("target");
        for (index, target) in DeploymentTarget::all().iter().enumerate() {
            let selected = if index == chosen { "*" } else { " " };
            lines.push(format!(
                "{}{} {:<24} {}",
                marker(index == state.focused_field),
                selected,
                target.title(),
                target.description()
            ));
        }
        if let Some(row) = Self::profile_row(state) {
            let name = state
                .profile_names
                .get(state.select("profile"))
                .map(String::as_str)
                .unwrap_or("");
            lines.push(String::new());
            lines.push(format!(
                "{}  Load saved profile: ◀ {} ▶",
                marker(row == state.focused_field),
                name
            ));
        }
        lines
    }

    fn save(&self, state: &mut WizardState) {
        if let Some(target) = DeploymentTarget::from_index(state.select("target")) {
            state.data.target = target;
        }
    }

    fn field_count(&self, state: &WizardState) -> FieldCount {
        let extra = usize::from(Self::profile_row(state).is_some());
        FieldCount::Fixed(DeploymentTarget::all().len() + extra)
    }

    fn key_help(&self) -> &'static str {
        "↑/↓ or j/k: move  Enter: choose  ←/→: pick profile  Esc: quit"
    }
}
