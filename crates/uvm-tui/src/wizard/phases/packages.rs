use crate::keymap::Action;
use crate::widgets::{marker, CheckboxState};
use crate::wizard::handler::{Command, FieldCount, PhaseHandler};
use crate::wizard::state::WizardState;
use crossterm::event::KeyEvent;

/// Rows of the package list shown at once.
const WINDOW: usize = 12;

/// Row 0 is the preset picker, rows 1.. are registry packages.
pub struct PackagesPhase;

impl PackagesPhase {
    fn names(state: &WizardState) -> Vec<String> {
        state.registry().map(|r| r.names()).unwrap_or_default()
    }

    fn preset_name(state: &WizardState) -> Option<&str> {
        state
            .presets
            .get(state.select("preset"))
            .map(|p| p.name.as_str())
    }

    fn apply_selected_preset(state: &mut WizardState) {
        let Some(preset) = state.presets.get(state.select("preset")).cloned() else {
            state.warn("No presets available");
            return;
        };
        let outcome = state.apply_package_preset(&preset);
        if outcome.skipped == 0 {
            state.info(format!(
                "Preset {}: {} package(s) selected",
                preset.name, outcome.applied
            ));
        } else {
            state.warn(format!(
                "Preset {}: {} selected, {} not available ({})",
                preset.name,
                outcome.applied,
                outcome.skipped,
                outcome.skipped_names.join(", ")
            ));
        }
    }
}

impl PhaseHandler for PackagesPhase {
    fn name(&self) -> &'static str {
        "packages"
    }

    /// Selection comes from saved data, else the registry's defaults.
    fn init(&self, state: &mut WizardState) {
        if state.package_selection.is_empty() {
            let chosen: Vec<String> = if state.data.packages.is_empty() {
                state
                    .registry()
                    .map(|r| {
                        r.names()
                            .into_iter()
                            .filter(|n| r.get(n).is_some_and(|p| p.default_selected))
                            .collect()
                    })
                    .unwrap_or_default()
            } else {
                state.data.packages.clone()
            };
            for name in chosen {
                state.package_selection.insert(name, true);
            }
        }
        state.focused_field = 0;
        state.focus(None);
    }

    fn update(&self, state: &mut WizardState, key: KeyEvent) -> (bool, Option<Command>) {
        let names = Self::names(state);
        let max = names.len();
        let on_preset = state.focused_field == 0;
        match state.keymap.action(&key, false) {
            Action::Up | Action::PrevField => state.navigate_field(-1, max),
            Action::Down | Action::NextField => state.navigate_field(1, max),
            Action::Left if on_preset => {
                let count = state.presets.len();
                state.cycle_select("preset", count, -1);
            }
            Action::Right if on_preset => {
                let count = state.presets.len();
                state.cycle_select("preset", count, 1);
            }
            Action::Confirm if on_preset && !names.is_empty() => Self::apply_selected_preset(state),
            Action::Confirm => return (true, None),
            Action::Toggle if !on_preset => {
                if let Some(name) = names.get(state.focused_field - 1) {
                    let selected = state.package_selection.entry(name.clone()).or_insert(false);
                    *selected = !*selected;
                }
            }
            _ => {}
        }
        (false, None)
    }

    fn view(&self, state: &WizardState) -> Vec<String> {
        let names = Self::names(state);
        let selected = state.selected_packages().len();
        let mut lines = vec![
            format!("Packages ({} of {} selected)", selected, names.len()),
            String::new(),
            format!(
                "{} Preset: ◀ {} ▶  (Enter applies)",
                marker(state.focused_field == 0),
                Self::preset_name(state).unwrap_or("none")
            ),
            String::new(),
        ];

        let Some(registry) = state.registry() else {
            lines.push("  No package registry available".to_string());
            return lines;
        };

        // keep the focused row inside the window
        let focus = state.focused_field.saturating_sub(1);
        let start = focus.saturating_sub(WINDOW / 2).min(names.len().saturating_sub(WINDOW));
        let end = (start + WINDOW).min(names.len());
        if start > 0 {
            lines.push(format!("  … {} more above", start));
        }
        for (offset, name) in names[start..end].iter().enumerate() {
            let row = start + offset + 1;
            let checked = state.package_selection.get(name).copied().unwrap_or(false);
            let description = registry
                .get(name)
                .map(|p| p.description.as_str())
                .unwrap_or("");
            lines.push(format!(
                "{} {} {:<16} {}",
                marker(row == state.focused_field),
                CheckboxState::from(checked).symbol(),
                name,
                description
            ));
        }
        if end < names.len() {
            lines.push(format!("  … {} more below", names.len() - end));
        }
        lines
    }

    fn save(&self, state: &mut WizardState) {
        state.data.packages = state.selected_packages();
    }

    fn field_count(&self, _state: &WizardState) -> FieldCount {
        FieldCount::Dynamic
    }

    fn key_help(&self) -> &'static str {
        "↑/↓ or j/k: move  ←/→: preset  Space: toggle  Enter: apply preset / continue  Esc: back"
    }
}
