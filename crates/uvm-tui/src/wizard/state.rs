//! Wizard session state and the field primitives every phase shares.

use super::phase::Phase;
use crate::input::{InputMode, TextInput};
use crate::keymap::Keymap;
use crate::widgets::CheckboxState;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use uvm_core::github::{GithubImport, GithubProfile};
use uvm_core::packages::{apply_preset, PresetOutcome};
use uvm_core::profile::WizardProfile;
use uvm_core::ssh::{same_key, SshKeyOption};
use uvm_core::{PackagePreset, PackageRegistry, WizardData};
use uvm_deploy::{DeployResult, ProgressEvent};

pub type InputMap = HashMap<String, TextInput>;

/// Focus `name` and blur every other input.
pub fn focus_input(mut inputs: InputMap, name: &str) -> InputMap {
    for (key, input) in inputs.iter_mut() {
        input.mode = if key == name {
            InputMode::Editing
        } else {
            InputMode::Normal
        };
    }
    inputs
}

pub fn blur_inputs(mut inputs: InputMap) -> InputMap {
    for input in inputs.values_mut() {
        input.mode = InputMode::Normal;
    }
    inputs
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Info,
    Warning,
    Error,
}

/// One-line message under the current phase; the next key dismisses it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusLine {
    pub kind: StatusKind,
    pub text: String,
}

/// Result of the last GitHub lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GithubState {
    pub username: String,
    pub keys: Vec<String>,
    pub profile: Option<GithubProfile>,
    pub keys_err: Option<String>,
    pub profile_err: Option<String>,
    pub in_flight: bool,
}

impl GithubState {
    pub fn warning(&self) -> Option<String> {
        GithubImport {
            username: self.username.clone(),
            keys: Vec::new(),
            profile: None,
            keys_err: self.keys_err.clone(),
            profile_err: self.profile_err.clone(),
        }
        .warning()
    }
}

/// What the Deploy and Complete phases render.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeployView {
    pub running: bool,
    pub spinner_tick: usize,
    pub events: Vec<ProgressEvent>,
    pub result: Option<DeployResult>,
}

impl DeployView {
    pub fn start() -> Self {
        Self {
            running: true,
            ..Default::default()
        }
    }

    pub fn push(&mut self, event: ProgressEvent) {
        self.events.push(event);
    }

    pub fn finish(&mut self, result: DeployResult) {
        self.running = false;
        self.result = Some(result);
    }

    pub fn percent(&self) -> u16 {
        self.events.last().map(|e| e.clamped_percent()).unwrap_or(0)
    }

    pub fn last_events(&self, n: usize) -> &[ProgressEvent] {
        let start = self.events.len().saturating_sub(n);
        &self.events[start..]
    }
}

pub struct WizardState {
    pub phase: Phase,
    pub data: WizardData,
    pub focused_field: usize,
    pub inputs: InputMap,
    pub selects: HashMap<String, usize>,
    pub checkboxes: HashMap<String, CheckboxState>,
    /// package name → selected
    pub package_selection: BTreeMap<String, bool>,
    /// public key line → selected
    pub ssh_selection: BTreeMap<String, bool>,
    pub registry: Option<Arc<dyn PackageRegistry>>,
    pub presets: Vec<PackagePreset>,
    pub local_keys: Vec<SshKeyOption>,
    pub github: GithubState,
    pub status: Option<StatusLine>,
    pub profile_names: Vec<String>,
    pub loaded_profile: Option<String>,
    pub keymap: Keymap,
    pub deploy: DeployView,
}

impl WizardState {
    pub fn new(
        registry: Option<Arc<dyn PackageRegistry>>,
        presets: Vec<PackagePreset>,
        keymap: Keymap,
    ) -> Self {
        Self {
            phase: Phase::Target,
            data: WizardData::default(),
            focused_field: 0,
            inputs: InputMap::new(),
            selects: HashMap::new(),
            checkboxes: HashMap::new(),
            package_selection: BTreeMap::new(),
            ssh_selection: BTreeMap::new(),
            registry,
            presets,
            local_keys: Vec::new(),
            github: GithubState::default(),
            status: None,
            profile_names: Vec::new(),
            loaded_profile: None,
            keymap,
            deploy: DeployView::default(),
        }
    }

    /// Start over at Target. Registry, presets, discovered keys and
    /// profile names are external and survive.
    pub fn reset(&mut self) {
        self.phase = Phase::Target;
        self.data = WizardData::default();
        self.focused_field = 0;
        self.inputs.clear();
        self.selects.clear();
        self.checkboxes.clear();
        self.package_selection.clear();
        self.ssh_selection.clear();
        self.github = GithubState::default();
        self.status = None;
        self.loaded_profile = None;
        self.deploy = DeployView::default();
    }

    pub fn registry(&self) -> Option<&dyn PackageRegistry> {
        self.registry.as_deref()
    }

    // ---- navigation -------------------------------------------------------

    pub fn can_go_back(&self) -> bool {
        self.phase.can_go_back()
    }

    /// Move to the next phase. The dispatcher calls this only after the
    /// handler asked to advance and `save` ran.
    pub fn advance(&mut self) {
        if let Some(next) = self.phase.next() {
            self.phase = next;
        }
        self.focused_field = 0;
    }

    /// Returns false when the current phase is a wall.
    pub fn go_back(&mut self) -> bool {
        if !self.can_go_back() {
            return false;
        }
        match self.phase.prev() {
            Some(prev) => {
                self.phase = prev;
                self.focused_field = 0;
                true
            }
            None => false,
        }
    }

    // ---- field primitives -------------------------------------------------

    /// Move focus by `delta`, clamped to `[0, max_field]`.
    pub fn navigate_field(&mut self, delta: isize, max_field: usize) {
        let next = self.focused_field as isize + delta;
        self.focused_field = next.clamp(0, max_field as isize) as usize;
    }

    /// Step a choice field by `delta`, wrapping. No-op without options.
    pub fn cycle_select(&mut self, name: &str, option_count: usize, delta: isize) {
        if option_count == 0 {
            return;
        }
        let current = self.selects.get(name).copied().unwrap_or(0) as isize;
        let next = (current + delta).rem_euclid(option_count as isize);
        self.selects.insert(name.to_string(), next as usize);
    }

    pub fn select(&self, name: &str) -> usize {
        self.selects.get(name).copied().unwrap_or(0)
    }

    pub fn set_select(&mut self, name: &str, index: usize) {
        self.selects.insert(name.to_string(), index);
    }

    pub fn set_input(&mut self, name: &str, input: TextInput) {
        self.inputs.insert(name.to_string(), input);
    }

    pub fn input(&self, name: &str) -> Option<&TextInput> {
        self.inputs.get(name)
    }

    pub fn input_mut(&mut self, name: &str) -> Option<&mut TextInput> {
        self.inputs.get_mut(name)
    }

    /// Trimmed value of a text input; empty if it doesn't exist.
    pub fn input_value(&self, name: &str) -> String {
        self.inputs
            .get(name)
            .map(|i| i.trimmed().to_string())
            .unwrap_or_default()
    }

    pub fn checkbox(&self, name: &str) -> bool {
        self.checkboxes
            .get(name)
            .map(|c| c.is_checked())
            .unwrap_or(false)
    }

    pub fn set_checkbox(&mut self, name: &str, checked: bool) {
        self.checkboxes.insert(name.to_string(), checked.into());
    }

    pub fn toggle_checkbox(&mut self, name: &str) {
        self.checkboxes.entry(name.to_string()).or_default().toggle();
    }

    /// Give keyboard focus to the text input `name`, or to none.
    pub fn focus(&mut self, name: Option<&str>) {
        let inputs = std::mem::take(&mut self.inputs);
        self.inputs = match name {
            Some(name) => focus_input(inputs, name),
            None => blur_inputs(inputs),
        };
    }

    /// True while a text input has focus.
    pub fn editing(&self) -> bool {
        self.inputs.values().any(TextInput::is_focused)
    }

    // ---- status line ------------------------------------------------------

    pub fn info(&mut self, text: impl Into<String>) {
        self.status = Some(StatusLine {
            kind: StatusKind::Info,
            text: text.into(),
        });
    }

    pub fn warn(&mut self, text: impl Into<String>) {
        self.status = Some(StatusLine {
            kind: StatusKind::Warning,
            text: text.into(),
        });
    }

    pub fn error(&mut self, text: impl Into<String>) {
        self.status = Some(StatusLine {
            kind: StatusKind::Error,
            text: text.into(),
        });
    }

    pub fn clear_status(&mut self) {
        self.status = None;
    }

    // ---- packages ---------------------------------------------------------

    /// Replace the package selection with `preset`'s registry members.
    pub fn apply_package_preset(&mut self, preset: &PackagePreset) -> PresetOutcome {
        match self.registry.clone() {
            Some(registry) => apply_preset(preset, registry.as_ref(), &mut self.package_selection),
            None => PresetOutcome {
                applied: 0,
                skipped: preset.packages.len(),
                skipped_names: preset.packages.clone(),
            },
        }
    }

    /// Selected package names, sorted.
    pub fn selected_packages(&self) -> Vec<String> {
        self.package_selection
            .iter()
            .filter(|(_, selected)| **selected)
            .map(|(name, _)| name.clone())
            .collect()
    }

    // ---- ssh / github -----------------------------------------------------

    /// Record a GitHub lookup. Imported keys start selected.
    pub fn apply_github_import(&mut self, import: GithubImport) {
        for key in &import.keys {
            // reuse the line we already have when only the comment differs
            let known = self
                .local_keys
                .iter()
                .map(|k| &k.key)
                .chain(self.ssh_selection.keys())
                .find(|k| same_key(k, key))
                .cloned();
            self.ssh_selection.insert(known.unwrap_or_else(|| key.clone()), true);
        }
        self.github = GithubState {
            username: import.username.clone(),
            keys: import.keys.clone(),
            profile: import.profile.clone(),
            keys_err: import.keys_err.clone(),
            profile_err: import.profile_err.clone(),
            in_flight: false,
        };
        match import.warning() {
            Some(warning) => self.warn(warning),
            None => self.info(format!(
                "Imported {} key(s) for {}",
                import.keys.len(),
                import.username
            )),
        }
    }

    // ---- profiles ---------------------------------------------------------

    pub fn snapshot(&self, name: &str) -> WizardProfile {
        WizardProfile::snapshot(name, &self.data)
    }

    /// Replace the collected data with a saved profile. The caller picks the
    /// phase to resume at.
    pub fn load_profile(&mut self, profile: &WizardProfile) {
        self.data = profile.to_wizard_data();
        self.set_select("target", self.data.target.index());
        self.package_selection = self
            .data
            .packages
            .iter()
            .map(|name| (name.clone(), true))
            .collect();
        self.ssh_selection = self
            .data
            .ssh_keys
            .iter()
            .map(|key| (key.clone(), true))
            .collect();
        self.loaded_profile = Some(profile.name.clone());
        self.info(format!("Loaded profile {}", profile.name));
    }
}
