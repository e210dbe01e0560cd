//! Phase handler contract and the registry that maps phases to handlers.

use super::phase::Phase;
use super::phases;
use super::state::WizardState;
use crossterm::event::KeyEvent;
use std::collections::HashMap;

/// How many focusable fields a phase has.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldCount {
    Fixed(usize),
    /// Sized by external data (keys, packages); the handler clamps itself
    Dynamic,
}

impl FieldCount {
    /// Highest valid focus index for fixed layouts.
    pub fn max_field(&self) -> Option<usize> {
        match self {
            FieldCount::Fixed(0) | FieldCount::Dynamic => None,
            FieldCount::Fixed(n) => Some(n - 1),
        }
    }
}

/// Side effect a handler asks the app to perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    FetchGithub(String),
    SaveProfile(String),
    LoadProfile(String),
    StartDeploy,
    Restart,
    Quit,
}

/// One wizard phase.
///
/// `init` runs once on entry and must focus field 0. `update` returns
/// `true` when the phase is done; the app then calls `save` and advances.
/// `view` is pure.
pub trait PhaseHandler: Send {
    fn name(&self) -> &'static str;

    fn init(&self, state: &mut WizardState);

    fn update(&self, state: &mut WizardState, key: KeyEvent) -> (bool, Option<Command>);

    fn view(&self, state: &WizardState) -> Vec<String>;

    fn save(&self, state: &mut WizardState);

    fn field_count(&self, state: &WizardState) -> FieldCount;

    /// Key legend shown under the phase.
    fn key_help(&self) -> &'static str {
        "↑/↓ or j/k: move  Tab: next field  Enter: continue  Esc: back"
    }
}

pub struct PhaseRegistry {
    handlers: HashMap<Phase, Box<dyn PhaseHandler>>,
}

impl Default for PhaseRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

impl PhaseRegistry {
    pub fn empty() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Every phase wired to its handler.
    pub fn standard() -> Self {
        let mut registry = Self::empty();
        registry.register(Phase::Target, Box::new(phases::TargetPhase));
        registry.register(Phase::TargetOptions, Box::new(phases::TargetOptionsPhase));
        registry.register(Phase::Ssh, Box::new(phases::SshPhase));
        registry.register(Phase::Git, Box::new(phases::GitPhase));
        registry.register(Phase::Host, Box::new(phases::HostPhase));
        registry.register(Phase::Packages, Box::new(phases::PackagesPhase));
        registry.register(Phase::Optional, Box::new(phases::OptionalPhase));
        registry.register(Phase::Review, Box::new(phases::ReviewPhase));
        registry.register(Phase::Deploy, Box::new(phases::DeployPhase));
        registry.register(Phase::Complete, Box::new(phases::CompletePhase));
        registry
    }

    pub fn register(&mut self, phase: Phase, handler: Box<dyn PhaseHandler>) {
        self.handlers.insert(phase, handler);
    }

    pub fn get(&self, phase: Phase) -> Option<&dyn PhaseHandler> {
        self.handlers.get(&phase).map(|h| h.as_ref())
    }

    pub fn init(&self, state: &mut WizardState) {
        state.focused_field = 0;
        match self.get(state.phase) {
            Some(handler) => handler.init(state),
            None => log::warn!("no handler registered for {:?}", state.phase),
        }
    }

    /// Delegate a key. Unregistered phases ignore input.
    pub fn update(&self, state: &mut WizardState, key: KeyEvent) -> (bool, Option<Command>) {
        match self.get(state.phase) {
            Some(handler) => handler.update(state, key),
            None => (false, None),
        }
    }

    pub fn view(&self, state: &WizardState) -> Vec<String> {
        match self.get(state.phase) {
            Some(handler) => handler.view(state),
            None => vec![format!("(nothing to show for {})", state.phase.title())],
        }
    }

    pub fn save(&self, state: &mut WizardState) {
        if let Some(handler) = self.get(state.phase) {
            handler.save(state);
        }
    }

    pub fn key_help(&self, phase: Phase) -> &'static str {
        self.get(phase).map(|h| h.key_help()).unwrap_or("Esc: back")
    }
}
