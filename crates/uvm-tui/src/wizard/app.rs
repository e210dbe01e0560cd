//! The dispatcher: routes keys to phase handlers, runs the commands they
//! return, and pulls results back from worker threads on each tick.

use super::handler::{Command, PhaseRegistry};
use super::phase::Phase;
use super::state::{DeployView, WizardState};
use crate::keymap::{Action, Keymap};
use anyhow::Result;
use crossterm::event::KeyEvent;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread;
use uvm_core::github::{import_user, GithubClient, GithubFetch, GithubImport};
use uvm_core::profile::ProfileStore;
use uvm_core::settings::Settings;
use uvm_core::ssh::{discover_public_keys, SshKeyOption};
use uvm_core::{Catalogue, PackagePreset, PackageRegistry};
use uvm_deploy::{
    build_deploy_options, select_deployer, spawn_deploy, CommandRunner, DeployHandle, DeployPoll,
    SystemRunner,
};

/// External collaborators, swappable in tests.
pub struct AppDeps {
    pub registry: Option<Arc<dyn PackageRegistry>>,
    pub presets: Vec<PackagePreset>,
    pub github: Arc<dyn GithubFetch>,
    pub runner: Arc<dyn CommandRunner>,
    pub store: ProfileStore,
    pub local_keys: Vec<SshKeyOption>,
}

impl AppDeps {
    /// Built-in catalogue, real GitHub client, real command runner.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let catalogue = Catalogue::builtin();
        let presets = catalogue.presets().to_vec();
        let local_keys = discover_public_keys(&settings.ssh_dir).unwrap_or_else(|err| {
            log::warn!("SSH key discovery failed: {:#}", err);
            Vec::new()
        });
        Ok(Self {
            registry: Some(Arc::new(catalogue)),
            presets,
            github: Arc::new(GithubClient::from_settings(settings)?),
            runner: Arc::new(SystemRunner),
            store: ProfileStore::new(&settings.profiles_dir),
            local_keys,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppOutcome {
    Continue,
    Quit,
}

/// Results coming back from background work.
#[derive(Debug)]
pub enum AppMessage {
    GithubFetched(GithubImport),
}

pub struct App {
    pub state: WizardState,
    phases: PhaseRegistry,
    settings: Settings,
    deps: AppDeps,
    messages_tx: Sender<AppMessage>,
    messages_rx: Receiver<AppMessage>,
    deploy: Option<DeployHandle>,
}

impl App {
    pub fn new(settings: Settings, keymap: Keymap, deps: AppDeps) -> Self {
        Self::with_phases(settings, keymap, deps, PhaseRegistry::standard())
    }

    pub fn with_phases(
        settings: Settings,
        keymap: Keymap,
        deps: AppDeps,
        phases: PhaseRegistry,
    ) -> Self {
        let mut state = WizardState::new(deps.registry.clone(), deps.presets.clone(), keymap);
        state.local_keys = deps.local_keys.clone();
        let (messages_tx, messages_rx) = mpsc::channel();
        let mut app = Self {
            state,
            phases,
            settings,
            deps,
            messages_tx,
            messages_rx,
            deploy: None,
        };
        app.refresh_profile_names();
        app.phases.init(&mut app.state);
        app
    }

    /// Lines for the content panel.
    pub fn view(&self) -> Vec<String> {
        self.phases.view(&self.state)
    }

    pub fn key_help(&self) -> &'static str {
        self.phases.key_help(self.state.phase)
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> AppOutcome {
        let phase = self.state.phase;
        if Keymap::is_quit(&key) {
            // deployments can't be interrupted
            return if phase == Phase::Deploy {
                AppOutcome::Continue
            } else {
                AppOutcome::Quit
            };
        }
        self.state.clear_status();

        if self.state.keymap.action(&key, self.state.editing()) == Action::Back {
            return match phase {
                Phase::Target | Phase::Complete => AppOutcome::Quit,
                Phase::Deploy => AppOutcome::Continue,
                _ => {
                    if self.state.go_back() {
                        self.phases.init(&mut self.state);
                    }
                    AppOutcome::Continue
                }
            };
        }

        let (advance, command) = self.phases.update(&mut self.state, key);
        if advance {
            self.advance();
        }
        match command {
            Some(command) => self.execute(command),
            None => AppOutcome::Continue,
        }
    }

    /// Save the current phase, move forward and initialise the next one.
    fn advance(&mut self) {
        self.phases.save(&mut self.state);
        self.state.advance();
        log::debug!("entering phase {:?}", self.state.phase);
        self.phases.init(&mut self.state);
    }

    /// Enter `phase` directly, skipping the handlers in between.
    pub fn jump_to(&mut self, phase: Phase) {
        self.state.phase = phase;
        self.phases.init(&mut self.state);
    }

    pub fn execute(&mut self, command: Command) -> AppOutcome {
        match command {
            Command::FetchGithub(username) => self.fetch_github(username),
            Command::SaveProfile(name) => self.save_profile(&name),
            Command::LoadProfile(name) => {
                if let Err(err) = self.load_profile(&name) {
                    self.state.error(format!("{:#}", err));
                }
            }
            Command::StartDeploy => self.start_deploy(),
            Command::Restart => {
                self.state.reset();
                self.refresh_profile_names();
                self.phases.init(&mut self.state);
            }
            Command::Quit => return AppOutcome::Quit,
        }
        AppOutcome::Continue
    }

    fn fetch_github(&mut self, username: String) {
        self.state.github.in_flight = true;
        let github = Arc::clone(&self.deps.github);
        let tx = self.messages_tx.clone();
        log::info!("fetching GitHub keys and profile for {}", username);
        thread::spawn(move || {
            let import = import_user(github.as_ref(), &username);
            let _ = tx.send(AppMessage::GithubFetched(import));
        });
    }

    fn save_profile(&mut self, name: &str) {
        let profile = self.state.snapshot(name);
        match self.deps.store.save(&profile) {
            Ok(path) => {
                self.state.loaded_profile = Some(name.to_string());
                self.state.info(format!("Saved profile to {}", path.display()));
                self.refresh_profile_names();
            }
            Err(err) => self.state.error(format!("Could not save profile: {:#}", err)),
        }
    }

    /// Load a saved profile and resume at Review.
    pub fn load_profile(&mut self, name: &str) -> Result<()> {
        let profile = self.deps.store.load(name)?;
        self.state.load_profile(&profile);
        self.jump_to(Phase::Review);
        Ok(())
    }

    fn refresh_profile_names(&mut self) {
        self.state.profile_names = self.deps.store.list().unwrap_or_else(|err| {
            log::warn!("could not list profiles: {:#}", err);
            Vec::new()
        });
    }

    fn start_deploy(&mut self) {
        if self.deploy.is_some() {
            return;
        }
        let opts = build_deploy_options(&self.state.data, self.state.registry(), &self.settings);
        let deployer = select_deployer(
            opts.target,
            self.state.registry.clone(),
            Arc::clone(&self.deps.runner),
        );
        log::info!(
            "starting {} deployment of {}",
            deployer.name(),
            self.state.data.machine_name()
        );
        self.state.deploy = DeployView::start();
        self.deploy = Some(spawn_deploy(deployer, opts));
    }

    /// Called on every loop iteration: background messages, spinner, progress.
    pub fn tick(&mut self) {
        while let Ok(message) = self.messages_rx.try_recv() {
            self.handle_message(message);
        }

        if self.state.deploy.running {
            self.state.deploy.spinner_tick = self.state.deploy.spinner_tick.wrapping_add(1);
        }

        let mut finished = None;
        if let Some(handle) = &self.deploy {
            loop {
                match handle.poll() {
                    DeployPoll::Progress(event) => self.state.deploy.push(event),
                    DeployPoll::Idle => break,
                    DeployPoll::Finished(result) => {
                        finished = Some(result);
                        break;
                    }
                }
            }
        }
        if let Some(result) = finished {
            self.deploy = None;
            if result.success {
                log::info!("deployment finished in {:?}", result.duration);
            } else {
                log::error!(
                    "deployment failed: {}",
                    result.error.as_deref().unwrap_or("unknown error")
                );
            }
            self.state.deploy.finish(result);
            self.jump_to(Phase::Complete);
        }
    }

    pub fn handle_message(&mut self, message: AppMessage) {
        match message {
            AppMessage::GithubFetched(import) => self.on_github_fetched(import),
        }
    }

    /// Record what the lookup found and, if the user is still on SSH, move on.
    fn on_github_fetched(&mut self, import: GithubImport) {
        self.state.apply_github_import(import);
        if self.state.phase == Phase::Ssh {
            self.advance();
        }
    }
}
