//! The `uvm` binary: parses the command line, sets up logging and settings,
//! then either launches the wizard or runs a scripted subcommand.

pub mod cli;
pub mod commands;

use anyhow::Result;
use clap::Parser;
use std::io;
use uvm_core::profile::ProfileStore;
use uvm_core::settings::Settings;
use uvm_tui::keymap::Keymap;
use uvm_tui::wizard::{self, App, AppDeps};

pub fn run() -> Result<()> {
    let cli = cli::Cli::parse();
    run_with(cli)
}

pub fn run_with(cli: cli::Cli) -> Result<()> {
    let settings = Settings::load(cli.config.as_deref())?;
    uvm_core::logging::init_with(cli.log_file.clone().or_else(|| settings.log_file.clone()));
    log::info!("uvm {} starting", env!("CARGO_PKG_VERSION"));

    let store = ProfileStore::new(&settings.profiles_dir);
    let mut stdout = io::stdout();
    match &cli.command {
        Some(cli::Command::Profiles { action }) => {
            return commands::profiles(&store, action, &mut stdout);
        }
        Some(cli::Command::Generate { profile, output }) => {
            log::info!("running headless generate for {}", profile);
            commands::generate(&settings, &store, profile, output.clone(), &mut stdout)?;
            return Ok(());
        }
        // No subcommand = launch the wizard (default)
        None => {}
    }

    let deps = AppDeps::from_settings(&settings)?;
    let keymap = Keymap::from_settings(&settings);
    let mut app = App::new(settings, keymap, deps);

    if cli.dump_tui {
        print!("{}", wizard::dump_all_phases(&mut app));
        return Ok(());
    }

    if let Some(name) = cli.profile.as_deref() {
        app.load_profile(name)?;
        log::info!("resuming profile {} at review", name);
    }

    log::info!("launching wizard");
    wizard::run(&mut app)
}
