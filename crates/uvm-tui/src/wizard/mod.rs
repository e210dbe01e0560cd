//! Interactive provisioning wizard.
//!
//! Ten phases from target selection to the deployment result. Each phase is a
//! [`handler::PhaseHandler`]; [`app::App`] routes keys to the current one,
//! performs the [`handler::Command`]s they return and polls background work.

pub mod app;
pub mod handler;
pub mod phase;
pub mod phases;
pub mod state;
pub mod ui;

pub use app::{App, AppDeps, AppMessage, AppOutcome};
pub use handler::{Command, FieldCount, PhaseHandler, PhaseRegistry};
pub use phase::Phase;
pub use state::WizardState;

use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io::{self, IsTerminal};
use std::time::Duration;
use uvm_core::UvmError;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Run the wizard until the user quits.
pub fn run(app: &mut App) -> Result<()> {
    if !io::stdout().is_terminal() {
        return Err(UvmError::NoTty.into());
    }

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = event_loop(&mut terminal, app);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn event_loop(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>, app: &mut App) -> Result<()> {
    loop {
        terminal.draw(|f| ui::draw(f, app))?;

        if event::poll(POLL_INTERVAL)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press && app.handle_key(key) == AppOutcome::Quit {
                    return Ok(());
                }
            }
        }

        app.tick();
    }
}

/// Render every phase as text, in order.
pub fn dump_all_phases(app: &mut App) -> String {
    let mut out = String::new();
    for phase in Phase::all() {
        app.jump_to(*phase);
        out.push_str(&ui::dump_phase(app));
        out.push('\n');
    }
    out
}
