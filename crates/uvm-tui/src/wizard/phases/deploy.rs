use crate::widgets::{spinner_frame, text_bar};
use crate::wizard::handler::{Command, FieldCount, PhaseHandler};
use crate::wizard::state::WizardState;
use crossterm::event::KeyEvent;

const SHOWN_EVENTS: usize = 8;

/// Progress while the worker runs. Takes no input; the app moves on to
/// Complete when the result arrives.
pub struct DeployPhase;

impl PhaseHandler for DeployPhase {
    fn name(&self) -> &'static str {
        "deploy"
    }

    fn init(&self, state: &mut WizardState) {
        state.focused_field = 0;
        state.focus(None);
    }

    fn update(&self, _state: &mut WizardState, _key: KeyEvent) -> (bool, Option<Command>) {
        (false, None)
    }

    fn view(&self, state: &WizardState) -> Vec<String> {
        let deploy = &state.deploy;
        let mut lines = vec![
            format!(
                "{} Deploying {} to {}",
                spinner_frame(deploy.spinner_tick),
                state.data.machine_name(),
                state.data.target.title()
            ),
            text_bar(deploy.percent(), 30),
            String::new(),
        ];
        for event in deploy.last_events(SHOWN_EVENTS) {
            let mark = if event.is_error { "✗" } else { "•" };
            lines.push(format!("{} [{}] {}", mark, event.stage, event.message));
            if let Some(command) = &event.command {
                lines.push(format!("    $ {}", command));
            }
            if let Some(detail) = &event.detail {
                lines.push(format!("    {}", detail));
            }
        }
        lines
    }

    fn save(&self, _state: &mut WizardState) {}

    fn field_count(&self, _state: &WizardState) -> FieldCount {
        FieldCount::Fixed(0)
    }

    fn key_help(&self) -> &'static str {
        "Deployment in progress; it cannot be cancelled"
    }
}
