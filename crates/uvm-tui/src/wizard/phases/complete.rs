use crate::wizard::handler::{Command, FieldCount, PhaseHandler};
use crate::wizard::state::WizardState;
use crossterm::event::{KeyCode, KeyEvent};

const SHOWN_LOGS: usize = 10;

pub struct CompletePhase;

impl PhaseHandler for CompletePhase {
    fn name(&self) -> &'static str {
        "complete"
    }

    fn init(&self, state: &mut WizardState) {
        state.focused_field = 0;
        state.focus(None);
    }

    fn update(&self, _state: &mut WizardState, key: KeyEvent) -> (bool, Option<Command>) {
        match key.code {
            KeyCode::Enter | KeyCode::Char('q') => (false, Some(Command::Quit)),
            KeyCode::Char('n') => (false, Some(Command::Restart)),
            _ => (false, None),
        }
    }

    fn view(&self, state: &WizardState) -> Vec<String> {
        let Some(result) = &state.deploy.result else {
            return vec!["No deployment has run.".to_string()];
        };
        let mut lines = Vec::new();
        if result.success {
            lines.push(format!(
                "✅ {} ready ({:.1}s)",
                state.data.machine_name(),
                result.duration.as_secs_f64()
            ));
        } else {
            lines.push("❌ Deployment failed".to_string());
            if let Some(error) = &result.error {
                lines.push(format!("   {}", error));
            }
        }
        if !result.outputs.is_empty() {
            lines.push(String::new());
            lines.push("Outputs:".to_string());
            for (key, value) in &result.outputs {
                lines.push(format!("  {}: {}", key, value));
            }
        }
        if !result.logs.is_empty() {
            lines.push(String::new());
            lines.push("Log:".to_string());
            let start = result.logs.len().saturating_sub(SHOWN_LOGS);
            for line in &result.logs[start..] {
                lines.push(format!("  {}", line));
            }
        }
        lines
    }

    fn save(&self, _state: &mut WizardState) {}

    fn field_count(&self, _state: &WizardState) -> FieldCount {
        FieldCount::Fixed(0)
    }

    fn key_help(&self) -> &'static str {
        "Enter/q: quit  n: start over"
    }
}
