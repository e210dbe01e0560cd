use super::content::{build_info_panel, status_message};
use crate::wizard::app::App;
use crate::wizard::phase::Phase;

/// Plain-text rendering of the current phase, for `--dump-tui` and tests.
pub fn dump_phase(app: &App) -> String {
    let body = app.view();
    let body = if body.is_empty() {
        "(no body content)".to_string()
    } else {
        body.join("\n")
    };
    format!(
        "PHASE: {} ({}/{})\n\n- Body:\n{}\n- Info:\n{}\n- Progress: {}%\n- Status: {}\n- Keys: {}\n",
        app.state.phase.title(),
        app.state.phase.number(),
        Phase::all().len(),
        body,
        build_info_panel(app),
        app.state.deploy.percent(),
        status_message(app),
        app.key_help()
    )
}
