use super::content::{build_info_panel, status_message};
use super::sidebar::build_phase_sidebar;
use crate::wizard::app::App;
use crate::wizard::state::StatusKind;
use ratatui::{
    layout::{Constraint, Direction, Layout},
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, List, ListItem, Paragraph},
    Frame,
};

pub fn draw(f: &mut Frame, app: &App) {
    // Title | Body | Progress | Keys
    let main_chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints(
            [
                Constraint::Length(3),
                Constraint::Min(10),
                Constraint::Length(3),
                Constraint::Length(4),
            ]
            .as_ref(),
        )
        .split(f.area());

    let target = app.state.data.target.title();
    let title_line = Line::from(vec![
        Span::styled("Ubuntu VM Provisioner", Style::default().fg(Color::White)),
        Span::raw(" | "),
        Span::styled(target, Style::default().fg(Color::Cyan)),
    ]);
    f.render_widget(
        Block::default().borders(Borders::ALL).title(title_line),
        main_chunks[0],
    );

    // Sidebar | Content | Info
    let body_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(
            [
                Constraint::Percentage(20),
                Constraint::Percentage(55),
                Constraint::Percentage(25),
            ]
            .as_ref(),
        )
        .split(main_chunks[1]);

    let sidebar = Paragraph::new(build_phase_sidebar(app.state.phase))
        .block(Block::default().borders(Borders::ALL).title("Steps"));
    f.render_widget(sidebar, body_chunks[0]);

    let items = app
        .view()
        .into_iter()
        .map(ListItem::new)
        .collect::<Vec<_>>();
    let content = List::new(items).block(
        Block::default()
            .borders(Borders::ALL)
            .title(app.state.phase.title()),
    );
    f.render_widget(content, body_chunks[1]);

    let info = Paragraph::new(build_info_panel(app))
        .block(Block::default().borders(Borders::ALL).title("Info"));
    f.render_widget(info, body_chunks[2]);

    let gauge_color = match &app.state.deploy.result {
        Some(result) if !result.success => Color::Red,
        Some(_) => Color::Green,
        None => Color::Yellow,
    };
    let gauge = Gauge::default()
        .block(Block::default().borders(Borders::ALL).title("Progress"))
        .gauge_style(Style::default().fg(gauge_color))
        .percent(app.state.deploy.percent());
    f.render_widget(gauge, main_chunks[2]);

    let status_style = match app.state.status.as_ref().map(|s| s.kind) {
        Some(StatusKind::Error) => Style::default().fg(Color::Red),
        Some(StatusKind::Warning) => Style::default().fg(Color::Yellow),
        _ => Style::default(),
    };
    let legend = Paragraph::new(vec![
        Line::styled(status_message(app), status_style),
        Line::raw(app.key_help()),
    ])
    .block(Block::default().borders(Borders::ALL).title("Keys"));
    f.render_widget(legend, main_chunks[3]);
}
