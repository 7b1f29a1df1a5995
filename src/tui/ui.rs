use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
};

use super::app::{Field, InputMode, SettingsApp};
use super::views::draw_settings;

/// Main draw function: header, the settings form, footer and overlays
pub fn draw(frame: &mut Frame, app: &SettingsApp) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(10),   // Form
            Constraint::Length(3), // Status/help bar
        ])
        .split(frame.area());

    draw_header(frame, app, chunks[0]);
    draw_settings(frame, app, chunks[1]);
    draw_footer(frame, app, chunks[2]);

    if app.show_help {
        draw_help_overlay(frame);
    }
}

fn draw_header(frame: &mut Frame, app: &SettingsApp, area: Rect) {
    let mut spans = vec![Span::styled(
        format!(" {} ", app.config_path.display()),
        Style::default().fg(Color::DarkGray),
    )];
    if app.is_modified() {
        spans.push(Span::styled(
            "[modified]",
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        ));
    }

    let header = Paragraph::new(Line::from(spans))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" HydrateMe - Settings "),
        )
        .style(Style::default().fg(Color::White));

    frame.render_widget(header, area);
}

fn draw_footer(frame: &mut Frame, app: &SettingsApp, area: Rect) {
    let help_text = if app.input_mode == InputMode::EditingPath {
        "[Enter] Confirm  [Esc] Cancel"
    } else {
        match app.field {
            Field::Interval => "[←/→] ±1  [PgUp/PgDn] ±10  [s] Save  [t] Test  [?] Help  [q] Quit",
            Field::Sound => "[Space] Toggle  [s] Save  [t] Test  [?] Help  [q] Quit",
            Field::CustomSound => "[Enter] Browse  [e] Type path  [c] Clear  [s] Save  [?] Help  [q] Quit",
        }
    };

    let status = if let Some(msg) = &app.status_message {
        Line::from(vec![
            Span::styled(msg, Style::default().fg(Color::Green)),
            Span::raw("  |  "),
            Span::styled(help_text, Style::default().fg(Color::DarkGray)),
        ])
    } else {
        Line::from(Span::styled(
            help_text,
            Style::default().fg(Color::DarkGray),
        ))
    };

    let footer = Paragraph::new(status).block(Block::default().borders(Borders::ALL));

    frame.render_widget(footer, area);
}

fn draw_help_overlay(frame: &mut Frame) {
    let area = centered_rect(60, 70, frame.area());

    let heading = |text: &'static str| {
        Line::from(Span::styled(
            text,
            Style::default().add_modifier(Modifier::BOLD),
        ))
    };

    let help_text = vec![
        Line::from(Span::styled(
            "HydrateMe - Help",
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        heading("Anywhere"),
        Line::from("  Tab/↓/j  - Next field"),
        Line::from("  S-Tab/↑/k - Previous field"),
        Line::from("  s        - Save and apply to the running reminder"),
        Line::from("  t        - Test reminder now"),
        Line::from("  q/Esc    - Quit (unsaved changes are discarded)"),
        Line::from("  ?        - Toggle this help"),
        Line::from(""),
        heading("Interval"),
        Line::from("  ←/→      - One minute less/more"),
        Line::from("  PgDn/PgUp - Ten minutes less/more"),
        Line::from(""),
        heading("Sound"),
        Line::from("  Space    - Turn the reminder sound on/off"),
        Line::from(""),
        heading("Custom sound"),
        Line::from("  Enter    - Choose a file (ogg, wav, flac)"),
        Line::from("  e        - Type a path"),
        Line::from("  c        - Back to the default sound"),
        Line::from(""),
        Line::from(Span::styled(
            "Press any key to close",
            Style::default().fg(Color::DarkGray),
        )),
    ];

    let help = Paragraph::new(help_text)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Help ")
                .style(Style::default().fg(Color::Cyan)),
        )
        .wrap(Wrap { trim: false });

    frame.render_widget(Clear, area);
    frame.render_widget(help, area);
}

/// Helper to create a centered rectangle
pub fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
