use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Gauge, Paragraph},
};

use crate::preferences::ReminderInterval;
use crate::tui::app::{Field, InputMode, SettingsApp};
use crate::tui::ui::centered_rect;

pub fn draw_settings(frame: &mut Frame, app: &SettingsApp, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Interval gauge
            Constraint::Min(6),    // Fields
        ])
        .split(area);

    let minutes = app.draft.interval.minutes();
    let ratio = f64::from(minutes - ReminderInterval::MIN)
        / f64::from(ReminderInterval::MAX - ReminderInterval::MIN);
    let gauge = Gauge::default()
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Remind me every "),
        )
        .gauge_style(Style::default().fg(Color::Cyan))
        .ratio(ratio.clamp(0.0, 1.0))
        .label(format!("{minutes} min"));
    frame.render_widget(gauge, chunks[0]);

    let label_style = |field: Field| -> Style {
        if app.field == field {
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::White)
        }
    };
    let marker = |field: Field| if app.field == field { "▶ " } else { "  " };

    let sound_value = if app.draft.sound_enabled {
        Span::styled("[x] On", Style::default().fg(Color::Green))
    } else {
        Span::styled("[ ] Off", Style::default().fg(Color::DarkGray))
    };

    let custom_value = match app.draft.custom_sound() {
        Some(path) => Span::raw(path.display().to_string()),
        None => Span::styled("Default sound", Style::default().fg(Color::DarkGray)),
    };

    let lines = vec![
        Line::from(""),
        Line::from(vec![
            Span::styled(
                format!("{}Interval:      ", marker(Field::Interval)),
                label_style(Field::Interval),
            ),
            Span::raw(format!(
                "{minutes} minutes  ({}-{})",
                ReminderInterval::MIN,
                ReminderInterval::MAX
            )),
        ]),
        Line::from(""),
        Line::from(vec![
            Span::styled(
                format!("{}Play sound:    ", marker(Field::Sound)),
                label_style(Field::Sound),
            ),
            sound_value,
        ]),
        Line::from(""),
        Line::from(vec![
            Span::styled(
                format!("{}Custom sound:  ", marker(Field::CustomSound)),
                label_style(Field::CustomSound),
            ),
            custom_value,
        ]),
    ];

    let form = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title(" Preferences "),
    );
    frame.render_widget(form, chunks[1]);

    if app.input_mode == InputMode::EditingPath {
        draw_path_dialog(frame, app);
    }
}

fn draw_path_dialog(frame: &mut Frame, app: &SettingsApp) {
    let area = centered_rect(70, 20, frame.area());

    let text = vec![
        Line::from(""),
        Line::from(Span::styled(
            format!("  {}_", app.path_input),
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(Span::styled(
            "  Empty path = default sound",
            Style::default().fg(Color::DarkGray),
        )),
    ];

    let dialog = Paragraph::new(text).block(
        Block::default()
            .borders(Borders::ALL)
            .title(" Sound file path ")
            .style(Style::default().fg(Color::Cyan)),
    );

    frame.render_widget(Clear, area);
    frame.render_widget(dialog, area);
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use ratatui::{Terminal, backend::TestBackend};

    use crate::preferences::Preferences;
    use crate::tui::app::SettingsApp;
    use crate::tui::ui;

    fn render(app: &SettingsApp) -> String {
        let mut terminal = Terminal::new(TestBackend::new(100, 24)).unwrap();
        terminal.draw(|f| ui::draw(f, app)).unwrap();
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[test]
    fn form_shows_the_current_values() {
        let prefs = Preferences {
            sound_enabled: false,
            custom_sound_path: "/home/me/drip.ogg".to_string(),
            ..Preferences::default()
        };
        let screen = render(&SettingsApp::new(prefs, PathBuf::from("/tmp/h.json")));

        assert!(screen.contains("30 minutes"));
        assert!(screen.contains("[ ] Off"));
        assert!(screen.contains("/home/me/drip.ogg"));
        assert!(!screen.contains("[modified]"));
    }

    #[test]
    fn empty_custom_sound_reads_as_default() {
        let screen = render(&SettingsApp::new(
            Preferences::default(),
            PathBuf::from("/tmp/h.json"),
        ));
        assert!(screen.contains("Default sound"));
    }
}
