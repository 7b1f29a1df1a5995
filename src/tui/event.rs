use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use super::app::{Field, InputMode, Message, SettingsApp};

/// Map key events to messages based on current app state
pub fn handle_key(key: KeyEvent, app: &SettingsApp) -> Option<Message> {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return Some(Message::Quit);
    }

    // If help is shown, any key closes it
    if app.show_help {
        return Some(Message::ToggleHelp);
    }

    if app.input_mode == InputMode::EditingPath {
        return match key.code {
            KeyCode::Enter => Some(Message::ConfirmPath),
            KeyCode::Esc => Some(Message::CancelPath),
            KeyCode::Backspace => Some(Message::PathBackspace),
            KeyCode::Char(c) => Some(Message::PathInput(c)),
            _ => None,
        };
    }

    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => return Some(Message::Quit),
        KeyCode::Char('?') => return Some(Message::ToggleHelp),
        KeyCode::Char('s') | KeyCode::Char('S') => return Some(Message::Save),
        KeyCode::Char('t') | KeyCode::Char('T') => return Some(Message::TestReminder),
        KeyCode::Tab | KeyCode::Down | KeyCode::Char('j') => return Some(Message::NextField),
        KeyCode::BackTab | KeyCode::Up | KeyCode::Char('k') => return Some(Message::PrevField),
        _ => {}
    }

    match app.field {
        Field::Interval => handle_interval_keys(key),
        Field::Sound => match key.code {
            KeyCode::Char(' ') | KeyCode::Enter => Some(Message::ToggleSound),
            _ => None,
        },
        Field::CustomSound => match key.code {
            KeyCode::Enter => Some(Message::PickSound),
            KeyCode::Char('e') | KeyCode::Char('E') => Some(Message::EditPath),
            KeyCode::Char('c') | KeyCode::Char('C') | KeyCode::Delete => Some(Message::ClearSound),
            _ => None,
        },
    }
}

fn handle_interval_keys(key: KeyEvent) -> Option<Message> {
    match key.code {
        KeyCode::Left | KeyCode::Char('h') | KeyCode::Char('-') => Some(Message::AdjustInterval(-1)),
        KeyCode::Right | KeyCode::Char('l') | KeyCode::Char('+') => Some(Message::AdjustInterval(1)),
        KeyCode::PageUp => Some(Message::AdjustInterval(10)),
        KeyCode::PageDown => Some(Message::AdjustInterval(-10)),
        _ => None,
    }
}
