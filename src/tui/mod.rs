//! Terminal settings editor, opened from the tray or with `hydrateme settings`.

pub mod app;
pub mod event;
pub mod ui;
pub mod views;

use std::io;

use crossterm::{
    event::{Event, KeyEventKind, read},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};

use crate::paths::Paths;
use crate::preferences::PreferenceStore;
use app::{LiveBackend, RunningState, SettingsApp, SettingsBackend};

/// Main entry point for the settings editor
pub fn run_settings(paths: &Paths) -> io::Result<()> {
    let store = PreferenceStore::new(paths.config_file.clone());
    let mut app = SettingsApp::new(store.load(), paths.config_file.clone());
    let mut backend = LiveBackend::new(store, paths.lock_file.clone());

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;

    let result = run_app(&mut terminal, &mut app, &mut backend);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut SettingsApp,
    backend: &mut dyn SettingsBackend,
) -> io::Result<()> {
    loop {
        terminal.draw(|f| ui::draw(f, app))?;

        // Nothing changes on its own, so block until the next key.
        if let Event::Key(key) = read()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            if let Some(msg) = event::handle_key(key, app) {
                app.update(msg, backend);
            }
        }

        if app.running_state == RunningState::Done {
            return Ok(());
        }
    }
}
