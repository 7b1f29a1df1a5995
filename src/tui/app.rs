use std::path::{Path, PathBuf};

use crate::error::{HydrateError, Result};
use crate::instance;
use crate::preferences::{PreferenceStore, Preferences};
use crate::wake::WakeSignal;

/// Audio formats offered by the file picker.
pub const SOUND_EXTENSIONS: [&str; 3] = ["ogg", "wav", "flac"];

/// The form row that has focus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Field {
    #[default]
    Interval,
    Sound,
    CustomSound,
}

impl Field {
    fn next(self) -> Self {
        match self {
            Field::Interval => Field::Sound,
            Field::Sound => Field::CustomSound,
            Field::CustomSound => Field::Interval,
        }
    }

    fn prev(self) -> Self {
        match self {
            Field::Interval => Field::CustomSound,
            Field::Sound => Field::Interval,
            Field::CustomSound => Field::Sound,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RunningState {
    #[default]
    Running,
    Done,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum InputMode {
    #[default]
    Normal,
    EditingPath,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    Quit,
    NextField,
    PrevField,

    AdjustInterval(i32),
    ToggleSound,
    PickSound,
    ClearSound,

    // Typing a sound path by hand
    EditPath,
    PathInput(char),
    PathBackspace,
    ConfirmPath,
    CancelPath,

    Save,
    TestReminder,

    ToggleHelp,
}

/// Everything the editor does outside its own state.
pub trait SettingsBackend {
    fn save(&mut self, prefs: &Preferences) -> Result<()>;
    /// Signals the running instance, returning its PID.
    fn signal_instance(&mut self, signal: WakeSignal) -> Result<u32>;
    /// Asks the user for a sound file. `None` if they cancelled.
    fn pick_sound_file(&mut self, start_dir: Option<&Path>) -> Option<PathBuf>;
}

/// The real thing: preferences file, lock-file PID, native file picker.
pub struct LiveBackend {
    store: PreferenceStore,
    lock_file: PathBuf,
}

impl LiveBackend {
    pub fn new(store: PreferenceStore, lock_file: PathBuf) -> Self {
        Self { store, lock_file }
    }
}

impl SettingsBackend for LiveBackend {
    fn save(&mut self, prefs: &Preferences) -> Result<()> {
        self.store.save(prefs)
    }

    fn signal_instance(&mut self, signal: WakeSignal) -> Result<u32> {
        instance::request(&self.lock_file, signal)
    }

    fn pick_sound_file(&mut self, start_dir: Option<&Path>) -> Option<PathBuf> {
        let mut dialog = rfd::FileDialog::new()
            .set_title("Choose reminder sound")
            .add_filter("Sound files", &SOUND_EXTENSIONS);
        if let Some(dir) = start_dir.or(dirs::home_dir().as_deref()) {
            dialog = dialog.set_directory(dir);
        }
        dialog.pick_file()
    }
}

#[derive(Debug)]
pub struct SettingsApp {
    pub running_state: RunningState,
    pub field: Field,
    pub input_mode: InputMode,

    /// The form's current values.
    pub draft: Preferences,
    /// What is on disk.
    pub saved: Preferences,
    pub config_path: PathBuf,

    pub path_input: String,
    pub show_help: bool,
    pub status_message: Option<String>,
}

impl SettingsApp {
    pub fn new(prefs: Preferences, config_path: PathBuf) -> Self {
        Self {
            running_state: RunningState::Running,
            field: Field::default(),
            input_mode: InputMode::Normal,
            draft: prefs.clone(),
            saved: prefs,
            config_path,
            path_input: String::new(),
            show_help: false,
            status_message: None,
        }
    }

    pub fn is_modified(&self) -> bool {
        self.draft != self.saved
    }

    /// Label for the custom sound row.
    pub fn sound_label(&self) -> String {
        match self.draft.custom_sound() {
            Some(path) => path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string()),
            None => "Default sound".to_string(),
        }
    }

    pub fn update(&mut self, msg: Message, backend: &mut dyn SettingsBackend) {
        match msg {
            Message::Quit => {
                if self.is_modified() {
                    tracing::info!("settings editor closed with unsaved changes");
                }
                self.running_state = RunningState::Done;
            }
            Message::NextField => self.field = self.field.next(),
            Message::PrevField => self.field = self.field.prev(),

            Message::AdjustInterval(delta) => {
                self.draft.interval = self.draft.interval.step(delta);
                self.status_message = None;
            }
            Message::ToggleSound => {
                self.draft.sound_enabled = !self.draft.sound_enabled;
                self.status_message = None;
            }
            Message::PickSound => {
                let start_dir = self
                    .draft
                    .custom_sound()
                    .and_then(Path::parent)
                    .map(Path::to_path_buf);
                if let Some(path) = backend.pick_sound_file(start_dir.as_deref()) {
                    self.draft.custom_sound_path = path.to_string_lossy().into_owned();
                    self.status_message = Some(format!("Sound: {}", self.sound_label()));
                }
            }
            Message::ClearSound => {
                self.draft.custom_sound_path.clear();
                self.status_message = Some("Using the default sound".to_string());
            }

            Message::EditPath => {
                self.path_input = self.draft.custom_sound_path.clone();
                self.input_mode = InputMode::EditingPath;
            }
            Message::PathInput(c) => self.path_input.push(c),
            Message::PathBackspace => {
                self.path_input.pop();
            }
            Message::ConfirmPath => {
                self.draft.custom_sound_path = self.path_input.trim().to_string();
                self.path_input.clear();
                self.input_mode = InputMode::Normal;
                if let Some(path) = self.draft.custom_sound() {
                    if !path.exists() {
                        self.status_message = Some(format!("Warning: {} does not exist", path.display()));
                    }
                }
            }
            Message::CancelPath => {
                self.path_input.clear();
                self.input_mode = InputMode::Normal;
            }

            Message::Save => self.save(backend),
            Message::TestReminder => {
                self.status_message = Some(match backend.signal_instance(WakeSignal::RemindNow) {
                    Ok(pid) => format!("Reminder requested from HydrateMe (pid {pid})"),
                    Err(HydrateError::NotRunning) => "HydrateMe is not running".to_string(),
                    Err(e) => format!("Could not reach HydrateMe: {e}"),
                });
            }

            Message::ToggleHelp => self.show_help = !self.show_help,
        }
    }

    fn save(&mut self, backend: &mut dyn SettingsBackend) {
        if let Err(e) = backend.save(&self.draft) {
            tracing::error!(error = %e, "failed to save preferences");
            self.status_message = Some(format!("Save failed: {e}"));
            return;
        }
        self.saved = self.draft.clone();

        self.status_message = Some(match backend.signal_instance(WakeSignal::ReloadPreferences) {
            Ok(pid) => format!("Saved. HydrateMe (pid {pid}) is using the new settings"),
            Err(HydrateError::NotRunning) => {
                "Saved. HydrateMe is not running; settings apply on next start".to_string()
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to notify running instance");
                format!("Saved, but could not notify HydrateMe: {e}")
            }
        });
    }
}
