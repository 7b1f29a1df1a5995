//! Error types for hydrateme.
//!
//! Almost nothing here is fatal: most of these are logged at the call site and
//! the reminder cycle carries on. The binary only turns an error into a non-zero
//! exit status for startup failures (unreadable lock file, no event loop).

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum HydrateError {
    // ─────────────────────────────────────────────────────────────────────
    // Filesystem / configuration
    // ─────────────────────────────────────────────────────────────────────
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Preferences file malformed: {path}: {details}")]
    PreferencesMalformed { path: PathBuf, details: String },

    #[error("Could not serialize preferences: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Could not determine the {0} directory")]
    DirectoryUnavailable(&'static str),

    // ─────────────────────────────────────────────────────────────────────
    // Desktop services
    // ─────────────────────────────────────────────────────────────────────
    #[error("Session bus query failed: {0}")]
    SessionBus(#[from] zbus::Error),

    #[error("Notification dispatch failed: {0}")]
    Notification(#[from] notify_rust::error::Error),

    #[error("Failed to launch {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("No terminal emulator could be started for the settings editor")]
    NoTerminal,

    #[error("Tray icon unavailable: {0}")]
    Tray(#[from] tray_icon::Error),

    #[error("Tray menu error: {0}")]
    Menu(#[from] tray_icon::menu::Error),

    #[error("Invalid tray icon image: {0}")]
    Icon(#[from] tray_icon::BadIcon),

    // ─────────────────────────────────────────────────────────────────────
    // Instance coordination
    // ─────────────────────────────────────────────────────────────────────
    #[error("Failed to signal process {pid}: {source}")]
    Signal {
        pid: u32,
        #[source]
        source: std::io::Error,
    },

    #[error("HydrateMe is not running")]
    NotRunning,
}

impl HydrateError {
    /// Builds a `map_err` adapter that wraps an I/O error with context.
    pub fn io(context: impl Into<String>) -> impl FnOnce(std::io::Error) -> Self {
        let context = context.into();
        move |source| HydrateError::Io { context, source }
    }
}

pub type Result<T> = std::result::Result<T, HydrateError>;
