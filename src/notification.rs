//! System notifications for reminders shown while the screen is locked

use notify_rust::{Notification, Timeout, Urgency};

use crate::error::Result;

pub const APP_TITLE: &str = "HydrateMe";
pub const REMINDER_BODY: &str = "Time to drink water!";
pub const DRANK_ACTION: &str = "drank";
pub const DRANK_LABEL: &str = "I Drank Water!";

pub trait Notifier {
    /// Posts the "time to drink" notification. Does not wait for the user.
    fn notify_reminder(&self) -> Result<()>;
}

/// Sends freedesktop notifications through the session's notification daemon.
#[derive(Debug, Default)]
pub struct DesktopNotifier;

impl DesktopNotifier {
    pub fn new() -> Self {
        Self
    }
}

impl Notifier for DesktopNotifier {
    fn notify_reminder(&self) -> Result<()> {
        let handle = Notification::new()
            .appname(APP_TITLE)
            .summary(APP_TITLE)
            .body(REMINDER_BODY)
            .icon("hydrateme")
            .action(DRANK_ACTION, DRANK_LABEL)
            .urgency(Urgency::Critical)
            .timeout(Timeout::Never)
            .show()?;
        tracing::info!(id = handle.id(), "reminder notification sent");
        Ok(())
    }
}
