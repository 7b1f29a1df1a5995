//! What happens when a reminder comes due.
//!
//! ```text
//! CountingDown ──due──▶ locked?   ──yes──▶ notify + sound ──────────────▶ CountingDown
//!                                 └─no───▶ sound + modal ──ack──────────▶ CountingDown
//!                                          (sound again every 10s until ack)
//! ```
//!
//! The presenter owns the state; the countdown itself lives in
//! [`ReminderScheduler`], which the presenter restarts once a cycle resolves.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use crate::error::Result;
use crate::lock_state::LockStateOracle;
use crate::notification::Notifier;
use crate::preferences::Preferences;
use crate::scheduler::ReminderScheduler;
use crate::sound::{SoundPlayer, reminder_sound};

pub const REPEAT_SOUND_PERIOD: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReminderState {
    #[default]
    Idle,
    CountingDown,
    Presenting,
}

/// The blocking "time to drink" dialog. Opening returns immediately; the
/// user's acknowledgment comes back later as an event.
pub trait ReminderModal {
    fn open(&mut self) -> Result<()>;
}

/// How a due reminder was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presentation {
    /// Screen locked: notification sent, countdown already restarted.
    Notified,
    /// Modal is up, waiting for the user.
    AwaitingAck,
    /// The modal could not be shown; countdown restarted so reminders continue.
    ModalFailed,
    /// A reminder was already on screen.
    AlreadyPresenting,
}

pub struct ReminderPresenter {
    oracle: Box<dyn LockStateOracle>,
    notifier: Box<dyn Notifier>,
    player: Box<dyn SoundPlayer>,
    modal: Box<dyn ReminderModal>,
    bundled_sound: PathBuf,
    state: ReminderState,
    next_repeat: Option<Instant>,
}

impl ReminderPresenter {
    pub fn new(
        oracle: Box<dyn LockStateOracle>,
        notifier: Box<dyn Notifier>,
        player: Box<dyn SoundPlayer>,
        modal: Box<dyn ReminderModal>,
        bundled_sound: PathBuf,
    ) -> Self {
        Self {
            oracle,
            notifier,
            player,
            modal,
            bundled_sound,
            state: ReminderState::Idle,
            next_repeat: None,
        }
    }

    pub fn state(&self) -> ReminderState {
        self.state
    }

    /// When the next repeat nudge is due, while a modal is up.
    pub fn repeat_deadline(&self) -> Option<Instant> {
        self.next_repeat
    }

    /// Starts a full interval from `now` and returns to `CountingDown`.
    pub fn resume(&mut self, now: Instant, prefs: &Preferences, scheduler: &mut ReminderScheduler) {
        scheduler.restart(now, prefs.interval.duration());
        self.state = ReminderState::CountingDown;
        self.next_repeat = None;
    }

    pub fn on_due(
        &mut self,
        now: Instant,
        prefs: &Preferences,
        scheduler: &mut ReminderScheduler,
    ) -> Presentation {
        if self.state == ReminderState::Presenting {
            tracing::info!("reminder already on screen, ignoring");
            return Presentation::AlreadyPresenting;
        }
        scheduler.stop();

        let locked = self.oracle.is_locked().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "could not get lock status, assuming unlocked");
            false
        });

        if locked {
            if let Err(e) = self.notifier.notify_reminder() {
                tracing::warn!(error = %e, "failed to send reminder notification");
            }
            self.trigger_sound(prefs);
            self.resume(now, prefs, scheduler);
            tracing::info!("screen locked, reminder sent as notification");
            return Presentation::Notified;
        }

        self.trigger_sound(prefs);
        match self.modal.open() {
            Ok(()) => {
                self.state = ReminderState::Presenting;
                self.next_repeat = Some(now + REPEAT_SOUND_PERIOD);
                tracing::info!("reminder dialog shown");
                Presentation::AwaitingAck
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to show reminder dialog");
                self.resume(now, prefs, scheduler);
                Presentation::ModalFailed
            }
        }
    }

    /// Plays the repeat nudge if one is due. Returns true when it fired.
    pub fn poll_repeat(&mut self, now: Instant, prefs: &Preferences) -> bool {
        match self.next_repeat {
            Some(deadline) if now >= deadline => {
                self.trigger_sound(prefs);
                let next = deadline + REPEAT_SOUND_PERIOD;
                // A late wake-up must not turn into a burst of sounds.
                self.next_repeat = Some(if next > now { next } else { now + REPEAT_SOUND_PERIOD });
                true
            }
            _ => false,
        }
    }

    /// The user pressed "I drank water". Returns false if nothing was on screen.
    pub fn acknowledge(
        &mut self,
        now: Instant,
        prefs: &Preferences,
        scheduler: &mut ReminderScheduler,
    ) -> bool {
        if self.state != ReminderState::Presenting {
            tracing::debug!(state = ?self.state, "acknowledgment with no reminder on screen");
            return false;
        }
        self.resume(now, prefs, scheduler);
        tracing::info!("reminder acknowledged");
        true
    }

    /// The modal came back without ever reaching the user, e.g. no dialog
    /// backend is installed. The reminder goes out as a notification instead
    /// and the countdown restarts, as on a locked screen. Returns false if
    /// nothing was on screen.
    pub fn modal_unavailable(
        &mut self,
        now: Instant,
        prefs: &Preferences,
        scheduler: &mut ReminderScheduler,
    ) -> bool {
        if self.state != ReminderState::Presenting {
            tracing::debug!(state = ?self.state, "modal report with no reminder on screen");
            return false;
        }
        tracing::warn!("reminder dialog could not be shown, falling back to a notification");
        if let Err(e) = self.notifier.notify_reminder() {
            tracing::warn!(error = %e, "failed to send reminder notification");
        }
        self.resume(now, prefs, scheduler);
        true
    }

    fn trigger_sound(&self, prefs: &Preferences) {
        if !prefs.sound_enabled {
            return;
        }
        let file = reminder_sound(prefs, &self.bundled_sound);
        if let Err(e) = self.player.play(&file) {
            tracing::warn!(error = %e, "failed to play reminder sound");
        }
    }
}
