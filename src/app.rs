//! The application context: preferences, countdown and presenter, driven by
//! explicit events instead of toolkit callbacks.

use std::time::Instant;

use crate::preferences::{PreferenceStore, Preferences};
use crate::presenter::{ReminderPresenter, ReminderState};
use crate::scheduler::ReminderScheduler;
use crate::wake::WakeSignal;

/// Everything the outside world can ask of the running instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEvent {
    SettingsRequested,
    QuitRequested,
    AckReceived,
    /// The reminder dialog returned without reaching the user.
    ModalUnavailable,
    /// "Test Reminder": present as if the countdown had just expired.
    ReminderRequested,
    /// The preferences file changed; reload and reapply.
    PreferencesChanged,
}

impl From<WakeSignal> for AppEvent {
    fn from(signal: WakeSignal) -> Self {
        match signal {
            WakeSignal::ShowSettings => AppEvent::SettingsRequested,
            WakeSignal::ReloadPreferences => AppEvent::PreferencesChanged,
            WakeSignal::RemindNow => AppEvent::ReminderRequested,
        }
    }
}

/// What the UI layer should do after an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    OpenSettings,
    Quit,
}

pub struct AppContext {
    store: PreferenceStore,
    prefs: Preferences,
    scheduler: ReminderScheduler,
    presenter: ReminderPresenter,
}

impl AppContext {
    /// Loads preferences from `store` once and starts out idle.
    pub fn new(store: PreferenceStore, presenter: ReminderPresenter) -> Self {
        let prefs = store.load();
        Self::with_preferences(store, prefs, presenter)
    }

    pub fn with_preferences(
        store: PreferenceStore,
        prefs: Preferences,
        presenter: ReminderPresenter,
    ) -> Self {
        Self {
            store,
            prefs,
            scheduler: ReminderScheduler::new(),
            presenter,
        }
    }

    pub fn preferences(&self) -> &Preferences {
        &self.prefs
    }

    pub fn state(&self) -> ReminderState {
        self.presenter.state()
    }

    pub fn scheduler(&self) -> &ReminderScheduler {
        &self.scheduler
    }

    /// Leaves `Idle` by starting the first countdown.
    pub fn start(&mut self, now: Instant) {
        tracing::info!(
            interval = self.prefs.interval.minutes(),
            sound = self.prefs.sound_enabled,
            "reminders started"
        );
        self.apply_timer(now);
    }

    /// Restarts the countdown with the configured interval.
    pub fn apply_timer(&mut self, now: Instant) {
        self.presenter.resume(now, &self.prefs, &mut self.scheduler);
    }

    pub fn handle(&mut self, event: AppEvent, now: Instant) -> Flow {
        tracing::debug!(?event, "handling event");
        match event {
            AppEvent::SettingsRequested => Flow::OpenSettings,
            AppEvent::QuitRequested => {
                tracing::info!("quit requested");
                Flow::Quit
            }
            AppEvent::AckReceived => {
                self.presenter
                    .acknowledge(now, &self.prefs, &mut self.scheduler);
                Flow::Continue
            }
            AppEvent::ModalUnavailable => {
                self.presenter
                    .modal_unavailable(now, &self.prefs, &mut self.scheduler);
                Flow::Continue
            }
            AppEvent::ReminderRequested => {
                self.presenter.on_due(now, &self.prefs, &mut self.scheduler);
                Flow::Continue
            }
            AppEvent::PreferencesChanged => {
                self.reload(now);
                Flow::Continue
            }
        }
    }

    /// Advances timers to `now`: fires a due reminder and any repeat nudge.
    pub fn tick(&mut self, now: Instant) {
        if self.scheduler.poll_due(now) {
            self.presenter.on_due(now, &self.prefs, &mut self.scheduler);
        }
        self.presenter.poll_repeat(now, &self.prefs);
    }

    /// The earliest instant at which [`tick`](Self::tick) has work to do.
    pub fn next_deadline(&self) -> Option<Instant> {
        match (self.scheduler.deadline(), self.presenter.repeat_deadline()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Progress toward the next reminder, `1.0` while one is on screen.
    pub fn progress(&self, now: Instant) -> f32 {
        match self.state() {
            ReminderState::Presenting => 1.0,
            _ => self.scheduler.elapsed_fraction(now).unwrap_or(0.0),
        }
    }

    fn reload(&mut self, now: Instant) {
        let prefs = self.store.load();
        if prefs == self.prefs {
            tracing::debug!("preferences unchanged");
        }
        self.prefs = prefs;
        tracing::info!(
            interval = self.prefs.interval.minutes(),
            sound = self.prefs.sound_enabled,
            "preferences reloaded"
        );
        // A reminder on screen picks the new interval up when acknowledged.
        if self.state() != ReminderState::Presenting {
            self.apply_timer(now);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::time::Duration;

    use super::*;
    use crate::preferences::ReminderInterval;
    use crate::presenter::REPEAT_SOUND_PERIOD;
    use crate::presenter::testing::{Log, log, presenter};
    use tempfile::tempdir;

    const MINUTE: Duration = Duration::from_secs(60);

    fn context(screen_locked: Option<bool>, minutes: i64) -> (Log, AppContext) {
        let log = log(screen_locked);
        let prefs = Preferences {
            interval: ReminderInterval::clamped(minutes),
            ..Preferences::default()
        };
        let ctx = AppContext::with_preferences(
            PreferenceStore::new(PathBuf::from("/nonexistent/hydrateme.json")),
            prefs,
            presenter(&log),
        );
        (log, ctx)
    }

    #[test]
    fn every_valid_interval_comes_due_after_exactly_that_many_minutes() {
        for minutes in 1..=240u32 {
            let (log, mut ctx) = context(Some(false), i64::from(minutes));
            let t0 = Instant::now();
            ctx.start(t0);
            assert_eq!(ctx.state(), ReminderState::CountingDown);

            let interval = MINUTE * minutes;
            ctx.tick(t0 + interval - Duration::from_millis(1));
            assert_eq!(log.borrow().modals, 0, "{minutes} min fired early");

            ctx.tick(t0 + interval);
            assert_eq!(log.borrow().modals, 1, "{minutes} min did not fire");
            assert_eq!(ctx.state(), ReminderState::Presenting);
        }
    }

    #[test]
    fn locked_due_sends_one_notification_and_keeps_counting() {
        let (log, mut ctx) = context(Some(true), 30);
        let t0 = Instant::now();
        ctx.start(t0);

        let due_at = t0 + 30 * MINUTE;
        ctx.tick(due_at);

        let calls = log.borrow();
        assert_eq!(calls.notifications, 1);
        assert!(calls.sounds.len() <= 1);
        assert_eq!(calls.modals, 0);
        assert_eq!(ctx.state(), ReminderState::CountingDown);
        assert_eq!(ctx.scheduler().deadline(), Some(due_at + 30 * MINUTE));
    }

    #[test]
    fn unlocked_ack_after_25s_hears_two_repeats_then_full_interval() {
        let (log, mut ctx) = context(Some(false), 30);
        let t0 = Instant::now();
        ctx.start(t0);

        let due_at = t0 + 30 * MINUTE;
        ctx.tick(due_at);
        assert_eq!(log.borrow().sounds.len(), 1);

        // Drive the loop the way the event loop would: wake at each deadline.
        let ack_at = due_at + Duration::from_secs(25);
        while let Some(next) = ctx.next_deadline().filter(|next| *next < ack_at) {
            ctx.tick(next);
        }
        assert_eq!(log.borrow().sounds.len(), 3, "initial sound plus repeats at 10s and 20s");

        assert_eq!(ctx.handle(AppEvent::AckReceived, ack_at), Flow::Continue);
        assert_eq!(ctx.state(), ReminderState::CountingDown);
        assert_eq!(ctx.scheduler().deadline(), Some(ack_at + 30 * MINUTE));

        ctx.tick(due_at + 3 * REPEAT_SOUND_PERIOD);
        assert_eq!(log.borrow().sounds.len(), 3);
    }

    #[test]
    fn missing_dialog_still_reminds_through_a_notification() {
        let (log, mut ctx) = context(Some(false), 30);
        let t0 = Instant::now();
        ctx.start(t0);

        let due_at = t0 + 30 * MINUTE;
        ctx.tick(due_at);
        assert_eq!(ctx.state(), ReminderState::Presenting);

        let back_at = due_at + Duration::from_millis(50);
        assert_eq!(ctx.handle(AppEvent::ModalUnavailable, back_at), Flow::Continue);
        assert_eq!(log.borrow().notifications, 1);
        assert_eq!(log.borrow().sounds.len(), 1);
        assert_eq!(ctx.state(), ReminderState::CountingDown);
        assert_eq!(ctx.scheduler().deadline(), Some(back_at + 30 * MINUTE));

        // No repeat nudges once the reminder went out as a notification.
        ctx.tick(due_at + 3 * REPEAT_SOUND_PERIOD);
        assert_eq!(log.borrow().sounds.len(), 1);
    }

    #[test]
    fn next_deadline_prefers_the_repeat_nudge_while_presenting() {
        let (_log, mut ctx) = context(Some(false), 30);
        let t0 = Instant::now();
        ctx.start(t0);
        assert_eq!(ctx.next_deadline(), Some(t0 + 30 * MINUTE));

        ctx.handle(AppEvent::ReminderRequested, t0);
        assert_eq!(ctx.next_deadline(), Some(t0 + REPEAT_SOUND_PERIOD));
        assert_eq!(ctx.progress(t0), 1.0);
    }

    #[test]
    fn test_reminder_presents_immediately_and_only_once() {
        let (log, mut ctx) = context(Some(false), 30);
        let t0 = Instant::now();
        ctx.start(t0);

        ctx.handle(AppEvent::ReminderRequested, t0 + MINUTE);
        ctx.handle(AppEvent::ReminderRequested, t0 + MINUTE);
        assert_eq!(log.borrow().modals, 1);
        assert!(!ctx.scheduler().is_active());
    }

    #[test]
    fn settings_and_quit_are_routed_to_the_ui() {
        let (_log, mut ctx) = context(Some(false), 30);
        let now = Instant::now();
        assert_eq!(ctx.handle(AppEvent::SettingsRequested, now), Flow::OpenSettings);
        assert_eq!(ctx.handle(AppEvent::QuitRequested, now), Flow::Quit);
    }

    #[test]
    fn wake_signals_map_to_events() {
        assert_eq!(
            AppEvent::from(WakeSignal::ShowSettings),
            AppEvent::SettingsRequested
        );
        assert_eq!(
            AppEvent::from(WakeSignal::ReloadPreferences),
            AppEvent::PreferencesChanged
        );
        assert_eq!(
            AppEvent::from(WakeSignal::RemindNow),
            AppEvent::ReminderRequested
        );
    }

    #[test]
    fn reload_applies_the_saved_interval() {
        let dir = tempdir().unwrap();
        let store = PreferenceStore::new(dir.path().join("hydrateme.json"));
        let log = log(Some(false));
        let mut ctx = AppContext::new(store.clone(), presenter(&log));
        let t0 = Instant::now();
        ctx.start(t0);
        assert_eq!(ctx.scheduler().deadline(), Some(t0 + 30 * MINUTE));

        store
            .save(&Preferences {
                interval: ReminderInterval::clamped(5),
                sound_enabled: false,
                custom_sound_path: String::new(),
            })
            .unwrap();

        let later = t0 + 2 * MINUTE;
        ctx.handle(AppEvent::PreferencesChanged, later);
        assert_eq!(ctx.preferences().interval.minutes(), 5);
        assert!(!ctx.preferences().sound_enabled);
        assert_eq!(ctx.scheduler().deadline(), Some(later + 5 * MINUTE));
    }

    #[test]
    fn reload_during_a_reminder_waits_for_the_ack() {
        let dir = tempdir().unwrap();
        let store = PreferenceStore::new(dir.path().join("hydrateme.json"));
        let log = log(Some(false));
        let mut ctx = AppContext::new(store.clone(), presenter(&log));
        let t0 = Instant::now();
        ctx.start(t0);
        ctx.handle(AppEvent::ReminderRequested, t0);

        store
            .save(&Preferences {
                interval: ReminderInterval::clamped(10),
                ..Preferences::default()
            })
            .unwrap();
        ctx.handle(AppEvent::PreferencesChanged, t0 + MINUTE);
        assert_eq!(ctx.state(), ReminderState::Presenting);
        assert!(!ctx.scheduler().is_active());

        let ack_at = t0 + 2 * MINUTE;
        ctx.handle(AppEvent::AckReceived, ack_at);
        assert_eq!(ctx.scheduler().deadline(), Some(ack_at + 10 * MINUTE));
    }
}
