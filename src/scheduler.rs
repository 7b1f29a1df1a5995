//! One-shot, restartable reminder countdown.
//!
//! The scheduler never repeats on its own: after it reports due it goes
//! inactive, and the next countdown starts only when the current reminder has
//! been resolved. Time is always passed in, which keeps it testable with a
//! simulated clock.

use std::time::{Duration, Instant};

#[derive(Debug, Clone, Default)]
pub struct ReminderScheduler {
    run: Option<Countdown>,
}

#[derive(Debug, Clone, Copy)]
struct Countdown {
    started: Instant,
    period: Duration,
}

impl Countdown {
    fn deadline(&self) -> Instant {
        self.started + self.period
    }
}

impl ReminderScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begins counting down `duration` from `now`, replacing any running countdown.
    pub fn start(&mut self, now: Instant, duration: Duration) {
        self.run = Some(Countdown {
            started: now,
            period: duration,
        });
        tracing::debug!(secs = duration.as_secs(), "countdown started");
    }

    pub fn stop(&mut self) {
        if self.run.take().is_some() {
            tracing::debug!("countdown stopped");
        }
    }

    pub fn restart(&mut self, now: Instant, new_duration: Duration) {
        self.stop();
        self.start(now, new_duration);
    }

    pub fn is_active(&self) -> bool {
        self.run.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.run.map(|run| run.deadline())
    }

    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        self.deadline()
            .map(|deadline| deadline.saturating_duration_since(now))
    }

    /// How far through the countdown we are, in `0.0..=1.0`.
    pub fn elapsed_fraction(&self, now: Instant) -> Option<f32> {
        let run = self.run?;
        if run.period.is_zero() {
            return Some(1.0);
        }
        let elapsed = now.saturating_duration_since(run.started);
        Some((elapsed.as_secs_f32() / run.period.as_secs_f32()).clamp(0.0, 1.0))
    }

    /// Reports expiry exactly once, then goes inactive until restarted.
    pub fn poll_due(&mut self, now: Instant) -> bool {
        match self.deadline() {
            Some(deadline) if now >= deadline => {
                self.run = None;
                true
            }
            _ => false,
        }
    }
}
