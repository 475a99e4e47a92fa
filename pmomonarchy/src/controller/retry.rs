//! Failure / retry policy.
//!
//! One attempt counter per widget, reset on every user play and on every
//! detected change of the live mount point. Each failure either schedules a
//! fresh session after a fixed delay or, once the ceiling is reached, puts
//! the widget off air for good.

use super::PlayerController;
use crate::error::FailureReason;
use crate::time::{Scheduler, Timer, TimerKey};
use crate::ui::PlayerStatus;
use std::time::Instant;
use tracing::{debug, info, warn};

#[derive(Debug, Default)]
pub struct RetryState {
    pub(super) attempts: u32,
    switch_started_at: Option<Instant>,
    pub(super) generation: u64,
    pub(super) pending: Option<TimerKey>,
}

impl RetryState {
    /// Attempts made since the last reset.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// When the last live mount point change was detected.
    pub fn switch_started_at(&self) -> Option<Instant> {
        self.switch_started_at
    }

    /// Whether a restart is waiting for its delay.
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub(super) fn reset_for_user_play(&mut self, scheduler: &mut dyn Scheduler) {
        self.attempts = 0;
        if let Some(key) = self.pending.take() {
            scheduler.cancel(key);
        }
        self.generation += 1;
    }

    pub(super) fn reset_for_stream_change(&mut self, now: Instant) {
        self.attempts = 0;
        self.switch_started_at = Some(now);
    }

    pub(super) fn clear_pending(&mut self) {
        self.pending = None;
        self.generation += 1;
    }
}

impl PlayerController {
    /// Entry point of every playback failure outside a hand-off.
    pub(super) fn on_failure(&mut self, reason: FailureReason) {
        if self.destroyed || self.snapshot.is_off_air() {
            return;
        }
        if self.retry.pending.is_some() {
            debug!(widget = %self.widget, %reason, "Restart already scheduled");
            return;
        }
        self.cancel_handoff();

        let max = self.settings.retry.attempts;
        if self.retry.attempts < max {
            self.retry.attempts += 1;
            info!(
                widget = %self.widget,
                attempt = self.retry.attempts,
                max,
                %reason,
                "Attempting restart {}/{}",
                self.retry.attempts,
                max
            );
            self.set_status(PlayerStatus::Loading, true);

            let delay = self.settings.retry.delay();
            let key = self.schedule(
                Timer::Retry {
                    generation: self.retry.generation,
                },
                delay,
            );
            self.retry.pending = Some(key);
        } else {
            self.go_off_air(reason);
        }
    }

    pub(super) fn fire_retry(&mut self, generation: u64) {
        if generation != self.retry.generation || self.retry.pending.is_none() {
            debug!(widget = %self.widget, generation, "Ignoring stale restart");
            return;
        }
        self.retry.clear_pending();
        if self.snapshot.is_off_air() {
            return;
        }
        debug!(widget = %self.widget, attempt = self.retry.attempts, "Restarting stream");
        self.start_session();
    }

    /// Terminal state: nothing happens on its own any more.
    fn go_off_air(&mut self, reason: FailureReason) {
        warn!(
            widget = %self.widget,
            %reason,
            "Max retry attempts reached, going off air"
        );
        self.scheduler.cancel_all();
        self.fetcher.cancel_all();
        self.retry.clear_pending();
        self.retry.attempts = 0;
        self.cancel_handoff();
        if let Some(mut session) = self.current.take() {
            session.release();
        }
        self.snapshot.set_off_air();
        self.render();
    }
}
