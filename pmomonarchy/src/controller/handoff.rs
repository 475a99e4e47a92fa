//! Make-before-break switch of a playing session to a new URL.
//!
//! The candidate session plays alongside the current one until it reports
//! `Started`; only then is the old session released. A failed candidate is
//! never traded back for the old session (its URL is presumed dead): the
//! switch is retried on a re-resolved URL within a time and attempt budget,
//! then escalated to the retry policy.

use super::{PlayerController, Resolution};
use crate::engine::{EngineEvent, SessionId};
use crate::error::FailureReason;
use crate::session::PlaybackSession;
use crate::time::{Timer, TimerKey};
use crate::ui::PlayerStatus;
use std::time::Duration;
use tracing::{debug, info, warn};

/// A switch in progress.
#[derive(Debug)]
pub struct Handoff {
    url: String,
    candidate: Option<PlaybackSession>,
    pending: Option<TimerKey>,
}

impl Handoff {
    /// URL the switch is heading to.
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn candidate_id(&self) -> Option<SessionId> {
        self.candidate.as_ref().map(PlaybackSession::id)
    }

    pub(super) fn candidate_mut(&mut self) -> Option<&mut PlaybackSession> {
        self.candidate.as_mut()
    }

    /// Whether a new candidate is waiting for its delay.
    pub fn is_retry_pending(&self) -> bool {
        self.pending.is_some()
    }
}

impl PlayerController {
    /// Starts a candidate session on `url`, superseding any switch already
    /// in progress.
    pub(super) fn begin_handoff(&mut self, url: String) {
        self.cancel_handoff();
        info!(widget = %self.widget, %url, "Switching stream");

        self.snapshot.loading = true;
        self.render();

        self.handoff = Some(Handoff {
            url: url.clone(),
            candidate: None,
            pending: None,
        });
        self.launch_candidate(&url);
    }

    fn launch_candidate(&mut self, url: &str) {
        match self.open_session(url) {
            Ok(candidate) => {
                debug!(widget = %self.widget, session = %candidate.id(), "Candidate session loading");
                if let Some(handoff) = self.handoff.as_mut() {
                    handoff.url = url.to_string();
                    handoff.candidate = Some(candidate);
                }
            }
            Err(err) => self.on_handoff_failure(FailureReason::LoadError(err.to_string())),
        }
    }

    pub(super) fn on_candidate_event(&mut self, event: EngineEvent) {
        let reason = match event {
            EngineEvent::Started => {
                self.promote_candidate();
                return;
            }
            EngineEvent::Paused => {
                debug!(widget = %self.widget, "Candidate paused before taking over");
                return;
            }
            EngineEvent::Stopped => FailureReason::Stopped,
            EngineEvent::Ended => FailureReason::StreamEnded,
            EngineEvent::LoadError(msg) => FailureReason::LoadError(msg),
            EngineEvent::PlayError(msg) => FailureReason::PlayError(msg),
        };

        if let Some(mut candidate) = self.handoff.as_mut().and_then(|h| h.candidate.take()) {
            candidate.release();
        }
        self.on_handoff_failure(reason);
    }

    /// Old session out, candidate in. The old one is only released here,
    /// after the candidate is confirmed playing.
    fn promote_candidate(&mut self) {
        let Some(mut handoff) = self.handoff.take() else {
            return;
        };
        let Some(mut candidate) = handoff.candidate.take() else {
            return;
        };
        if let Some(key) = handoff.pending.take() {
            self.scheduler.cancel(key);
        }

        candidate.mark_started();
        if let Some(mut old) = self.current.replace(candidate) {
            old.release();
        }
        info!(widget = %self.widget, url = %handoff.url, "Stream switch complete");
        self.set_status(PlayerStatus::Playing, false);
    }

    fn on_handoff_failure(&mut self, reason: FailureReason) {
        let elapsed = self
            .retry
            .switch_started_at()
            .map(|started| self.now().saturating_duration_since(started))
            .unwrap_or(Duration::ZERO);
        let budget = self.settings.retry.switch_budget();
        let max = self.settings.retry.attempts;

        if elapsed < budget && self.retry.attempts < max {
            self.retry.attempts += 1;
            info!(
                widget = %self.widget,
                attempt = self.retry.attempts,
                max,
                %reason,
                "Stream switch retry {}/{}",
                self.retry.attempts,
                max
            );
            let delay = self.settings.retry.delay();
            let key = self.schedule(
                Timer::HandoffRetry {
                    generation: self.handoff_generation,
                },
                delay,
            );
            if let Some(handoff) = self.handoff.as_mut() {
                handoff.pending = Some(key);
            }
        } else {
            warn!(
                widget = %self.widget,
                elapsed_secs = elapsed.as_secs(),
                attempts = self.retry.attempts,
                %reason,
                "Stream switch gave up"
            );
            self.cancel_handoff();
            self.on_failure(FailureReason::HandoffTimeout);
        }
    }

    pub(super) fn fire_handoff_retry(&mut self, generation: u64) {
        let pending = if generation == self.handoff_generation {
            self.handoff
                .as_mut()
                .and_then(|handoff| handoff.pending.take())
        } else {
            None
        };
        if pending.is_none() {
            debug!(widget = %self.widget, generation, "Ignoring stale switch retry");
            return;
        }
        if self.snapshot.is_off_air() {
            self.cancel_handoff();
            return;
        }

        // the mount point may have moved again since the switch began
        self.resolve(Resolution::Handoff {
            generation: self.handoff_generation,
        });
    }

    pub(super) fn on_candidate_url(&mut self, generation: u64, url: Result<String, String>) {
        if generation != self.handoff_generation || self.handoff.is_none() {
            debug!(widget = %self.widget, generation, "Ignoring stale candidate URL");
            return;
        }
        match url {
            Ok(url) => {
                self.last_stream_url = Some(url.clone());
                self.launch_candidate(&url);
            }
            Err(err) => self.on_handoff_failure(FailureReason::LoadError(err)),
        }
    }

    /// Drops the switch in progress, releasing its candidate.
    pub(super) fn cancel_handoff(&mut self) {
        self.handoff_generation += 1;
        if let Some(mut handoff) = self.handoff.take() {
            if let Some(key) = handoff.pending.take() {
                self.scheduler.cancel(key);
            }
            if let Some(mut candidate) = handoff.candidate.take() {
                debug!(widget = %self.widget, session = %candidate.id(), "Discarding candidate");
                candidate.release();
            }
        }
    }
}
