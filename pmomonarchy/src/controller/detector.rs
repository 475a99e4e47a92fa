//! Live mount point polling.

use super::{PlayerController, Resolution, StreamChange};
use crate::time::Timer;
use crate::ui::PlayerStatus;
use chrono::Utc;
use tracing::{debug, info, warn};

impl PlayerController {
    pub(super) fn schedule_stream_check(&mut self) {
        if !self.stream.is_live() || self.snapshot.is_off_air() {
            return;
        }
        let interval = self.settings.polling.stream_check_interval();
        self.schedule(Timer::StreamCheck, interval);
    }

    pub(super) fn check_stream(&mut self) {
        if !self.stream.is_live() || self.snapshot.is_off_air() {
            return;
        }
        self.schedule_stream_check();
        self.check_seq += 1;
        self.resolve(Resolution::StreamCheck {
            seq: self.check_seq,
        });
    }

    /// Compares the current mount point with the last known one. A change
    /// resets the retry budget and, if audio is playing, switches to it.
    ///
    /// Only the answer to the latest check counts.
    pub(super) fn on_stream_checked(&mut self, seq: u64, url: Result<String, String>) {
        if seq != self.check_seq || !self.stream.is_live() || self.snapshot.is_off_air() {
            return;
        }
        let url = match url {
            Ok(url) => url,
            Err(err) => {
                warn!(widget = %self.widget, "Stream check failed: {err}");
                return;
            }
        };

        if self.last_stream_url.as_deref() == Some(url.as_str()) {
            debug!(widget = %self.widget, %url, "Stream unchanged");
            return;
        }

        info!(
            widget = %self.widget,
            previous = self.last_stream_url.as_deref().unwrap_or("-"),
            %url,
            "Stream change detected"
        );
        self.last_stream_url = Some(url.clone());
        self.last_change = Some(StreamChange {
            url: url.clone(),
            detected_at: Utc::now(),
        });
        let now = self.now();
        self.retry.reset_for_stream_change(now);

        if self.snapshot.status == PlayerStatus::Playing {
            self.begin_handoff(url);
        }
    }
}
