//! Now-playing refresh for the non-live streams.
//!
//! Failures are logged and otherwise ignored: the previous title and link
//! stay on screen and playback is never affected.

use super::{NowPlaying, PlayerController, PlayerMessage};
use crate::constants::TEXT_NO_TITLE;
use crate::episode::episode_link;
use crate::time::Timer;
use futures::FutureExt;
use tracing::debug;

impl PlayerController {
    pub(super) fn schedule_metadata_refresh(&mut self) {
        if self.stream.is_live() || self.snapshot.is_off_air() {
            return;
        }
        let interval = self.settings.polling.metadata_interval();
        self.schedule(Timer::MetadataRefresh, interval);
    }

    /// Fetches title and metadata in the background; the outcome comes back
    /// as [`PlayerMessage::NowPlaying`].
    pub(super) fn refresh_metadata(&mut self) {
        if self.stream.is_live() || self.snapshot.is_off_air() {
            return;
        }
        self.metadata_seq += 1;
        let seq = self.metadata_seq;
        let source = self.metadata.clone();
        let stream = self.stream;
        let widget = self.widget.clone();

        self.fetcher.spawn(
            async move {
                let (title, doc) =
                    futures::join!(source.fetch_title(stream), source.fetch_metadata(stream));
                let title = title
                    .map_err(|err| debug!(widget = %widget, "Title update failed: {err}"))
                    .ok();
                let filename = match doc {
                    Ok(doc) => doc.filename().map(str::to_string),
                    Err(err) => {
                        debug!(widget = %widget, "Metadata update failed: {err}");
                        None
                    }
                };
                PlayerMessage::NowPlaying(NowPlaying {
                    seq,
                    title,
                    filename,
                })
            }
            .boxed(),
        );
    }

    /// Applies the latest refresh; older answers arriving late are dropped.
    pub fn on_now_playing(&mut self, update: NowPlaying) {
        if self.destroyed || self.stream.is_live() || self.snapshot.is_off_air() {
            return;
        }
        if update.seq != self.metadata_seq {
            debug!(widget = %self.widget, seq = update.seq, "Ignoring stale now-playing update");
            return;
        }

        if let Some(title) = update.title {
            let title = title.trim();
            self.snapshot.now_playing = if title.is_empty() {
                TEXT_NO_TITLE.to_string()
            } else {
                title.to_string()
            };
        }
        if let Some(filename) = update.filename {
            self.snapshot.episode_link = episode_link(&self.settings.episode_base_url, &filename);
        }

        self.render();
    }
}
