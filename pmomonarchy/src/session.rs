//! Playback session: one engine bound to one URL.
//!
//! A session is a plain resource wrapper. It never retries on its own; the
//! controller decides what happens when it fails.

use crate::engine::{AudioBackend, AudioEngine, EngineEventSink, EngineOptions, SessionId};
use crate::error::Result;
use tracing::debug;

pub struct PlaybackSession {
    id: SessionId,
    url: String,
    engine: Option<Box<dyn AudioEngine>>,
    playing: bool,
    loading: bool,
}

impl PlaybackSession {
    /// Builds an engine for `url` and starts loading it. Completion is
    /// reported through `events`.
    pub fn start(
        backend: &dyn AudioBackend,
        id: SessionId,
        url: &str,
        volume: f32,
        events: EngineEventSink,
    ) -> Result<Self> {
        let mut engine = backend.create(id, EngineOptions::stream(url, volume), events)?;
        debug!(session = %id, %url, volume, "Starting session");
        engine.play();
        Ok(Self {
            id,
            url: url.to_string(),
            engine: Some(engine),
            playing: false,
            loading: true,
        })
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn is_released(&self) -> bool {
        self.engine.is_none()
    }

    /// Pauses a playing session. Callers check [`is_loading`](Self::is_loading)
    /// first; pausing mid-load is refused.
    pub fn pause(&mut self) -> bool {
        if self.loading {
            return false;
        }
        match self.engine.as_mut() {
            Some(engine) => {
                engine.pause();
                true
            }
            None => false,
        }
    }

    /// Resumes a paused session.
    pub fn resume(&mut self) -> bool {
        if self.loading {
            return false;
        }
        match self.engine.as_mut() {
            Some(engine) => {
                self.loading = true;
                engine.play();
                true
            }
            None => false,
        }
    }

    pub fn set_volume(&mut self, volume: f32) {
        if let Some(engine) = self.engine.as_mut() {
            engine.set_volume(volume);
        }
    }

    pub(crate) fn mark_started(&mut self) {
        self.playing = true;
        self.loading = false;
    }

    pub(crate) fn mark_paused(&mut self) {
        self.playing = false;
        self.loading = false;
    }

    pub(crate) fn mark_failed(&mut self) {
        self.playing = false;
        self.loading = false;
    }

    /// Stops and frees the engine. Safe to call repeatedly.
    pub fn release(&mut self) {
        if let Some(mut engine) = self.engine.take() {
            debug!(session = %self.id, url = %self.url, "Releasing session");
            engine.unload();
        }
        self.playing = false;
        self.loading = false;
    }
}

impl Drop for PlaybackSession {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for PlaybackSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackSession")
            .field("id", &self.id)
            .field("url", &self.url)
            .field("playing", &self.playing)
            .field("loading", &self.loading)
            .field("released", &self.is_released())
            .finish()
    }
}
