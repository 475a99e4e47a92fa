//! Audio engine seam.
//!
//! An [`AudioBackend`] builds one [`AudioEngine`] per playback session. The
//! engine reports its lifecycle asynchronously through the
//! [`EngineEventSink`] it was created with; every event is tagged with the
//! session id so the controller can drop notifications from sessions it has
//! already replaced.

pub mod http;

use crate::controller::PlayerMessage;
use crate::error::Result;
use std::fmt;
use tokio::sync::mpsc;

pub use http::HttpStreamBackend;

/// Identifier of a playback session, unique per widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Lifecycle notifications of an engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    Started,
    Paused,
    Stopped,
    /// The stream reached its natural end
    Ended,
    LoadError(String),
    PlayError(String),
}

/// Event tagged with the session that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineNotification {
    pub session: SessionId,
    pub event: EngineEvent,
}

/// Construction parameters of an engine.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineOptions {
    pub sources: Vec<String>,
    /// Stream the source instead of downloading it whole
    pub streaming: bool,
    pub volume: f32,
    pub formats: Vec<String>,
}

impl EngineOptions {
    /// Streaming MP3 options for a single source.
    pub fn stream(url: impl Into<String>, volume: f32) -> Self {
        Self {
            sources: vec![url.into()],
            streaming: true,
            volume,
            formats: vec![crate::constants::STREAM_FORMAT.to_string()],
        }
    }
}

/// One loaded audio source.
pub trait AudioEngine: Send {
    fn play(&mut self);
    fn pause(&mut self);
    /// Stops playback and frees the source. Must tolerate repeated calls and
    /// engines that never finished loading.
    fn unload(&mut self);
    fn set_volume(&mut self, volume: f32);
}

/// Factory of engines.
pub trait AudioBackend: Send + Sync {
    fn create(
        &self,
        session: SessionId,
        options: EngineOptions,
        events: EngineEventSink,
    ) -> Result<Box<dyn AudioEngine>>;
}

/// Where engines post their events.
#[derive(Debug, Clone)]
pub struct EngineEventSink {
    session: SessionId,
    mailbox: mpsc::UnboundedSender<PlayerMessage>,
}

impl EngineEventSink {
    pub(crate) fn new(session: SessionId, mailbox: mpsc::UnboundedSender<PlayerMessage>) -> Self {
        Self { session, mailbox }
    }

    pub fn session(&self) -> SessionId {
        self.session
    }

    /// Posts `event`; silently dropped once the player is gone.
    pub fn emit(&self, event: EngineEvent) {
        let _ = self.mailbox.send(PlayerMessage::Engine(EngineNotification {
            session: self.session,
            event,
        }));
    }
}
