//! Playback controller of one widget.
//!
//! Everything that can happen to a widget arrives as a [`PlayerMessage`]:
//! user commands, engine notifications, timers and the outcome of
//! background fetches. The controller handles them one at a time and never
//! waits inside a handler: network round trips go through a [`Fetcher`] and
//! come back as messages. The only interleavings to care about are thus
//! between messages; each handler checks that what it is about to act on is
//! still current (session ids, generations, the destroyed flag).
//!
//! State machine:
//!
//! ```text
//! IDLE → LOADING → PLAYING ⇄ PAUSED
//!          ↑  ↓       ↓        ↓
//!          └──┴───────┴────────┴──→ OFF_AIR (terminal)
//! ```
//!
//! The policies live in submodules: [`retry`] (failures and natural ends),
//! [`handoff`] (make-before-break switch of the live stream), [`detector`]
//! (live mount point polling) and [`metadata`] (now-playing refresh).

mod detector;
mod handoff;
mod metadata;
mod retry;

use crate::catalog::StreamCatalog;
use crate::channels::StreamKind;
use crate::config::{clamp_volume, MonarchyConfig, PollingConfig, RetryConfig};
use crate::constants::TEXT_LIVE;
use crate::engine::{AudioBackend, EngineEvent, EngineEventSink, EngineNotification, SessionId};
use crate::error::FailureReason;
use crate::fetch::Fetcher;
use crate::metadata::MetadataSource;
use crate::session::PlaybackSession;
use crate::time::{Clock, Scheduler, Timer, TimerKey};
use crate::ui::{PlayerStatus, UiReconciler, UiSnapshot};
use chrono::{DateTime, Utc};
use futures::FutureExt;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

pub use handoff::Handoff;
pub use retry::RetryState;

/// Input of the controller.
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerMessage {
    Command(UserCommand),
    Engine(EngineNotification),
    Timer(Timer),
    /// Outcome of a stream URL resolution
    Resolved {
        purpose: Resolution,
        url: Result<String, String>,
    },
    /// Outcome of a now-playing refresh
    NowPlaying(NowPlaying),
    Destroy,
}

/// Why a stream URL was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// First look at the live mount point
    Initial,
    /// URL of a new playback session
    Session { generation: u64 },
    /// Periodic live mount point check
    StreamCheck { seq: u64 },
    /// URL of the next hand-off candidate
    Handoff { generation: u64 },
}

/// Title and archive file name fetched for the now-playing line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NowPlaying {
    pub seq: u64,
    /// `None` when the title could not be fetched
    pub title: Option<String>,
    /// `None` when the metadata could not be fetched or names no file
    pub filename: Option<String>,
}

/// What the user can do with the widget.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UserCommand {
    /// The play/pause control was clicked
    TogglePlay,
    Play,
    Pause,
    SetVolume(f32),
}

/// Tunables of the controller.
#[derive(Debug, Clone)]
pub struct ControllerSettings {
    pub retry: RetryConfig,
    pub polling: PollingConfig,
    pub episode_base_url: String,
}

impl ControllerSettings {
    pub fn from_config(config: &MonarchyConfig) -> Self {
        Self {
            retry: config.retry,
            polling: config.polling,
            episode_base_url: config.api.episode_base_url.clone(),
        }
    }
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self::from_config(&MonarchyConfig::default())
    }
}

/// Collaborators of the controller.
pub struct ControllerDeps {
    pub catalog: StreamCatalog,
    pub metadata: Arc<dyn MetadataSource>,
    pub backend: Arc<dyn AudioBackend>,
    pub clock: Arc<dyn Clock>,
    pub scheduler: Box<dyn Scheduler>,
    pub fetcher: Box<dyn Fetcher>,
    pub ui: Box<dyn UiReconciler>,
    /// Mailbox the engines post their events to
    pub mailbox: mpsc::UnboundedSender<PlayerMessage>,
}

/// Last detected change of the live mount point.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamChange {
    pub url: String,
    pub detected_at: DateTime<Utc>,
}

pub struct PlayerController {
    widget: String,
    stream: StreamKind,
    settings: ControllerSettings,

    catalog: StreamCatalog,
    metadata: Arc<dyn MetadataSource>,
    backend: Arc<dyn AudioBackend>,
    clock: Arc<dyn Clock>,
    scheduler: Box<dyn Scheduler>,
    fetcher: Box<dyn Fetcher>,
    ui: Box<dyn UiReconciler>,
    mailbox: mpsc::UnboundedSender<PlayerMessage>,

    snapshot: UiSnapshot,
    volume: f32,
    current: Option<PlaybackSession>,
    handoff: Option<Handoff>,
    handoff_generation: u64,
    session_generation: u64,
    check_seq: u64,
    metadata_seq: u64,
    retry: RetryState,
    last_stream_url: Option<String>,
    last_change: Option<StreamChange>,
    next_session: u64,
    destroyed: bool,
}

impl PlayerController {
    pub fn new(
        widget: impl Into<String>,
        stream: StreamKind,
        volume: f32,
        settings: ControllerSettings,
        deps: ControllerDeps,
    ) -> Self {
        let volume = clamp_volume(volume);
        Self {
            widget: widget.into(),
            stream,
            settings,
            catalog: deps.catalog,
            metadata: deps.metadata,
            backend: deps.backend,
            clock: deps.clock,
            scheduler: deps.scheduler,
            fetcher: deps.fetcher,
            ui: deps.ui,
            mailbox: deps.mailbox,
            snapshot: UiSnapshot::new(volume),
            volume,
            current: None,
            handoff: None,
            handoff_generation: 0,
            session_generation: 0,
            check_seq: 0,
            metadata_seq: 0,
            retry: RetryState::default(),
            last_stream_url: None,
            last_change: None,
            next_session: 0,
            destroyed: false,
        }
    }

    /// Initial render, first metadata fetch and polling timers.
    pub fn start(&mut self) {
        info!(widget = %self.widget, stream = %self.stream, "Starting player");

        if self.stream.is_live() {
            self.snapshot.now_playing = TEXT_LIVE.to_string();
            self.render();
            self.resolve(Resolution::Initial);
            self.schedule_stream_check();
        } else {
            self.render();
            self.refresh_metadata();
            self.schedule_metadata_refresh();
        }
    }

    pub fn handle(&mut self, message: PlayerMessage) {
        match message {
            PlayerMessage::Command(command) => self.on_command(command),
            PlayerMessage::Engine(notification) => self.on_engine_event(notification),
            PlayerMessage::Timer(timer) => self.on_timer(timer),
            PlayerMessage::Resolved { purpose, url } => self.on_resolved(purpose, url),
            PlayerMessage::NowPlaying(update) => self.on_now_playing(update),
            PlayerMessage::Destroy => self.destroy(),
        }
    }

    pub fn on_command(&mut self, command: UserCommand) {
        if self.destroyed {
            return;
        }
        match command {
            UserCommand::TogglePlay => self.toggle_play(),
            UserCommand::Play => {
                if self.snapshot.status != PlayerStatus::Playing {
                    self.toggle_play();
                }
            }
            UserCommand::Pause => {
                if self.snapshot.status == PlayerStatus::Playing {
                    self.toggle_play();
                }
            }
            UserCommand::SetVolume(volume) => self.set_volume(volume),
        }
    }

    /// Click on the play/pause control.
    pub fn toggle_play(&mut self) {
        if self.destroyed {
            return;
        }
        if self.snapshot.is_off_air() {
            debug!(widget = %self.widget, "Control disabled: off air");
            return;
        }
        if self.snapshot.loading {
            debug!(widget = %self.widget, "Ignoring click while loading");
            return;
        }

        if self.snapshot.status == PlayerStatus::Playing {
            if let Some(session) = self.current.as_mut() {
                session.pause();
            }
        } else {
            self.begin_user_play();
        }
    }

    fn begin_user_play(&mut self) {
        self.retry.reset_for_user_play(self.scheduler.as_mut());
        self.set_status(PlayerStatus::Loading, true);

        let stale_live_url = self.stream.is_live()
            && matches!(
                (&self.current, &self.last_stream_url),
                (Some(session), Some(latest)) if session.url() != latest.as_str()
            );

        if !stale_live_url {
            if let Some(session) = self.current.as_mut() {
                if session.resume() {
                    debug!(widget = %self.widget, session = %session.id(), "Resuming session");
                    return;
                }
            }
        }
        self.start_session();
    }

    /// Applies immediately and is carried over to every later session.
    pub fn set_volume(&mut self, volume: f32) {
        let volume = clamp_volume(volume);
        self.volume = volume;
        if let Some(session) = self.current.as_mut() {
            session.set_volume(volume);
        }
        if let Some(candidate) = self.handoff.as_mut().and_then(Handoff::candidate_mut) {
            candidate.set_volume(volume);
        }
        self.snapshot.volume = volume;
        self.render();
    }

    pub fn on_engine_event(&mut self, notification: EngineNotification) {
        if self.destroyed {
            return;
        }
        let EngineNotification { session, event } = notification;

        if self.current.as_ref().map(PlaybackSession::id) == Some(session) {
            self.on_current_event(event);
        } else if self.handoff.as_ref().and_then(Handoff::candidate_id) == Some(session) {
            self.on_candidate_event(event);
        } else {
            debug!(widget = %self.widget, %session, ?event, "Dropping event of stale session");
        }
    }

    fn on_current_event(&mut self, event: EngineEvent) {
        let in_handoff = self.handoff.is_some();
        let Some(session) = self.current.as_mut() else {
            return;
        };

        let reason = match event {
            EngineEvent::Started => {
                session.mark_started();
                if !in_handoff {
                    self.set_status(PlayerStatus::Playing, false);
                }
                return;
            }
            EngineEvent::Paused => {
                session.mark_paused();
                if !in_handoff {
                    self.set_status(PlayerStatus::Paused, false);
                }
                return;
            }
            EngineEvent::Stopped => FailureReason::Stopped,
            EngineEvent::Ended => FailureReason::StreamEnded,
            EngineEvent::LoadError(msg) => FailureReason::LoadError(msg),
            EngineEvent::PlayError(msg) => FailureReason::PlayError(msg),
        };

        session.mark_failed();
        info!(widget = %self.widget, session = %session.id(), "Stream interrupted: {reason}");

        if in_handoff {
            // the candidate is already on its way; nothing left to keep
            if let Some(mut old) = self.current.take() {
                old.release();
            }
            return;
        }
        self.on_failure(reason);
    }

    pub fn on_timer(&mut self, timer: Timer) {
        if self.destroyed {
            return;
        }
        match timer {
            Timer::StreamCheck => self.check_stream(),
            Timer::MetadataRefresh => {
                self.refresh_metadata();
                self.schedule_metadata_refresh();
            }
            Timer::Retry { generation } => self.fire_retry(generation),
            Timer::HandoffRetry { generation } => self.fire_handoff_retry(generation),
        }
    }

    /// Resolves the stream URL in the background; the outcome comes back as
    /// [`PlayerMessage::Resolved`].
    fn resolve(&mut self, purpose: Resolution) {
        let catalog = self.catalog.clone();
        let stream = self.stream;
        self.fetcher.spawn(
            async move {
                let url = catalog
                    .resolve_url(stream)
                    .await
                    .map_err(|err| err.to_string());
                PlayerMessage::Resolved { purpose, url }
            }
            .boxed(),
        );
    }

    pub fn on_resolved(&mut self, purpose: Resolution, url: Result<String, String>) {
        if self.destroyed {
            return;
        }
        match purpose {
            Resolution::Initial => match url {
                Ok(url) => {
                    if self.last_stream_url.is_none() {
                        self.last_stream_url = Some(url);
                    }
                }
                Err(err) => warn!(widget = %self.widget, "Live stream path unavailable: {err}"),
            },
            Resolution::Session { generation } => self.on_session_url(generation, url),
            Resolution::StreamCheck { seq } => self.on_stream_checked(seq, url),
            Resolution::Handoff { generation } => self.on_candidate_url(generation, url),
        }
    }

    /// Releases the current session and asks for a fresh stream URL; the
    /// new session starts once it is known.
    fn start_session(&mut self) {
        if let Some(mut old) = self.current.take() {
            old.release();
        }
        self.session_generation += 1;
        self.resolve(Resolution::Session {
            generation: self.session_generation,
        });
    }

    fn on_session_url(&mut self, generation: u64, url: Result<String, String>) {
        if generation != self.session_generation || self.snapshot.is_off_air() {
            debug!(widget = %self.widget, generation, "Ignoring stale stream URL");
            return;
        }
        let url = match url {
            Ok(url) => url,
            Err(err) => {
                self.on_failure(FailureReason::LoadError(err));
                return;
            }
        };
        if self.stream.is_live() {
            self.last_stream_url = Some(url.clone());
        }

        match self.open_session(&url) {
            Ok(session) => {
                info!(widget = %self.widget, session = %session.id(), %url, "Session started");
                self.current = Some(session);
            }
            Err(err) => self.on_failure(FailureReason::LoadError(err.to_string())),
        }
    }

    fn open_session(&mut self, url: &str) -> crate::error::Result<PlaybackSession> {
        self.next_session += 1;
        let id = SessionId(self.next_session);
        let events = EngineEventSink::new(id, self.mailbox.clone());
        PlaybackSession::start(self.backend.as_ref(), id, url, self.volume, events)
    }

    /// Cancels every timer and fetch and releases every session. Later
    /// messages are ignored.
    pub fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.destroyed = true;
        self.scheduler.cancel_all();
        self.fetcher.cancel_all();
        self.retry.clear_pending();
        self.cancel_handoff();
        if let Some(mut session) = self.current.take() {
            session.release();
        }
        info!(widget = %self.widget, "Player destroyed");
    }

    fn set_status(&mut self, status: PlayerStatus, loading: bool) {
        self.snapshot.status = status;
        self.snapshot.loading = loading;
        self.render();
    }

    fn render(&mut self) {
        if !self.destroyed {
            self.ui.render(&self.snapshot);
        }
    }

    fn schedule(&mut self, timer: Timer, delay: std::time::Duration) -> TimerKey {
        self.scheduler.schedule(timer, delay)
    }

    fn now(&self) -> Instant {
        self.clock.now()
    }

    pub fn widget(&self) -> &str {
        &self.widget
    }

    pub fn stream(&self) -> StreamKind {
        self.stream
    }

    pub fn snapshot(&self) -> &UiSnapshot {
        &self.snapshot
    }

    pub fn status(&self) -> PlayerStatus {
        self.snapshot.status
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn retry_state(&self) -> &RetryState {
        &self.retry
    }

    pub fn current_url(&self) -> Option<&str> {
        self.current.as_ref().map(PlaybackSession::url)
    }

    pub fn current_session(&self) -> Option<SessionId> {
        self.current.as_ref().map(PlaybackSession::id)
    }

    pub fn handoff(&self) -> Option<&Handoff> {
        self.handoff.as_ref()
    }

    pub fn last_stream_url(&self) -> Option<&str> {
        self.last_stream_url.as_deref()
    }

    pub fn last_change(&self) -> Option<&StreamChange> {
        self.last_change.as_ref()
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }
}

impl Drop for PlayerController {
    fn drop(&mut self) {
        self.destroy();
    }
}
