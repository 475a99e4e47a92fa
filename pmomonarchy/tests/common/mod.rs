//! Fakes and a virtual-time harness shared by the controller tests.

#![allow(dead_code)]

use async_trait::async_trait;
use pmomonarchy::catalog::{LivePathSource, StreamCatalog};
use pmomonarchy::controller::{ControllerDeps, ControllerSettings, PlayerController, PlayerMessage, UserCommand};
use pmomonarchy::engine::{AudioBackend, AudioEngine, EngineEvent, EngineEventSink, EngineOptions, SessionId};
use pmomonarchy::error::{Error, Result};
use pmomonarchy::fetch::ManualFetcher;
use pmomonarchy::metadata::{MetadataSource, StreamMetadata};
use pmomonarchy::time::VirtualClock;
use pmomonarchy::ui::{PlayerStatus, UiReconciler, UiSnapshot};
use pmomonarchy::StreamKind;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

pub const BASE: &str = "https://mediamonarchy.live";

// ============================================================================
// Audio backend
// ============================================================================

/// What the fake backend knows about one engine it built.
#[derive(Debug, Clone)]
pub struct EngineRecord {
    pub session: SessionId,
    pub url: String,
    pub volume: f32,
    pub plays: u32,
    pub pauses: u32,
    pub unloaded: bool,
    sink: EngineEventSink,
}

impl EngineRecord {
    /// Posts `event` as this engine would.
    pub fn emit(&self, event: EngineEvent) {
        self.sink.emit(event);
    }
}

#[derive(Debug, Clone, Default)]
pub struct FakeBackend {
    engines: Arc<Mutex<Vec<EngineRecord>>>,
    refuse: Arc<Mutex<bool>>,
}

impl FakeBackend {
    pub fn engines(&self) -> Vec<EngineRecord> {
        self.engines.lock().unwrap().clone()
    }

    pub fn created(&self) -> usize {
        self.engines.lock().unwrap().len()
    }

    pub fn engine(&self, session: SessionId) -> EngineRecord {
        self.engines()
            .into_iter()
            .find(|record| record.session == session)
            .expect("engine of session")
    }

    pub fn latest(&self) -> EngineRecord {
        self.engines().last().cloned().expect("at least one engine")
    }

    /// Engines neither unloaded nor superseded.
    pub fn live_engines(&self) -> Vec<EngineRecord> {
        self.engines().into_iter().filter(|record| !record.unloaded).collect()
    }

    /// Makes every later `create` fail.
    pub fn refuse_engines(&self, refuse: bool) {
        *self.refuse.lock().unwrap() = refuse;
    }
}

impl AudioBackend for FakeBackend {
    fn create(
        &self,
        session: SessionId,
        options: EngineOptions,
        events: EngineEventSink,
    ) -> Result<Box<dyn AudioEngine>> {
        if *self.refuse.lock().unwrap() {
            return Err(Error::Engine("no audio device".into()));
        }
        let mut engines = self.engines.lock().unwrap();
        engines.push(EngineRecord {
            session,
            url: options.sources[0].clone(),
            volume: options.volume,
            plays: 0,
            pauses: 0,
            unloaded: false,
            sink: events,
        });
        Ok(Box::new(FakeEngine {
            index: engines.len() - 1,
            engines: self.engines.clone(),
        }))
    }
}

struct FakeEngine {
    index: usize,
    engines: Arc<Mutex<Vec<EngineRecord>>>,
}

impl FakeEngine {
    fn with<F: FnOnce(&mut EngineRecord)>(&self, f: F) {
        f(&mut self.engines.lock().unwrap()[self.index]);
    }
}

impl AudioEngine for FakeEngine {
    fn play(&mut self) {
        self.with(|record| record.plays += 1);
    }

    fn pause(&mut self) {
        self.with(|record| record.pauses += 1);
    }

    fn unload(&mut self) {
        self.with(|record| record.unloaded = true);
    }

    fn set_volume(&mut self, volume: f32) {
        self.with(|record| record.volume = volume);
    }
}

// ============================================================================
// HTTP sources
// ============================================================================

#[derive(Debug, Clone)]
pub struct FakeLive {
    path: Arc<Mutex<Option<String>>>,
    calls: Arc<Mutex<u32>>,
}

impl FakeLive {
    pub fn new(path: &str) -> Self {
        Self {
            path: Arc::new(Mutex::new(Some(path.to_string()))),
            calls: Arc::new(Mutex::new(0)),
        }
    }

    pub fn set_path(&self, path: &str) {
        *self.path.lock().unwrap() = Some(path.to_string());
    }

    /// Makes the endpoint fail until the next `set_path`.
    pub fn fail(&self) {
        *self.path.lock().unwrap() = None;
    }

    pub fn calls(&self) -> u32 {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl LivePathSource for FakeLive {
    async fn current_path(&self) -> Result<String> {
        *self.calls.lock().unwrap() += 1;
        self.path
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| Error::LivePath("endpoint down".into()))
    }
}

#[derive(Debug, Clone, Default)]
pub struct FakeMetadata {
    title: Arc<Mutex<Option<String>>>,
    filename: Arc<Mutex<Option<String>>>,
    calls: Arc<Mutex<u32>>,
}

impl FakeMetadata {
    pub fn new(title: &str, filename: &str) -> Self {
        let metadata = Self::default();
        metadata.set(Some(title), Some(filename));
        metadata
    }

    /// `None` makes the matching endpoint fail.
    pub fn set(&self, title: Option<&str>, filename: Option<&str>) {
        *self.title.lock().unwrap() = title.map(str::to_string);
        *self.filename.lock().unwrap() = filename.map(str::to_string);
    }

    pub fn calls(&self) -> u32 {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl MetadataSource for FakeMetadata {
    async fn fetch_title(&self, _stream: StreamKind) -> Result<String> {
        *self.calls.lock().unwrap() += 1;
        self.title
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| Error::Status {
                url: format!("{BASE}/music_title"),
                status: 503,
            })
    }

    async fn fetch_metadata(&self, _stream: StreamKind) -> Result<StreamMetadata> {
        self.filename
            .lock()
            .unwrap()
            .clone()
            .map(StreamMetadata::with_filename)
            .ok_or_else(|| Error::other("connection reset"))
    }
}

// ============================================================================
// UI
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct RecordingUi {
    renders: Arc<Mutex<Vec<UiSnapshot>>>,
}

impl RecordingUi {
    pub fn count(&self) -> usize {
        self.renders.lock().unwrap().len()
    }

    pub fn last(&self) -> Option<UiSnapshot> {
        self.renders.lock().unwrap().last().cloned()
    }

    /// Whether `status` was ever rendered.
    pub fn seen(&self, status: PlayerStatus) -> bool {
        self.renders
            .lock()
            .unwrap()
            .iter()
            .any(|snapshot| snapshot.status == status)
    }
}

impl UiReconciler for RecordingUi {
    fn render(&mut self, snapshot: &UiSnapshot) {
        self.renders.lock().unwrap().push(snapshot.clone());
    }
}

// ============================================================================
// Harness
// ============================================================================

/// A controller on a virtual timeline. Engine events posted to the mailbox
/// are delivered after every step.
pub struct Harness {
    pub controller: PlayerController,
    pub clock: VirtualClock,
    pub backend: FakeBackend,
    pub live: FakeLive,
    pub metadata: FakeMetadata,
    pub fetcher: ManualFetcher,
    pub ui: RecordingUi,
    rx: mpsc::UnboundedReceiver<PlayerMessage>,
}

impl Harness {
    pub fn new(stream: StreamKind) -> Self {
        Self::with_settings(stream, ControllerSettings::default())
    }

    pub fn with_settings(stream: StreamKind, settings: ControllerSettings) -> Self {
        let clock = VirtualClock::new();
        let backend = FakeBackend::default();
        let live = FakeLive::new("/live1.mp3");
        let metadata = FakeMetadata::new("Morning Show", "/archive/20230501_Morning_Show.mp3");
        let fetcher = ManualFetcher::new();
        let ui = RecordingUi::default();
        let (tx, rx) = mpsc::unbounded_channel();

        let catalog = StreamCatalog::new(BASE, Arc::new(live.clone())).expect("valid base url");
        let deps = ControllerDeps {
            catalog,
            metadata: Arc::new(metadata.clone()),
            backend: Arc::new(backend.clone()),
            clock: Arc::new(clock.clone()),
            scheduler: Box::new(clock.clone()),
            fetcher: Box::new(fetcher.clone()),
            ui: Box::new(ui.clone()),
            mailbox: tx,
        };
        let controller = PlayerController::new("mm-player-test", stream, 0.5, settings, deps);

        Self {
            controller,
            clock,
            backend,
            live,
            metadata,
            fetcher,
            ui,
            rx,
        }
    }

    /// Harness already started.
    pub async fn started(stream: StreamKind) -> Self {
        let mut harness = Self::new(stream);
        harness.start().await;
        harness
    }

    /// Starts the controller and lets its first fetches complete.
    pub async fn start(&mut self) {
        self.controller.start();
        self.drain().await;
    }

    /// Delivers every posted message and runs every queued fetch, until
    /// both are exhausted.
    pub async fn drain(&mut self) {
        loop {
            if let Ok(message) = self.rx.try_recv() {
                self.controller.handle(message);
            } else if let Some(message) = self.fetcher.run_next().await {
                self.controller.handle(message);
            } else {
                break;
            }
        }
    }

    pub async fn command(&mut self, command: UserCommand) {
        self.controller.handle(PlayerMessage::Command(command));
        self.drain().await;
    }

    pub async fn click(&mut self) {
        self.command(UserCommand::TogglePlay).await;
    }

    /// Posts `event` as the engine of `session` would.
    pub async fn emit(&mut self, session: SessionId, event: EngineEvent) {
        self.backend.engine(session).sink.emit(event);
        self.drain().await;
    }

    /// Posts `event` on the most recently built engine.
    pub async fn emit_latest(&mut self, event: EngineEvent) {
        let session = self.backend.latest().session;
        self.emit(session, event).await;
    }

    /// Click and let the new session report `Started`.
    pub async fn play(&mut self) {
        self.click().await;
        self.emit_latest(EngineEvent::Started).await;
    }

    /// Moves the timeline forward, firing every timer that comes due,
    /// including the ones scheduled on the way.
    pub async fn advance(&mut self, by: Duration) {
        let deadline = self.clock.elapsed() + by;
        while let Some(timer) = self.clock.pop_due(deadline) {
            self.controller.handle(PlayerMessage::Timer(timer));
            self.drain().await;
        }
        self.clock.set_elapsed(deadline);
    }

    pub fn url(path: &str) -> String {
        format!("{BASE}{path}")
    }
}

pub fn secs(n: u64) -> Duration {
    Duration::from_secs(n)
}
