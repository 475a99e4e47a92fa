//! Player factory and handle.
//!
//! Each widget runs its own controller on a spawned task fed through an
//! unbounded mailbox; nothing is shared between two widgets.
//!
//! ```no_run
//! use pmomonarchy::{create_player, PlayerOptions};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let player = create_player("mm-player-1", PlayerOptions::default().with_stream("rock"))?;
//!     player.toggle_play();
//!
//!     let mut state = player.subscribe();
//!     while state.changed().await.is_ok() {
//!         println!("{:?}", *state.borrow());
//!     }
//!
//!     player.destroy().await;
//!     Ok(())
//! }
//! ```

use crate::catalog::{LivePathSource, StreamCatalog};
use crate::client::ClientBuilder;
use crate::config::{MonarchyConfig, PlayerOptions};
use crate::controller::{ControllerDeps, ControllerSettings, PlayerController, PlayerMessage, UserCommand};
use crate::engine::{AudioBackend, HttpStreamBackend};
use crate::error::Result;
use crate::fetch::TokioFetcher;
use crate::metadata::MetadataSource;
use crate::time::{SystemClock, TokioScheduler};
use crate::ui::{UiReconciler, UiSnapshot, WatchUi};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Creates a player bound to `container` with the default configuration and
/// the HTTP collaborators. Must be called from within a tokio runtime.
pub fn create_player(container: impl Into<String>, options: PlayerOptions) -> Result<PlayerHandle> {
    PlayerBuilder::new(options).container(container).spawn()
}

/// Builder wiring a controller to its collaborators.
pub struct PlayerBuilder {
    container: Option<String>,
    options: PlayerOptions,
    config: MonarchyConfig,
    live: Option<Arc<dyn LivePathSource>>,
    metadata: Option<Arc<dyn MetadataSource>>,
    backend: Option<Arc<dyn AudioBackend>>,
    ui: Option<Box<dyn UiReconciler>>,
}

impl PlayerBuilder {
    pub fn new(options: PlayerOptions) -> Self {
        Self {
            container: None,
            options,
            config: MonarchyConfig::default(),
            live: None,
            metadata: None,
            backend: None,
            ui: None,
        }
    }

    /// Builder for the widget described by the `player` section of `config`.
    pub fn from_config(config: MonarchyConfig) -> Self {
        let mut builder = Self::new(config.player.clone());
        builder.config = config;
        builder
    }

    /// Container identifier; a `mm-player-<uuid>` one is generated otherwise.
    pub fn container(mut self, container: impl Into<String>) -> Self {
        self.container = Some(container.into());
        self
    }

    pub fn config(mut self, config: MonarchyConfig) -> Self {
        self.config = config;
        self
    }

    pub fn live_source(mut self, live: Arc<dyn LivePathSource>) -> Self {
        self.live = Some(live);
        self
    }

    pub fn metadata_source(mut self, metadata: Arc<dyn MetadataSource>) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn backend(mut self, backend: Arc<dyn AudioBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Extra renderer, called alongside the handle's own snapshot channel.
    pub fn ui(mut self, ui: Box<dyn UiReconciler>) -> Self {
        self.ui = Some(ui);
        self
    }

    /// Validates the options and spawns the player task.
    pub fn spawn(self) -> Result<PlayerHandle> {
        let stream = self.options.stream_kind()?;
        let volume = self.options.initial_volume();
        let container = self
            .container
            .unwrap_or_else(|| format!("mm-player-{}", uuid::Uuid::new_v4()));

        let client = ClientBuilder::from_config(&self.config.api).build()?;
        let live: Arc<dyn LivePathSource> = self
            .live
            .unwrap_or_else(|| Arc::new(client.clone()) as Arc<dyn LivePathSource>);
        let metadata: Arc<dyn MetadataSource> = self
            .metadata
            .unwrap_or_else(|| Arc::new(client) as Arc<dyn MetadataSource>);
        let backend: Arc<dyn AudioBackend> = match self.backend {
            Some(backend) => backend,
            None => Arc::new(HttpStreamBackend::new()?),
        };

        let catalog = StreamCatalog::new(&self.config.api.base_url, live)?;
        let (tx, rx) = mpsc::unbounded_channel();
        let (watch_ui, state) = WatchUi::new(UiSnapshot::new(volume));
        let ui: Box<dyn UiReconciler> = match self.ui {
            Some(extra) => Box::new(FanOut(vec![Box::new(watch_ui), extra])),
            None => Box::new(watch_ui),
        };

        let deps = ControllerDeps {
            catalog,
            metadata,
            backend,
            clock: Arc::new(SystemClock),
            scheduler: Box::new(TokioScheduler::new(tx.clone())),
            fetcher: Box::new(TokioFetcher::new(tx.clone())),
            ui,
            mailbox: tx.clone(),
        };
        let controller = PlayerController::new(
            container.clone(),
            stream,
            volume,
            ControllerSettings::from_config(&self.config),
            deps,
        );

        let join_handle = tokio::spawn(run(controller, rx));
        info!(widget = %container, %stream, "Player created");

        Ok(PlayerHandle {
            container,
            options: self.options,
            tx,
            state,
            join_handle: Some(join_handle),
        })
    }
}

async fn run(mut controller: PlayerController, mut rx: mpsc::UnboundedReceiver<PlayerMessage>) {
    controller.start();

    while let Some(message) = rx.recv().await {
        if message == PlayerMessage::Destroy {
            break;
        }
        controller.handle(message);
    }

    controller.destroy();
    debug!(widget = controller.widget(), "Player task stopped");
}

struct FanOut(Vec<Box<dyn UiReconciler>>);

impl UiReconciler for FanOut {
    fn render(&mut self, snapshot: &UiSnapshot) {
        for ui in &mut self.0 {
            ui.render(snapshot);
        }
    }
}

/// Control surface of a running player.
///
/// Dropping the handle tears the player down as well; [`destroy`](Self::destroy)
/// additionally waits for the task to finish.
pub struct PlayerHandle {
    container: String,
    options: PlayerOptions,
    tx: mpsc::UnboundedSender<PlayerMessage>,
    state: watch::Receiver<UiSnapshot>,
    join_handle: Option<JoinHandle<()>>,
}

impl PlayerHandle {
    pub fn container(&self) -> &str {
        &self.container
    }

    pub fn options(&self) -> &PlayerOptions {
        &self.options
    }

    fn send(&self, command: UserCommand) {
        if self.tx.send(PlayerMessage::Command(command)).is_err() {
            warn!(widget = %self.container, ?command, "Player already stopped");
        }
    }

    /// Same as a click on the play/pause control.
    pub fn toggle_play(&self) {
        self.send(UserCommand::TogglePlay);
    }

    pub fn play(&self) {
        self.send(UserCommand::Play);
    }

    pub fn pause(&self) {
        self.send(UserCommand::Pause);
    }

    pub fn set_volume(&self, volume: f32) {
        self.send(UserCommand::SetVolume(volume));
    }

    /// Latest rendered state.
    pub fn snapshot(&self) -> UiSnapshot {
        self.state.borrow().clone()
    }

    /// Receiver notified on every state change.
    pub fn subscribe(&self) -> watch::Receiver<UiSnapshot> {
        self.state.clone()
    }

    /// Cancels every timer, releases the audio sessions and waits for the
    /// player task to stop.
    pub async fn destroy(mut self) {
        let _ = self.tx.send(PlayerMessage::Destroy);
        if let Some(join_handle) = self.join_handle.take() {
            if let Err(err) = join_handle.await {
                if !err.is_cancelled() {
                    warn!(widget = %self.container, "Player task failed: {err}");
                }
            }
        }
    }
}

impl Drop for PlayerHandle {
    fn drop(&mut self) {
        if self.join_handle.is_some() {
            let _ = self.tx.send(PlayerMessage::Destroy);
        }
    }
}
