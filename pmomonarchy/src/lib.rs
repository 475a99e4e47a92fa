//! # pmomonarchy - Media Monarchy radio player core
//!
//! `pmomonarchy` drives the embeddable Media Monarchy player: it plays one of
//! eight internet radio streams, keeps the now-playing information fresh and
//! recovers on its own from the failures a long-running stream inevitably
//! hits.
//!
//! ## Features
//!
//! - **Stream catalog**: the eight Media Monarchy streams, the live broadcast
//!   resolved through its endpoint on every use
//! - **Self-healing playback**: bounded restarts with a fixed delay, then a
//!   terminal "off air" state
//! - **Seamless hand-off**: when the live mount point moves, a second session
//!   is loaded next to the playing one and swapped in once it plays
//! - **Now-playing**: title and episode page link refreshed every minute
//! - **Testable**: audio engine, clock, timers and HTTP sources are traits
//!
//! ## Quick Start
//!
//! ```no_run
//! use pmomonarchy::{create_player, PlayerOptions, PlayerStatus};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let player = create_player("mm-player", PlayerOptions::default().with_stream("onair"))?;
//!     player.toggle_play();
//!
//!     let mut state = player.subscribe();
//!     while state.changed().await.is_ok() {
//!         let snapshot = state.borrow().clone();
//!         println!("{:?} - {}", snapshot.status, snapshot.now_playing);
//!         if snapshot.status == PlayerStatus::OffAir {
//!             break;
//!         }
//!     }
//!
//!     player.destroy().await;
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - [`channels`]: stream identifiers and their static metadata
//! - [`catalog`]: identifier → playable URL
//! - [`client`]: HTTP client for the title / metadata / live endpoints
//! - [`engine`]: audio engine seam and the headless HTTP engine
//! - [`session`]: one engine bound to one URL
//! - [`controller`]: the per-widget state machine (retry, hand-off, polling)
//! - [`player`]: factory, handle and the task running the controller
//! - [`time`]: clocks and one-shot timers, real and virtual
//! - [`fetch`]: background fetches feeding the controller
//! - [`ui`]: snapshot of what the widget shows
//! - [`episode`]: episode page links from archive file names
//! - [`config`]: YAML configuration

pub mod catalog;
pub mod channels;
pub mod client;
pub mod config;
pub mod constants;
pub mod controller;
pub mod engine;
pub mod episode;
pub mod error;
pub mod fetch;
pub mod metadata;
pub mod player;
pub mod session;
pub mod time;
pub mod ui;

// Re-exports for convenience
pub use catalog::{LivePathSource, StreamCatalog};
pub use channels::{StreamDescriptor, StreamKind, ALL_STREAMS};
pub use client::{ClientBuilder, MonarchyClient};
pub use config::{MonarchyConfig, PlayerOptions, Theme};
pub use controller::{PlayerController, PlayerMessage, UserCommand};
pub use engine::{AudioBackend, AudioEngine, EngineEvent, EngineOptions, SessionId};
pub use error::{Error, FailureReason, Result};
pub use metadata::{MetadataSource, StreamMetadata};
pub use player::{create_player, PlayerBuilder, PlayerHandle};
pub use ui::{PlayerStatus, UiReconciler, UiSnapshot};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
