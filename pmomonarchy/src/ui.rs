//! What the widget shows.
//!
//! The controller keeps a [`UiSnapshot`] up to date and hands every new
//! version to a [`UiReconciler`]. Rendering (DOM, terminal, web socket...) is
//! the reconciler's business.

use crate::constants::{TEXT_LOADING, TEXT_OFF_AIR};
use serde::Serialize;
use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PlayerStatus {
    #[default]
    Idle,
    Loading,
    Playing,
    Paused,
    /// Retries exhausted; only a new widget gets out of it
    OffAir,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UiSnapshot {
    pub status: PlayerStatus,
    /// Spinner on the play/pause control
    pub loading: bool,
    /// `false` once off air: the control is disabled
    pub control_enabled: bool,
    pub now_playing: String,
    pub episode_link: Option<String>,
    pub volume: f32,
}

impl UiSnapshot {
    pub fn new(volume: f32) -> Self {
        Self {
            status: PlayerStatus::Idle,
            loading: false,
            control_enabled: true,
            now_playing: TEXT_LOADING.to_string(),
            episode_link: None,
            volume,
        }
    }

    pub fn is_off_air(&self) -> bool {
        self.status == PlayerStatus::OffAir
    }

    pub(crate) fn set_off_air(&mut self) {
        self.status = PlayerStatus::OffAir;
        self.loading = false;
        self.control_enabled = false;
        self.now_playing = TEXT_OFF_AIR.to_string();
    }
}

pub trait UiReconciler: Send {
    fn render(&mut self, snapshot: &UiSnapshot);
}

/// Publishes snapshots on a tokio `watch` channel.
#[derive(Debug)]
pub struct WatchUi {
    tx: watch::Sender<UiSnapshot>,
}

impl WatchUi {
    pub fn new(initial: UiSnapshot) -> (Self, watch::Receiver<UiSnapshot>) {
        let (tx, rx) = watch::channel(initial);
        (Self { tx }, rx)
    }
}

impl UiReconciler for WatchUi {
    fn render(&mut self, snapshot: &UiSnapshot) {
        self.tx.send_if_modified(|current| {
            if current == snapshot {
                false
            } else {
                *current = snapshot.clone();
                true
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_off_air_disables_control() {
        let mut snapshot = UiSnapshot::new(0.5);
        snapshot.loading = true;
        snapshot.set_off_air();
        assert!(snapshot.is_off_air());
        assert!(!snapshot.loading);
        assert!(!snapshot.control_enabled);
        assert_eq!(snapshot.now_playing, "Off Air");
    }

    #[test]
    fn test_watch_ui_skips_identical_snapshots() {
        let (mut ui, mut rx) = WatchUi::new(UiSnapshot::new(0.5));
        ui.render(&UiSnapshot::new(0.5));
        assert!(!rx.has_changed().unwrap());

        let mut playing = UiSnapshot::new(0.5);
        playing.status = PlayerStatus::Playing;
        ui.render(&playing);
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().status, PlayerStatus::Playing);
    }
}
