//! A spawned player stays responsive while its HTTP sources hang.

mod common;

use async_trait::async_trait;
use common::FakeBackend;
use pmomonarchy::catalog::LivePathSource;
use pmomonarchy::error::Result;
use pmomonarchy::metadata::{MetadataSource, StreamMetadata};
use pmomonarchy::{PlayerBuilder, PlayerOptions, StreamKind};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, timeout};

/// Counts the requests that were abandoned before answering.
#[derive(Debug, Clone, Default)]
struct Abandoned(Arc<AtomicUsize>);

impl Abandoned {
    fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

struct AbandonGuard(Abandoned);

impl Drop for AbandonGuard {
    fn drop(&mut self) {
        self.0 .0.fetch_add(1, Ordering::SeqCst);
    }
}

/// Endpoints that accept the request and never answer.
#[derive(Debug, Clone, Default)]
struct HangingServer {
    abandoned: Abandoned,
}

impl HangingServer {
    async fn hang<T>(&self) -> T {
        let _guard = AbandonGuard(self.abandoned.clone());
        std::future::pending().await
    }
}

#[async_trait]
impl MetadataSource for HangingServer {
    async fn fetch_title(&self, _stream: StreamKind) -> Result<String> {
        self.hang().await
    }

    async fn fetch_metadata(&self, _stream: StreamKind) -> Result<StreamMetadata> {
        self.hang().await
    }
}

#[async_trait]
impl LivePathSource for HangingServer {
    async fn current_path(&self) -> Result<String> {
        self.hang().await
    }
}

async fn wait_for(mut condition: impl FnMut() -> bool) -> bool {
    timeout(Duration::from_secs(2), async {
        while !condition() {
            sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .is_ok()
}

#[tokio::test]
async fn test_hanging_metadata_does_not_hold_up_playback() {
    let server = HangingServer::default();
    let backend = FakeBackend::default();
    let player = PlayerBuilder::new(PlayerOptions::default().with_stream("music"))
        .container("mm-player-hanging")
        .metadata_source(Arc::new(server.clone()))
        .backend(Arc::new(backend.clone()))
        .spawn()
        .unwrap();

    player.toggle_play();
    assert!(
        wait_for(|| backend.created() == 1).await,
        "click not handled while the refresh hangs"
    );

    let destroyed = timeout(Duration::from_secs(2), player.destroy()).await;
    assert!(destroyed.is_ok(), "destroy held up by the refresh");
    assert!(backend.live_engines().is_empty());
    // title and metadata requests are both abandoned
    assert!(wait_for(|| server.abandoned.count() == 2).await);
}

#[tokio::test]
async fn test_hanging_live_endpoint_does_not_hold_up_destroy() {
    let server = HangingServer::default();
    let backend = FakeBackend::default();
    let player = PlayerBuilder::new(PlayerOptions::default().with_stream("onair"))
        .container("mm-player-hanging-live")
        .live_source(Arc::new(server.clone()))
        .backend(Arc::new(backend.clone()))
        .spawn()
        .unwrap();

    player.toggle_play();
    player.set_volume(0.2);
    assert!(
        wait_for(|| (player.snapshot().volume - 0.2).abs() < f32::EPSILON).await,
        "volume change not handled while the live endpoint hangs"
    );
    assert!(player.snapshot().loading);

    let destroyed = timeout(Duration::from_secs(2), player.destroy()).await;
    assert!(destroyed.is_ok(), "destroy held up by the live endpoint");
    assert_eq!(backend.created(), 0);
    assert!(wait_for(|| server.abandoned.count() == 2).await);
}
