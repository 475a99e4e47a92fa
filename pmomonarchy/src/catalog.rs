//! Stream catalog: identifier → title and playable URL.
//!
//! Fixed streams resolve without any I/O. The live broadcast asks a
//! [`LivePathSource`] every time, since its mount point rolls over on the
//! server side.

use crate::channels::{SourcePath, StreamDescriptor, StreamKind};
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::sync::Arc;
use url::Url;

/// Yields the current mount point of the live broadcast.
///
/// The returned value is either a path relative to the stream server or an
/// absolute URL.
#[async_trait]
pub trait LivePathSource: Send + Sync {
    async fn current_path(&self) -> Result<String>;
}

#[derive(Clone)]
pub struct StreamCatalog {
    base_url: Url,
    live: Arc<dyn LivePathSource>,
}

impl StreamCatalog {
    pub fn new(base_url: &str, live: Arc<dyn LivePathSource>) -> Result<Self> {
        Ok(Self {
            base_url: Url::parse(base_url)?,
            live,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn descriptor(&self, kind: StreamKind) -> StreamDescriptor {
        StreamDescriptor::new(kind)
    }

    /// URL of a stream with a fixed mount point, `None` for the live one.
    pub fn fixed_url(&self, kind: StreamKind) -> Option<String> {
        match self.descriptor(kind).source {
            SourcePath::Fixed(path) => self.join(path).ok(),
            SourcePath::Dynamic => None,
        }
    }

    /// Resolves the playable URL of `kind`, querying the live endpoint for
    /// the live broadcast.
    ///
    /// ```
    /// # use pmomonarchy::{MonarchyClient, StreamCatalog, StreamKind};
    /// # use std::sync::Arc;
    /// # tokio_test::block_on(async {
    /// let client = MonarchyClient::new()?;
    /// let catalog = StreamCatalog::new("https://mediamonarchy.live", Arc::new(client))?;
    ///
    /// let url = catalog.resolve_url(StreamKind::Rock).await?;
    /// assert_eq!(url, "https://mediamonarchy.live/stream5");
    /// # Ok::<(), pmomonarchy::Error>(())
    /// # }).unwrap();
    /// ```
    pub async fn resolve_url(&self, kind: StreamKind) -> Result<String> {
        match self.descriptor(kind).source {
            SourcePath::Fixed(path) => self.join(path),
            SourcePath::Dynamic => {
                let path = self.live.current_path().await?;
                if path.starts_with("http://") || path.starts_with("https://") {
                    Url::parse(&path)?;
                    Ok(path)
                } else {
                    self.join(&path)
                }
            }
        }
    }

    fn join(&self, path: &str) -> Result<String> {
        if path.is_empty() {
            return Err(Error::LivePath("empty path".into()));
        }
        Ok(self.base_url.join(path)?.to_string())
    }
}

impl std::fmt::Debug for StreamCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamCatalog")
            .field("base_url", &self.base_url.as_str())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channels::ALL_STREAMS;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingLive {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl LivePathSource for CountingLive {
        async fn current_path(&self) -> Result<String> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(format!("/live{n}"))
        }
    }

    fn catalog() -> (StreamCatalog, Arc<CountingLive>) {
        let live = Arc::new(CountingLive {
            calls: AtomicUsize::new(0),
        });
        let catalog = StreamCatalog::new("https://mediamonarchy.live", live.clone()).unwrap();
        (catalog, live)
    }

    #[tokio::test]
    async fn test_fixed_streams_are_constant_and_pure() {
        let (catalog, live) = catalog();
        for descriptor in ALL_STREAMS.iter().filter(|d| !d.kind.is_live()) {
            let first = catalog.resolve_url(descriptor.kind).await.unwrap();
            let second = catalog.resolve_url(descriptor.kind).await.unwrap();
            assert_eq!(first, second);
            assert_eq!(Some(first), catalog.fixed_url(descriptor.kind));
        }
        assert_eq!(live.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_music_url() {
        let (catalog, _) = catalog();
        assert_eq!(
            catalog.resolve_url(StreamKind::Music).await.unwrap(),
            "https://mediamonarchy.live/stream"
        );
    }

    #[tokio::test]
    async fn test_live_url_is_resolved_each_time() {
        let (catalog, live) = catalog();
        assert_eq!(catalog.fixed_url(StreamKind::OnAir), None);
        assert_eq!(
            catalog.resolve_url(StreamKind::OnAir).await.unwrap(),
            "https://mediamonarchy.live/live0"
        );
        assert_eq!(
            catalog.resolve_url(StreamKind::OnAir).await.unwrap(),
            "https://mediamonarchy.live/live1"
        );
        assert_eq!(live.calls.load(Ordering::SeqCst), 2);
    }
}
