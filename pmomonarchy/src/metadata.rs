//! Now-playing metadata for the archive / music streams.

use crate::channels::StreamKind;
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Source of now-playing information for a stream.
#[async_trait]
pub trait MetadataSource: Send + Sync {
    /// Plain-text title of what is playing
    async fn fetch_title(&self, stream: StreamKind) -> Result<String>;

    /// Descriptor of the file being played
    async fn fetch_metadata(&self, stream: StreamKind) -> Result<StreamMetadata>;
}

/// Document served by `/{stream}_metadata`.
///
/// Only the file name is used; everything else the server adds is ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StreamMetadata {
    #[serde(default)]
    pub format: Option<FormatSection>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FormatSection {
    #[serde(default)]
    pub filename: Option<String>,
}

impl StreamMetadata {
    pub fn with_filename(filename: impl Into<String>) -> Self {
        Self {
            format: Some(FormatSection {
                filename: Some(filename.into()),
            }),
        }
    }

    pub fn filename(&self) -> Option<&str> {
        self.format.as_ref()?.filename.as_deref()
    }
}
