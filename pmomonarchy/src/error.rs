//! Error types for the Media Monarchy player core

use std::fmt;

/// Result type alias for Media Monarchy operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur when talking to the Media Monarchy endpoints or
/// building a player
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Endpoint answered with a non-success status
    #[error("Endpoint {url} returned status {status}")]
    Status { url: String, status: u16 },

    /// JSON parsing failed
    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Unknown stream identifier (configuration error)
    #[error("Unknown stream identifier: {0}")]
    UnknownStream(String),

    /// The live endpoint did not yield a usable stream path
    #[error("Live stream path unavailable: {0}")]
    LivePath(String),

    /// The audio backend refused to create an engine
    #[error("Audio engine error: {0}")]
    Engine(String),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a generic error from a string
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }
}

/// Why a playback attempt ended up in the retry path.
///
/// None of these ever reach the host as an `Err`; they only drive the
/// retry policy and the diagnostic logs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// The source was unreachable or unplayable
    LoadError(String),
    /// The engine refused to start
    PlayError(String),
    /// The stream reached its end
    StreamEnded,
    /// The engine stopped on its own
    Stopped,
    /// A hand-off ran out of time or attempts
    HandoffTimeout,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LoadError(msg) => write!(f, "load error: {msg}"),
            Self::PlayError(msg) => write!(f, "play error: {msg}"),
            Self::StreamEnded => f.write_str("stream ended"),
            Self::Stopped => f.write_str("stream stopped"),
            Self::HandoffTimeout => f.write_str("stream switch failed"),
        }
    }
}
