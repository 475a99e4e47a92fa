//! Media Monarchy stream definitions
//!
//! This module defines the eight streams a widget can be bound to and their
//! static metadata. Only the live broadcast has no fixed path: its mount point
//! moves on the server side and has to be resolved through
//! [`StreamCatalog`](crate::catalog::StreamCatalog).

use crate::error::Error;
use std::fmt;
use std::str::FromStr;

/// Logical identifier for a Media Monarchy stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamKind {
    OnAir,
    Music,
    News,
    Rock,
    Techno,
    Country,
    Eclectic,
    Pop,
}

impl StreamKind {
    pub const fn slug(self) -> &'static str {
        match self {
            Self::OnAir => "onair",
            Self::Music => "music",
            Self::News => "news",
            Self::Rock => "rock",
            Self::Techno => "techno",
            Self::Country => "country",
            Self::Eclectic => "eclectic",
            Self::Pop => "pop",
        }
    }

    pub const fn display_title(self) -> &'static str {
        match self {
            Self::OnAir => "Media Monarchy Live Broadcast",
            Self::Music => "PUTV All Genres Radio",
            Self::News => "Morning Monarchy Archive Radio",
            Self::Rock => "PUTV Rock Radio",
            Self::Techno => "PUTV Techno Radio",
            Self::Country => "PUTV Country Radio",
            Self::Eclectic => "PUTV Eclectic Radio",
            Self::Pop => "PUTV Pop Radio",
        }
    }

    /// Mount point relative to the stream server, `None` for the live
    /// broadcast whose path is resolved at runtime.
    pub const fn fixed_path(self) -> Option<&'static str> {
        match self {
            Self::OnAir => None,
            Self::Music => Some("/stream"),
            Self::News => Some("/stream3"),
            Self::Rock => Some("/stream5"),
            Self::Techno => Some("/stream6"),
            Self::Country => Some("/stream4"),
            Self::Eclectic => Some("/stream7"),
            Self::Pop => Some("/stream8"),
        }
    }

    pub const fn is_live(self) -> bool {
        matches!(self, Self::OnAir)
    }
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for StreamKind {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "onair" => Ok(Self::OnAir),
            "music" => Ok(Self::Music),
            "news" => Ok(Self::News),
            "rock" => Ok(Self::Rock),
            "techno" => Ok(Self::Techno),
            "country" => Ok(Self::Country),
            // the plugin documentation has always spelled it this way
            "eclectic" | "ecclectic" => Ok(Self::Eclectic),
            "pop" => Ok(Self::Pop),
            other => Err(Error::UnknownStream(other.to_string())),
        }
    }
}

/// How the source path of a stream is obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourcePath {
    Fixed(&'static str),
    Dynamic,
}

/// Metadata descriptor for a stream.
#[derive(Debug, Clone, Copy)]
pub struct StreamDescriptor {
    pub kind: StreamKind,
    pub slug: &'static str,
    pub display_title: &'static str,
    pub source: SourcePath,
}

impl StreamDescriptor {
    pub const fn new(kind: StreamKind) -> Self {
        Self {
            slug: kind.slug(),
            display_title: kind.display_title(),
            source: match kind.fixed_path() {
                Some(path) => SourcePath::Fixed(path),
                None => SourcePath::Dynamic,
            },
            kind,
        }
    }
}

/// All available Media Monarchy streams
pub const ALL_STREAMS: [StreamDescriptor; 8] = [
    StreamDescriptor::new(StreamKind::OnAir),
    StreamDescriptor::new(StreamKind::Music),
    StreamDescriptor::new(StreamKind::News),
    StreamDescriptor::new(StreamKind::Rock),
    StreamDescriptor::new(StreamKind::Techno),
    StreamDescriptor::new(StreamKind::Country),
    StreamDescriptor::new(StreamKind::Eclectic),
    StreamDescriptor::new(StreamKind::Pop),
];
