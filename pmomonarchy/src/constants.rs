//! Constants for the Media Monarchy player core.
//!
//! These are the values the widget has always shipped with. Every one of them
//! can be overridden through [`MonarchyConfig`](crate::config::MonarchyConfig).

// ============================================================================
// Endpoints
// ============================================================================

/// Stream and metadata server
pub const DEFAULT_BASE_URL: &str = "https://mediamonarchy.live";

/// Site hosting the episode pages
pub const DEFAULT_EPISODE_BASE_URL: &str = "https://mediamonarchy.com";

/// Endpoint (relative to the base URL) yielding the current live mount point
pub const LIVE_PATH_ENDPOINT: &str = "/onair_stream";

/// Default User-Agent
pub const DEFAULT_USER_AGENT: &str = "pmomonarchy/0.1.0";

/// Default timeout for title / metadata / live path requests (seconds)
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

// ============================================================================
// Retry policy
// ============================================================================

/// Attempts before a widget gives up and goes off air
pub const RETRY_ATTEMPTS: u32 = 20;

/// Fixed delay between two attempts (seconds)
pub const RETRY_DELAY_SECS: u64 = 15;

/// Time budget of a stream hand-off, counted from the detected change (seconds)
///
/// Value: 300 seconds (5 minutes)
pub const STREAM_SWITCH_BUDGET_SECS: u64 = 300;

// ============================================================================
// Polling intervals
// ============================================================================

/// Now-playing refresh interval (seconds)
pub const METADATA_REFRESH_SECS: u64 = 60;

/// Live mount point check interval (seconds)
pub const STREAM_CHECK_SECS: u64 = 60;

// ============================================================================
// Widget defaults
// ============================================================================

pub const DEFAULT_STREAM: &str = "music";
pub const DEFAULT_VOLUME: f32 = 0.5;
pub const DEFAULT_WIDTH: &str = "99%";
pub const DEFAULT_HEIGHT: &str = "63%";

/// Format hint handed to the audio engine
pub const STREAM_FORMAT: &str = "mp3";

// ============================================================================
// Status texts
// ============================================================================

pub const TEXT_LOADING: &str = "Loading...";
pub const TEXT_NO_TITLE: &str = "No title available";
pub const TEXT_LIVE: &str = "Live Broadcast";
pub const TEXT_OFF_AIR: &str = "Off Air";
pub const TEXT_EPISODE_LINK: &str = "View Episode Details";
