//! Configuration structures for the Media Monarchy player.
//!
//! Values come from an embedded default YAML document, optionally merged with
//! a user file and with `PMOMONARCHY__section__key=value` environment
//! overrides. The rest of the crate only sees the typed structs below.

use crate::constants::*;
use crate::channels::StreamKind;
use crate::error::Error;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use std::path::Path;
use std::time::Duration;
use std::{env, fs};
use tracing::info;

const DEFAULT_CONFIG: &str = include_str!("monarchy.yaml");

/// Environment variable pointing at a user configuration file
pub const ENV_CONFIG_FILE: &str = "PMOMONARCHY_CONFIG";
const ENV_PREFIX: &str = "PMOMONARCHY__";

/// Top-level configuration block.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MonarchyConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub polling: PollingConfig,
    #[serde(default)]
    pub player: PlayerOptions,
}

impl MonarchyConfig {
    /// Loads the embedded defaults, merges `path` (or the file named by
    /// `PMOMONARCHY_CONFIG`) on top of them, then applies environment
    /// overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut value: Value = serde_yaml::from_str(DEFAULT_CONFIG)?;

        let user_path = path
            .map(|p| p.to_path_buf())
            .or_else(|| env::var(ENV_CONFIG_FILE).ok().map(Into::into));

        if let Some(user_path) = user_path {
            let data = fs::read_to_string(&user_path)
                .with_context(|| format!("reading {}", user_path.display()))?;
            let external: Value = serde_yaml::from_str(&data)
                .with_context(|| format!("parsing {}", user_path.display()))?;
            info!(config_file = %user_path.display(), "Loaded config file");
            merge_yaml(&mut value, &external);
        }

        apply_env_overrides(&mut value, env::vars());

        let config: Self = serde_yaml::from_value(value)?;
        config.validate()?;
        Ok(config)
    }

    /// Parses a YAML document merged over the embedded defaults.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let mut value: Value = serde_yaml::from_str(DEFAULT_CONFIG)?;
        let external: Value = serde_yaml::from_str(yaml)?;
        merge_yaml(&mut value, &external);
        let config: Self = serde_yaml::from_value(value)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        url::Url::parse(&self.api.base_url).context("api.base_url")?;
        url::Url::parse(&self.api.episode_base_url).context("api.episode_base_url")?;
        self.player.stream_kind()?;
        if self.polling.metadata_seconds == 0 || self.polling.stream_check_seconds == 0 {
            return Err(Error::Config("polling intervals must be positive".into()).into());
        }
        if self.api.request_timeout_seconds == 0 {
            return Err(Error::Config("api.request_timeout_seconds must be positive".into()).into());
        }
        Ok(())
    }
}

/// Endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "ApiConfig::default_base_url")]
    pub base_url: String,
    #[serde(default = "ApiConfig::default_episode_base_url")]
    pub episode_base_url: String,
    #[serde(default = "ApiConfig::default_user_agent")]
    pub user_agent: String,
    #[serde(default = "ApiConfig::default_request_timeout")]
    pub request_timeout_seconds: u64,
}

impl ApiConfig {
    fn default_base_url() -> String {
        DEFAULT_BASE_URL.to_string()
    }

    fn default_episode_base_url() -> String {
        DEFAULT_EPISODE_BASE_URL.to_string()
    }

    fn default_user_agent() -> String {
        DEFAULT_USER_AGENT.to_string()
    }

    const fn default_request_timeout() -> u64 {
        DEFAULT_REQUEST_TIMEOUT_SECS
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: Self::default_base_url(),
            episode_base_url: Self::default_episode_base_url(),
            user_agent: Self::default_user_agent(),
            request_timeout_seconds: Self::default_request_timeout(),
        }
    }
}

/// Retry and hand-off bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "RetryConfig::default_attempts")]
    pub attempts: u32,
    #[serde(default = "RetryConfig::default_delay")]
    pub delay_seconds: u64,
    #[serde(default = "RetryConfig::default_switch_budget")]
    pub switch_budget_seconds: u64,
}

impl RetryConfig {
    const fn default_attempts() -> u32 {
        RETRY_ATTEMPTS
    }

    const fn default_delay() -> u64 {
        RETRY_DELAY_SECS
    }

    const fn default_switch_budget() -> u64 {
        STREAM_SWITCH_BUDGET_SECS
    }

    pub fn delay(&self) -> Duration {
        Duration::from_secs(self.delay_seconds)
    }

    pub fn switch_budget(&self) -> Duration {
        Duration::from_secs(self.switch_budget_seconds)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            attempts: Self::default_attempts(),
            delay_seconds: Self::default_delay(),
            switch_budget_seconds: Self::default_switch_budget(),
        }
    }
}

/// Polling cadence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollingConfig {
    #[serde(default = "PollingConfig::default_metadata")]
    pub metadata_seconds: u64,
    #[serde(default = "PollingConfig::default_stream_check")]
    pub stream_check_seconds: u64,
}

impl PollingConfig {
    const fn default_metadata() -> u64 {
        METADATA_REFRESH_SECS
    }

    const fn default_stream_check() -> u64 {
        STREAM_CHECK_SECS
    }

    pub fn metadata_interval(&self) -> Duration {
        Duration::from_secs(self.metadata_seconds)
    }

    pub fn stream_check_interval(&self) -> Duration {
        Duration::from_secs(self.stream_check_seconds)
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            metadata_seconds: Self::default_metadata(),
            stream_check_seconds: Self::default_stream_check(),
        }
    }
}

/// Colour scheme of the widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Dark,
    Light,
}

/// Per-widget options, captured once when the player is created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerOptions {
    #[serde(default = "PlayerOptions::default_stream")]
    pub stream: String,
    #[serde(default)]
    pub theme: Theme,
    #[serde(default = "PlayerOptions::default_width")]
    pub width: String,
    #[serde(default = "PlayerOptions::default_height")]
    pub height: String,
    #[serde(default = "PlayerOptions::default_volume")]
    pub volume: f32,
}

impl PlayerOptions {
    fn default_stream() -> String {
        DEFAULT_STREAM.to_string()
    }

    fn default_width() -> String {
        DEFAULT_WIDTH.to_string()
    }

    fn default_height() -> String {
        DEFAULT_HEIGHT.to_string()
    }

    const fn default_volume() -> f32 {
        DEFAULT_VOLUME
    }

    pub fn with_stream(mut self, stream: impl Into<String>) -> Self {
        self.stream = stream.into();
        self
    }

    pub fn with_volume(mut self, volume: f32) -> Self {
        self.volume = volume;
        self
    }

    pub fn with_theme(mut self, theme: Theme) -> Self {
        self.theme = theme;
        self
    }

    /// Parses the stream identifier; an unknown one is a configuration error.
    pub fn stream_kind(&self) -> crate::error::Result<StreamKind> {
        self.stream.parse()
    }

    /// Initial volume clamped to `[0, 1]`.
    pub fn initial_volume(&self) -> f32 {
        clamp_volume(self.volume)
    }
}

impl Default for PlayerOptions {
    fn default() -> Self {
        Self {
            stream: Self::default_stream(),
            theme: Theme::default(),
            width: Self::default_width(),
            height: Self::default_height(),
            volume: Self::default_volume(),
        }
    }
}

pub(crate) fn clamp_volume(volume: f32) -> f32 {
    if volume.is_nan() {
        return DEFAULT_VOLUME;
    }
    volume.clamp(0.0, 1.0)
}

fn merge_yaml(default: &mut Value, external: &Value) {
    match (default, external) {
        (Value::Mapping(dmap), Value::Mapping(emap)) => {
            for (k, v) in emap {
                match dmap.get_mut(k) {
                    Some(dv) => merge_yaml(dv, v),
                    None => {
                        dmap.insert(k.clone(), v.clone());
                    }
                }
            }
        }
        (d, e) => *d = e.clone(),
    }
}

fn apply_env_overrides(config: &mut Value, vars: impl Iterator<Item = (String, String)>) {
    for (key, value) in vars {
        let Some(path) = key.strip_prefix(ENV_PREFIX) else {
            continue;
        };
        let path: Vec<String> = path.split("__").map(|s| s.to_lowercase()).collect();
        let yaml_value =
            serde_yaml::from_str::<Value>(&value).unwrap_or(Value::String(value.clone()));
        set_path(config, &path, yaml_value);
    }
}

fn set_path(node: &mut Value, path: &[String], value: Value) {
    let Some((head, rest)) = path.split_first() else {
        *node = value;
        return;
    };
    if !node.is_mapping() {
        *node = Value::Mapping(Mapping::new());
    }
    if let Value::Mapping(map) = node {
        let child = map
            .entry(Value::String(head.clone()))
            .or_insert(Value::Null);
        set_path(child, rest, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_defaults() {
        let config = MonarchyConfig::from_yaml_str("{}").unwrap();
        assert_eq!(config.api.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.retry.attempts, 20);
        assert_eq!(config.retry.delay(), Duration::from_secs(15));
        assert_eq!(config.retry.switch_budget(), Duration::from_secs(300));
        assert_eq!(config.polling.stream_check_interval(), Duration::from_secs(60));
        assert_eq!(config.player.stream, "music");
        assert_eq!(config.player.theme, Theme::Dark);
    }

    #[test]
    fn test_partial_override() {
        let config = MonarchyConfig::from_yaml_str(
            "retry:\n  attempts: 3\nplayer:\n  stream: rock\n  theme: light\n",
        )
        .unwrap();
        assert_eq!(config.retry.attempts, 3);
        assert_eq!(config.retry.delay_seconds, 15);
        assert_eq!(config.player.stream_kind().unwrap(), StreamKind::Rock);
        assert_eq!(config.player.theme, Theme::Light);
    }

    #[test]
    fn test_unknown_stream_is_rejected() {
        assert!(MonarchyConfig::from_yaml_str("player:\n  stream: jazz\n").is_err());
    }

    #[test]
    fn test_zero_durations_are_rejected() {
        assert!(MonarchyConfig::from_yaml_str("api:\n  request_timeout_seconds: 0\n").is_err());
        assert!(MonarchyConfig::from_yaml_str("polling:\n  metadata_seconds: 0\n").is_err());
        assert!(MonarchyConfig::from_yaml_str("api:\n  request_timeout_seconds: 1\n").is_ok());
    }

    #[test]
    fn test_env_overrides() {
        let mut value: Value = serde_yaml::from_str(DEFAULT_CONFIG).unwrap();
        let vars = vec![
            ("PMOMONARCHY__RETRY__ATTEMPTS".to_string(), "5".to_string()),
            ("PMOMONARCHY__API__BASE_URL".to_string(), "http://localhost:9000".to_string()),
            ("UNRELATED".to_string(), "x".to_string()),
        ];
        apply_env_overrides(&mut value, vars.into_iter());
        let config: MonarchyConfig = serde_yaml::from_value(value).unwrap();
        assert_eq!(config.retry.attempts, 5);
        assert_eq!(config.api.base_url, "http://localhost:9000");
    }

    #[test]
    fn test_volume_is_clamped() {
        assert_eq!(PlayerOptions::default().with_volume(1.7).initial_volume(), 1.0);
        assert_eq!(PlayerOptions::default().with_volume(-0.2).initial_volume(), 0.0);
        assert_eq!(clamp_volume(f32::NAN), DEFAULT_VOLUME);
    }
}
