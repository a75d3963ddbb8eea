use std::time::Duration;

use anyhow::{Context, Result};
use element_scanner::{ScanOptions, ScannerPolicy};
use mood_bridge::{BridgeSettings, HttpPlaybackConfig, PlaylistTable};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub scanner: ScannerPolicy,
    /// Defaults for `scan`; command-line flags override individual fields.
    #[serde(default)]
    pub scan: ScanOptions,
    #[serde(default)]
    pub mood: MoodConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct MoodConfig {
    pub alpha: f32,
    pub threshold: f32,
    /// Pause between simulated emotion events.
    pub tick_interval: String,
    pub playlists: PlaylistTable,
    pub playback: PlaybackSettings,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct PlaybackSettings {
    pub api_base: String,
    /// Bearer token; `ELEMENTSCAN_PLAYBACK_TOKEN` takes precedence.
    pub token: Option<String>,
    pub timeout: String,
}

impl Default for MoodConfig {
    fn default() -> Self {
        let bridge = BridgeSettings::default();
        Self {
            alpha: bridge.alpha,
            threshold: bridge.threshold,
            tick_interval: "500ms".to_string(),
            playlists: PlaylistTable::default(),
            playback: PlaybackSettings::default(),
        }
    }
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            api_base: "https://api.spotify.com/v1".to_string(),
            token: None,
            timeout: "5s".to_string(),
        }
    }
}

impl MoodConfig {
    pub fn bridge_settings(&self) -> BridgeSettings {
        BridgeSettings {
            alpha: self.alpha,
            threshold: self.threshold,
        }
    }

    pub fn tick_interval(&self) -> Result<Duration> {
        humantime::parse_duration(&self.tick_interval)
            .with_context(|| format!("Invalid mood.tick_interval `{}`", self.tick_interval))
    }
}

impl PlaybackSettings {
    pub fn timeout(&self) -> Result<Duration> {
        humantime::parse_duration(&self.timeout)
            .with_context(|| format!("Invalid mood.playback.timeout `{}`", self.timeout))
    }

    /// HTTP sink settings, or `None` when no token is configured.
    pub fn http_config(&self) -> Result<Option<HttpPlaybackConfig>> {
        let Some(token) = self.token.as_ref().filter(|token| !token.trim().is_empty()) else {
            return Ok(None);
        };
        Ok(Some(HttpPlaybackConfig {
            api_base: self.api_base.clone(),
            token: token.clone(),
            timeout: self.timeout()?,
        }))
    }
}
