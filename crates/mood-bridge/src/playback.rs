use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use url::Url;

use crate::emotion::EmotionLabel;
use crate::errors::MoodError;

/// Where mood changes end up. Implementations report failures and never retry.
#[async_trait]
pub trait PlaybackSink: Send + Sync {
    async fn play(&self, mood: EmotionLabel, tracks: &[String]) -> Result<(), MoodError>;
}

/// Track identifiers per mood, in play order.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlaylistTable {
    entries: BTreeMap<EmotionLabel, Vec<String>>,
}

impl PlaylistTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, mood: EmotionLabel, tracks: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.insert(mood, tracks);
        self
    }

    pub fn insert(&mut self, mood: EmotionLabel, tracks: impl IntoIterator<Item = impl Into<String>>) {
        self.entries
            .insert(mood, tracks.into_iter().map(Into::into).collect());
    }

    pub fn tracks_for(&self, mood: EmotionLabel) -> Result<&[String], MoodError> {
        self.entries
            .get(&mood)
            .filter(|tracks| !tracks.is_empty())
            .map(Vec::as_slice)
            .ok_or(MoodError::NoTracksForMood(mood))
    }

    pub fn moods(&self) -> impl Iterator<Item = EmotionLabel> + '_ {
        self.entries.keys().copied()
    }
}

#[derive(Clone, Debug)]
pub struct HttpPlaybackConfig {
    pub api_base: String,
    pub token: String,
    pub timeout: Duration,
}

/// Starts playback through a Web API style player endpoint:
/// `PUT {api_base}/me/player/play` with `{"uris": [...]}` and a bearer token.
pub struct HttpPlaybackSink {
    client: Client,
    endpoint: Url,
    token: String,
}

#[derive(Serialize)]
struct PlayRequest<'a> {
    uris: &'a [String],
}

impl HttpPlaybackSink {
    pub fn new(config: HttpPlaybackConfig) -> Result<Self, MoodError> {
        if config.token.trim().is_empty() {
            return Err(MoodError::invalid_config("missing playback token"));
        }
        let base = Url::parse(&format!("{}/", config.api_base.trim_end_matches('/')))
            .map_err(|err| MoodError::invalid_config(format!("invalid api base: {err}")))?;
        let endpoint = base
            .join("me/player/play")
            .map_err(|err| MoodError::invalid_config(format!("invalid api base: {err}")))?;
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|err| {
                MoodError::invalid_config(format!("failed to build HTTP client: {err}"))
            })?;
        Ok(Self {
            client,
            endpoint,
            token: config.token,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl PlaybackSink for HttpPlaybackSink {
    async fn play(&self, mood: EmotionLabel, tracks: &[String]) -> Result<(), MoodError> {
        let response = self
            .client
            .put(self.endpoint.clone())
            .bearer_auth(&self.token)
            .json(&PlayRequest { uris: tracks })
            .send()
            .await
            .map_err(|err| MoodError::PlaybackTransport(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<response unavailable>".to_string());
            warn!(target: "moodbridge.playback", %mood, status = status.as_u16(), "playback rejected");
            return Err(MoodError::PlaybackRejected {
                status: status.as_u16(),
                body,
            });
        }
        info!(target: "moodbridge.playback", %mood, tracks = tracks.len(), "playback started");
        Ok(())
    }
}

/// Logs and records every request instead of playing anything.
#[derive(Default)]
pub struct LoggingPlaybackSink {
    calls: Mutex<Vec<(EmotionLabel, Vec<String>)>>,
}

impl LoggingPlaybackSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<(EmotionLabel, Vec<String>)> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl PlaybackSink for LoggingPlaybackSink {
    async fn play(&self, mood: EmotionLabel, tracks: &[String]) -> Result<(), MoodError> {
        debug!(target: "moodbridge.playback", %mood, ?tracks, "dry-run playback");
        self.calls.lock().push((mood, tracks.to_vec()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_or_empty_moods_are_errors() {
        let table = PlaylistTable::new()
            .with(EmotionLabel::Joy, ["spotify:track:a", "spotify:track:b"])
            .with(EmotionLabel::Fear, Vec::<String>::new());
        assert_eq!(table.tracks_for(EmotionLabel::Joy).unwrap().len(), 2);
        assert_eq!(
            table.tracks_for(EmotionLabel::Fear).unwrap_err(),
            MoodError::NoTracksForMood(EmotionLabel::Fear)
        );
        assert_eq!(
            table.tracks_for(EmotionLabel::Anger).unwrap_err(),
            MoodError::NoTracksForMood(EmotionLabel::Anger)
        );
    }

    #[test]
    fn playlist_table_reads_yaml_like_maps() {
        let table: PlaylistTable =
            serde_json::from_str(r#"{"sadness": ["spotify:playlist:rainy"]}"#).unwrap();
        assert_eq!(
            table.tracks_for(EmotionLabel::Sadness).unwrap(),
            ["spotify:playlist:rainy".to_string()]
        );
    }

    #[test]
    fn http_sink_requires_token_and_valid_base() {
        let config = HttpPlaybackConfig {
            api_base: "https://api.example.test/v1".into(),
            token: String::new(),
            timeout: Duration::from_secs(1),
        };
        assert!(HttpPlaybackSink::new(config.clone()).is_err());

        let sink = HttpPlaybackSink::new(HttpPlaybackConfig {
            token: "t".into(),
            ..config
        })
        .unwrap();
        assert_eq!(sink.endpoint().as_str(), "https://api.example.test/v1/me/player/play");

        let broken = HttpPlaybackSink::new(HttpPlaybackConfig {
            api_base: "not a url".into(),
            token: "t".into(),
            timeout: Duration::from_secs(1),
        });
        assert!(matches!(broken, Err(MoodError::InvalidConfig(_))));
    }
}
