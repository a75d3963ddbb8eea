use thiserror::Error;

use crate::emotion::EmotionLabel;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum MoodError {
    #[error("emotion source silent for {after_ms}ms")]
    SourceSilent { after_ms: u64 },
    #[error("emotion source closed")]
    SourceClosed,
    #[error("playback rejected with status {status}")]
    PlaybackRejected { status: u16, body: String },
    #[error("playback transport failed: {0}")]
    PlaybackTransport(String),
    #[error("no tracks configured for mood `{0}`")]
    NoTracksForMood(EmotionLabel),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl MoodError {
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }
}
