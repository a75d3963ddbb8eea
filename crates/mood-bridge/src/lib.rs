//! Emotion-driven playback.
//!
//! An [`EmotionSource`] produces label scores, [`EmotionSmoother`] averages them and
//! [`MoodBridge`] asks a [`PlaybackSink`] to play the tracks configured for the dominant
//! mood whenever that mood changes.

pub mod bridge;
pub mod emotion;
pub mod errors;
pub mod playback;
pub mod source;

pub use bridge::{BridgeSettings, MoodBridge, TickOutcome};
pub use emotion::{EmotionEvent, EmotionLabel, EmotionReading, EmotionSmoother};
pub use errors::MoodError;
pub use playback::{
    HttpPlaybackConfig, HttpPlaybackSink, LoggingPlaybackSink, PlaybackSink, PlaylistTable,
};
pub use source::{ChannelEmotionSource, EmotionSource, SimulatedEmotionSource};
