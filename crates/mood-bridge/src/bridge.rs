use serde::Serialize;
use tracing::{debug, info};

use crate::emotion::{EmotionLabel, EmotionReading, EmotionSmoother};
use crate::errors::MoodError;
use crate::playback::{PlaybackSink, PlaylistTable};
use crate::source::EmotionSource;

#[derive(Clone, Debug)]
pub struct BridgeSettings {
    /// EMA weight of the newest event.
    pub alpha: f32,
    /// Smoothed score the dominant label needs before the mood may switch.
    pub threshold: f32,
}

impl Default for BridgeSettings {
    fn default() -> Self {
        Self {
            alpha: 0.3,
            threshold: 0.4,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TickOutcome {
    /// The mood switched and the sink accepted the new tracks.
    Changed {
        mood: EmotionLabel,
        previous: Option<EmotionLabel>,
        reading: EmotionReading,
    },
    Unchanged {
        mood: Option<EmotionLabel>,
        reading: EmotionReading,
    },
}

/// Turns emotion events into playback requests, one event per [`MoodBridge::tick`].
///
/// The sink is only called when the dominant smoothed label changes. A failed request is
/// returned to the caller and the new mood is kept, so it is not requested again until the
/// mood changes once more.
pub struct MoodBridge<S, K>
where
    S: EmotionSource,
    K: PlaybackSink,
{
    source: S,
    sink: K,
    table: PlaylistTable,
    smoother: EmotionSmoother,
    threshold: f32,
    mood: Option<EmotionLabel>,
}

impl<S, K> MoodBridge<S, K>
where
    S: EmotionSource,
    K: PlaybackSink,
{
    pub fn new(source: S, sink: K, table: PlaylistTable, settings: BridgeSettings) -> Self {
        Self {
            source,
            sink,
            table,
            smoother: EmotionSmoother::new(settings.alpha),
            threshold: settings.threshold.clamp(0.0, 1.0),
            mood: None,
        }
    }

    pub fn mood(&self) -> Option<EmotionLabel> {
        self.mood
    }

    pub fn sink(&self) -> &K {
        &self.sink
    }

    pub async fn tick(&mut self) -> Result<TickOutcome, MoodError> {
        let event = self.source.next_event().await?;
        let reading = self.smoother.update(&event).clone();

        let candidate = reading
            .dominant()
            .filter(|(_, score)| *score >= self.threshold)
            .map(|(label, _)| label);
        let Some(next) = candidate.filter(|label| Some(*label) != self.mood) else {
            debug!(target: "moodbridge.bridge", mood = ?self.mood, "mood unchanged");
            return Ok(TickOutcome::Unchanged {
                mood: self.mood,
                reading,
            });
        };

        let previous = self.mood.replace(next);
        info!(target: "moodbridge.bridge", mood = %next, ?previous, "mood changed");
        let tracks = self.table.tracks_for(next)?;
        self.sink.play(next, tracks).await?;
        Ok(TickOutcome::Changed {
            mood: next,
            previous,
            reading,
        })
    }
}
