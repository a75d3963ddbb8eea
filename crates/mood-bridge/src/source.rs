use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::sync::mpsc;
use tracing::trace;

use crate::emotion::{EmotionEvent, EmotionLabel};
use crate::errors::MoodError;

/// A stream of emotion observations.
#[async_trait]
pub trait EmotionSource: Send {
    async fn next_event(&mut self) -> Result<EmotionEvent, MoodError>;
}

/// Relays events pushed by an external producer, such as a recognition SDK callback.
pub struct ChannelEmotionSource {
    rx: mpsc::Receiver<EmotionEvent>,
    silence: Duration,
}

impl ChannelEmotionSource {
    /// The sender side goes to the producer. `silence` bounds the wait for each event.
    pub fn channel(buffer: usize, silence: Duration) -> (mpsc::Sender<EmotionEvent>, Self) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        (tx, Self { rx, silence })
    }
}

#[async_trait]
impl EmotionSource for ChannelEmotionSource {
    async fn next_event(&mut self) -> Result<EmotionEvent, MoodError> {
        match tokio::time::timeout(self.silence, self.rx.recv()).await {
            Ok(Some(event)) => Ok(event),
            Ok(None) => Err(MoodError::SourceClosed),
            Err(_) => Err(MoodError::SourceSilent {
                after_ms: u64::try_from(self.silence.as_millis()).unwrap_or(u64::MAX),
            }),
        }
    }
}

/// Seeded random walk over every label, for demos and tests without a camera.
pub struct SimulatedEmotionSource {
    rng: StdRng,
    scores: BTreeMap<EmotionLabel, f32>,
    attention: f32,
    step: f32,
    interval: Duration,
}

impl SimulatedEmotionSource {
    pub fn new(seed: u64, interval: Duration) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let scores = EmotionLabel::ALL
            .into_iter()
            .map(|label| (label, rng.gen_range(0.0..0.5)))
            .collect();
        Self {
            rng,
            scores,
            attention: 0.5,
            step: 0.15,
            interval,
        }
    }

    /// Largest change per label between two events.
    pub fn with_step(mut self, step: f32) -> Self {
        self.step = step.abs();
        self
    }
}

#[async_trait]
impl EmotionSource for SimulatedEmotionSource {
    async fn next_event(&mut self) -> Result<EmotionEvent, MoodError> {
        if !self.interval.is_zero() {
            tokio::time::sleep(self.interval).await;
        }
        let step = self.step;
        for score in self.scores.values_mut() {
            let delta = if step > 0.0 { self.rng.gen_range(-step..=step) } else { 0.0 };
            *score = (*score + delta).clamp(0.0, 1.0);
        }
        let delta = if step > 0.0 { self.rng.gen_range(-step..=step) } else { 0.0 };
        self.attention = (self.attention + delta).clamp(0.0, 1.0);

        let positive = self.scores[&EmotionLabel::Joy];
        let negative = [
            EmotionLabel::Sadness,
            EmotionLabel::Anger,
            EmotionLabel::Fear,
            EmotionLabel::Disgust,
        ]
        .iter()
        .map(|label| self.scores[label])
        .sum::<f32>()
            / 4.0;

        trace!(target: "moodbridge.source", scores = ?self.scores, "simulated event");
        Ok(EmotionEvent {
            scores: self.scores.clone(),
            attention: Some(self.attention),
            valence: Some((positive - negative).clamp(-1.0, 1.0)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn channel_source_relays_then_reports_silence() {
        let (tx, mut source) = ChannelEmotionSource::channel(4, Duration::from_millis(20));
        tx.send(EmotionEvent::single(EmotionLabel::Joy, 0.9)).await.unwrap();
        let event = source.next_event().await.unwrap();
        assert_eq!(event.scores[&EmotionLabel::Joy], 0.9);

        let err = source.next_event().await.unwrap_err();
        assert_eq!(err, MoodError::SourceSilent { after_ms: 20 });

        drop(tx);
        assert_eq!(source.next_event().await.unwrap_err(), MoodError::SourceClosed);
    }

    #[tokio::test]
    async fn simulated_source_is_seeded_and_bounded() {
        let mut a = SimulatedEmotionSource::new(7, Duration::ZERO);
        let mut b = SimulatedEmotionSource::new(7, Duration::ZERO);
        for _ in 0..20 {
            let left = a.next_event().await.unwrap();
            let right = b.next_event().await.unwrap();
            assert_eq!(left, right);
            assert_eq!(left.scores.len(), EmotionLabel::ALL.len());
            assert!(left.scores.values().all(|score| (0.0..=1.0).contains(score)));
            assert!(left.valence.map_or(false, |v| (-1.0..=1.0).contains(&v)));
        }
    }
}
