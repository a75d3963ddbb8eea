use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::MoodError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmotionLabel {
    Joy,
    Sadness,
    Anger,
    Fear,
    Surprise,
    Disgust,
    Neutral,
}

impl EmotionLabel {
    pub const ALL: [EmotionLabel; 7] = [
        EmotionLabel::Joy,
        EmotionLabel::Sadness,
        EmotionLabel::Anger,
        EmotionLabel::Fear,
        EmotionLabel::Surprise,
        EmotionLabel::Disgust,
        EmotionLabel::Neutral,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EmotionLabel::Joy => "joy",
            EmotionLabel::Sadness => "sadness",
            EmotionLabel::Anger => "anger",
            EmotionLabel::Fear => "fear",
            EmotionLabel::Surprise => "surprise",
            EmotionLabel::Disgust => "disgust",
            EmotionLabel::Neutral => "neutral",
        }
    }
}

impl fmt::Display for EmotionLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EmotionLabel {
    type Err = MoodError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        EmotionLabel::ALL
            .into_iter()
            .find(|label| label.as_str().eq_ignore_ascii_case(value.trim()))
            .ok_or_else(|| MoodError::invalid_config(format!("unknown emotion label `{value}`")))
    }
}

/// One observation from an emotion source. Values are taken as given; the smoother
/// clamps them.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EmotionEvent {
    pub scores: BTreeMap<EmotionLabel, f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attention: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valence: Option<f32>,
}

impl EmotionEvent {
    pub fn single(label: EmotionLabel, score: f32) -> Self {
        let mut scores = BTreeMap::new();
        scores.insert(label, score);
        Self {
            scores,
            ..Self::default()
        }
    }
}

/// Smoothed state after one or more events.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct EmotionReading {
    pub scores: BTreeMap<EmotionLabel, f32>,
    pub attention: Option<f32>,
    pub valence: Option<f32>,
}

impl EmotionReading {
    /// Highest scoring label; ties go to the label declared first.
    pub fn dominant(&self) -> Option<(EmotionLabel, f32)> {
        self.scores
            .iter()
            .fold(None, |best: Option<(EmotionLabel, f32)>, (label, score)| match best {
                Some((_, top)) if top >= *score => best,
                _ => Some((*label, *score)),
            })
    }
}

/// Exponential moving average over incoming events.
///
/// `alpha` is the weight of the newest sample; 1.0 disables smoothing. Labels missing from
/// an event keep their previous value.
#[derive(Clone, Debug)]
pub struct EmotionSmoother {
    alpha: f32,
    state: EmotionReading,
    samples: u64,
}

impl EmotionSmoother {
    pub fn new(alpha: f32) -> Self {
        Self {
            alpha: if alpha.is_finite() { alpha.clamp(0.01, 1.0) } else { 1.0 },
            state: EmotionReading::default(),
            samples: 0,
        }
    }

    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    pub fn samples(&self) -> u64 {
        self.samples
    }

    pub fn current(&self) -> &EmotionReading {
        &self.state
    }

    pub fn update(&mut self, event: &EmotionEvent) -> &EmotionReading {
        let alpha = self.alpha;
        for (label, score) in &event.scores {
            let sample = clamp_unit(*score);
            let entry = self.state.scores.entry(*label).or_insert(sample);
            *entry = blend(*entry, sample, alpha);
        }
        if let Some(attention) = event.attention {
            self.state.attention = Some(match self.state.attention {
                Some(prev) => blend(prev, clamp_unit(attention), alpha),
                None => clamp_unit(attention),
            });
        }
        if let Some(valence) = event.valence {
            let sample = clamp_signed(valence);
            self.state.valence = Some(match self.state.valence {
                Some(prev) => blend(prev, sample, alpha),
                None => sample,
            });
        }
        self.samples += 1;
        &self.state
    }
}

fn blend(previous: f32, sample: f32, alpha: f32) -> f32 {
    previous + alpha * (sample - previous)
}

fn clamp_unit(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

fn clamp_signed(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(-1.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_parse_case_insensitively() {
        assert_eq!("Joy".parse::<EmotionLabel>().unwrap(), EmotionLabel::Joy);
        assert!("boredom".parse::<EmotionLabel>().is_err());
    }

    #[test]
    fn smoothing_clamps_and_averages() {
        let mut smoother = EmotionSmoother::new(0.5);
        let mut first = EmotionEvent::single(EmotionLabel::Joy, 1.4);
        first.valence = Some(-3.0);
        let reading = smoother.update(&first).clone();
        assert_eq!(reading.scores[&EmotionLabel::Joy], 1.0);
        assert_eq!(reading.valence, Some(-1.0));

        let reading = smoother.update(&EmotionEvent::single(EmotionLabel::Joy, 0.0));
        assert!((reading.scores[&EmotionLabel::Joy] - 0.5).abs() < f32::EPSILON);
        assert_eq!(smoother.samples(), 2);
    }

    #[test]
    fn dominant_prefers_highest_score() {
        let mut reading = EmotionReading::default();
        assert!(reading.dominant().is_none());
        reading.scores.insert(EmotionLabel::Sadness, 0.4);
        reading.scores.insert(EmotionLabel::Surprise, 0.7);
        reading.scores.insert(EmotionLabel::Neutral, 0.7);
        assert_eq!(reading.dominant(), Some((EmotionLabel::Surprise, 0.7)));
    }
}
