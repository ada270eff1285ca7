//! Chapter and character emotion types

use serde::{Deserialize, Serialize};

/// The six emotion categories, in distribution index order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmotionCategory {
    Joy,
    Sadness,
    Anger,
    Fear,
    Surprise,
    Disgust,
}

/// All categories, ordered to match `ChapterEmotion::distribution`.
pub const EMOTION_CATEGORIES: [EmotionCategory; 6] = [
    EmotionCategory::Joy,
    EmotionCategory::Sadness,
    EmotionCategory::Anger,
    EmotionCategory::Fear,
    EmotionCategory::Surprise,
    EmotionCategory::Disgust,
];

impl EmotionCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmotionCategory::Joy => "joy",
            EmotionCategory::Sadness => "sadness",
            EmotionCategory::Anger => "anger",
            EmotionCategory::Fear => "fear",
            EmotionCategory::Surprise => "surprise",
            EmotionCategory::Disgust => "disgust",
        }
    }

    /// Index into the six-way distribution array.
    pub fn index(&self) -> usize {
        EMOTION_CATEGORIES
            .iter()
            .position(|c| c == self)
            .unwrap_or(0)
    }
}

/// Aggregate emotional reading of one chapter.
///
/// `distribution` sums to 1 (within float tolerance); `sentiment` lies in
/// [-1, 1].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChapterEmotion {
    pub chapter: usize,
    pub sentiment: f64,
    pub distribution: [f64; 6],
}

impl ChapterEmotion {
    /// Dominant category of the distribution.
    pub fn dominant(&self) -> EmotionCategory {
        let mut best = 0;
        for i in 1..6 {
            if self.distribution[i] > self.distribution[best] {
                best = i;
            }
        }
        EMOTION_CATEGORIES[best]
    }
}

/// A directed emotion one character holds toward another in a chapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacterEmotion {
    pub source: String,
    pub target: String,
    pub chapter: usize,
    pub kind: EmotionCategory,
    /// Intensity in [0, 1]
    pub intensity: f64,
}

/// High or low extremum of the emotional curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeakKind {
    High,
    Low,
}

/// A local extremum whose deviation from the moving-average baseline
/// exceeds the configured sigma.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmotionalPeak {
    pub chapter: usize,
    pub sentiment: f64,
    pub kind: PeakKind,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dominant_picks_largest_share() {
        let e = ChapterEmotion {
            chapter: 1,
            sentiment: -0.4,
            distribution: [0.1, 0.5, 0.1, 0.1, 0.1, 0.1],
        };
        assert_eq!(e.dominant(), EmotionCategory::Sadness);
    }

    #[test]
    fn category_indices_match_ordering() {
        for (i, cat) in EMOTION_CATEGORIES.iter().enumerate() {
            assert_eq!(cat.index(), i);
        }
    }
}
