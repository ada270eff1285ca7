//! Chapter sentiment, directed emotions, and the emotional curve

use super::{Entities, ProcessedText};
use crate::config::AnalysisOptions;
use crate::lexicon::Lexicons;
use crate::model::{
    ChapterEmotion, CharacterEmotion, EmotionalPeak, PeakKind, EMOTION_CATEGORIES,
};
use tracing::debug;

/// Co-occurrence count at which directed-emotion intensity saturates.
const INTENSITY_SATURATION: f64 = 3.0;

/// Output of the emotion stage.
#[derive(Debug, Clone)]
pub struct EmotionReport {
    pub chapters: Vec<ChapterEmotion>,
    pub directed: Vec<CharacterEmotion>,
    pub peaks: Vec<EmotionalPeak>,
}

/// Scores per-chapter sentiment, decomposes the six-way emotion
/// distribution, derives directed character emotions, and finds the
/// peaks and troughs of the emotional curve.
pub struct EmotionAnalyzer<'a> {
    lexicons: &'a Lexicons,
    options: &'a AnalysisOptions,
}

impl<'a> EmotionAnalyzer<'a> {
    pub fn new(lexicons: &'a Lexicons, options: &'a AnalysisOptions) -> Self {
        Self { lexicons, options }
    }

    /// Run the stage.
    pub fn analyze(&self, text: &ProcessedText, entities: &Entities) -> EmotionReport {
        let chapters: Vec<ChapterEmotion> = text
            .chapters
            .iter()
            .map(|chapter| self.chapter_emotion(chapter.index, &chapter.sentences))
            .collect();

        let directed = self.directed_emotions(text, entities);
        let peaks = self.detect_peaks(&chapters);

        debug!(
            chapters = chapters.len(),
            directed = directed.len(),
            peaks = peaks.len(),
            "emotion analysis complete"
        );
        EmotionReport {
            chapters,
            directed,
            peaks,
        }
    }

    /// Chapter sentiment is the clipped mean of sentence scores; the
    /// distribution is the L1-normalized sum of per-sentence
    /// distributions, with neutral sentences contributing uniformly.
    fn chapter_emotion(&self, index: usize, sentences: &[String]) -> ChapterEmotion {
        let mut sentiment_sum = 0.0;
        let mut distribution = [0.0_f64; 6];
        for sentence in sentences {
            sentiment_sum += self.lexicons.sentiment_of(sentence);
            let hits = self.lexicons.emotion_hits(sentence);
            let total: f64 = hits.iter().sum();
            if total > 0.0 {
                for (slot, hit) in distribution.iter_mut().zip(hits) {
                    *slot += hit / total;
                }
            } else {
                for slot in distribution.iter_mut() {
                    *slot += 1.0 / 6.0;
                }
            }
        }

        let count = sentences.len().max(1) as f64;
        let sentiment = (sentiment_sum / count).clamp(-1.0, 1.0);
        let total: f64 = distribution.iter().sum();
        if total > 0.0 {
            for slot in distribution.iter_mut() {
                *slot /= total;
            }
        } else {
            distribution = [1.0 / 6.0; 6];
        }
        ChapterEmotion {
            chapter: index,
            sentiment,
            distribution,
        }
    }

    /// Directed emotions: for each ordered character pair in a chapter,
    /// aggregate over sentences containing both; intensity is |sentiment|
    /// scaled by co-occurrence count.
    fn directed_emotions(&self, text: &ProcessedText, entities: &Entities) -> Vec<CharacterEmotion> {
        let mut out = Vec::new();
        for (pos, chapter) in text.chapters.iter().enumerate() {
            let names: Vec<&str> = entities.characters.iter().map(|c| c.name.as_str()).collect();
            for &source in &names {
                for &target in &names {
                    if source == target {
                        continue;
                    }
                    let mut sentiment_sum = 0.0;
                    let mut hits = [0.0_f64; 6];
                    let mut count = 0usize;
                    for (sidx, sentence) in chapter.sentences.iter().enumerate() {
                        let present = &entities.mentions[pos][sidx];
                        if !(present.iter().any(|n| n == source)
                            && present.iter().any(|n| n == target))
                        {
                            continue;
                        }
                        count += 1;
                        sentiment_sum += self.lexicons.sentiment_of(sentence);
                        let sentence_hits = self.lexicons.emotion_hits(sentence);
                        for (slot, hit) in hits.iter_mut().zip(sentence_hits) {
                            *slot += hit;
                        }
                    }
                    if count == 0 {
                        continue;
                    }
                    let mean = sentiment_sum / count as f64;
                    let total_hits: f64 = hits.iter().sum();
                    if mean == 0.0 && total_hits == 0.0 {
                        continue;
                    }
                    let kind = dominant_category(&hits, mean);
                    let intensity = (mean.abs()
                        * (count as f64 / INTENSITY_SATURATION).min(1.0))
                    .clamp(0.0, 1.0);
                    out.push(CharacterEmotion {
                        source: source.to_string(),
                        target: target.to_string(),
                        chapter: chapter.index,
                        kind,
                        intensity,
                    });
                }
            }
        }
        out
    }

    /// Peaks and troughs: local extrema whose deviation from the
    /// moving-average baseline exceeds sigma standard deviations of the
    /// curve. The earliest chapter of a plateau is chosen.
    fn detect_peaks(&self, chapters: &[ChapterEmotion]) -> Vec<EmotionalPeak> {
        let curve: Vec<f64> = chapters.iter().map(|c| c.sentiment).collect();
        let n = curve.len();
        if n < 2 {
            return Vec::new();
        }
        let mean = curve.iter().sum::<f64>() / n as f64;
        let variance = curve.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n as f64;
        let sigma = variance.sqrt();
        if sigma == 0.0 {
            return Vec::new();
        }
        let threshold = sigma * self.options.peak_sigma;
        let window = self.options.emotion_baseline_window.max(1);

        let mut peaks = Vec::new();
        for i in 0..n {
            let start = i.saturating_sub(window / 2);
            let end = (i + window / 2 + 1).min(n);
            let baseline = curve[start..end].iter().sum::<f64>() / (end - start) as f64;
            let deviation = curve[i] - baseline;

            // Strict rise on the left, non-strict on the right: the first
            // chapter of a plateau wins.
            let left_lower = i == 0 || curve[i - 1] < curve[i];
            let right_not_higher = i + 1 >= n || curve[i + 1] <= curve[i];
            let left_higher = i == 0 || curve[i - 1] > curve[i];
            let right_not_lower = i + 1 >= n || curve[i + 1] >= curve[i];

            if left_lower && right_not_higher && deviation > threshold {
                peaks.push(EmotionalPeak {
                    chapter: chapters[i].chapter,
                    sentiment: curve[i],
                    kind: PeakKind::High,
                });
            } else if left_higher && right_not_lower && -deviation > threshold {
                peaks.push(EmotionalPeak {
                    chapter: chapters[i].chapter,
                    sentiment: curve[i],
                    kind: PeakKind::Low,
                });
            }
        }
        peaks
    }
}

/// Dominant category from lexicon hits; sentiment polarity decides when
/// no category word occurred.
fn dominant_category(
    hits: &[f64; 6],
    mean_sentiment: f64,
) -> crate::model::EmotionCategory {
    let total: f64 = hits.iter().sum();
    if total > 0.0 {
        let mut best = 0;
        for i in 1..6 {
            if hits[i] > hits[best] {
                best = i;
            }
        }
        EMOTION_CATEGORIES[best]
    } else if mean_sentiment > 0.0 {
        crate::model::EmotionCategory::Joy
    } else {
        crate::model::EmotionCategory::Sadness
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::EntityExtractor;
    use crate::model::{Chapter, Novel};

    fn run(texts: &[&str]) -> EmotionReport {
        let lex = Lexicons::builtin();
        let options = AnalysisOptions::default().with_min_mentions(2);
        let chapters: Vec<Chapter> = texts
            .iter()
            .enumerate()
            .map(|(i, t)| Chapter::new(i + 1, format!("第{}章", i + 1), *t))
            .collect();
        let novel = Novel::new("t", "t", chapters);
        let text = ProcessedText::from_novel(&novel, &lex).unwrap();
        let entities = EntityExtractor::new(&lex, &options).extract(&text).unwrap();
        EmotionAnalyzer::new(&lex, &options).analyze(&text, &entities)
    }

    #[test]
    fn distribution_sums_to_one() {
        let report = run(&[
            "林远大喜。苏青也笑了。",
            "林远伤心。苏青哭了。",
        ]);
        for chapter in &report.chapters {
            let sum: f64 = chapter.distribution.iter().sum();
            assert!((sum - 1.0).abs() < 1e-6, "sum {sum}");
            assert!((-1.0..=1.0).contains(&chapter.sentiment));
        }
    }

    #[test]
    fn neutral_chapter_is_uniform() {
        let report = run(&[
            "林远入山。苏青到了。",
            "林远走了。苏青走了。",
        ]);
        for share in report.chapters[0].distribution {
            assert!((share - 1.0 / 6.0).abs() < 1e-9);
        }
        assert_eq!(report.chapters[0].sentiment, 0.0);
    }

    #[test]
    fn trough_detected_on_strongly_negative_chapter() {
        let report = run(&[
            "林远入山。苏青到了。",
            "林远大喜。苏青笑了。",
            "林远走了。苏青走了。",
            "林远重伤，伤心欲绝，悲痛大哭。苏青绝望落泪，痛哭失声。",
            "林远归来。苏青点头。",
        ]);
        let trough = report
            .peaks
            .iter()
            .find(|p| p.kind == PeakKind::Low)
            .expect("trough");
        assert_eq!(trough.chapter, 4);
    }

    #[test]
    fn directed_emotion_requires_co_mention() {
        let report = run(&[
            "林远对苏青大笑，欢喜不已。林远入山。苏青走了。",
            "林远归来。苏青点头。",
        ]);
        let towards = report
            .directed
            .iter()
            .find(|e| e.source == "林远" && e.target == "苏青" && e.chapter == 1)
            .expect("directed emotion");
        assert!(towards.intensity > 0.0);
        // Chapter 2 has no co-mention sentence, so no chapter-2 entry.
        assert!(!report
            .directed
            .iter()
            .any(|e| e.chapter == 2));
    }
}
