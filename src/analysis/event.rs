//! Event detection within chapters

use super::{Entities, ProcessedText};
use crate::config::AnalysisOptions;
use crate::lexicon::Lexicons;
use crate::model::{Character, Event, EventId, EventKind};
use std::collections::HashMap;
use tracing::debug;

/// Importance blend weights: participants, verb class, turning point,
/// chapter position.
const W_PARTICIPANT: f64 = 0.4;
const W_VERB: f64 = 0.3;
const W_TURNING: f64 = 0.2;
const W_POSITION: f64 = 0.1;

/// Fraction of a chapter's sentences counted as "near the boundary".
const BOUNDARY_FRACTION: f64 = 0.1;

/// Maximum description length in characters.
const DESCRIPTION_CAP: usize = 60;

/// Detects discrete events per chapter from the event-verb lexicon and
/// turning-point cues. Turning-point detection happens here and nowhere
/// else; the timeline analyzer consumes the flag through the event kind
/// and importance.
pub struct EventAnalyzer<'a> {
    lexicons: &'a Lexicons,
    options: &'a AnalysisOptions,
}

impl<'a> EventAnalyzer<'a> {
    pub fn new(lexicons: &'a Lexicons, options: &'a AnalysisOptions) -> Self {
        Self { lexicons, options }
    }

    /// Run the stage. Events come out in (chapter, sequence) order;
    /// `sequence` is the sentence index within the chapter, which keeps
    /// ids deterministic across runs.
    pub fn analyze(
        &self,
        text: &ProcessedText,
        entities: &Entities,
        characters: &[Character],
    ) -> Vec<Event> {
        let importance_of: HashMap<&str, f64> = characters
            .iter()
            .map(|c| (c.name.as_str(), c.importance))
            .collect();
        let mut events = Vec::new();

        for (pos, chapter) in text.chapters.iter().enumerate() {
            let total = chapter.sentences.len();
            let boundary = ((total as f64 * BOUNDARY_FRACTION).ceil() as usize).max(1);

            for (sidx, sentence) in chapter.sentences.iter().enumerate() {
                let participants = &entities.mentions[pos][sidx];
                if participants.is_empty() {
                    continue;
                }
                let verb = self
                    .lexicons
                    .event_verbs
                    .iter()
                    .filter(|v| sentence.contains(v.verb.as_str()))
                    .max_by(|a, b| {
                        a.weight
                            .partial_cmp(&b.weight)
                            .unwrap_or(std::cmp::Ordering::Equal)
                    });
                let turning = self
                    .lexicons
                    .turning_cues
                    .iter()
                    .any(|cue| sentence.contains(cue.as_str()));
                if verb.is_none() && !turning {
                    continue;
                }

                let kind = match verb {
                    Some(v) => v.kind,
                    None => EventKind::TurningPoint,
                };
                let participant_max = participants
                    .iter()
                    .filter_map(|p| importance_of.get(p.as_str()))
                    .cloned()
                    .fold(0.0_f64, f64::max);
                let verb_weight = verb.map(|v| v.weight).unwrap_or(0.0);
                let near_boundary = sidx < boundary || sidx + boundary >= total;
                let importance = (W_PARTICIPANT * participant_max
                    + W_VERB * verb_weight
                    + W_TURNING * if turning { 1.0 } else { 0.0 }
                    + W_POSITION * if near_boundary { 1.0 } else { 0.0 })
                .clamp(0.0, 1.0);

                let location = self.recent_location(entities, pos, sidx);

                events.push(Event {
                    id: EventId::from_position(chapter.index, sidx),
                    description: truncate(sentence, DESCRIPTION_CAP),
                    chapter: chapter.index,
                    sequence: sidx,
                    kind,
                    participants: participants.clone(),
                    location,
                    importance,
                    contribution: 0.0,
                    parent: None,
                    time_marker: None,
                });
            }
        }

        debug!(events = events.len(), "event detection complete");
        events
    }

    /// The most recently mentioned location within the bounded back-window,
    /// the event's own sentence included.
    fn recent_location(&self, entities: &Entities, pos: usize, sidx: usize) -> Option<String> {
        let back = self.options.location_back_window;
        let start = sidx.saturating_sub(back);
        for i in (start..=sidx).rev() {
            if let Some(name) = entities.location_mentions[pos][i].last() {
                return Some(name.clone());
            }
        }
        None
    }
}

fn truncate(sentence: &str, cap: usize) -> String {
    if sentence.chars().count() <= cap {
        sentence.to_string()
    } else {
        sentence.chars().take(cap).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{CharacterAnalyzer, EntityExtractor, RelationExtractor};
    use crate::model::{Chapter, Novel};

    fn run(texts: &[&str]) -> Vec<Event> {
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
        let relations = RelationExtractor::new(&lex, &options).extract(&text, &entities);
        let characters = CharacterAnalyzer::new(&options).analyze(&text, &entities, &relations);
        EventAnalyzer::new(&lex, &options).analyze(&text, &entities, &characters)
    }

    #[test]
    fn conflict_event_detected_with_participants() {
        let events = run(&[
            "林远入山。苏青到了。",
            "林远望着苏青。",
            "突然，林远与苏青大战。",
        ]);
        let battle = events
            .iter()
            .find(|e| e.kind == EventKind::Conflict)
            .expect("conflict event");
        assert_eq!(battle.chapter, 3);
        assert!(battle.participants.contains(&"林远".to_string()));
        assert!(battle.participants.contains(&"苏青".to_string()));
        assert!(battle.importance >= 0.6, "importance {}", battle.importance);
    }

    #[test]
    fn turning_cue_without_verb_is_turning_point() {
        let events = run(&[
            "林远入山。苏青到了。",
            "自此，林远一蹶不振。苏青走了。",
        ]);
        assert!(events.iter().any(|e| e.kind == EventKind::TurningPoint));
    }

    #[test]
    fn sentences_without_characters_are_skipped() {
        let events = run(&[
            "山中大战连连。林远入山。苏青到了。",
            "林远走了。苏青走了。",
        ]);
        // 大战 appears with no character mention in the first sentence.
        assert!(events.iter().all(|e| !e.participants.is_empty()));
    }

    #[test]
    fn location_attached_from_back_window() {
        let events = run(&[
            "林远到了青云山。林远站定。突然，林远遇袭。苏青到了。苏青走了。",
        ]);
        let ambush = events
            .iter()
            .find(|e| e.description.contains("遇袭"))
            .expect("ambush event");
        assert_eq!(ambush.location.as_deref(), Some("青云山"));
    }

    #[test]
    fn events_are_totally_ordered() {
        let events = run(&[
            "林远遇苏青。林远与苏青大战。",
            "林远逃了。苏青走了。",
        ]);
        let mut sorted = events.clone();
        sorted.sort_by_key(|e| e.position());
        assert_eq!(events, sorted);
    }
}
