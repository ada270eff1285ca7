//! Character state tracking across four axes

use super::{Entities, ProcessedText, Timeline};
use crate::config::AnalysisOptions;
use crate::lexicon::Lexicons;
use crate::model::{
    CausalLink, Character, CharacterState, Classification, Event, EventId, StateAxis,
    StateTransition, STATE_AXES,
};
use std::collections::HashMap;
use tracing::debug;

/// Neutral starting value on every axis.
const INITIAL_VALUE: f64 = 0.5;

/// Per-chapter delta clamp, so one densely-worded chapter cannot swing an
/// axis across its whole range.
const CHAPTER_DELTA_CAP: f64 = 0.5;

/// Output of the state stage.
#[derive(Debug, Clone)]
pub struct StateReport {
    /// Dense snapshots: every main character, every axis, every chapter
    /// from its first appearance on
    pub states: Vec<CharacterState>,
    pub transitions: Vec<StateTransition>,
}

/// Tracks main-character state over chapters from the state-change
/// lexicon, carrying values forward where the character is absent, and
/// emits transitions tied to their most plausible causing event.
pub struct StateTracker<'a> {
    lexicons: &'a Lexicons,
    options: &'a AnalysisOptions,
}

impl<'a> StateTracker<'a> {
    pub fn new(lexicons: &'a Lexicons, options: &'a AnalysisOptions) -> Self {
        Self { lexicons, options }
    }

    /// Run the stage.
    pub fn analyze(
        &self,
        text: &ProcessedText,
        entities: &Entities,
        characters: &[Character],
        timeline: &Timeline,
    ) -> StateReport {
        let mut states = Vec::new();
        let mut transitions = Vec::new();
        let last_chapter = text
            .chapters
            .last()
            .map(|c| c.index)
            .unwrap_or(0);

        for character in characters {
            if character.classification != Classification::Main {
                continue;
            }
            let mut values: HashMap<StateAxis, f64> =
                STATE_AXES.iter().map(|&a| (a, INITIAL_VALUE)).collect();

            for chapter in character.first_appearance..=last_chapter {
                let deltas = self.chapter_deltas(text, entities, &character.name, chapter);
                let trigger = if deltas.values().any(|d| *d != 0.0) {
                    chapter_trigger_event(&timeline.events, &character.name, chapter)
                } else {
                    None
                };

                for &axis in &STATE_AXES {
                    let delta = deltas.get(&axis).copied().unwrap_or(0.0);
                    let previous = values[&axis];
                    let value = (previous + delta).clamp(0.0, 1.0);
                    values.insert(axis, value);

                    states.push(CharacterState {
                        character: character.name.clone(),
                        chapter,
                        axis,
                        value,
                        triggering_event: if delta != 0.0 { trigger.clone() } else { None },
                    });

                    if delta.abs() > self.options.state_transition_threshold {
                        let cause = transition_cause(
                            &timeline.events,
                            &timeline.causal_links,
                            &character.name,
                            chapter,
                        );
                        transitions.push(StateTransition {
                            character: character.name.clone(),
                            axis,
                            from_chapter: chapter.saturating_sub(1).max(character.first_appearance),
                            to_chapter: chapter,
                            delta: value - previous,
                            cause_event: cause,
                        });
                    }
                }
            }
        }

        debug!(
            states = states.len(),
            transitions = transitions.len(),
            "state tracking complete"
        );
        StateReport {
            states,
            transitions,
        }
    }

    /// Clamped sum of state-lexicon deltas over sentences containing the
    /// character in one chapter. A chapter without the character yields no
    /// deltas, so values carry forward unchanged.
    fn chapter_deltas(
        &self,
        text: &ProcessedText,
        entities: &Entities,
        name: &str,
        chapter: usize,
    ) -> HashMap<StateAxis, f64> {
        let mut deltas: HashMap<StateAxis, f64> = HashMap::new();
        let Some(pos) = text.chapters.iter().position(|c| c.index == chapter) else {
            return deltas;
        };
        for (sidx, sentence) in text.chapters[pos].sentences.iter().enumerate() {
            if !entities.mentions[pos][sidx].iter().any(|n| n == name) {
                continue;
            }
            for keyword in &self.lexicons.state_keywords {
                if sentence.contains(keyword.keyword.as_str()) {
                    *deltas.entry(keyword.axis).or_insert(0.0) += keyword.delta;
                }
            }
        }
        for delta in deltas.values_mut() {
            *delta = delta.clamp(-CHAPTER_DELTA_CAP, CHAPTER_DELTA_CAP);
        }
        deltas
    }
}

/// Highest-importance event in the chapter that shares the character.
fn chapter_trigger_event(events: &[Event], name: &str, chapter: usize) -> Option<EventId> {
    events
        .iter()
        .filter(|e| e.chapter == chapter && e.involves(name))
        .max_by(|a, b| {
            a.importance
                .partial_cmp(&b.importance)
                .unwrap_or(std::cmp::Ordering::Equal)
        })
        .map(|e| e.id.clone())
}

/// The event a transition is tied to: the strongest of the chapter's own
/// sharing events and their causal ancestors that also share the
/// character.
fn transition_cause(
    events: &[Event],
    causal_links: &[CausalLink],
    name: &str,
    chapter: usize,
) -> Option<EventId> {
    let by_id: HashMap<&EventId, &Event> = events.iter().map(|e| (&e.id, e)).collect();
    let mut candidates: Vec<&Event> = events
        .iter()
        .filter(|e| e.chapter == chapter && e.involves(name))
        .collect();
    let local: Vec<EventId> = candidates.iter().map(|e| e.id.clone()).collect();
    for link in causal_links {
        if local.contains(&link.effect) {
            if let Some(cause) = by_id.get(&link.cause) {
                if cause.involves(name) {
                    candidates.push(cause);
                }
            }
        }
    }
    candidates
        .into_iter()
        .max_by(|a, b| {
            a.importance
                .partial_cmp(&b.importance)
                .unwrap_or(std::cmp::Ordering::Equal)
        })
        .map(|e| e.id.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{
        CharacterAnalyzer, EntityExtractor, EventAnalyzer, RelationExtractor, TimelineAnalyzer,
    };
    use crate::model::{Chapter, Novel};

    fn run(texts: &[&str]) -> (StateReport, Vec<Character>) {
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
        let events = EventAnalyzer::new(&lex, &options).analyze(&text, &entities, &characters);
        let timeline = TimelineAnalyzer::new(&lex, &options).analyze(events, &characters);
        let report = StateTracker::new(&lex, &options).analyze(&text, &entities, &characters, &timeline);
        (report, characters)
    }

    fn value_of(report: &StateReport, name: &str, chapter: usize, axis: StateAxis) -> f64 {
        report
            .states
            .iter()
            .find(|s| s.character == name && s.chapter == chapter && s.axis == axis)
            .map(|s| s.value)
            .expect("state snapshot")
    }

    #[test]
    fn injury_lowers_health() {
        let (report, _) = run(&[
            "林远入山。苏青到了。",
            "林远受伤。苏青走了。",
            "林远归来。苏青点头。",
        ]);
        let before = value_of(&report, "林远", 1, StateAxis::Health);
        let after = value_of(&report, "林远", 2, StateAxis::Health);
        assert_eq!(before, INITIAL_VALUE);
        assert!((after - 0.3).abs() < 1e-9);
        // Carried forward unchanged into chapter 3.
        assert_eq!(value_of(&report, "林远", 3, StateAxis::Health), after);
    }

    #[test]
    fn large_delta_emits_transition() {
        let (report, _) = run(&[
            "林远入山。苏青到了。",
            "林远重伤。苏青走了。",
            "林远归来。苏青点头。",
        ]);
        let transition = report
            .transitions
            .iter()
            .find(|t| t.character == "林远" && t.axis == StateAxis::Health)
            .expect("health transition");
        assert!(transition.delta < 0.0);
        assert_eq!(transition.to_chapter, 2);
    }

    #[test]
    fn small_delta_does_not_transition() {
        let (report, _) = run(&[
            "林远入山。苏青到了。",
            "林远学会一式。苏青走了。",
            "林远归来。苏青点头。",
        ]);
        // 学会 moves ability by +0.1, at the threshold but not above it.
        assert!(!report
            .transitions
            .iter()
            .any(|t| t.character == "林远" && t.axis == StateAxis::Ability));
        assert!((value_of(&report, "林远", 2, StateAxis::Ability) - 0.6).abs() < 1e-9);
    }

    #[test]
    fn snapshots_are_dense_over_all_axes() {
        let (report, characters) = run(&[
            "林远入山。苏青到了。",
            "苏青走了。",
            "林远归来。苏青点头。",
        ]);
        let main: Vec<_> = characters
            .iter()
            .filter(|c| c.classification == Classification::Main)
            .collect();
        for character in &main {
            for chapter in character.first_appearance..=3 {
                for &axis in &STATE_AXES {
                    assert!(
                        report.states.iter().any(|s| s.character == character.name
                            && s.chapter == chapter
                            && s.axis == axis),
                        "missing snapshot for {} ch{} {:?}",
                        character.name,
                        chapter,
                        axis
                    );
                }
            }
        }
        assert!(report
            .states
            .iter()
            .all(|s| (0.0..=1.0).contains(&s.value)));
    }
}
