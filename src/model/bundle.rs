//! The immutable analysis bundle

use super::character::{Character, Relation};
use super::emotion::{ChapterEmotion, CharacterEmotion, EmotionalPeak};
use super::event::{CausalLink, Event, EventId};
use super::location::{Location, LocationVisit, SceneTransition};
use super::state::{CharacterState, StateTransition};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Run-level statistics, part of the output contract.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statistics {
    pub chapters: usize,
    pub words: usize,
    pub characters: usize,
    pub relations: usize,
    pub events: usize,
    pub locations: usize,
    pub main_plot_events: usize,
}

/// The root output of one analysis run.
///
/// Constructed once by the orchestrator and never mutated afterwards. The
/// property-graph projection in [`crate::graph`] is derived from this.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisBundle {
    /// Identifier of this run
    pub run_id: String,
    pub novel_id: String,
    pub novel_title: String,
    pub author: Option<String>,
    pub created_at: DateTime<Utc>,

    pub characters: Vec<Character>,
    /// (character, chapter) pairs where the character is mentioned
    pub appearances: Vec<(String, usize)>,
    pub relations: Vec<Relation>,
    pub events: Vec<Event>,
    pub causal_links: Vec<CausalLink>,
    /// Event ids with contribution above the main-plot threshold
    pub main_plot_events: Vec<EventId>,
    pub locations: Vec<Location>,
    pub visits: Vec<LocationVisit>,
    pub scene_transitions: Vec<SceneTransition>,
    pub chapter_emotions: Vec<ChapterEmotion>,
    pub character_emotions: Vec<CharacterEmotion>,
    pub emotional_peaks: Vec<EmotionalPeak>,
    pub states: Vec<CharacterState>,
    pub state_transitions: Vec<StateTransition>,
    /// Per-chapter word counts, for the Chapter node projection
    pub chapter_words: Vec<(usize, String, usize)>,

    pub statistics: Statistics,
    /// False when the pipeline succeeded but the store write failed
    pub persisted: bool,
}

impl AnalysisBundle {
    /// An empty bundle for degenerate input (`NoEntitiesFound`): statistics
    /// present, every list empty.
    pub fn empty(novel_id: &str, title: &str, author: Option<String>, stats: Statistics) -> Self {
        Self {
            run_id: Uuid::new_v4().to_string(),
            novel_id: novel_id.to_string(),
            novel_title: title.to_string(),
            author,
            created_at: Utc::now(),
            characters: Vec::new(),
            appearances: Vec::new(),
            relations: Vec::new(),
            events: Vec::new(),
            causal_links: Vec::new(),
            main_plot_events: Vec::new(),
            locations: Vec::new(),
            visits: Vec::new(),
            scene_transitions: Vec::new(),
            chapter_emotions: Vec::new(),
            character_emotions: Vec::new(),
            emotional_peaks: Vec::new(),
            states: Vec::new(),
            state_transitions: Vec::new(),
            chapter_words: Vec::new(),
            statistics: stats,
            persisted: false,
        }
    }

    /// Whether this is the degenerate empty bundle.
    pub fn is_empty(&self) -> bool {
        self.characters.is_empty() && self.events.is_empty()
    }

    /// Sort every list by its canonical key so two runs over the same input
    /// compare equal regardless of internal iteration order. Run metadata
    /// (run id, timestamp, persisted flag) is excluded from comparison by
    /// [`AnalysisBundle::normalized_eq`].
    pub fn normalize(&mut self) {
        self.characters.sort_by(|a, b| a.name.cmp(&b.name));
        self.appearances.sort();
        self.relations.sort_by(|a, b| {
            (a.pair_key(), a.kind.priority()).cmp(&(b.pair_key(), b.kind.priority()))
        });
        self.events.sort_by_key(|e| e.position());
        self.causal_links
            .sort_by(|a, b| (&a.cause, &a.effect).cmp(&(&b.cause, &b.effect)));
        self.main_plot_events.sort();
        self.locations.sort_by(|a, b| a.name.cmp(&b.name));
        self.visits.sort_by(|a, b| {
            (&a.character, &a.location, a.chapter).cmp(&(&b.character, &b.location, b.chapter))
        });
        self.scene_transitions
            .sort_by(|a, b| (a.chapter, &a.triggering_event).cmp(&(b.chapter, &b.triggering_event)));
        self.chapter_emotions.sort_by_key(|e| e.chapter);
        self.character_emotions.sort_by(|a, b| {
            (&a.source, &a.target, a.chapter).cmp(&(&b.source, &b.target, b.chapter))
        });
        self.emotional_peaks.sort_by_key(|p| p.chapter);
        self.states.sort_by(|a, b| {
            (&a.character, a.chapter, a.axis.as_str()).cmp(&(&b.character, b.chapter, b.axis.as_str()))
        });
        self.state_transitions.sort_by(|a, b| {
            (&a.character, a.axis.as_str(), a.to_chapter)
                .cmp(&(&b.character, b.axis.as_str(), b.to_chapter))
        });
        self.chapter_words.sort_by_key(|(idx, _, _)| *idx);
    }

    /// Equality under normalization, ignoring run metadata.
    pub fn normalized_eq(&self, other: &Self) -> bool {
        let mut a = self.clone();
        let mut b = other.clone();
        a.normalize();
        b.normalize();
        a.run_id = String::new();
        b.run_id = String::new();
        a.created_at = b.created_at;
        a.persisted = b.persisted;
        a == b
    }

    /// Events above the main-plot threshold, resolved.
    pub fn main_plot(&self) -> Vec<&Event> {
        self.events
            .iter()
            .filter(|e| self.main_plot_events.contains(&e.id))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_bundle_reports_empty() {
        let stats = Statistics {
            chapters: 2,
            words: 10,
            ..Default::default()
        };
        let bundle = AnalysisBundle::empty("n1", "测试", None, stats);
        assert!(bundle.is_empty());
        assert_eq!(bundle.statistics.chapters, 2);
        assert!(bundle.main_plot().is_empty());
    }

    #[test]
    fn normalized_eq_ignores_run_metadata() {
        let stats = Statistics::default();
        let a = AnalysisBundle::empty("n1", "测试", None, stats.clone());
        let mut b = AnalysisBundle::empty("n1", "测试", None, stats);
        b.persisted = true;
        assert_ne!(a.run_id, b.run_id);
        assert!(a.normalized_eq(&b));
    }
}
