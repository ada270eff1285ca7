//! Timeline construction: event order, hierarchy, causality, main plot

use crate::config::AnalysisOptions;
use crate::lexicon::Lexicons;
use crate::model::{CausalLink, Character, Classification, Event, EventId, StateTransition};
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Causal strength terms: base, per shared participant (capped), cue or
/// shared-transition bonus.
const CAUSAL_BASE: f64 = 0.2;
const CAUSAL_PER_PARTICIPANT: f64 = 0.2;
const CAUSAL_PARTICIPANT_CAP: usize = 3;
const CAUSAL_CUE_BONUS: f64 = 0.3;

/// Maximum power-iteration rounds for the contribution walk.
const WALK_MAX_ITER: usize = 100;

/// Output of the timeline stage.
#[derive(Debug, Clone)]
pub struct Timeline {
    /// Events with hierarchy, contribution, and time markers filled in,
    /// in (chapter, sequence) order
    pub events: Vec<Event>,
    pub causal_links: Vec<CausalLink>,
    /// Ids of events whose contribution clears the main-plot threshold
    pub main_plot_events: Vec<EventId>,
}

/// Orders events, infers the sub-event forest and causal links, and
/// computes main-plot contribution via a random walk with restart over
/// the participation and causality graph.
pub struct TimelineAnalyzer<'a> {
    lexicons: &'a Lexicons,
    options: &'a AnalysisOptions,
}

impl<'a> TimelineAnalyzer<'a> {
    pub fn new(lexicons: &'a Lexicons, options: &'a AnalysisOptions) -> Self {
        Self { lexicons, options }
    }

    /// Run the stage.
    pub fn analyze(&self, mut events: Vec<Event>, characters: &[Character]) -> Timeline {
        events.sort_by_key(|e| e.position());

        for event in &mut events {
            event.time_marker = self.lexicons.time_marker_of(&event.description);
        }

        self.infer_hierarchy(&mut events);
        let causal_links = self.infer_causal_links(&events);
        let (contributions, main_plot_events) =
            self.contribution_scores(&events, &causal_links, characters);
        for (event, contribution) in events.iter_mut().zip(contributions) {
            event.contribution = contribution;
        }

        debug!(
            events = events.len(),
            causal = causal_links.len(),
            main_plot = main_plot_events.len(),
            "timeline analysis complete"
        );
        Timeline {
            events,
            causal_links,
            main_plot_events,
        }
    }

    /// Intra-chapter sub-event forest: E nests under the most important F
    /// sharing its chapter, two participants, and a nearby sentence span,
    /// with a clear importance gap.
    fn infer_hierarchy(&self, events: &mut [Event]) {
        let snapshots: Vec<(EventId, usize, usize, f64, Vec<String>)> = events
            .iter()
            .map(|e| {
                (
                    e.id.clone(),
                    e.chapter,
                    e.sequence,
                    e.importance,
                    e.participants.clone(),
                )
            })
            .collect();

        for event in events.iter_mut() {
            let mut best: Option<(&EventId, f64)> = None;
            for (fid, fchapter, fseq, fimp, fparts) in &snapshots {
                if *fid == event.id || *fchapter != event.chapter {
                    continue;
                }
                let span = event.sequence.abs_diff(*fseq);
                if span > self.options.sub_event_span {
                    continue;
                }
                if *fimp < event.importance + self.options.sub_event_gap {
                    continue;
                }
                let shared = event
                    .participants
                    .iter()
                    .filter(|p| fparts.contains(p))
                    .count();
                if shared < 2 {
                    continue;
                }
                if best.map_or(true, |(_, imp)| *fimp > imp) {
                    best = Some((fid, *fimp));
                }
            }
            event.parent = best.map(|(id, _)| id.clone());
        }
    }

    /// Cue-based causal links between ordered event pairs.
    fn infer_causal_links(&self, events: &[Event]) -> Vec<CausalLink> {
        let mut links = Vec::new();
        for i in 0..events.len() {
            for j in (i + 1)..events.len() {
                let (cause, effect) = (&events[i], &events[j]);
                let shared = cause.shared_participants(effect);
                if shared == 0 {
                    continue;
                }
                if cause.importance < self.options.causal_importance
                    || effect.importance < self.options.causal_importance
                {
                    continue;
                }
                let cued = self
                    .lexicons
                    .consequence_cues
                    .iter()
                    .any(|cue| effect.description.contains(cue.as_str()));
                if !cued {
                    continue;
                }
                links.push(CausalLink {
                    cause: cause.id.clone(),
                    effect: effect.id.clone(),
                    strength: causal_strength(shared, true),
                });
            }
        }
        links
    }

    /// Random walk with restart over events: edges from shared
    /// participation and causal links, restart mass on events involving
    /// top-importance characters. Steady-state probability, min-max
    /// normalized, is the contribution score.
    fn contribution_scores(
        &self,
        events: &[Event],
        causal_links: &[CausalLink],
        characters: &[Character],
    ) -> (Vec<f64>, Vec<EventId>) {
        let n = events.len();
        if n == 0 {
            return (Vec::new(), Vec::new());
        }

        let index: HashMap<&EventId, usize> =
            events.iter().enumerate().map(|(i, e)| (&e.id, i)).collect();
        let mut adjacency = vec![vec![0.0_f64; n]; n];
        for i in 0..n {
            for j in (i + 1)..n {
                let shared = events[i].shared_participants(&events[j]) as f64;
                if shared > 0.0 {
                    adjacency[i][j] += shared;
                    adjacency[j][i] += shared;
                }
            }
        }
        for link in causal_links {
            if let (Some(&i), Some(&j)) = (index.get(&link.cause), index.get(&link.effect)) {
                adjacency[i][j] += 2.0 * link.strength;
                adjacency[j][i] += 2.0 * link.strength;
            }
        }

        // Restart vector: events involving main characters; the whole set
        // when classification found none.
        let top: HashSet<&str> = characters
            .iter()
            .filter(|c| c.classification == Classification::Main)
            .map(|c| c.name.as_str())
            .collect();
        let mut restart: Vec<f64> = events
            .iter()
            .map(|e| {
                if e.participants.iter().any(|p| top.contains(p.as_str())) {
                    1.0
                } else {
                    0.0
                }
            })
            .collect();
        if restart.iter().sum::<f64>() == 0.0 {
            restart = vec![1.0; n];
        }
        let restart_sum: f64 = restart.iter().sum();
        for r in restart.iter_mut() {
            *r /= restart_sum;
        }

        let row_sums: Vec<f64> = adjacency.iter().map(|row| row.iter().sum()).collect();
        let alpha = self.options.walk_restart;
        let mut p = restart.clone();
        for _ in 0..WALK_MAX_ITER {
            let mut next = vec![0.0_f64; n];
            let mut dangling = 0.0_f64;
            for i in 0..n {
                if row_sums[i] == 0.0 {
                    dangling += p[i];
                    continue;
                }
                for j in 0..n {
                    if adjacency[i][j] > 0.0 {
                        next[j] += (1.0 - alpha) * p[i] * adjacency[i][j] / row_sums[i];
                    }
                }
            }
            for i in 0..n {
                next[i] += (alpha + (1.0 - alpha) * dangling) * restart[i];
            }
            let diff: f64 = next
                .iter()
                .zip(&p)
                .map(|(a, b)| (a - b).abs())
                .sum();
            p = next;
            if diff < self.options.walk_tolerance {
                break;
            }
        }

        let max = p.iter().cloned().fold(f64::MIN, f64::max);
        let min = p.iter().cloned().fold(f64::MAX, f64::min);
        let contributions: Vec<f64> = if (max - min).abs() < f64::EPSILON {
            vec![1.0; n]
        } else {
            p.iter().map(|v| (v - min) / (max - min)).collect()
        };

        let main_plot: Vec<EventId> = events
            .iter()
            .zip(&contributions)
            .filter(|(_, &c)| c >= self.options.main_plot_threshold)
            .map(|(e, _)| e.id.clone())
            .collect();
        (contributions, main_plot)
    }
}

/// Augment cue-based causal links with the shared-state-transition
/// channel once state tracking has run. A pair qualifies when both events
/// fall inside a transition's chapter span for a character they share.
pub(crate) fn augment_causal_with_transitions(
    timeline: &mut Timeline,
    transitions: &[StateTransition],
    options: &AnalysisOptions,
) {
    let existing: HashSet<(EventId, EventId)> = timeline
        .causal_links
        .iter()
        .map(|l| (l.cause.clone(), l.effect.clone()))
        .collect();

    let events = &timeline.events;
    let mut added = Vec::new();
    for i in 0..events.len() {
        for j in (i + 1)..events.len() {
            let (cause, effect) = (&events[i], &events[j]);
            if existing.contains(&(cause.id.clone(), effect.id.clone())) {
                continue;
            }
            let shared: Vec<&String> = cause
                .participants
                .iter()
                .filter(|p| effect.participants.contains(p))
                .collect();
            if shared.is_empty()
                || cause.importance < options.causal_importance
                || effect.importance < options.causal_importance
            {
                continue;
            }
            let spanned = transitions.iter().any(|t| {
                shared.iter().any(|p| **p == t.character)
                    && t.from_chapter <= cause.chapter
                    && effect.chapter <= t.to_chapter
            });
            if spanned {
                added.push(CausalLink {
                    cause: cause.id.clone(),
                    effect: effect.id.clone(),
                    strength: causal_strength(shared.len(), false),
                });
            }
        }
    }
    timeline.causal_links.extend(added);
}

fn causal_strength(shared: usize, cued: bool) -> f64 {
    (CAUSAL_BASE
        + CAUSAL_PER_PARTICIPANT * shared.min(CAUSAL_PARTICIPANT_CAP) as f64
        + if cued { CAUSAL_CUE_BONUS } else { 0.0 })
    .min(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::EventKind;

    fn event(chapter: usize, seq: usize, imp: f64, parts: &[&str], desc: &str) -> Event {
        Event {
            id: EventId::from_position(chapter, seq),
            description: desc.to_string(),
            chapter,
            sequence: seq,
            kind: EventKind::Other,
            participants: parts.iter().map(|s| s.to_string()).collect(),
            location: None,
            importance: imp,
            contribution: 0.0,
            parent: None,
            time_marker: None,
        }
    }

    fn main_character(name: &str) -> Character {
        let mut c = Character::new(name);
        c.classification = Classification::Main;
        c.importance = 0.9;
        c
    }

    fn analyzer<'a>(lex: &'a Lexicons, options: &'a AnalysisOptions) -> TimelineAnalyzer<'a> {
        TimelineAnalyzer::new(lex, options)
    }

    #[test]
    fn sub_event_nests_under_more_important_neighbor() {
        let lex = Lexicons::builtin();
        let options = AnalysisOptions::default();
        let events = vec![
            event(1, 0, 0.9, &["甲", "乙"], "大战"),
            event(1, 2, 0.5, &["甲", "乙"], "受伤"),
        ];
        let timeline = analyzer(&lex, &options).analyze(events, &[main_character("甲")]);
        assert_eq!(
            timeline.events[1].parent,
            Some(EventId::from_position(1, 0))
        );
        assert_eq!(timeline.events[0].parent, None);
    }

    #[test]
    fn hierarchy_is_intra_chapter_only() {
        let lex = Lexicons::builtin();
        let options = AnalysisOptions::default();
        let events = vec![
            event(1, 0, 0.9, &["甲", "乙"], "大战"),
            event(2, 0, 0.5, &["甲", "乙"], "受伤"),
        ];
        let timeline = analyzer(&lex, &options).analyze(events, &[main_character("甲")]);
        assert!(timeline.events.iter().all(|e| e.parent.is_none()));
    }

    #[test]
    fn consequence_cue_creates_forward_link() {
        let lex = Lexicons::builtin();
        let options = AnalysisOptions::default();
        let events = vec![
            event(3, 0, 0.9, &["甲", "乙"], "甲与乙大战"),
            event(4, 0, 0.6, &["甲"], "于是甲受伤"),
        ];
        let timeline = analyzer(&lex, &options).analyze(events, &[main_character("甲")]);
        assert_eq!(timeline.causal_links.len(), 1);
        let link = &timeline.causal_links[0];
        assert_eq!(link.cause, EventId::from_position(3, 0));
        assert_eq!(link.effect, EventId::from_position(4, 0));
        assert!(link.strength >= 0.4);
    }

    #[test]
    fn causal_links_respect_temporal_order() {
        let lex = Lexicons::builtin();
        let options = AnalysisOptions::default();
        let events = vec![
            event(1, 0, 0.9, &["甲"], "于是甲出发"),
            event(2, 0, 0.9, &["甲"], "甲到达"),
        ];
        let timeline = analyzer(&lex, &options).analyze(events, &[main_character("甲")]);
        // The cue sits on the *earlier* event, so no backward link forms.
        assert!(timeline.causal_links.is_empty());
    }

    #[test]
    fn contributions_are_normalized_and_main_plot_is_subset() {
        let lex = Lexicons::builtin();
        let options = AnalysisOptions::default();
        let events = vec![
            event(1, 0, 0.9, &["甲", "乙"], "相遇"),
            event(1, 1, 0.8, &["甲", "乙"], "于是结伴"),
            event(2, 0, 0.4, &["丙"], "旁观"),
        ];
        let ids: HashSet<EventId> = events.iter().map(|e| e.id.clone()).collect();
        let timeline = analyzer(&lex, &options).analyze(events, &[main_character("甲")]);
        assert!(timeline
            .events
            .iter()
            .all(|e| (0.0..=1.0).contains(&e.contribution)));
        assert!(!timeline.main_plot_events.is_empty());
        assert!(timeline.main_plot_events.iter().all(|id| ids.contains(id)));
    }

    #[test]
    fn transition_channel_adds_links_after_state_tracking() {
        let lex = Lexicons::builtin();
        let options = AnalysisOptions::default();
        let events = vec![
            event(3, 0, 0.9, &["甲", "乙"], "甲与乙大战"),
            event(4, 0, 0.6, &["甲"], "甲受伤"),
        ];
        let mut timeline = analyzer(&lex, &options).analyze(events, &[main_character("甲")]);
        assert!(timeline.causal_links.is_empty());

        let transitions = vec![StateTransition {
            character: "甲".into(),
            axis: crate::model::StateAxis::Health,
            from_chapter: 3,
            to_chapter: 4,
            delta: -0.2,
            cause_event: None,
        }];
        augment_causal_with_transitions(&mut timeline, &transitions, &options);
        assert_eq!(timeline.causal_links.len(), 1);
        assert_eq!(timeline.causal_links[0].effect, EventId::from_position(4, 0));
    }

    #[test]
    fn time_markers_attached_from_descriptions() {
        let lex = Lexicons::builtin();
        let options = AnalysisOptions::default();
        let events = vec![event(1, 0, 0.9, &["甲"], "三日后，甲归来")];
        let timeline = analyzer(&lex, &options).analyze(events, &[main_character("甲")]);
        assert!(matches!(
            timeline.events[0].time_marker,
            Some(crate::model::TimeMarker::Relative(_))
        ));
    }
}
