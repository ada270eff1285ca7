//! Location scoring, scene transitions, and visit tables

use super::{Entities, ProcessedText};
use crate::model::{Event, Location, LocationVisit, SceneTransition};
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::debug;

/// Bonus weight for distinct character visitors, on top of normalized
/// event importance.
const VISITOR_BONUS: f64 = 0.1;
const VISITOR_CAP: usize = 5;

/// Output of the location stage.
#[derive(Debug, Clone)]
pub struct LocationReport {
    /// Locations with importance and event counts filled, sorted by name
    pub locations: Vec<Location>,
    pub visits: Vec<LocationVisit>,
    pub transitions: Vec<SceneTransition>,
}

/// Scores locations, tracks scene transitions along the event order, and
/// builds per-character visit tables.
pub struct LocationAnalyzer;

impl LocationAnalyzer {
    pub fn new() -> Self {
        Self
    }

    /// Run the stage over the ordered events and the mention index.
    pub fn analyze(
        &self,
        text: &ProcessedText,
        entities: &Entities,
        events: &[Event],
    ) -> LocationReport {
        let mut locations = entities.locations.clone();

        // Event counts, importance sums, and distinct visitors per location.
        let mut importance_sum: HashMap<&str, f64> = HashMap::new();
        let mut visitors: HashMap<&str, HashSet<&str>> = HashMap::new();
        for event in events {
            let Some(name) = event.location.as_deref() else {
                continue;
            };
            *importance_sum.entry(name).or_insert(0.0) += event.importance;
            visitors
                .entry(name)
                .or_default()
                .extend(event.participants.iter().map(String::as_str));
        }
        for location in &mut locations {
            location.event_count = events
                .iter()
                .filter(|e| e.location.as_deref() == Some(location.name.as_str()))
                .count();
        }
        let max_sum = importance_sum.values().cloned().fold(0.0_f64, f64::max);
        for location in &mut locations {
            let normalized = if max_sum > 0.0 {
                importance_sum
                    .get(location.name.as_str())
                    .copied()
                    .unwrap_or(0.0)
                    / max_sum
            } else {
                0.0
            };
            let distinct = visitors
                .get(location.name.as_str())
                .map(|v| v.len())
                .unwrap_or(0);
            location.importance = (normalized
                + VISITOR_BONUS * distinct.min(VISITOR_CAP) as f64)
                .clamp(0.0, 1.0);
        }

        // Scene transitions between consecutive located events.
        let mut transitions = Vec::new();
        let mut previous: Option<&str> = None;
        for event in events {
            let Some(here) = event.location.as_deref() else {
                continue;
            };
            if let Some(from) = previous {
                if from != here {
                    transitions.push(SceneTransition {
                        from: from.to_string(),
                        to: here.to_string(),
                        chapter: event.chapter,
                        triggering_event: event.id.clone(),
                    });
                }
            }
            previous = Some(here);
        }

        // Visit tables: sentence-level co-mentions plus event placements.
        let mut visit_counts: BTreeMap<(String, String, usize), usize> = BTreeMap::new();
        for (pos, chapter) in text.chapters.iter().enumerate() {
            for (sidx, names) in entities.mentions[pos].iter().enumerate() {
                for place in &entities.location_mentions[pos][sidx] {
                    for name in names {
                        *visit_counts
                            .entry((name.clone(), place.clone(), chapter.index))
                            .or_insert(0) += 1;
                    }
                }
            }
        }
        for event in events {
            let Some(place) = &event.location else { continue };
            for name in &event.participants {
                *visit_counts
                    .entry((name.clone(), place.clone(), event.chapter))
                    .or_insert(0) += 1;
            }
        }
        let visits: Vec<LocationVisit> = visit_counts
            .into_iter()
            .map(|((character, location, chapter), visit_count)| LocationVisit {
                character,
                location,
                chapter,
                visit_count,
            })
            .collect();

        debug!(
            locations = locations.len(),
            transitions = transitions.len(),
            visits = visits.len(),
            "location analysis complete"
        );
        LocationReport {
            locations,
            visits,
            transitions,
        }
    }
}

impl Default for LocationAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}
