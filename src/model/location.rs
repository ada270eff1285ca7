//! Locations, visits, and scene transitions

use super::event::EventId;
use serde::{Deserialize, Serialize};

/// Coarse location classification from the suffix dictionary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LocationKind {
    City,
    Mountain,
    Building,
    Room,
    Region,
    Other,
}

impl LocationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LocationKind::City => "city",
            LocationKind::Mountain => "mountain",
            LocationKind::Building => "building",
            LocationKind::Room => "room",
            LocationKind::Region => "region",
            LocationKind::Other => "other",
        }
    }
}

/// A named place where events unfold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub name: String,
    pub kind: LocationKind,
    /// Normalized importance in [0, 1]
    pub importance: f64,
    /// Number of events that happen here
    pub event_count: usize,
}

impl Location {
    pub fn new(name: impl Into<String>, kind: LocationKind) -> Self {
        Self {
            name: name.into(),
            kind,
            importance: 0.0,
            event_count: 0,
        }
    }
}

/// How often a character is placed at a location within one chapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationVisit {
    pub character: String,
    pub location: String,
    pub chapter: usize,
    pub visit_count: usize,
}

/// A change of location between temporally adjacent events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneTransition {
    pub from: String,
    pub to: String,
    pub chapter: usize,
    pub triggering_event: EventId,
}
