//! Events, their hierarchy, and causal links

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for an event.
///
/// Serializes as a plain string. Deterministic form `ev:<chapter>:<seq>`
/// is used by the pipeline so re-runs produce identical ids.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(String);

impl EventId {
    /// Deterministic id from the event's position in the total order.
    pub fn from_position(chapter: usize, sequence: usize) -> Self {
        Self(format!("ev:{chapter}:{sequence}"))
    }

    /// Random id, for events created outside the pipeline.
    pub fn random() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for EventId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Event classification, derived from the matched verb or cue class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventKind {
    Meeting,
    Conflict,
    Cooperation,
    Parting,
    TurningPoint,
    Discovery,
    Other,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Meeting => "meeting",
            EventKind::Conflict => "conflict",
            EventKind::Cooperation => "cooperation",
            EventKind::Parting => "parting",
            EventKind::TurningPoint => "turning-point",
            EventKind::Discovery => "discovery",
            EventKind::Other => "other",
        }
    }
}

/// A time expression attached to an event, for display only — it never
/// overrides the (chapter, sequence) order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "text", rename_all = "lowercase")]
pub enum TimeMarker {
    /// e.g. 三月初三, 某年某月
    Absolute(String),
    /// e.g. 三日后, 次年
    Relative(String),
}

/// A discrete occurrence within one chapter.
///
/// Events are totally ordered by (chapter, sequence); every participant is
/// a canonical character name present in the bundle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    /// Short span of source text
    pub description: String,
    pub chapter: usize,
    /// Order within the chapter
    pub sequence: usize,
    pub kind: EventKind,
    /// Canonical character names mentioned in the event window
    pub participants: Vec<String>,
    /// Most recently mentioned location, if any
    pub location: Option<String>,
    /// Blended importance in [0, 1]
    pub importance: f64,
    /// Main-plot contribution in [0, 1], filled by the timeline analyzer
    pub contribution: f64,
    /// Parent event id when this is a sub-event
    pub parent: Option<EventId>,
    pub time_marker: Option<TimeMarker>,
}

impl Event {
    /// Position in the total order.
    pub fn position(&self) -> (usize, usize) {
        (self.chapter, self.sequence)
    }

    pub fn involves(&self, character: &str) -> bool {
        self.participants.iter().any(|p| p == character)
    }

    /// Count of participants shared with another event.
    pub fn shared_participants(&self, other: &Event) -> usize {
        self.participants
            .iter()
            .filter(|p| other.participants.contains(p))
            .count()
    }
}

/// A directed causal edge between two events.
///
/// Invariant: the cause precedes the effect in the total order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CausalLink {
    pub cause: EventId,
    pub effect: EventId,
    pub strength: f64,
}
