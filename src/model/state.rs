//! Character state axes and transitions

use super::event::EventId;
use serde::{Deserialize, Serialize};

/// The four tracked state axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateAxis {
    Health,
    Mood,
    Ability,
    SocialStanding,
}

/// All axes, in reporting order.
pub const STATE_AXES: [StateAxis; 4] = [
    StateAxis::Health,
    StateAxis::Mood,
    StateAxis::Ability,
    StateAxis::SocialStanding,
];

impl StateAxis {
    pub fn as_str(&self) -> &'static str {
        match self {
            StateAxis::Health => "health",
            StateAxis::Mood => "mood",
            StateAxis::Ability => "ability",
            StateAxis::SocialStanding => "social_standing",
        }
    }
}

/// One state snapshot: a character's value on one axis in one chapter.
///
/// Snapshots are dense — every principal character has a value on every
/// axis in every chapter from its first appearance on, carried forward
/// from the last change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacterState {
    pub character: String,
    pub chapter: usize,
    pub axis: StateAxis,
    /// Bounded scalar in [0, 1]; 0.5 is neutral
    pub value: f64,
    /// Event that triggered the change in this chapter, if any
    pub triggering_event: Option<EventId>,
}

/// A significant state change between two chapters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateTransition {
    pub character: String,
    pub axis: StateAxis,
    pub from_chapter: usize,
    pub to_chapter: usize,
    /// Signed change in axis value
    pub delta: f64,
    pub cause_event: Option<EventId>,
}
