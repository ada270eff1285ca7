//! Logical data model for narrative analysis
//!
//! These are the in-memory entities the pipeline produces; the persistent
//! form is the property-graph projection in [`crate::graph`].

mod bundle;
mod character;
mod emotion;
mod event;
mod location;
mod novel;
mod state;

pub use bundle::{AnalysisBundle, Statistics};
pub use character::{
    Character, Classification, EvidenceChannel, Relation, RelationEvidence, RelationKind,
};
pub use emotion::{
    ChapterEmotion, CharacterEmotion, EmotionCategory, EmotionalPeak, PeakKind, EMOTION_CATEGORIES,
};
pub use event::{CausalLink, Event, EventId, EventKind, TimeMarker};
pub use location::{Location, LocationKind, LocationVisit, SceneTransition};
pub use novel::{Chapter, Novel};
pub use state::{CharacterState, StateAxis, StateTransition, STATE_AXES};
