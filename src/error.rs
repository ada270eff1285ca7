//! Crate-level error types
//!
//! A single error object crosses the API boundary: `{kind, stage?, message}`.
//! Stage internals never leak panics or backtraces outward; an internal
//! fault is wrapped in `AnalysisError::StageFailure` with the stage name
//! and the underlying error preserved as its source.

use thiserror::Error;

/// Pipeline stages, in execution order.
///
/// Used for progress reporting and for error provenance in
/// [`AnalysisError::StageFailure`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    TextProcessing,
    EntityExtraction,
    RelationExtraction,
    CharacterAnalysis,
    EventAnalysis,
    TimelineAnalysis,
    LocationAnalysis,
    EmotionAnalysis,
    StateTracking,
    Persistence,
}

impl Stage {
    /// All stages in pipeline order.
    pub const ALL: [Stage; 10] = [
        Stage::TextProcessing,
        Stage::EntityExtraction,
        Stage::RelationExtraction,
        Stage::CharacterAnalysis,
        Stage::EventAnalysis,
        Stage::TimelineAnalysis,
        Stage::LocationAnalysis,
        Stage::EmotionAnalysis,
        Stage::StateTracking,
        Stage::Persistence,
    ];

    /// Short human-readable label for progress messages.
    pub fn label(&self) -> &'static str {
        match self {
            Stage::TextProcessing => "text processing",
            Stage::EntityExtraction => "entity extraction",
            Stage::RelationExtraction => "relation extraction",
            Stage::CharacterAnalysis => "character analysis",
            Stage::EventAnalysis => "event analysis",
            Stage::TimelineAnalysis => "timeline analysis",
            Stage::LocationAnalysis => "location analysis",
            Stage::EmotionAnalysis => "emotion analysis",
            Stage::StateTracking => "state tracking",
            Stage::Persistence => "graph store write",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Errors surfaced by the analysis pipeline
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// Malformed or empty novel input
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Fewer than two characters survived entity filtering.
    ///
    /// The orchestrator converts this into a successful empty bundle;
    /// it only escapes when a stage is invoked directly on degenerate input.
    #[error("no entities found: {0}")]
    NoEntitiesFound(String),

    /// A required lexicon resource is absent
    #[error("lexicon missing: {0}")]
    LexiconMissing(String),

    /// Unrecoverable fault inside a stage. The underlying error is kept
    /// as the source so callers can walk the chain (a failed store write
    /// surfaces here with `Stage::Persistence` and the `StorageError`
    /// underneath).
    #[error("stage '{stage}' failed: {source}")]
    StageFailure {
        stage: Stage,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
    },

    /// The analysis was cancelled between stages
    #[error("analysis cancelled")]
    Cancelled,
}

impl AnalysisError {
    /// Wrap an underlying stage fault with its stage provenance.
    pub fn stage_failure(
        stage: Stage,
        source: impl Into<Box<dyn std::error::Error + Send + Sync + 'static>>,
    ) -> Self {
        Self::StageFailure {
            stage,
            source: source.into(),
        }
    }

    /// The stage this error originated in, if it carries one.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::StageFailure { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

/// Result type for pipeline operations
pub type PipelineResult<T> = Result<T, AnalysisError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::StorageError;
    use std::error::Error;

    #[test]
    fn stage_failure_carries_provenance_and_source() {
        let underlying = StorageError::NovelNotFound("n1".into());
        let err = AnalysisError::stage_failure(Stage::Persistence, underlying);
        assert_eq!(err.stage(), Some(Stage::Persistence));
        assert!(err.to_string().contains("graph store write"));

        let source = err.source().expect("source preserved");
        assert!(source.to_string().contains("n1"));
        assert!(source.downcast_ref::<StorageError>().is_some());
    }

    #[test]
    fn input_errors_have_no_stage() {
        assert_eq!(AnalysisError::InvalidInput("empty".into()).stage(), None);
        assert_eq!(AnalysisError::Cancelled.stage(), None);
    }

    #[test]
    fn stages_are_in_pipeline_order() {
        assert_eq!(Stage::ALL.first(), Some(&Stage::TextProcessing));
        assert_eq!(Stage::ALL.last(), Some(&Stage::Persistence));
    }
}
