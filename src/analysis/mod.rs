//! The narrative analysis pipeline
//!
//! A fixed sequence of typed transformations over an immutable context:
//! each stage consumes the outputs of its predecessors and produces a new
//! immutable value. The stage set is closed — there is no open analyzer
//! registry — because the cross-stage data contracts are where the
//! invariants live.
//!
//! Execution order (see [`orchestrator::Orchestrator`]):
//! text → entities → relations → characters → events → timeline →
//! locations → emotion → state.

mod character;
mod emotion;
mod entity;
mod event;
mod location;
mod orchestrator;
mod relation;
mod state;
mod timeline;

pub use character::CharacterAnalyzer;
pub use emotion::{EmotionAnalyzer, EmotionReport};
pub use entity::{Entities, EntityExtractor};
pub use event::EventAnalyzer;
pub use location::{LocationAnalyzer, LocationReport};
pub use orchestrator::{Orchestrator, ProgressFn};
pub use relation::RelationExtractor;
pub use state::{StateReport, StateTracker};
pub use timeline::{Timeline, TimelineAnalyzer};

use crate::error::AnalysisError;
use crate::lexicon::Lexicons;
use crate::model::Novel;
use crate::text::TextProcessor;

/// One chapter after text processing: its sentences plus a word count.
#[derive(Debug, Clone)]
pub struct ProcessedChapter {
    pub index: usize,
    pub title: String,
    pub sentences: Vec<String>,
    pub word_count: usize,
}

/// The whole novel after text processing — the first stage output and the
/// backbone every later stage reads.
#[derive(Debug, Clone)]
pub struct ProcessedText {
    pub chapters: Vec<ProcessedChapter>,
}

impl ProcessedText {
    /// Run the text-processing stage.
    pub fn from_novel(novel: &Novel, lexicons: &Lexicons) -> Result<Self, AnalysisError> {
        novel.validate()?;
        let processor = TextProcessor::new(lexicons);
        let mut chapters = Vec::with_capacity(novel.chapters.len());
        for chapter in &novel.chapters {
            let sentences = match processor.sentences(&chapter.text) {
                Ok(s) => s,
                // An individual blank chapter is tolerated; the novel-level
                // validation already rejected the all-blank case.
                Err(AnalysisError::InvalidInput(_)) => Vec::new(),
                Err(e) => return Err(e),
            };
            let word_count = chapter
                .text
                .chars()
                .filter(|c| !c.is_whitespace())
                .count();
            chapters.push(ProcessedChapter {
                index: chapter.index,
                title: chapter.title.clone(),
                sentences,
                word_count,
            });
        }
        Ok(Self { chapters })
    }

    pub fn chapter_count(&self) -> usize {
        self.chapters.len()
    }

    pub fn total_words(&self) -> usize {
        self.chapters.iter().map(|c| c.word_count).sum()
    }
}
