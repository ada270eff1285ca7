//! Pipeline orchestration
//!
//! Runs the stages in their fixed order, reports progress, honors
//! cancellation between stages, and writes the finished bundle to the
//! graph store. Stage outputs are immutable values handed to the next
//! stage; a stage error aborts the whole run and partial results are
//! discarded.

use super::{
    timeline, CharacterAnalyzer, EmotionAnalyzer, EntityExtractor, EventAnalyzer,
    LocationAnalyzer, ProcessedText, RelationExtractor, StateTracker, TimelineAnalyzer,
};
use crate::config::AnalysisOptions;
use crate::error::{AnalysisError, PipelineResult, Stage};
use crate::graph::project_bundle;
use crate::lexicon::Lexicons;
use crate::model::{AnalysisBundle, Novel, Statistics};
use crate::storage::GraphStore;
use crate::tasks::CancelSignal;
use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

/// Progress callback: percentage (0–100) and a short message.
pub type ProgressFn = dyn Fn(u8, &str) + Send + Sync;

/// Runs one analysis end to end.
///
/// The orchestrator is single-threaded within one analysis and holds no
/// mutable state between runs, so any number of orchestrators may run
/// concurrently over disjoint novel identifiers.
pub struct Orchestrator {
    lexicons: Lexicons,
    options: AnalysisOptions,
}

impl Orchestrator {
    pub fn new(lexicons: Lexicons, options: AnalysisOptions) -> Self {
        Self { lexicons, options }
    }

    /// Builtin lexicons, default thresholds.
    pub fn with_defaults() -> Self {
        Self::new(Lexicons::builtin(), AnalysisOptions::default())
    }

    pub fn options(&self) -> &AnalysisOptions {
        &self.options
    }

    /// Run the full pipeline, returning the immutable analysis bundle.
    ///
    /// Degenerate input (`NoEntitiesFound`) terminates successfully with
    /// an empty bundle whose statistics are still populated. Any other
    /// stage fault surfaces as [`AnalysisError::StageFailure`].
    pub async fn analyze(
        &self,
        novel: &Novel,
        progress: Option<&ProgressFn>,
        cancel: &CancelSignal,
    ) -> PipelineResult<AnalysisBundle> {
        let report = |pct: u8, msg: &str| {
            if let Some(f) = progress {
                f(pct, msg);
            }
        };
        let checkpoint = |pct: u8, stage: Stage| -> PipelineResult<()> {
            if cancel.is_set() {
                info!(novel = %novel.id, "analysis cancelled before {stage}");
                return Err(AnalysisError::Cancelled);
            }
            report(pct, stage.label());
            Ok(())
        };

        info!(novel = %novel.id, chapters = novel.chapters.len(), "analysis started");

        checkpoint(0, Stage::TextProcessing)?;
        let text = ProcessedText::from_novel(novel, &self.lexicons)?;
        tokio::task::yield_now().await;

        checkpoint(10, Stage::EntityExtraction)?;
        let entities = match EntityExtractor::new(&self.lexicons, &self.options).extract(&text) {
            Ok(entities) => entities,
            Err(AnalysisError::NoEntitiesFound(reason)) => {
                warn!(novel = %novel.id, %reason, "degenerate input, returning empty bundle");
                report(100, "complete (no entities)");
                return Ok(AnalysisBundle::empty(
                    &novel.id,
                    &novel.title,
                    novel.author.clone(),
                    Statistics {
                        chapters: text.chapter_count(),
                        words: text.total_words(),
                        ..Default::default()
                    },
                ));
            }
            Err(e) => return Err(e),
        };
        tokio::task::yield_now().await;

        checkpoint(20, Stage::RelationExtraction)?;
        let relations =
            RelationExtractor::new(&self.lexicons, &self.options).extract(&text, &entities);
        tokio::task::yield_now().await;

        checkpoint(30, Stage::CharacterAnalysis)?;
        let characters =
            CharacterAnalyzer::new(&self.options).analyze(&text, &entities, &relations);
        tokio::task::yield_now().await;

        checkpoint(45, Stage::EventAnalysis)?;
        let events =
            EventAnalyzer::new(&self.lexicons, &self.options).analyze(&text, &entities, &characters);
        tokio::task::yield_now().await;

        checkpoint(55, Stage::TimelineAnalysis)?;
        let mut timeline =
            TimelineAnalyzer::new(&self.lexicons, &self.options).analyze(events, &characters);
        tokio::task::yield_now().await;

        checkpoint(70, Stage::LocationAnalysis)?;
        let location_report = LocationAnalyzer::new().analyze(&text, &entities, &timeline.events);
        tokio::task::yield_now().await;

        checkpoint(80, Stage::EmotionAnalysis)?;
        let emotion_report =
            EmotionAnalyzer::new(&self.lexicons, &self.options).analyze(&text, &entities);
        tokio::task::yield_now().await;

        checkpoint(90, Stage::StateTracking)?;
        let state_report = StateTracker::new(&self.lexicons, &self.options).analyze(
            &text,
            &entities,
            &characters,
            &timeline,
        );
        // The shared-state-transition causal channel can only be evaluated
        // once state tracking has run.
        timeline::augment_causal_with_transitions(
            &mut timeline,
            &state_report.transitions,
            &self.options,
        );

        let statistics = Statistics {
            chapters: text.chapter_count(),
            words: text.total_words(),
            characters: characters.len(),
            relations: relations.len(),
            events: timeline.events.len(),
            locations: location_report.locations.len(),
            main_plot_events: timeline.main_plot_events.len(),
        };

        let appearances = entities.appearances(&text);
        let chapter_words = text
            .chapters
            .iter()
            .map(|c| (c.index, c.title.clone(), c.word_count))
            .collect();

        let mut bundle = AnalysisBundle {
            run_id: Uuid::new_v4().to_string(),
            novel_id: novel.id.clone(),
            novel_title: novel.title.clone(),
            author: novel.author.clone(),
            created_at: Utc::now(),
            characters,
            appearances,
            relations,
            events: timeline.events,
            causal_links: timeline.causal_links,
            main_plot_events: timeline.main_plot_events,
            locations: location_report.locations,
            visits: location_report.visits,
            scene_transitions: location_report.transitions,
            chapter_emotions: emotion_report.chapters,
            character_emotions: emotion_report.directed,
            emotional_peaks: emotion_report.peaks,
            states: state_report.states,
            state_transitions: state_report.transitions,
            chapter_words,
            statistics,
            persisted: false,
        };
        bundle.normalize();

        report(100, "complete");
        info!(
            novel = %novel.id,
            characters = bundle.statistics.characters,
            events = bundle.statistics.events,
            "analysis complete"
        );
        Ok(bundle)
    }

    /// Project a finished bundle and write it to the store.
    ///
    /// A failed write surfaces as `StageFailure` on the persistence
    /// stage with the `StorageError` as its source.
    pub fn persist(
        &self,
        bundle: &AnalysisBundle,
        store: &dyn GraphStore,
    ) -> PipelineResult<()> {
        let graph = project_bundle(bundle);
        store
            .upsert_bundle(&bundle.novel_id, &graph)
            .map_err(|e| AnalysisError::stage_failure(Stage::Persistence, e))?;
        info!(
            novel = %bundle.novel_id,
            nodes = graph.nodes.len(),
            edges = graph.edges.len(),
            "bundle persisted"
        );
        Ok(())
    }

    /// Run the pipeline and persist the bundle.
    ///
    /// A store failure after a successful pipeline does not discard the
    /// result: the bundle comes back with `persisted = false` and the
    /// error is logged. Cancellation before the write leaves the store in
    /// its pre-analysis state.
    pub async fn analyze_and_store(
        &self,
        novel: &Novel,
        store: &dyn GraphStore,
        progress: Option<&ProgressFn>,
        cancel: &CancelSignal,
    ) -> PipelineResult<AnalysisBundle> {
        let mut bundle = self.analyze(novel, progress, cancel).await?;

        if cancel.is_set() {
            return Err(AnalysisError::Cancelled);
        }
        if let Some(f) = progress {
            f(100, Stage::Persistence.label());
        }
        match self.persist(&bundle, store) {
            Ok(()) => bundle.persisted = true,
            Err(e) => {
                warn!(novel = %novel.id, error = %e, "graph store write failed; returning unpersisted bundle");
            }
        }
        Ok(bundle)
    }
}
