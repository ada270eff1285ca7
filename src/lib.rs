//! Wenmai: Narrative Knowledge Graph Engine
//!
//! Analyzes long-form Chinese fiction into a multi-layered, queryable
//! model of its internal world: the cast of characters, the relations
//! that bind them, the events that occur, the locations where they
//! unfold, the emotional trajectory of each chapter, and the evolving
//! states of principal characters.
//!
//! # Core Concepts
//!
//! - **Pipeline**: a fixed sequence of typed analysis stages, each
//!   consuming the immutable outputs of its predecessors
//! - **Bundle**: the immutable result of one analysis run
//! - **Projection**: the bundle written as a property graph, persisted
//!   per novel id
//!
//! # Example
//!
//! ```
//! use wenmai::{CancelSignal, Orchestrator};
//! use wenmai::model::{Chapter, Novel};
//!
//! # async fn demo() -> Result<(), wenmai::AnalysisError> {
//! let novel = Novel::new(
//!     "demo",
//!     "示例",
//!     vec![Chapter::new(1, "一", "林远入山。苏青到了。")],
//! );
//! let orchestrator = Orchestrator::with_defaults();
//! let bundle = orchestrator
//!     .analyze(&novel, None, &CancelSignal::new())
//!     .await?;
//! println!("{} characters", bundle.statistics.characters);
//! # Ok(())
//! # }
//! ```

pub mod analysis;
pub mod config;
pub mod error;
pub mod graph;
pub mod ingest;
pub mod lexicon;
pub mod model;
pub mod storage;
pub mod tasks;
pub mod text;

pub use analysis::{Orchestrator, ProgressFn};
pub use config::AnalysisOptions;
pub use error::{AnalysisError, PipelineResult, Stage};
pub use graph::{project_bundle, GraphEdge, GraphNode, NodeLabel, PropertyGraph, PropertyValue};
pub use lexicon::Lexicons;
pub use model::{AnalysisBundle, Statistics};
pub use storage::{
    EdgeFilter, GraphStore, NodeFilter, OpenStore, SqliteStore, StorageError, StorageResult,
};
pub use tasks::{CancelSignal, TaskRegistry, TaskStatus};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
