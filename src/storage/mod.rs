//! Graph storage backends

mod sqlite;

pub use sqlite::SqliteStore;

use crate::graph::{GraphEdge, GraphNode, NodeLabel, PropertyGraph};
use std::path::Path;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("novel not found: {0}")]
    NovelNotFound(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Filter criteria for querying projected nodes
#[derive(Debug, Clone, Default)]
pub struct NodeFilter {
    pub label: Option<NodeLabel>,
    pub limit: Option<usize>,
}

impl NodeFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_label(mut self, label: NodeLabel) -> Self {
        self.label = Some(label);
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Filter criteria for querying projected edges
#[derive(Debug, Clone, Default)]
pub struct EdgeFilter {
    pub relationship: Option<String>,
    pub source: Option<String>,
    pub limit: Option<usize>,
}

impl EdgeFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_relationship(mut self, relationship: impl Into<String>) -> Self {
        self.relationship = Some(relationship.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

/// Trait for property-graph storage backends
///
/// Implementations must be thread-safe (Send + Sync): the enclosing task
/// manager runs analyses over disjoint novel ids concurrently against one
/// store.
pub trait GraphStore: Send + Sync {
    /// Replace the stored projection for a novel in one transaction.
    ///
    /// Prior nodes and edges under the id are deleted before insertion,
    /// so re-running an analysis is idempotent at the store level.
    fn upsert_bundle(&self, novel_id: &str, graph: &PropertyGraph) -> StorageResult<()>;

    /// Load the stored projection for a novel, normalized.
    fn load_graph(&self, novel_id: &str) -> StorageResult<PropertyGraph>;

    /// Delete everything stored under a novel id. Returns whether any
    /// rows existed.
    fn delete_novel(&self, novel_id: &str) -> StorageResult<bool>;

    /// Ids of all stored novels.
    fn list_novels(&self) -> StorageResult<Vec<String>>;

    /// Nodes matching a filter.
    fn find_nodes(&self, novel_id: &str, filter: &NodeFilter) -> StorageResult<Vec<GraphNode>>;

    /// Edges matching a filter.
    fn find_edges(&self, novel_id: &str, filter: &EdgeFilter) -> StorageResult<Vec<GraphEdge>>;
}

/// Extension trait for opening stores from paths
pub trait OpenStore: GraphStore + Sized {
    /// Open or create a store at the given path
    fn open(path: impl AsRef<Path>) -> StorageResult<Self>;

    /// Create an in-memory store (useful for testing)
    fn open_in_memory() -> StorageResult<Self>;
}
