//! SQLite storage backend

use super::{EdgeFilter, GraphStore, NodeFilter, OpenStore, StorageError, StorageResult};
use crate::graph::{GraphEdge, GraphNode, NodeLabel, Properties, PropertyGraph};
use rusqlite::{params, Connection};
use std::path::Path;
use std::str::FromStr;
use std::sync::Mutex;

/// SQLite-backed graph store
///
/// One database file holds every analyzed novel; all rows are keyed by
/// novel id and `upsert_bundle` replaces a novel's rows inside a single
/// transaction. Thread-safe via an internal mutex on the connection.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    fn init_schema(conn: &Connection) -> StorageResult<()> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS novels (
                id TEXT PRIMARY KEY,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS nodes (
                novel_id TEXT NOT NULL,
                id TEXT NOT NULL,
                label TEXT NOT NULL,
                properties_json TEXT NOT NULL,
                PRIMARY KEY (novel_id, id),
                FOREIGN KEY (novel_id) REFERENCES novels(id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_nodes_label
                ON nodes(novel_id, label);

            CREATE TABLE IF NOT EXISTS edges (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                novel_id TEXT NOT NULL,
                source_id TEXT NOT NULL,
                target_id TEXT NOT NULL,
                relationship TEXT NOT NULL,
                properties_json TEXT NOT NULL,
                FOREIGN KEY (novel_id) REFERENCES novels(id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_edges_source
                ON edges(novel_id, source_id);
            CREATE INDEX IF NOT EXISTS idx_edges_relationship
                ON edges(novel_id, relationship);

            PRAGMA foreign_keys = ON;
            PRAGMA journal_mode = WAL;
            "#,
        )?;
        Ok(())
    }

    fn row_to_node(
        id: String,
        label: String,
        properties_json: String,
    ) -> StorageResult<GraphNode> {
        let label = NodeLabel::from_str(&label)
            .map_err(|e| StorageError::Database(rusqlite::Error::InvalidParameterName(e)))?;
        let properties: Properties = serde_json::from_str(&properties_json)?;
        Ok(GraphNode {
            id,
            label,
            properties,
        })
    }

    fn row_to_edge(
        source: String,
        target: String,
        relationship: String,
        properties_json: String,
    ) -> StorageResult<GraphEdge> {
        let properties: Properties = serde_json::from_str(&properties_json)?;
        Ok(GraphEdge {
            source,
            target,
            relationship,
            properties,
        })
    }
}

impl GraphStore for SqliteStore {
    fn upsert_bundle(&self, novel_id: &str, graph: &PropertyGraph) -> StorageResult<()> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;

        tx.execute("DELETE FROM edges WHERE novel_id = ?1", params![novel_id])?;
        tx.execute("DELETE FROM nodes WHERE novel_id = ?1", params![novel_id])?;
        tx.execute("DELETE FROM novels WHERE id = ?1", params![novel_id])?;

        tx.execute(
            "INSERT INTO novels (id, updated_at) VALUES (?1, ?2)",
            params![novel_id, chrono::Utc::now().to_rfc3339()],
        )?;
        {
            let mut node_stmt = tx.prepare(
                "INSERT INTO nodes (novel_id, id, label, properties_json)
                 VALUES (?1, ?2, ?3, ?4)",
            )?;
            for node in &graph.nodes {
                node_stmt.execute(params![
                    novel_id,
                    node.id,
                    node.label.as_str(),
                    serde_json::to_string(&node.properties)?,
                ])?;
            }
            let mut edge_stmt = tx.prepare(
                "INSERT INTO edges (novel_id, source_id, target_id, relationship, properties_json)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for edge in &graph.edges {
                edge_stmt.execute(params![
                    novel_id,
                    edge.source,
                    edge.target,
                    edge.relationship,
                    serde_json::to_string(&edge.properties)?,
                ])?;
            }
        }

        tx.commit()?;
        Ok(())
    }

    fn load_graph(&self, novel_id: &str) -> StorageResult<PropertyGraph> {
        let conn = self.conn.lock().unwrap();
        let exists: bool = conn.query_row(
            "SELECT COUNT(*) > 0 FROM novels WHERE id = ?1",
            params![novel_id],
            |row| row.get(0),
        )?;
        if !exists {
            return Err(StorageError::NovelNotFound(novel_id.to_string()));
        }

        let mut graph = PropertyGraph::new();
        let mut stmt =
            conn.prepare("SELECT id, label, properties_json FROM nodes WHERE novel_id = ?1")?;
        let nodes = stmt.query_map(params![novel_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?;
        for node in nodes {
            let (id, label, properties) = node?;
            graph.nodes.push(Self::row_to_node(id, label, properties)?);
        }

        let mut stmt = conn.prepare(
            "SELECT source_id, target_id, relationship, properties_json
             FROM edges WHERE novel_id = ?1",
        )?;
        let edges = stmt.query_map(params![novel_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
            ))
        })?;
        for edge in edges {
            let (source, target, relationship, properties) = edge?;
            graph
                .edges
                .push(Self::row_to_edge(source, target, relationship, properties)?);
        }

        graph.normalize();
        Ok(graph)
    }

    fn delete_novel(&self, novel_id: &str) -> StorageResult<bool> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM edges WHERE novel_id = ?1", params![novel_id])?;
        tx.execute("DELETE FROM nodes WHERE novel_id = ?1", params![novel_id])?;
        let removed = tx.execute("DELETE FROM novels WHERE id = ?1", params![novel_id])?;
        tx.commit()?;
        Ok(removed > 0)
    }

    fn list_novels(&self) -> StorageResult<Vec<String>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare("SELECT id FROM novels ORDER BY id")?;
        let ids = stmt.query_map([], |row| row.get::<_, String>(0))?;
        let mut out = Vec::new();
        for id in ids {
            out.push(id?);
        }
        Ok(out)
    }

    fn find_nodes(&self, novel_id: &str, filter: &NodeFilter) -> StorageResult<Vec<GraphNode>> {
        let graph = self.load_graph(novel_id)?;
        let mut nodes: Vec<GraphNode> = graph
            .nodes
            .into_iter()
            .filter(|n| filter.label.map_or(true, |l| n.label == l))
            .collect();
        if let Some(limit) = filter.limit {
            nodes.truncate(limit);
        }
        Ok(nodes)
    }

    fn find_edges(&self, novel_id: &str, filter: &EdgeFilter) -> StorageResult<Vec<GraphEdge>> {
        let graph = self.load_graph(novel_id)?;
        let mut edges: Vec<GraphEdge> = graph
            .edges
            .into_iter()
            .filter(|e| {
                filter
                    .relationship
                    .as_deref()
                    .map_or(true, |r| e.relationship == r)
                    && filter.source.as_deref().map_or(true, |s| e.source == s)
            })
            .collect();
        if let Some(limit) = filter.limit {
            edges.truncate(limit);
        }
        Ok(edges)
    }
}

impl OpenStore for SqliteStore {
    fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn open_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{GraphEdge, GraphNode, NodeLabel};

    fn sample_graph() -> PropertyGraph {
        let mut graph = PropertyGraph::new();
        graph.nodes.push(
            GraphNode::new("novel:n1", NodeLabel::Novel).with_property("title", "测试"),
        );
        graph.nodes.push(
            GraphNode::new("character:林远", NodeLabel::Character)
                .with_property("importance", 0.8),
        );
        graph.edges.push(
            GraphEdge::new("character:林远", "character:苏青", "KNOWS")
                .with_property("strength", 0.5),
        );
        graph.normalize();
        graph
    }

    #[test]
    fn upsert_then_load_roundtrips() {
        let store = SqliteStore::open_in_memory().unwrap();
        let graph = sample_graph();
        store.upsert_bundle("n1", &graph).unwrap();
        let loaded = store.load_graph("n1").unwrap();
        assert_eq!(loaded, graph);
    }

    #[test]
    fn upsert_is_idempotent() {
        let store = SqliteStore::open_in_memory().unwrap();
        let graph = sample_graph();
        store.upsert_bundle("n1", &graph).unwrap();
        store.upsert_bundle("n1", &graph).unwrap();
        let loaded = store.load_graph("n1").unwrap();
        assert_eq!(loaded.nodes.len(), graph.nodes.len());
        assert_eq!(loaded.edges.len(), graph.edges.len());
        assert_eq!(store.list_novels().unwrap(), vec!["n1".to_string()]);
    }

    #[test]
    fn missing_novel_is_an_error() {
        let store = SqliteStore::open_in_memory().unwrap();
        assert!(matches!(
            store.load_graph("absent"),
            Err(StorageError::NovelNotFound(_))
        ));
    }

    #[test]
    fn delete_removes_all_rows() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.upsert_bundle("n1", &sample_graph()).unwrap();
        assert!(store.delete_novel("n1").unwrap());
        assert!(!store.delete_novel("n1").unwrap());
        assert!(store.list_novels().unwrap().is_empty());
    }

    #[test]
    fn filters_select_by_label_and_relationship() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.upsert_bundle("n1", &sample_graph()).unwrap();

        let characters = store
            .find_nodes("n1", &NodeFilter::new().with_label(NodeLabel::Character))
            .unwrap();
        assert_eq!(characters.len(), 1);

        let knows = store
            .find_edges("n1", &EdgeFilter::new().with_relationship("KNOWS"))
            .unwrap();
        assert_eq!(knows.len(), 1);
        assert_eq!(knows[0].source, "character:林远");
    }

    #[test]
    fn persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graph.db");
        {
            let store = SqliteStore::open(&path).unwrap();
            store.upsert_bundle("n1", &sample_graph()).unwrap();
        }
        let store = SqliteStore::open(&path).unwrap();
        assert_eq!(store.list_novels().unwrap(), vec!["n1".to_string()]);
    }
}
