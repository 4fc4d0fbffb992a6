//! Graph store boundary.
//!
//! The loader talks to a store only through [`GraphStore`]. Records reach
//! the store as flat property maps: every value is a scalar (bool, number,
//! string), structured values are serialized to JSON text beforehand and
//! nulls are dropped.

pub mod loader;
pub mod memory;
pub mod neo4j;
pub mod schema;

use crate::error::Result;
use serde_json::{Map, Value};

pub use loader::{GraphLoader, LoadReport};
pub use memory::MemoryGraphStore;
pub use neo4j::Neo4jStore;

/// Flat scalar properties of one node or relationship.
pub type Properties = Map<String, Value>;

/// One relationship to create between two node ids.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeRow {
    /// Source node id.
    pub from_id: String,
    /// Destination node id.
    pub to_id: String,
    /// Relationship properties.
    pub properties: Properties,
}

/// How batches are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteMode {
    /// Always create new entities, even if one with the same id exists.
    #[default]
    Create,
    /// Upsert nodes by `(label, id)` and relationships by `(type, from, to)`.
    Merge,
}

/// A graph-oriented store.
///
/// Methods that write return how many entities the statement affected.
/// A rejected statement is [`crate::RepoGraphError::Statement`]; a lost or
/// unreachable session is [`crate::RepoGraphError::StoreConnection`].
pub trait GraphStore {
    /// Cheap round trip proving the session is alive.
    fn ping(&mut self) -> Result<()>;

    /// Number of nodes currently stored.
    fn count_nodes(&mut self) -> Result<u64>;

    /// Delete up to `limit` nodes together with their relationships.
    fn delete_nodes(&mut self, limit: usize) -> Result<u64>;

    /// Ensure `id` is unique among nodes labelled `label`.
    fn ensure_unique_id(&mut self, label: &str) -> Result<()>;

    /// Ensure a lookup index on `label.property`.
    fn ensure_index(&mut self, label: &str, property: &str) -> Result<()>;

    /// Insert nodes labelled `label`. All-or-nothing per call.
    fn insert_nodes(&mut self, label: &str, rows: &[Properties], mode: WriteMode) -> Result<usize>;

    /// Insert relationships of type `rel_type` between existing nodes
    /// matched by id. Rows whose endpoints do not exist create nothing.
    fn insert_edges(&mut self, rel_type: &str, rows: &[EdgeRow], mode: WriteMode) -> Result<usize>;
}

/// Flatten a record into store properties.
///
/// Keys in `skip` are dropped, as are nulls. Arrays and objects become
/// their JSON text.
pub fn flatten(record: &Map<String, Value>, skip: &[&str]) -> Properties {
    let mut properties = Properties::new();
    for (key, value) in record {
        if skip.contains(&key.as_str()) {
            continue;
        }
        match value {
            Value::Null => {}
            Value::Array(_) | Value::Object(_) => {
                properties.insert(key.clone(), Value::String(value.to_string()));
            }
            scalar => {
                properties.insert(key.clone(), scalar.clone());
            }
        }
    }
    properties
}
