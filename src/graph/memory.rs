//! In-process graph store.
//!
//! Mirrors the networked store in statement atomicity, scalar-only
//! property values that fit a signed 64-bit integer or float, and
//! relationships matched by `id` across all labels.
//!
//! It differs in one place: uniqueness constraints are recorded but never
//! enforced, so create mode happily stores a second node with an existing
//! `id`. A Neo4j database holding the `IS UNIQUE` constraints rejects that
//! second CREATE instead. Duplicate-id results from this store describe the
//! loader's create semantics, not Neo4j's.

use super::{EdgeRow, GraphStore, Properties, WriteMode};
use crate::error::{RepoGraphError, Result};
use serde_json::Value;
use std::collections::BTreeSet;

/// A stored node.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredNode {
    /// Store-internal entity key.
    pub key: u64,
    /// Node label.
    pub label: String,
    /// Node properties.
    pub properties: Properties,
}

impl StoredNode {
    /// The `id` property, if it is a string.
    pub fn id(&self) -> Option<&str> {
        self.properties.get("id").and_then(Value::as_str)
    }
}

/// A stored relationship.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredEdge {
    /// Relationship type.
    pub rel_type: String,
    /// Key of the source node.
    pub from_key: u64,
    /// Key of the destination node.
    pub to_key: u64,
    /// Relationship properties.
    pub properties: Properties,
}

/// In-memory [`GraphStore`].
#[derive(Debug, Default)]
pub struct MemoryGraphStore {
    nodes: Vec<StoredNode>,
    edges: Vec<StoredEdge>,
    next_key: u64,
    constraints: BTreeSet<String>,
    indexes: BTreeSet<(String, String)>,
    offline: bool,
}

impl MemoryGraphStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate losing the session: every call fails with a connection
    /// error until switched back.
    pub fn set_offline(&mut self, offline: bool) {
        self.offline = offline;
    }

    /// All nodes in insertion order.
    pub fn nodes(&self) -> &[StoredNode] {
        &self.nodes
    }

    /// All relationships in insertion order.
    pub fn edges(&self) -> &[StoredEdge] {
        &self.edges
    }

    /// Nodes whose `id` property equals `id`.
    pub fn nodes_with_id(&self, id: &str) -> Vec<&StoredNode> {
        self.nodes.iter().filter(|n| n.id() == Some(id)).collect()
    }

    /// Nodes labelled `label`.
    pub fn nodes_with_label(&self, label: &str) -> Vec<&StoredNode> {
        self.nodes.iter().filter(|n| n.label == label).collect()
    }

    /// Relationships of type `rel_type`.
    pub fn edges_of_type(&self, rel_type: &str) -> Vec<&StoredEdge> {
        self.edges.iter().filter(|e| e.rel_type == rel_type).collect()
    }

    /// Labels with a declared id constraint.
    pub fn constraints(&self) -> &BTreeSet<String> {
        &self.constraints
    }

    /// Declared `(label, property)` indexes.
    pub fn indexes(&self) -> &BTreeSet<(String, String)> {
        &self.indexes
    }

    fn check_online(&self) -> Result<()> {
        if self.offline {
            Err(RepoGraphError::StoreConnection {
                uri: "memory://".to_string(),
                message: "session closed".to_string(),
            })
        } else {
            Ok(())
        }
    }

    fn create_node(&mut self, label: &str, properties: Properties) {
        let key = self.next_key;
        self.next_key += 1;
        self.nodes.push(StoredNode {
            key,
            label: label.to_string(),
            properties,
        });
    }

    fn keys_with_id(&self, id: &str) -> Vec<u64> {
        self.nodes
            .iter()
            .filter(|n| n.id() == Some(id))
            .map(|n| n.key)
            .collect()
    }
}

/// Reject values the networked store cannot hold.
fn validate(properties: &Properties) -> Result<()> {
    for (key, value) in properties {
        match value {
            Value::Array(_) | Value::Object(_) => {
                return Err(RepoGraphError::Statement(format!(
                    "property '{}' is not a scalar",
                    key
                )))
            }
            Value::Number(n) if n.is_u64() && n.as_i64().is_none() => {
                return Err(RepoGraphError::Statement(format!(
                    "property '{}' is out of integer range: {}",
                    key, n
                )))
            }
            _ => {}
        }
    }
    Ok(())
}

fn without_nulls(properties: &Properties) -> Properties {
    properties
        .iter()
        .filter(|(_, v)| !v.is_null())
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

impl GraphStore for MemoryGraphStore {
    fn ping(&mut self) -> Result<()> {
        self.check_online()
    }

    fn count_nodes(&mut self) -> Result<u64> {
        self.check_online()?;
        Ok(self.nodes.len() as u64)
    }

    fn delete_nodes(&mut self, limit: usize) -> Result<u64> {
        self.check_online()?;
        let count = limit.min(self.nodes.len());
        let removed: BTreeSet<u64> = self.nodes.drain(..count).map(|n| n.key).collect();
        self.edges
            .retain(|e| !removed.contains(&e.from_key) && !removed.contains(&e.to_key));
        Ok(count as u64)
    }

    fn ensure_unique_id(&mut self, label: &str) -> Result<()> {
        self.check_online()?;
        self.constraints.insert(label.to_string());
        Ok(())
    }

    fn ensure_index(&mut self, label: &str, property: &str) -> Result<()> {
        self.check_online()?;
        self.indexes.insert((label.to_string(), property.to_string()));
        Ok(())
    }

    fn insert_nodes(&mut self, label: &str, rows: &[Properties], mode: WriteMode) -> Result<usize> {
        self.check_online()?;
        for row in rows {
            validate(row)?;
        }
        for row in rows {
            let row = without_nulls(row);
            let existing = match (mode, row.get("id").and_then(Value::as_str)) {
                (WriteMode::Merge, Some(id)) => self
                    .nodes
                    .iter()
                    .position(|n| n.label == label && n.id() == Some(id)),
                _ => None,
            };
            match existing {
                Some(index) => self.nodes[index].properties.extend(row),
                None => self.create_node(label, row),
            }
        }
        Ok(rows.len())
    }

    fn insert_edges(&mut self, rel_type: &str, rows: &[EdgeRow], mode: WriteMode) -> Result<usize> {
        self.check_online()?;
        for row in rows {
            validate(&row.properties)?;
        }
        let mut affected = 0;
        for row in rows {
            let properties = without_nulls(&row.properties);
            for from_key in self.keys_with_id(&row.from_id) {
                for to_key in self.keys_with_id(&row.to_id) {
                    let existing = match mode {
                        WriteMode::Merge => self.edges.iter().position(|e| {
                            e.rel_type == rel_type && e.from_key == from_key && e.to_key == to_key
                        }),
                        WriteMode::Create => None,
                    };
                    match existing {
                        Some(index) => self.edges[index].properties.extend(properties.clone()),
                        None => self.edges.push(StoredEdge {
                            rel_type: rel_type.to_string(),
                            from_key,
                            to_key,
                            properties: properties.clone(),
                        }),
                    }
                    affected += 1;
                }
            }
        }
        Ok(affected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn props(value: Value) -> Properties {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_out_of_range_integer_fails_whole_statement() {
        let mut store = MemoryGraphStore::new();
        let rows = vec![
            props(json!({"id": "a"})),
            props(json!({"id": "b", "size": u64::MAX})),
        ];
        let err = store.insert_nodes("File", &rows, WriteMode::Create).unwrap_err();
        assert_eq!(err.kind(), "Statement");
        assert!(store.nodes().is_empty());
    }

    #[test]
    fn test_merge_updates_in_place() {
        let mut store = MemoryGraphStore::new();
        store
            .insert_nodes("File", &[props(json!({"id": "a", "n": 1}))], WriteMode::Merge)
            .unwrap();
        store
            .insert_nodes("File", &[props(json!({"id": "a", "n": 2}))], WriteMode::Merge)
            .unwrap();
        assert_eq!(store.nodes().len(), 1);
        assert_eq!(store.nodes()[0].properties["n"], json!(2));
    }

    #[test]
    fn test_edges_need_both_endpoints() {
        let mut store = MemoryGraphStore::new();
        store
            .insert_nodes("File", &[props(json!({"id": "a"}))], WriteMode::Create)
            .unwrap();
        let rows = vec![EdgeRow {
            from_id: "a".into(),
            to_id: "missing".into(),
            properties: Properties::new(),
        }];
        assert_eq!(store.insert_edges("CALLS", &rows, WriteMode::Create).unwrap(), 0);
    }

    #[test]
    fn test_delete_removes_attached_edges() {
        let mut store = MemoryGraphStore::new();
        let rows = vec![props(json!({"id": "a"})), props(json!({"id": "b"}))];
        store.insert_nodes("File", &rows, WriteMode::Create).unwrap();
        let edge = EdgeRow {
            from_id: "a".into(),
            to_id: "b".into(),
            properties: Properties::new(),
        };
        store.insert_edges("CONTAINS", &[edge], WriteMode::Create).unwrap();
        assert_eq!(store.delete_nodes(1).unwrap(), 1);
        assert!(store.edges().is_empty());
        assert_eq!(store.count_nodes().unwrap(), 1);
    }

    #[test]
    fn test_unique_constraints_are_recorded_not_enforced() {
        let mut store = MemoryGraphStore::new();
        store.ensure_unique_id("File").unwrap();
        let rows = vec![props(json!({"id": "a"}))];
        store.insert_nodes("File", &rows, WriteMode::Create).unwrap();
        store.insert_nodes("File", &rows, WriteMode::Create).unwrap();
        assert_eq!(store.constraints().len(), 1);
        assert_eq!(store.nodes_with_id("a").len(), 2);
    }

    #[test]
    fn test_offline_store_reports_connection_error() {
        let mut store = MemoryGraphStore::new();
        store.set_offline(true);
        assert!(store.ping().unwrap_err().is_connection());
    }
}
