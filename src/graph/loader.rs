//! Bulk loading of record streams into a graph store.
//!
//! Nodes are grouped by label and inserted before edges, in fixed-size
//! batches. A rejected batch is retried one record at a time so a single
//! bad record costs only itself. Edges without a destination id are
//! external references: counted, never sent. Only a lost store session
//! stops a load.

use super::schema::{label_rank, CLEAR_CHUNK, INDEXED_PROPERTIES};
use super::{flatten, EdgeRow, GraphStore, Properties, WriteMode};
use crate::config::ExistingData;
use crate::error::{RepoGraphError, Result};
use crate::record::sink::{RawRecords, RecordSink};
use crate::record::NodeKind;
use log::{debug, info, warn};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Record keys that are not node properties.
const NODE_META_KEYS: &[&str] = &["type"];

/// Record keys that are not relationship properties. `to_name` only
/// matters for edges that never reach the store.
const EDGE_META_KEYS: &[&str] = &["type", "from_id", "to_id", "to_name"];

/// Outcome of a load.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    /// Nodes found in the store before loading.
    pub existing_nodes: u64,
    /// Whether the store was cleared first.
    pub cleared: bool,
    /// Nodes written.
    pub nodes_inserted: usize,
    /// Nodes rejected on their own.
    pub nodes_failed: usize,
    /// Relationships written.
    pub edges_inserted: usize,
    /// Relationships rejected on their own.
    pub edges_failed: usize,
    /// Edges without a destination id.
    pub edges_skipped_external: usize,
    /// Record lines or objects that could not be used.
    pub malformed: usize,
    /// The load stopped early on an interrupt.
    pub interrupted: bool,
}

/// Loads node and edge records into a [`GraphStore`].
pub struct GraphLoader<'s, S: GraphStore + ?Sized> {
    store: &'s mut S,
    batch_size: usize,
    mode: WriteMode,
    cancel: Option<Arc<AtomicBool>>,
}

impl<'s, S: GraphStore + ?Sized> GraphLoader<'s, S> {
    /// Loader writing `batch_size` records per statement (at least one).
    pub fn new(store: &'s mut S, batch_size: usize) -> Self {
        Self {
            store,
            batch_size: batch_size.max(1),
            mode: WriteMode::Create,
            cancel: None,
        }
    }

    /// Use `mode` for every insert.
    pub fn with_mode(mut self, mode: WriteMode) -> Self {
        self.mode = mode;
        self
    }

    /// Stop between batches once `flag` is set.
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    fn cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .map(|flag| flag.load(Ordering::SeqCst))
            .unwrap_or(false)
    }

    /// Load the record files of `sink`.
    pub fn load_sink(
        &mut self,
        sink: &RecordSink,
        policy: ExistingData,
        confirm: &mut dyn FnMut(&str) -> bool,
    ) -> Result<LoadReport> {
        if !sink.has_output() {
            return Err(RepoGraphError::Config(format!(
                "no record files in {}",
                sink.dir().display()
            )));
        }
        let nodes = sink.read_raw_nodes()?;
        let edges = sink.read_raw_edges()?;
        info!(
            "read {} node records and {} edge records from {}",
            nodes.records.len(),
            edges.records.len(),
            sink.dir().display()
        );
        self.load(&nodes, &edges, policy, confirm)
    }

    /// Full load: existing-data check, schema, nodes, edges.
    pub fn load(
        &mut self,
        nodes: &RawRecords,
        edges: &RawRecords,
        policy: ExistingData,
        confirm: &mut dyn FnMut(&str) -> bool,
    ) -> Result<LoadReport> {
        let mut report = LoadReport {
            malformed: nodes.malformed + edges.malformed,
            ..LoadReport::default()
        };

        self.prepare_store(policy, confirm, &mut report)?;
        self.ensure_schema();
        self.load_nodes(&nodes.records, &mut report)?;
        if !report.interrupted {
            self.load_edges(&edges.records, &mut report)?;
        }

        info!(
            "load finished: nodes={} nodes_failed={} edges={} edges_failed={} external={} malformed={}",
            report.nodes_inserted,
            report.nodes_failed,
            report.edges_inserted,
            report.edges_failed,
            report.edges_skipped_external,
            report.malformed
        );
        Ok(report)
    }

    /// Count existing nodes and clear or keep them according to `policy`.
    pub fn prepare_store(
        &mut self,
        policy: ExistingData,
        confirm: &mut dyn FnMut(&str) -> bool,
        report: &mut LoadReport,
    ) -> Result<()> {
        let existing = self.store.count_nodes().map_err(as_connection)?;
        report.existing_nodes = existing;
        if existing == 0 {
            return Ok(());
        }

        let clear = match policy {
            ExistingData::Clear => true,
            ExistingData::Append => false,
            ExistingData::Ask => confirm(&format!(
                "The graph store already contains {} nodes. Delete them before loading?",
                existing
            )),
        };
        if clear {
            let deleted = self.clear()?;
            report.cleared = true;
            info!("cleared {} existing nodes", deleted);
        } else {
            warn!(
                "appending to {} existing nodes; entities with repeated ids will be duplicated",
                existing
            );
        }
        Ok(())
    }

    /// Delete every node in chunks. Returns the number deleted.
    pub fn clear(&mut self) -> Result<u64> {
        let mut total = 0;
        loop {
            let deleted = self.store.delete_nodes(CLEAR_CHUNK).map_err(as_connection)?;
            if deleted == 0 {
                break;
            }
            total += deleted;
            debug!("deleted {} nodes", deleted);
        }
        Ok(total)
    }

    /// Create id constraints for every node kind and the lookup indexes.
    /// Failures are logged and ignored.
    pub fn ensure_schema(&mut self) {
        for kind in NodeKind::ALL {
            if let Err(e) = self.store.ensure_unique_id(kind.as_str()) {
                debug!("constraint on {}.id not created: {}", kind.as_str(), e);
            }
        }
        for (label, property) in INDEXED_PROPERTIES {
            if let Err(e) = self.store.ensure_index(label, property) {
                debug!("index on {}.{} not created: {}", label, property, e);
            }
        }
    }

    /// Insert node records grouped by label, structural labels first.
    pub fn load_nodes(
        &mut self,
        records: &[Map<String, Value>],
        report: &mut LoadReport,
    ) -> Result<()> {
        let mut groups: BTreeMap<(usize, String), Vec<Properties>> = BTreeMap::new();
        for record in records {
            let label = record.get("type").and_then(Value::as_str);
            let has_id = record.get("id").map(Value::is_string).unwrap_or(false);
            match label {
                Some(label) if has_id => groups
                    .entry((label_rank(label), label.to_string()))
                    .or_default()
                    .push(flatten(record, NODE_META_KEYS)),
                _ => {
                    debug!("node record without type or id skipped");
                    report.malformed += 1;
                }
            }
        }

        let mode = self.mode;
        for ((_, label), rows) in &groups {
            let statement_label = label.as_str();
            let (inserted, failed, interrupted) = self.insert_batches(label, rows, |store, batch| {
                store.insert_nodes(statement_label, batch, mode)
            })?;
            report.nodes_inserted += inserted;
            report.nodes_failed += failed;
            info!("{}: {} nodes inserted, {} failed", label, inserted, failed);
            if interrupted {
                report.interrupted = true;
                return Ok(());
            }
        }
        Ok(())
    }

    /// Insert direct edges grouped by type; count external ones.
    pub fn load_edges(
        &mut self,
        records: &[Map<String, Value>],
        report: &mut LoadReport,
    ) -> Result<()> {
        let mut groups: BTreeMap<String, Vec<EdgeRow>> = BTreeMap::new();
        let mut external: BTreeMap<String, usize> = BTreeMap::new();
        for record in records {
            let rel_type = record.get("type").and_then(Value::as_str);
            let from_id = record.get("from_id").and_then(Value::as_str);
            let (Some(rel_type), Some(from_id)) = (rel_type, from_id) else {
                debug!("edge record without type or from_id skipped");
                report.malformed += 1;
                continue;
            };
            match record.get("to_id").and_then(Value::as_str) {
                Some(to_id) => groups.entry(rel_type.to_string()).or_default().push(EdgeRow {
                    from_id: from_id.to_string(),
                    to_id: to_id.to_string(),
                    properties: flatten(record, EDGE_META_KEYS),
                }),
                None => *external.entry(rel_type.to_string()).or_default() += 1,
            }
        }
        report.edges_skipped_external += external.values().sum::<usize>();

        let mode = self.mode;
        for (rel_type, rows) in &groups {
            let statement_type = rel_type.as_str();
            let (inserted, failed, interrupted) = self.insert_batches(rel_type, rows, |store, batch| {
                store.insert_edges(statement_type, batch, mode)
            })?;
            report.edges_inserted += inserted;
            report.edges_failed += failed;
            info!(
                "{}: {} edges inserted, {} failed, {} external skipped",
                rel_type,
                inserted,
                failed,
                external.get(rel_type).copied().unwrap_or(0)
            );
            let unmatched = rows.len().saturating_sub(inserted + failed);
            if unmatched > 0 {
                debug!("{}: {} edges matched no stored endpoints", rel_type, unmatched);
            }
            if interrupted {
                report.interrupted = true;
                return Ok(());
            }
        }
        Ok(())
    }

    /// Send `rows` in batches, falling back to single records when a batch
    /// is rejected. Returns `(inserted, failed, interrupted)`.
    fn insert_batches<T>(
        &mut self,
        group: &str,
        rows: &[T],
        mut insert: impl FnMut(&mut S, &[T]) -> Result<usize>,
    ) -> Result<(usize, usize, bool)> {
        let mut inserted = 0;
        let mut failed = 0;
        for (index, batch) in rows.chunks(self.batch_size).enumerate() {
            if self.cancelled() {
                warn!("{}: interrupted before batch {}", group, index);
                return Ok((inserted, failed, true));
            }
            match insert(&mut *self.store, batch) {
                Ok(count) => inserted += count,
                Err(e) if e.is_connection() => return Err(e),
                Err(e) => {
                    warn!(
                        "{}: batch {} rejected ({}); retrying {} records one by one",
                        group,
                        index,
                        e,
                        batch.len()
                    );
                    // A dead session must abort instead of failing every record.
                    self.store.ping().map_err(as_connection)?;
                    for row in batch {
                        match insert(&mut *self.store, std::slice::from_ref(row)) {
                            Ok(count) => inserted += count,
                            Err(e) if e.is_connection() => return Err(e),
                            Err(e) => {
                                debug!("{}: record rejected: {}", group, e);
                                failed += 1;
                            }
                        }
                    }
                }
            }
        }
        Ok((inserted, failed, false))
    }
}

/// Treat any failure of a session-level call as a connection failure.
fn as_connection(err: RepoGraphError) -> RepoGraphError {
    match err {
        RepoGraphError::StoreConnection { .. } => err,
        other => RepoGraphError::StoreConnection {
            uri: "graph store".to_string(),
            message: other.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::MemoryGraphStore;
    use serde_json::json;

    fn record(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_nodes_are_grouped_and_flattened() {
        let mut store = MemoryGraphStore::new();
        let records = vec![
            record(json!({"type": "Function", "id": "f", "decorators": ["x"]})),
            record(json!({"type": "Repository", "id": "r"})),
            record(json!({"id": "no-type"})),
        ];
        let mut report = LoadReport::default();
        GraphLoader::new(&mut store, 10)
            .load_nodes(&records, &mut report)
            .unwrap();
        assert_eq!(report.nodes_inserted, 2);
        assert_eq!(report.malformed, 1);
        assert_eq!(store.nodes()[0].label, "Repository");
        assert_eq!(store.nodes()[1].properties["decorators"], json!("[\"x\"]"));
        assert!(!store.nodes()[1].properties.contains_key("type"));
    }

    #[test]
    fn test_cancel_flag_stops_before_first_batch() {
        let mut store = MemoryGraphStore::new();
        let flag = Arc::new(AtomicBool::new(true));
        let records = vec![record(json!({"type": "File", "id": "a"}))];
        let mut report = LoadReport::default();
        GraphLoader::new(&mut store, 10)
            .with_cancel_flag(flag)
            .load_nodes(&records, &mut report)
            .unwrap();
        assert!(report.interrupted);
        assert!(store.nodes().is_empty());
    }
}
