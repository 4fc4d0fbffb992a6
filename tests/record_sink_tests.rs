//! Record sink tests: append-only JSONL streams and the run summary.

use repograph::ingest::{extract_source, UnitOutcome};
use repograph::record::sink::{RecordSink, EDGES_FILE, NODES_FILE};
use repograph::record::{Edge, EdgeKind, Node, RunSummary};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_records() -> (Vec<Node>, Vec<Edge>) {
        let source = r#"
import os
from typing import List as L

@decorate(1, key="v")
def build(items: L[int], *rest, flag=False, **extra) -> int:
    """Build it."""
    total = 0
    for item in items:
        if item and flag:
            total += item
    return total

class Thing(Base):
    LIMIT = 3
"#;
        match extract_source(Path::new("/repo"), Path::new("/repo/m.py"), source.as_bytes()) {
            UnitOutcome::Extracted(records) => (records.nodes, records.edges),
            UnitOutcome::Failed { reason, .. } => panic!("extraction failed: {}", reason),
        }
    }

    #[test]
    fn test_nodes_round_trip_field_for_field() {
        let dir = TempDir::new().unwrap();
        let sink = RecordSink::new(dir.path());
        let (nodes, edges) = sample_records();

        assert_eq!(sink.append_nodes(&nodes).unwrap(), nodes.len());
        assert_eq!(sink.append_edges(&edges).unwrap(), edges.len());

        assert_eq!(sink.read_nodes().unwrap(), nodes);
        assert_eq!(sink.read_edges().unwrap(), edges);
    }

    #[test]
    fn test_streams_are_one_object_per_line() {
        let dir = TempDir::new().unwrap();
        let sink = RecordSink::new(dir.path());
        let (nodes, edges) = sample_records();
        sink.append_nodes(&nodes).unwrap();
        sink.append_edges(&edges).unwrap();

        let text = fs::read_to_string(dir.path().join(NODES_FILE)).unwrap();
        assert_eq!(text.lines().count(), nodes.len());
        for line in text.lines() {
            let value: serde_json::Value = serde_json::from_str(line).unwrap();
            assert!(value["id"].is_string());
            assert!(value["type"].is_string());
        }

        let text = fs::read_to_string(dir.path().join(EDGES_FILE)).unwrap();
        for line in text.lines() {
            let value: serde_json::Value = serde_json::from_str(line).unwrap();
            assert!(value["from_id"].is_string());
            assert!(value["to_id"].is_string() || value["to_name"].is_string());
        }
    }

    #[test]
    fn test_second_append_extends_the_stream() {
        let dir = TempDir::new().unwrap();
        let sink = RecordSink::new(dir.path().join("nested/out"));
        let edge = Edge::external(EdgeKind::Calls, "a", "print");
        sink.append_edges(&[edge.clone()]).unwrap();
        sink.append_edges(&[edge]).unwrap();
        assert_eq!(sink.read_edges().unwrap().len(), 2);
        assert!(!sink.has_output());
    }

    #[test]
    fn test_summary_replaces_and_clean_removes_everything() {
        let dir = TempDir::new().unwrap();
        let sink = RecordSink::new(dir.path());
        assert!(sink.read_summary().unwrap().is_none());

        let (nodes, edges) = sample_records();
        sink.append_nodes(&nodes).unwrap();
        sink.append_edges(&edges).unwrap();
        let summary = RunSummary {
            repository: "/repo".into(),
            repository_name: "repo".into(),
            run_id: "run".into(),
            total_files: 1,
            files_processed: 1,
            files_with_errors: 0,
            total_directories: 0,
            total_functions: 1,
            total_methods: 0,
            total_classes: 1,
            total_imports: 2,
            total_calls: 0,
            total_variables: 2,
            total_decorators: 1,
            analysis_timestamp: "2024-01-01T00:00:00+00:00".into(),
        };
        sink.write_summary(&summary).unwrap();
        sink.write_summary(&summary).unwrap();
        assert_eq!(sink.read_summary().unwrap(), Some(summary));
        assert!(sink.has_output());

        let removed = sink.clean().unwrap();
        assert_eq!(removed.len(), 3);
        assert!(!sink.has_output());
        assert!(sink.clean().unwrap().is_empty());
    }
}
