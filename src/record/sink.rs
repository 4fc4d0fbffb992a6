//! Append-only JSON Lines storage for extracted records.
//!
//! Nodes and edges go to separate files in one output directory. Each call
//! appends and flushes before returning; nothing is ever rewritten in place,
//! so the files of several runs can be concatenated.

use crate::error::{RepoGraphError, Result};
use crate::record::{Edge, Node, RunSummary};
use log::{debug, warn};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

/// File name of the node stream.
pub const NODES_FILE: &str = "nodes.jsonl";
/// File name of the edge stream.
pub const EDGES_FILE: &str = "edges.jsonl";
/// File name of the run summary.
pub const STATS_FILE: &str = "stats.json";

/// Kind-partitioned record files in one directory.
#[derive(Debug, Clone)]
pub struct RecordSink {
    dir: PathBuf,
}

/// Untyped records read back from a stream, with the count of lines that
/// could not be decoded as JSON objects.
#[derive(Debug, Default)]
pub struct RawRecords {
    /// Decoded objects in file order.
    pub records: Vec<Map<String, Value>>,
    /// Non-empty lines that were skipped.
    pub malformed: usize,
}

impl RecordSink {
    /// Sink writing into `dir` (created on first append).
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Output directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the node stream.
    pub fn nodes_path(&self) -> PathBuf {
        self.dir.join(NODES_FILE)
    }

    /// Path of the edge stream.
    pub fn edges_path(&self) -> PathBuf {
        self.dir.join(EDGES_FILE)
    }

    /// Path of the run summary.
    pub fn stats_path(&self) -> PathBuf {
        self.dir.join(STATS_FILE)
    }

    /// Whether both record streams already exist.
    pub fn has_output(&self) -> bool {
        self.nodes_path().exists() && self.edges_path().exists()
    }

    /// Remove all record files. Returns the names that were deleted.
    pub fn clean(&self) -> Result<Vec<&'static str>> {
        let mut removed = Vec::new();
        for (name, path) in [
            (NODES_FILE, self.nodes_path()),
            (EDGES_FILE, self.edges_path()),
            (STATS_FILE, self.stats_path()),
        ] {
            if path.exists() {
                fs::remove_file(&path).map_err(|e| RepoGraphError::io(&path, e))?;
                removed.push(name);
            }
        }
        Ok(removed)
    }

    /// Append node records.
    pub fn append_nodes(&self, nodes: &[Node]) -> Result<usize> {
        append_jsonl(&self.nodes_path(), nodes)
    }

    /// Append edge records.
    pub fn append_edges(&self, edges: &[Edge]) -> Result<usize> {
        append_jsonl(&self.edges_path(), edges)
    }

    /// Write the run summary, replacing any previous one.
    pub fn write_summary(&self, summary: &RunSummary) -> Result<()> {
        let path = self.stats_path();
        fs::create_dir_all(&self.dir).map_err(|e| RepoGraphError::io(&self.dir, e))?;
        let text = serde_json::to_string_pretty(summary)?;
        fs::write(&path, text).map_err(|e| RepoGraphError::io(&path, e))
    }

    /// Read the run summary, if one was written.
    pub fn read_summary(&self) -> Result<Option<RunSummary>> {
        let path = self.stats_path();
        if !path.exists() {
            return Ok(None);
        }
        let text = fs::read_to_string(&path).map_err(|e| RepoGraphError::io(&path, e))?;
        Ok(Some(serde_json::from_str(&text)?))
    }

    /// Read the node stream back as typed records.
    pub fn read_nodes(&self) -> Result<Vec<Node>> {
        read_jsonl(&self.nodes_path())
    }

    /// Read the edge stream back as typed records.
    pub fn read_edges(&self) -> Result<Vec<Edge>> {
        read_jsonl(&self.edges_path())
    }

    /// Read the node stream as untyped objects, skipping malformed lines.
    pub fn read_raw_nodes(&self) -> Result<RawRecords> {
        read_raw(&self.nodes_path())
    }

    /// Read the edge stream as untyped objects, skipping malformed lines.
    pub fn read_raw_edges(&self) -> Result<RawRecords> {
        read_raw(&self.edges_path())
    }
}

/// Append items to `path`, one JSON object per line.
pub fn append_jsonl<T: Serialize>(path: &Path, items: &[T]) -> Result<usize> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| RepoGraphError::io(parent, e))?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| RepoGraphError::io(path, e))?;
    let mut writer = BufWriter::new(file);
    for item in items {
        serde_json::to_writer(&mut writer, item)?;
        writer
            .write_all(b"\n")
            .map_err(|e| RepoGraphError::io(path, e))?;
    }
    writer.flush().map_err(|e| RepoGraphError::io(path, e))?;
    writer
        .get_ref()
        .sync_data()
        .map_err(|e| RepoGraphError::io(path, e))?;
    debug!("appended {} records to {}", items.len(), path.display());
    Ok(items.len())
}

/// Read typed records; any malformed line is an error.
pub fn read_jsonl<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let file = File::open(path).map_err(|e| RepoGraphError::io(path, e))?;
    let mut items = Vec::new();
    for line in BufReader::new(file).lines() {
        let line = line.map_err(|e| RepoGraphError::io(path, e))?;
        if line.trim().is_empty() {
            continue;
        }
        items.push(serde_json::from_str(&line)?);
    }
    Ok(items)
}

fn read_raw(path: &Path) -> Result<RawRecords> {
    let file = File::open(path).map_err(|e| RepoGraphError::io(path, e))?;
    let mut raw = RawRecords::default();
    for (index, line) in BufReader::new(file).lines().enumerate() {
        let line = line.map_err(|e| RepoGraphError::io(path, e))?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<Value>(&line) {
            Ok(Value::Object(map)) => raw.records.push(map),
            Ok(_) => {
                warn!("{}:{}: record is not a JSON object", path.display(), index + 1);
                raw.malformed += 1;
            }
            Err(e) => {
                warn!("{}:{}: {}", path.display(), index + 1, e);
                raw.malformed += 1;
            }
        }
    }
    Ok(raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::EdgeKind;

    #[test]
    fn test_append_is_incremental() {
        let dir = tempfile::tempdir().unwrap();
        let sink = RecordSink::new(dir.path());
        sink.append_edges(&[Edge::resolved(EdgeKind::Contains, "a", "b")])
            .unwrap();
        sink.append_edges(&[Edge::external(EdgeKind::Calls, "a", "print")])
            .unwrap();
        let edges = sink.read_edges().unwrap();
        assert_eq!(edges.len(), 2);
        assert_eq!(edges[1].to_name.as_deref(), Some("print"));
    }

    #[test]
    fn test_raw_read_skips_malformed_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(NODES_FILE);
        fs::write(&path, "{\"id\":\"a\",\"type\":\"File\"}\nnot json\n[1,2]\n\n").unwrap();
        let sink = RecordSink::new(dir.path());
        let raw = sink.read_raw_nodes().unwrap();
        assert_eq!(raw.records.len(), 1);
        assert_eq!(raw.malformed, 2);
    }
}
