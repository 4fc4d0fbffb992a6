//! Filesystem → syntax tree → record extraction.
//!
//! This module reads Python source units, parses them with tree-sitter, and
//! turns each unit into node and edge records. A unit either yields records
//! or a failure reason; it never aborts the surrounding run.

pub mod imports;
pub mod metrics;
pub mod python;
pub mod render;
pub mod walk;

use crate::error::{RepoGraphError, Result};
use crate::identity::stable_id;
use crate::record::{Edge, Node, UnitStats};
use log::{debug, error};
use ropey::Rope;
use std::fs;
use std::path::{Path, PathBuf};
use tree_sitter::Tree;

pub use python::PythonExtractor;

/// Maximum number of source lines kept in a snippet.
pub const MAX_SNIPPET_LINES: usize = 10;

/// Maximum snippet length in characters.
pub const MAX_SNIPPET_CHARS: usize = 500;

/// Records produced by one unit.
#[derive(Debug, Default)]
pub struct UnitRecords {
    /// Nodes in emission order.
    pub nodes: Vec<Node>,
    /// Edges in emission order.
    pub edges: Vec<Edge>,
    /// Per-unit counters.
    pub stats: UnitStats,
    /// Traversal fault that stopped extraction early. Records emitted
    /// before the fault are kept.
    pub fault: Option<String>,
}

/// Result of extracting one unit.
#[derive(Debug)]
pub enum UnitOutcome {
    /// The unit was parsed and walked.
    Extracted(UnitRecords),
    /// The unit could not be read, decoded or parsed.
    Failed {
        /// Path of the unit.
        path: PathBuf,
        /// Human-readable reason.
        reason: String,
    },
}

impl UnitOutcome {
    /// Whether the unit was skipped.
    pub fn is_failed(&self) -> bool {
        matches!(self, UnitOutcome::Failed { .. })
    }
}

/// Line-aware view of a unit's text.
#[derive(Debug)]
pub struct SourceText {
    rope: Rope,
}

impl SourceText {
    /// Index the text.
    pub fn new(text: &str) -> Self {
        Self {
            rope: Rope::from_str(text),
        }
    }

    /// Logical line count. A trailing line break does not open a new line.
    pub fn line_count(&self) -> usize {
        let lines = self.rope.len_lines();
        if self.rope.line(lines - 1).len_chars() == 0 {
            lines - 1
        } else {
            lines
        }
    }

    /// Source lines covering `start_byte..end_byte`, at most
    /// [`MAX_SNIPPET_LINES`] of them followed by `...` when cut, and at most
    /// [`MAX_SNIPPET_CHARS`] characters overall.
    pub fn snippet(&self, start_byte: usize, end_byte: usize) -> String {
        let len = self.rope.len_bytes();
        let first = self.rope.byte_to_line(start_byte.min(len));
        let last = self.rope.byte_to_line(end_byte.min(len)).max(first);

        let mut lines: Vec<String> = (first..=last)
            .take(MAX_SNIPPET_LINES)
            .map(|index| strip_line_break(&self.rope.line(index).to_string()))
            .collect();
        if last - first + 1 > MAX_SNIPPET_LINES {
            lines.push("...".to_string());
        }
        render::truncate(&lines.join("\n"), MAX_SNIPPET_CHARS)
    }
}

fn strip_line_break(line: &str) -> String {
    line.trim_end_matches(['\n', '\r', '\u{b}', '\u{c}', '\u{85}', '\u{2028}', '\u{2029}'])
        .to_string()
}

/// Identifier of a file or directory, derived from its path.
///
/// The walker and the extractor both call this, so containment edges point
/// at the same ids the extractor later assigns.
pub fn path_id(path: &Path) -> String {
    stable_id(&[path.to_string_lossy()])
}

/// Path relative to the repository root with `/` separators.
pub fn relative_path(repo_root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(repo_root).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Parse Python text.
///
/// tree-sitter recovers from syntax errors; any ERROR or MISSING node in
/// the result counts as a parse failure, reported at its first line.
pub fn parse_python(path: &Path, text: &str) -> Result<Tree> {
    let mut parser = tree_sitter::Parser::new();
    parser
        .set_language(&tree_sitter_python::language())
        .map_err(|e| RepoGraphError::Parse {
            file: path.to_path_buf(),
            message: format!("Failed to set Python language: {:?}", e),
        })?;

    let tree = parser
        .parse(text, None)
        .ok_or_else(|| RepoGraphError::Parse {
            file: path.to_path_buf(),
            message: "Parse failed - no tree returned".to_string(),
        })?;

    if tree.root_node().has_error() {
        let line = first_error_line(&tree).unwrap_or(1);
        return Err(RepoGraphError::Parse {
            file: path.to_path_buf(),
            message: format!("invalid syntax at line {}", line),
        });
    }
    Ok(tree)
}

fn first_error_line(tree: &Tree) -> Option<usize> {
    let mut stack = vec![tree.root_node()];
    let mut first: Option<usize> = None;
    while let Some(node) = stack.pop() {
        if node.is_error() || node.is_missing() {
            let line = node.start_position().row + 1;
            first = Some(first.map_or(line, |f| f.min(line)));
            continue;
        }
        if node.has_error() {
            let mut cursor = node.walk();
            stack.extend(node.children(&mut cursor));
        }
    }
    first
}

/// Read, decode, parse and extract one unit.
pub fn extract_file(repo_root: &Path, path: &Path) -> UnitOutcome {
    match fs::read(path) {
        Ok(bytes) => extract_source(repo_root, path, &bytes),
        Err(e) => UnitOutcome::Failed {
            path: path.to_path_buf(),
            reason: RepoGraphError::io(path, e).to_string(),
        },
    }
}

/// Decode, parse and extract one unit from raw bytes.
pub fn extract_source(repo_root: &Path, path: &Path, bytes: &[u8]) -> UnitOutcome {
    let text = match std::str::from_utf8(bytes) {
        Ok(text) => text.strip_prefix('\u{feff}').unwrap_or(text),
        Err(e) => {
            let err = RepoGraphError::Decode {
                file: path.to_path_buf(),
                message: e.to_string(),
            };
            return UnitOutcome::Failed {
                path: path.to_path_buf(),
                reason: err.to_string(),
            };
        }
    };

    let tree = match parse_python(path, text) {
        Ok(tree) => tree,
        Err(e) => {
            return UnitOutcome::Failed {
                path: path.to_path_buf(),
                reason: e.to_string(),
            }
        }
    };

    let records = PythonExtractor::new(repo_root, path, text).extract(tree.root_node());
    if let Some(fault) = &records.fault {
        error!("extraction fault in {}: {}", path.display(), fault);
    }
    debug!(
        "extracted {} nodes, {} edges from {}",
        records.nodes.len(),
        records.edges.len(),
        path.display()
    );
    UnitOutcome::Extracted(records)
}
