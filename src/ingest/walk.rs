//! Repository directory walking.
//!
//! Produces the structural part of the graph (Repository and Directory
//! nodes, Contains edges) and the list of source units to extract. File
//! contents are never read here; Contains edges to files point at the ids
//! the extractor derives from the same paths.

use super::{path_id, relative_path};
use crate::error::{RepoGraphError, Result};
use crate::record::{DirectoryNode, Edge, EdgeKind, Node, RepositoryNode};
use glob::Pattern;
use log::{debug, warn};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Directory names that are always skipped.
pub const DEFAULT_EXCLUDES: &[&str] = &[
    ".git",
    "__pycache__",
    "node_modules",
    ".venv",
    "venv",
    ".tox",
    "build",
    "dist",
    ".eggs",
];

/// Extension of source units.
pub const SOURCE_EXTENSION: &str = "py";

/// Directory exclusion rules.
#[derive(Debug, Clone)]
pub struct WalkOptions {
    names: Vec<String>,
    patterns: Vec<Pattern>,
}

impl Default for WalkOptions {
    fn default() -> Self {
        Self {
            names: DEFAULT_EXCLUDES.iter().map(|s| s.to_string()).collect(),
            patterns: Vec::new(),
        }
    }
}

impl WalkOptions {
    /// Default exclusions plus `extra`. Entries containing `*`, `?` or `[`
    /// are glob patterns matched against the directory name and its path
    /// relative to the root; anything else is an exact name.
    pub fn with_excludes(extra: &[String]) -> Result<Self> {
        let mut options = Self::default();
        for entry in extra {
            if entry.contains(['*', '?', '[']) {
                let pattern = Pattern::new(entry).map_err(|e| {
                    RepoGraphError::Config(format!("invalid exclude pattern '{}': {}", entry, e))
                })?;
                options.patterns.push(pattern);
            } else {
                options.names.push(entry.clone());
            }
        }
        Ok(options)
    }

    /// Whether a directory is skipped, including the dot-prefix rule.
    pub fn is_excluded(&self, name: &str, relpath: &str) -> bool {
        name.starts_with('.')
            || self.names.iter().any(|n| n == name)
            || self
                .patterns
                .iter()
                .any(|p| p.matches(name) || p.matches(relpath))
    }
}

/// Structural records and source units of one repository.
#[derive(Debug, Default)]
pub struct RepositoryLayout {
    /// Repository node followed by Directory nodes in walk order.
    pub nodes: Vec<Node>,
    /// Contains edges, each emitted after its source node.
    pub edges: Vec<Edge>,
    /// Source units in walk order.
    pub files: Vec<PathBuf>,
    /// Directories below the root.
    pub directories: usize,
}

fn is_source_file(path: &Path) -> bool {
    let hidden = path
        .file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.starts_with('.'))
        .unwrap_or(true);
    !hidden && path.extension().map(|e| e == SOURCE_EXTENSION).unwrap_or(false)
}

/// Walk `root` in sorted pre-order.
pub fn walk_repository(root: &Path, options: &WalkOptions) -> Result<RepositoryLayout> {
    if !root.is_dir() {
        return Err(RepoGraphError::Config(format!(
            "repository path {} is not a directory",
            root.display()
        )));
    }

    let mut layout = RepositoryLayout::default();
    let repo_id = path_id(root);
    layout.nodes.push(Node::Repository(RepositoryNode {
        id: repo_id,
        name: root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
        path: root.to_string_lossy().into_owned(),
    }));

    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| {
            // The root itself may live in a dot-directory (temp dirs do).
            if e.depth() == 0 || !e.file_type().is_dir() {
                return true;
            }
            let name = e.file_name().to_string_lossy();
            !options.is_excluded(&name, &relative_path(root, e.path()))
        });

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("skipping unreadable entry: {}", e);
                continue;
            }
        };
        if entry.depth() == 0 {
            continue;
        }
        let path = entry.path();
        let parent_id = match path.parent() {
            Some(parent) => path_id(parent),
            None => continue,
        };

        if entry.file_type().is_dir() {
            let id = path_id(path);
            layout.nodes.push(Node::Directory(DirectoryNode {
                id: id.clone(),
                name: entry.file_name().to_string_lossy().into_owned(),
                path: path.to_string_lossy().into_owned(),
                relpath: relative_path(root, path),
            }));
            layout.edges.push(
                Edge::resolved(EdgeKind::Contains, &parent_id, &id)
                    .with_relationship("contains_directory"),
            );
            layout.directories += 1;
        } else if path.is_file() && is_source_file(path) {
            layout.edges.push(
                Edge::resolved(EdgeKind::Contains, &parent_id, &path_id(path))
                    .with_relationship("contains_file"),
            );
            layout.files.push(path.to_path_buf());
        }
    }

    debug!(
        "walked {}: {} directories, {} source files",
        root.display(),
        layout.directories,
        layout.files.len()
    );
    Ok(layout)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dot_and_default_names_are_excluded() {
        let options = WalkOptions::default();
        assert!(options.is_excluded(".hidden", ".hidden"));
        assert!(options.is_excluded("__pycache__", "pkg/__pycache__"));
        assert!(!options.is_excluded("pkg", "pkg"));
    }

    #[test]
    fn test_extra_patterns() {
        let options =
            WalkOptions::with_excludes(&["fixtures".to_string(), "gen_*".to_string()]).unwrap();
        assert!(options.is_excluded("fixtures", "tests/fixtures"));
        assert!(options.is_excluded("gen_proto", "src/gen_proto"));
        assert!(!options.is_excluded("generate", "generate"));
    }

    #[test]
    fn test_invalid_pattern_is_config_error() {
        let err = WalkOptions::with_excludes(&["[".to_string()]).unwrap_err();
        assert_eq!(err.kind(), "Config");
    }

    #[test]
    fn test_source_file_rule() {
        assert!(is_source_file(Path::new("/r/a.py")));
        assert!(!is_source_file(Path::new("/r/.a.py")));
        assert!(!is_source_file(Path::new("/r/a.pyc")));
    }
}
