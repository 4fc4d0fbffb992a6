//! Run configuration.
//!
//! Everything a run needs is carried by explicit structs handed to
//! constructors. Store credentials come from the environment, with a `.env`
//! file in the working directory loaded first when present.

use crate::error::{RepoGraphError, Result};
use crate::graph::schema::DEFAULT_BATCH_SIZE;
use crate::graph::WriteMode;
use std::fmt;
use std::path::{Path, PathBuf};

/// Environment variable holding the store endpoint.
pub const ENV_URI: &str = "NEO4J_URI";
/// Environment variable holding the store user.
pub const ENV_USERNAME: &str = "NEO4J_USERNAME";
/// Environment variable holding the store password.
pub const ENV_PASSWORD: &str = "NEO4J_PASSWORD";

/// Parent directory of default output directories.
pub const DEFAULT_OUTPUT_ROOT: &str = "graph_data";

/// Store connection parameters.
#[derive(Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Bolt endpoint, e.g. `neo4j://localhost:7687`.
    pub uri: String,
    /// User name.
    pub username: String,
    /// Password.
    pub password: String,
}

impl fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreConfig")
            .field("uri", &self.uri)
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

impl StoreConfig {
    /// Read credentials from the process environment (after `.env`).
    ///
    /// Returns `None` unless all three variables are set and non-empty.
    pub fn from_env() -> Option<Self> {
        // Load .env file if present (silently ignore if missing)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read credentials through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Option<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        Some(Self {
            uri: get(ENV_URI)?,
            username: get(ENV_USERNAME)?,
            password: get(ENV_PASSWORD)?,
        })
    }
}

/// What to do when record files from an earlier run exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReusePolicy {
    /// Keep them and skip extraction.
    Reuse,
    /// Delete them and extract again.
    Regenerate,
    /// Ask the operator.
    Ask,
}

/// What to do when the store already holds nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExistingData {
    /// Delete everything before loading.
    Clear,
    /// Load on top, accepting duplicate ids.
    Append,
    /// Ask the operator.
    Ask,
}

/// Configuration of one pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Repository root.
    pub repo_root: PathBuf,
    /// Directory for record files.
    pub output_dir: PathBuf,
    /// Extra excluded directory names or glob patterns.
    pub excludes: Vec<String>,
    /// Handling of existing record files.
    pub reuse: ReusePolicy,
    /// Handling of a non-empty store.
    pub existing: ExistingData,
    /// Records per insert statement.
    pub batch_size: usize,
    /// Create or merge.
    pub write_mode: WriteMode,
    /// Stop after writing record files.
    pub skip_store: bool,
}

impl PipelineConfig {
    /// Defaults for `repo_root`: output under `graph_data/<repo name>`,
    /// ask before reusing or clearing, batches of 1000, create mode.
    pub fn new(repo_root: impl Into<PathBuf>) -> Self {
        let repo_root = repo_root.into();
        Self {
            output_dir: default_output_dir(&repo_root),
            repo_root,
            excludes: Vec::new(),
            reuse: ReusePolicy::Ask,
            existing: ExistingData::Ask,
            batch_size: DEFAULT_BATCH_SIZE,
            write_mode: WriteMode::Create,
            skip_store: false,
        }
    }

    /// Reject settings no run can use.
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(RepoGraphError::Config(
                "batch size must be at least 1".to_string(),
            ));
        }
        if !self.repo_root.is_dir() {
            return Err(RepoGraphError::Config(format!(
                "repository path {} does not exist or is not a directory",
                self.repo_root.display()
            )));
        }
        Ok(())
    }
}

/// `graph_data/<repo name>` relative to the working directory.
pub fn default_output_dir(repo_root: &Path) -> PathBuf {
    let name = repo_root
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| "repository".to_string());
    PathBuf::from(DEFAULT_OUTPUT_ROOT).join(name)
}
