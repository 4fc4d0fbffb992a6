//! Repograph error types.
//!
//! All errors are typed and provide root cause information. Per-unit
//! extraction failures are not errors (see [`crate::ingest::UnitOutcome`]);
//! only faults that must stop a pipeline step are represented here.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for repograph operations.
#[derive(Error, Debug)]
pub enum RepoGraphError {
    /// I/O error during file operations.
    #[error("I/O error for path {path}: {source}")]
    Io {
        /// The file path that caused the I/O error.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// JSON encoding or decoding error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Tree-sitter parsing error.
    #[error("Parse error in {file}: {message}")]
    Parse {
        /// The file that failed to parse.
        file: PathBuf,
        /// The parse error message.
        message: String,
    },

    /// Source text is not valid UTF-8.
    #[error("Cannot decode {file} as UTF-8: {message}")]
    Decode {
        /// The file that failed to decode.
        file: PathBuf,
        /// The decoder message.
        message: String,
    },

    /// The graph store could not be reached or the session was lost.
    #[error("Cannot connect to graph store at {uri}: {message}")]
    StoreConnection {
        /// Store endpoint.
        uri: String,
        /// Underlying driver message.
        message: String,
    },

    /// A single statement was rejected by the graph store.
    #[error("Graph store rejected statement: {0}")]
    Statement(String),

    /// Invalid or missing configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The run was interrupted before completion.
    #[error("Interrupted during {stage}")]
    Interrupted {
        /// Pipeline stage that observed the interrupt.
        stage: &'static str,
    },

    /// Generic error with context.
    #[error("{0}")]
    Other(String),
}

impl RepoGraphError {
    /// Build an I/O error bound to a path.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        RepoGraphError::Io {
            path: path.into(),
            source,
        }
    }

    /// Stable identifier for the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            RepoGraphError::Io { .. } => "Io",
            RepoGraphError::Json(_) => "Json",
            RepoGraphError::Parse { .. } => "Parse",
            RepoGraphError::Decode { .. } => "Decode",
            RepoGraphError::StoreConnection { .. } => "StoreConnection",
            RepoGraphError::Statement(_) => "Statement",
            RepoGraphError::Config(_) => "Config",
            RepoGraphError::Interrupted { .. } => "Interrupted",
            RepoGraphError::Other(_) => "Other",
        }
    }

    /// File path associated with the error, if any.
    pub fn file_path(&self) -> Option<&std::path::Path> {
        match self {
            RepoGraphError::Io { path, .. } => Some(path.as_path()),
            RepoGraphError::Parse { file, .. } | RepoGraphError::Decode { file, .. } => {
                Some(file.as_path())
            }
            _ => None,
        }
    }

    /// Optional remediation hint for CLI output.
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            RepoGraphError::StoreConnection { .. } => {
                Some("Check NEO4J_URI, NEO4J_USERNAME and NEO4J_PASSWORD (or .env)")
            }
            RepoGraphError::Interrupted { .. } => {
                Some("Partial output is valid; re-run with --clean or --force-clear to avoid duplicates")
            }
            _ => None,
        }
    }

    /// Whether the error means the store session is unusable.
    pub fn is_connection(&self) -> bool {
        matches!(self, RepoGraphError::StoreConnection { .. })
    }
}

impl From<std::io::Error> for RepoGraphError {
    fn from(err: std::io::Error) -> Self {
        RepoGraphError::Io {
            path: PathBuf::from("<unknown>"),
            source: err,
        }
    }
}

/// Result type alias for repograph operations.
pub type Result<T> = std::result::Result<T, RepoGraphError>;
