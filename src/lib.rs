//! Repograph: Python repository to property-graph extraction.
//!
//! This library walks a source tree, turns every Python module into node and
//! edge records with deterministic identities, writes them to append-only
//! JSONL files and bulk-loads them into a graph store.

#![warn(missing_docs)]
// env_logger and ctrlc are used by src/main.rs (binary), not this library
#![expect(unused_crate_dependencies)]

pub mod cli;
pub mod config;
pub mod error;
pub mod graph;
pub mod identity;
pub mod ingest;
pub mod pipeline;
pub mod record;

/// Re-export common error types for convenience.
pub use error::{RepoGraphError, Result};

/// Re-export the store boundary for convenience.
pub use graph::{GraphLoader, GraphStore, LoadReport};

/// Repograph version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
