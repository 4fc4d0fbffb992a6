//! Command-line interface for repograph.
//!
//! This module handles argument parsing and output payloads only.
//! The work itself lives in [`crate::pipeline`].

use crate::config::{ExistingData, PipelineConfig, ReusePolicy};
use crate::graph::WriteMode;
use clap::{Args, Parser};
use serde::Serialize;
use serde_json::Value;
use std::path::PathBuf;

/// Repograph: Python repository to property-graph pipeline.
#[derive(Parser, Debug)]
#[command(name = "repograph")]
#[command(author, version, about, long_about = None)]
#[command(subcommand_required = true)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Available repograph commands.
#[derive(clap::Subcommand, Debug)]
pub enum Commands {
    /// Analyze a repository, write record files and load them into the store.
    Run {
        /// Extraction options.
        #[command(flatten)]
        analysis: AnalysisArgs,

        /// Load options.
        #[command(flatten)]
        load: LoadArgs,

        /// Write record files only; do not touch the store.
        #[arg(long)]
        skip_store: bool,
    },

    /// Analyze a repository and write record files only.
    Analyze {
        /// Extraction options.
        #[command(flatten)]
        analysis: AnalysisArgs,
    },

    /// Load previously written record files into the store.
    Load {
        /// Directory holding nodes.jsonl and edges.jsonl.
        #[arg(short, long, value_name = "DIR")]
        output: PathBuf,

        /// Load options.
        #[command(flatten)]
        load: LoadArgs,
    },
}

/// Options of the extraction step.
#[derive(Args, Debug, Clone)]
pub struct AnalysisArgs {
    /// Repository root to analyze.
    #[arg(short, long, value_name = "PATH")]
    pub repo: PathBuf,

    /// Output directory (default: graph_data/<repo name>).
    #[arg(short, long, value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// Extra directory name or glob pattern to skip (repeatable).
    #[arg(short = 'x', long = "exclude", value_name = "NAME")]
    pub excludes: Vec<String>,

    /// Delete existing record files before analyzing.
    #[arg(long, conflicts_with = "reuse")]
    pub clean: bool,

    /// Reuse existing record files without asking.
    #[arg(long)]
    pub reuse: bool,
}

/// Options of the load step.
#[derive(Args, Debug, Clone)]
pub struct LoadArgs {
    /// Delete all existing store data before loading, without asking.
    #[arg(long, conflicts_with = "append")]
    pub force_clear: bool,

    /// Load on top of existing store data, without asking.
    #[arg(long)]
    pub append: bool,

    /// Records per insert statement.
    #[arg(long, value_name = "N", default_value_t = crate::graph::schema::DEFAULT_BATCH_SIZE)]
    pub batch_size: usize,

    /// Upsert by id instead of always creating.
    #[arg(long)]
    pub merge: bool,
}

impl AnalysisArgs {
    /// Pipeline configuration for these options.
    pub fn to_config(&self) -> PipelineConfig {
        let mut config = PipelineConfig::new(&self.repo);
        if let Some(output) = &self.output {
            config.output_dir = output.clone();
        }
        config.excludes = self.excludes.clone();
        config.reuse = if self.clean {
            ReusePolicy::Regenerate
        } else if self.reuse {
            ReusePolicy::Reuse
        } else {
            ReusePolicy::Ask
        };
        config
    }
}

impl LoadArgs {
    /// Apply these options to `config`.
    pub fn apply(&self, config: &mut PipelineConfig) {
        config.existing = if self.force_clear {
            ExistingData::Clear
        } else if self.append {
            ExistingData::Append
        } else {
            ExistingData::Ask
        };
        config.batch_size = self.batch_size;
        config.write_mode = if self.merge {
            WriteMode::Merge
        } else {
            WriteMode::Create
        };
    }
}

/// Parse command-line arguments.
///
/// Returns the parsed Cli struct or exits on error.
pub fn parse_args() -> Cli {
    Cli::parse()
}

/// JSON success payload for CLI responses.
#[derive(Serialize)]
pub struct CliSuccessPayload {
    /// Status indicator ("ok").
    pub status: &'static str,
    /// Human-readable message.
    pub message: String,
    /// Optional structured data.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl CliSuccessPayload {
    /// Construct a payload with structured data.
    pub fn with_data(message: String, data: Value) -> Self {
        Self {
            status: "ok",
            message,
            data: Some(data),
        }
    }
}

/// JSON error payload for CLI responses.
#[derive(Serialize)]
pub struct CliErrorPayload {
    /// Status indicator ("error").
    pub status: &'static str,
    /// Structured error details.
    pub error: ErrorDetails,
}

/// Details for a CLI error payload.
#[derive(Serialize)]
pub struct ErrorDetails {
    /// Error kind identifier (StoreConnection, etc.).
    pub kind: &'static str,
    /// Human-readable message.
    pub message: String,
    /// Optional file context.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    /// Optional hint for remediation steps.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl CliErrorPayload {
    /// Build payload from a RepoGraphError instance.
    pub fn from_error(error: &crate::RepoGraphError) -> Self {
        CliErrorPayload {
            status: "error",
            error: ErrorDetails {
                kind: error.kind(),
                message: error.to_string(),
                file: error
                    .file_path()
                    .map(|path| path.to_string_lossy().to_string()),
                hint: error.hint().map(|h| h.to_string()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_flags_map_to_config() {
        let cli = Cli::try_parse_from([
            "repograph", "run", "--repo", "/tmp/r", "--clean", "--force-clear", "--merge",
            "--batch-size", "50",
        ])
        .unwrap();
        let Commands::Run { analysis, load, skip_store } = cli.command else {
            panic!("expected run");
        };
        let mut config = analysis.to_config();
        load.apply(&mut config);
        assert!(!skip_store);
        assert_eq!(config.reuse, ReusePolicy::Regenerate);
        assert_eq!(config.existing, ExistingData::Clear);
        assert_eq!(config.write_mode, WriteMode::Merge);
        assert_eq!(config.batch_size, 50);
        assert_eq!(config.output_dir, PathBuf::from("graph_data/r"));
    }

    #[test]
    fn test_conflicting_flags_are_rejected() {
        assert!(Cli::try_parse_from(["repograph", "analyze", "--repo", ".", "--clean", "--reuse"])
            .is_err());
        assert!(Cli::try_parse_from([
            "repograph", "load", "--output", "d", "--force-clear", "--append"
        ])
        .is_err());
    }
}
