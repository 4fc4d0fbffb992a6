//! Repograph CLI binary
//!
//! Thin adapter over the pipeline: logging, interrupt handling, prompts and
//! output payloads. No extraction or loading logic lives here.

use repograph::cli::{AnalysisArgs, CliErrorPayload, CliSuccessPayload, Commands, LoadArgs};
use repograph::config::{PipelineConfig, StoreConfig};
use repograph::graph::{GraphStore, Neo4jStore};
use repograph::pipeline;
use repograph::RepoGraphError;
use std::io::{BufRead, IsTerminal, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

fn main() -> ExitCode {
    let cli = repograph::cli::parse_args();

    let default_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    let cancel = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&cancel);
    if let Err(e) = ctrlc::set_handler(move || {
        flag.store(true, Ordering::SeqCst);
    }) {
        log::warn!("interrupt handler not installed: {}", e);
    }

    let result = match cli.command {
        Commands::Run {
            analysis,
            load,
            skip_store,
        } => execute_run(&analysis, &load, skip_store, cancel),
        Commands::Analyze { analysis } => execute_analyze(&analysis, &cancel),
        Commands::Load { output, load } => execute_load(output, &load, cancel),
    };

    match result {
        Ok(payload) => {
            match serde_json::to_string_pretty(&payload) {
                Ok(text) => println!("{}", text),
                Err(_) => println!("{}", payload.message),
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            let payload = CliErrorPayload::from_error(&e);
            match serde_json::to_string_pretty(&payload) {
                Ok(text) => eprintln!("{}", text),
                Err(_) => eprintln!("Error: {}", e),
            }
            ExitCode::from(1)
        }
    }
}

/// Ask a yes/no question on the terminal. Anything but yes is no, and a
/// non-interactive stdin always answers no.
fn confirm(question: &str) -> bool {
    let stdin = std::io::stdin();
    if !stdin.is_terminal() {
        log::info!("{} [non-interactive: no]", question);
        return false;
    }
    let mut stderr = std::io::stderr();
    let _ = write!(stderr, "{} [yes/no]: ", question);
    let _ = stderr.flush();
    let mut answer = String::new();
    if stdin.lock().read_line(&mut answer).is_err() {
        return false;
    }
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

fn connect_store() -> repograph::Result<Option<Box<dyn GraphStore>>> {
    match StoreConfig::from_env() {
        Some(config) => Ok(Some(
            Box::new(Neo4jStore::connect(&config)?) as Box<dyn GraphStore>
        )),
        None => Ok(None),
    }
}

fn to_data<T: serde::Serialize>(value: &T) -> repograph::Result<serde_json::Value> {
    Ok(serde_json::to_value(value)?)
}

fn execute_run(
    analysis: &AnalysisArgs,
    load: &LoadArgs,
    skip_store: bool,
    cancel: Arc<AtomicBool>,
) -> repograph::Result<CliSuccessPayload> {
    let mut config = analysis.to_config();
    load.apply(&mut config);
    config.skip_store = skip_store;

    let report = pipeline::run(&config, cancel, &mut |q: &str| confirm(q), connect_store)?;
    let message = match &report.load {
        Some(loaded) => format!(
            "Loaded {} nodes and {} edges ({} external references skipped)",
            loaded.nodes_inserted, loaded.edges_inserted, loaded.edges_skipped_external
        ),
        None => format!(
            "Records written to {}; store step skipped",
            report.analysis.output_dir.display()
        ),
    };
    Ok(CliSuccessPayload::with_data(message, to_data(&report)?))
}

fn execute_analyze(
    analysis: &AnalysisArgs,
    cancel: &AtomicBool,
) -> repograph::Result<CliSuccessPayload> {
    let config = analysis.to_config();
    let report = pipeline::analyze(&config, cancel, &mut |q: &str| confirm(q))?;
    let message = if report.reused {
        format!("Reused record files in {}", report.output_dir.display())
    } else {
        format!(
            "Wrote {} nodes and {} edges to {}",
            report.nodes_written,
            report.edges_written,
            report.output_dir.display()
        )
    };
    Ok(CliSuccessPayload::with_data(message, to_data(&report)?))
}

fn execute_load(
    output: PathBuf,
    load: &LoadArgs,
    cancel: Arc<AtomicBool>,
) -> repograph::Result<CliSuccessPayload> {
    let mut config = PipelineConfig::new(".");
    config.output_dir = output;
    load.apply(&mut config);

    let store_config = StoreConfig::from_env().ok_or_else(|| {
        RepoGraphError::Config(
            "graph store credentials missing: set NEO4J_URI, NEO4J_USERNAME and NEO4J_PASSWORD"
                .to_string(),
        )
    })?;
    let mut store = Neo4jStore::connect(&store_config)?;
    let report = pipeline::load(&config, &mut store, cancel, &mut |q: &str| confirm(q))?;
    Ok(CliSuccessPayload::with_data(
        format!(
            "Loaded {} nodes and {} edges ({} external references skipped)",
            report.nodes_inserted, report.edges_inserted, report.edges_skipped_external
        ),
        to_data(&report)?,
    ))
}
