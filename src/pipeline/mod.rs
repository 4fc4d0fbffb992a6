//! Pipeline orchestration.
//!
//! A run is strictly sequential: walk the repository, extract each unit and
//! append its records, write the run summary, then load the record files
//! into a graph store. A unit that cannot be read or parsed is skipped and
//! counted; only configuration problems, sink I/O, store connection loss and
//! interrupts end a run early.

use crate::config::{PipelineConfig, ReusePolicy};
use crate::error::{RepoGraphError, Result};
use crate::graph::{GraphLoader, GraphStore, LoadReport};
use crate::ingest::walk::{walk_repository, WalkOptions};
use crate::ingest::{extract_file, UnitOutcome};
use crate::record::sink::RecordSink;
use crate::record::{RunSummary, UnitStats};
use log::{error, info, warn};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Units between progress lines.
pub const PROGRESS_EVERY: usize = 10;

/// A unit that produced no records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedUnit {
    /// Unit path.
    pub path: PathBuf,
    /// Why it was skipped.
    pub reason: String,
}

/// Outcome of the extraction step.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    /// Directory holding the record files.
    pub output_dir: PathBuf,
    /// Existing record files were reused and nothing was extracted.
    pub reused: bool,
    /// Summary of the run that produced the record files, when known.
    pub summary: Option<RunSummary>,
    /// Node records appended by this run.
    pub nodes_written: usize,
    /// Edge records appended by this run.
    pub edges_written: usize,
    /// Units skipped as unreadable or unparsable.
    pub skipped: Vec<SkippedUnit>,
    /// Units whose traversal stopped early; their partial records were kept.
    pub faults: Vec<SkippedUnit>,
}

/// Outcome of a full run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// Extraction step.
    pub analysis: AnalysisReport,
    /// Load step, absent when skipped.
    pub load: Option<LoadReport>,
}

/// Extract `config.repo_root` into record files under `config.output_dir`.
///
/// `confirm` answers yes/no questions; it is only consulted when the reuse
/// policy is [`ReusePolicy::Ask`].
pub fn analyze(
    config: &PipelineConfig,
    cancel: &AtomicBool,
    confirm: &mut dyn FnMut(&str) -> bool,
) -> Result<AnalysisReport> {
    config.validate()?;
    let root = fs::canonicalize(&config.repo_root)
        .map_err(|e| RepoGraphError::io(&config.repo_root, e))?;
    let sink = RecordSink::new(&config.output_dir);

    if sink.has_output() {
        let reuse = match config.reuse {
            ReusePolicy::Reuse => true,
            ReusePolicy::Regenerate => false,
            ReusePolicy::Ask => confirm(&format!(
                "Record files already exist in {}. Reuse them instead of analyzing again?",
                sink.dir().display()
            )),
        };
        if reuse {
            info!("reusing record files in {}", sink.dir().display());
            return Ok(AnalysisReport {
                output_dir: sink.dir().to_path_buf(),
                reused: true,
                summary: sink.read_summary()?,
                nodes_written: 0,
                edges_written: 0,
                skipped: Vec::new(),
                faults: Vec::new(),
            });
        }
    }
    if config.reuse == ReusePolicy::Regenerate || sink.has_output() {
        let removed = sink.clean()?;
        if !removed.is_empty() {
            info!("removed previous record files: {}", removed.join(", "));
        }
    }

    let options = WalkOptions::with_excludes(&config.excludes)?;
    let layout = walk_repository(&root, &options)?;
    if layout.files.is_empty() {
        return Err(RepoGraphError::Config(format!(
            "no Python source files found under {}",
            root.display()
        )));
    }
    info!(
        "found {} source files in {} directories under {}",
        layout.files.len(),
        layout.directories,
        root.display()
    );

    fs::create_dir_all(sink.dir()).map_err(|e| RepoGraphError::io(sink.dir(), e))?;
    let mut report = AnalysisReport {
        output_dir: sink.dir().to_path_buf(),
        reused: false,
        summary: None,
        nodes_written: sink.append_nodes(&layout.nodes)?,
        edges_written: sink.append_edges(&layout.edges)?,
        skipped: Vec::new(),
        faults: Vec::new(),
    };

    let total = layout.files.len();
    let mut totals = UnitStats::default();
    let mut processed = 0;
    for (index, path) in layout.files.iter().enumerate() {
        if cancel.load(Ordering::SeqCst) {
            warn!("interrupted after {} of {} files", index, total);
            return Err(RepoGraphError::Interrupted {
                stage: "extraction",
            });
        }
        match extract_file(&root, path) {
            UnitOutcome::Extracted(unit) => {
                if let Some(fault) = &unit.fault {
                    error!("{}: traversal stopped early: {}", path.display(), fault);
                    report.faults.push(SkippedUnit {
                        path: path.clone(),
                        reason: fault.clone(),
                    });
                }
                report.nodes_written += sink.append_nodes(&unit.nodes)?;
                report.edges_written += sink.append_edges(&unit.edges)?;
                totals += unit.stats;
                processed += 1;
            }
            UnitOutcome::Failed { path, reason } => {
                warn!("skipping {}: {}", path.display(), reason);
                report.skipped.push(SkippedUnit { path, reason });
            }
        }
        if (index + 1) % PROGRESS_EVERY == 0 {
            info!("processed {}/{} files", index + 1, total);
        }
    }

    let summary = summarize(&root, total, processed, layout.directories, &report, totals);
    sink.write_summary(&summary)?;
    info!(
        "analysis complete: files={} errors={} functions={} methods={} classes={} nodes={} edges={}",
        summary.files_processed,
        summary.files_with_errors,
        summary.total_functions,
        summary.total_methods,
        summary.total_classes,
        report.nodes_written,
        report.edges_written
    );
    report.summary = Some(summary);
    Ok(report)
}

fn summarize(
    root: &Path,
    total_files: usize,
    files_processed: usize,
    total_directories: usize,
    report: &AnalysisReport,
    totals: UnitStats,
) -> RunSummary {
    RunSummary {
        repository: root.to_string_lossy().into_owned(),
        repository_name: root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
        run_id: uuid::Uuid::new_v4().to_string(),
        total_files,
        files_processed,
        files_with_errors: report.skipped.len(),
        total_directories,
        total_functions: totals.functions,
        total_methods: totals.methods,
        total_classes: totals.classes,
        total_imports: totals.imports,
        total_calls: totals.calls,
        total_variables: totals.variables,
        total_decorators: totals.decorators,
        analysis_timestamp: chrono::Utc::now().to_rfc3339(),
    }
}

/// Load the record files under `config.output_dir` into `store`.
pub fn load(
    config: &PipelineConfig,
    store: &mut dyn GraphStore,
    cancel: Arc<AtomicBool>,
    confirm: &mut dyn FnMut(&str) -> bool,
) -> Result<LoadReport> {
    let sink = RecordSink::new(&config.output_dir);
    let report = GraphLoader::new(store, config.batch_size)
        .with_mode(config.write_mode)
        .with_cancel_flag(cancel)
        .load_sink(&sink, config.existing, confirm)?;
    if report.interrupted {
        return Err(RepoGraphError::Interrupted { stage: "load" });
    }
    Ok(report)
}

/// Analyze, then load unless loading is skipped.
///
/// `connect` is called only when a load is due; `Ok(None)` means no store
/// is configured and the load is skipped with a warning. The store is
/// dropped before returning on every path.
pub fn run(
    config: &PipelineConfig,
    cancel: Arc<AtomicBool>,
    confirm: &mut dyn FnMut(&str) -> bool,
    connect: impl FnOnce() -> Result<Option<Box<dyn GraphStore>>>,
) -> Result<RunReport> {
    let analysis = analyze(config, &cancel, confirm)?;
    if config.skip_store {
        info!("store step skipped");
        return Ok(RunReport {
            analysis,
            load: None,
        });
    }

    let Some(mut store) = connect()? else {
        warn!("no graph store configured; records left in {}", analysis.output_dir.display());
        return Ok(RunReport {
            analysis,
            load: None,
        });
    };
    let loaded = load(config, store.as_mut(), cancel, confirm)?;
    Ok(RunReport {
        analysis,
        load: Some(loaded),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::MemoryGraphStore;

    fn write(root: &Path, rel: &str, text: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, text).unwrap();
    }

    #[test]
    fn test_empty_repository_is_an_error() {
        let repo = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let mut config = PipelineConfig::new(repo.path());
        config.output_dir = out.path().join("records");
        let err = analyze(&config, &AtomicBool::new(false), &mut |_| false).unwrap_err();
        assert_eq!(err.kind(), "Config");
    }

    #[test]
    fn test_run_without_store_keeps_records() {
        let repo = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        write(repo.path(), "pkg/mod.py", "def f():\n    return 1\n");
        let mut config = PipelineConfig::new(repo.path());
        config.output_dir = out.path().join("records");

        let report = run(&config, Arc::new(AtomicBool::new(false)), &mut |_| false, || Ok(None))
            .unwrap();
        assert!(report.load.is_none());
        assert_eq!(report.analysis.summary.unwrap().total_functions, 1);
    }

    #[test]
    fn test_interrupt_stops_extraction() {
        let repo = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        write(repo.path(), "a.py", "x = 1\n");
        let mut config = PipelineConfig::new(repo.path());
        config.output_dir = out.path().join("records");
        let err = analyze(&config, &AtomicBool::new(true), &mut |_| false).unwrap_err();
        assert_eq!(err.kind(), "Interrupted");
    }

    #[test]
    fn test_run_loads_into_store() {
        let repo = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        write(repo.path(), "a.py", "class A:\n    pass\n");
        let mut config = PipelineConfig::new(repo.path());
        config.output_dir = out.path().join("records");

        let report = run(&config, Arc::new(AtomicBool::new(false)), &mut |_| false, || {
            Ok(Some(Box::new(MemoryGraphStore::new()) as Box<dyn GraphStore>))
        })
        .unwrap();
        let load = report.load.unwrap();
        assert!(load.nodes_inserted >= 3);
        assert_eq!(load.nodes_failed, 0);
    }
}
