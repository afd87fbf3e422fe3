//! # Analyzer Invocation
//!
//! @title Per-File Static Analysis
//! @author Ramprasad
//!
//! Runs the static analyzer once per staged source file, in source map
//! order. One file failing to launch never stops the others.

use super::{CommandOutput, CommandRunner, CommandSpec};
use crate::parser::SourceMap;
use crate::project::{RemapTable, StagedProject};
use log::{info, warn};
use std::path::PathBuf;

/// Placeholder output for a failing run that wrote nothing to stderr.
pub const NO_STDERR: &str = "No stderr";

/// A file whose analyzer process could not be run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisFailure {
    pub key: String,
    pub path: PathBuf,
    pub message: String,
}

/// What happened when a file was handed to the analyzer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalysisOutcome {
    /// The analyzer ran; holds its diagnostic output.
    Completed(String),

    /// The analyzer could not be run for this file.
    Failed(AnalysisFailure),
}

/// Analyzer result for one source key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileAnalysis {
    pub key: String,
    pub path: PathBuf,
    pub outcome: AnalysisOutcome,
}

impl FileAnalysis {
    /// Captured output, `None` for failed files.
    pub fn output(&self) -> Option<&str> {
        match &self.outcome {
            AnalysisOutcome::Completed(output) => Some(output),
            AnalysisOutcome::Failed(_) => None,
        }
    }
}

/// Observer for the per-file loop; drives progress bars in the CLI.
pub trait AnalysisProgress {
    /// Called before the analyzer is launched for `key`.
    fn file_started(&self, _key: &str, _index: usize, _total: usize) {}

    /// Called once the file has an outcome.
    fn file_finished(&self, _analysis: &FileAnalysis) {}
}

/// Progress observer that ignores every event.
pub struct NoProgress;

impl AnalysisProgress for NoProgress {}

/// Drives the analyzer across a staged project.
pub struct AnalysisRunner<'a> {
    runner: &'a dyn CommandRunner,
    analyzer: String,
}

impl<'a> AnalysisRunner<'a> {
    /// Creates a runner launching `analyzer` through `runner`.
    pub fn new(runner: &'a dyn CommandRunner, analyzer: impl Into<String>) -> Self {
        Self {
            runner,
            analyzer: analyzer.into(),
        }
    }

    /// Builds the analyzer command for one staged file.
    pub fn command_for(
        &self,
        path: &std::path::Path,
        project: &StagedProject,
        remaps: &RemapTable,
    ) -> CommandSpec {
        let mut spec = CommandSpec::new(&self.analyzer).arg(path.display().to_string());

        if !remaps.is_empty() {
            spec = spec.arg("--solc-remaps").arg(remaps.to_argument());
        }

        spec.arg(format!("--solc-args=--allow-paths {}", allowed_paths(project)))
            .current_dir(&project.staging_root)
    }

    /// Analyzes every key of `sources`, in order.
    ///
    /// Returns one [`FileAnalysis`] per key. Launch failures are logged and
    /// recorded as [`AnalysisOutcome::Failed`]; they are never retried.
    pub fn run(
        &self,
        sources: &SourceMap,
        project: &StagedProject,
        remaps: &RemapTable,
        progress: &dyn AnalysisProgress,
    ) -> Vec<FileAnalysis> {
        let total = sources.len();
        let mut results = Vec::with_capacity(total);

        for (index, key) in sources.keys().enumerate() {
            progress.file_started(key, index, total);

            let path = project
                .path_of(key)
                .map(|p| p.to_path_buf())
                .unwrap_or_else(|| project.staging_root.join(key));
            let command = self.command_for(&path, project, remaps);
            info!("Running Slither command: {}", command);

            let outcome = match self.runner.run(&command) {
                Ok(output) => AnalysisOutcome::Completed(diagnostics(output)),
                Err(e) => {
                    warn!("Failed to analyze contract file: {} ({})", path.display(), e);
                    AnalysisOutcome::Failed(AnalysisFailure {
                        key: key.to_string(),
                        path: path.clone(),
                        message: e.to_string(),
                    })
                }
            };

            let analysis = FileAnalysis {
                key: key.to_string(),
                path,
                outcome,
            };
            progress.file_finished(&analysis);
            results.push(analysis);
        }

        results
    }
}

/// The analyzer reports findings on stderr and exits non-zero when it finds
/// anything, so the exit status does not decide success.
fn diagnostics(output: CommandOutput) -> String {
    log::debug!("Slither analysis stdout: {}", output.stdout);
    if !output.success && output.stderr.is_empty() {
        NO_STDERR.to_string()
    } else {
        output.stderr
    }
}

/// `--allow-paths` value: `.`, the staging root, and an external dependency
/// root when there is one.
pub fn allowed_paths(project: &StagedProject) -> String {
    let mut paths = vec![".".to_string(), project.staging_root.display().to_string()];
    if !project.dependency_root_is_nested() {
        paths.push(project.dependency_root.display().to_string());
    }
    paths.join(",")
}
