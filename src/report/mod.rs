//! # Report Generation Module
//!
//! @title Analysis Result Aggregation and Reporting
//! @author Ramprasad
//!
//! Folds per-file analyzer output into the pipeline's single
//! [`AnalysisResult`] and renders it for terminals, Markdown documents and
//! JSON consumers.
//!
//! ## Key Types
//!
//! - [`AnalysisResult`] - `{ slitherResults, combinedSourceCode }`
//! - [`Report`] - The result plus run metadata
//! - [`ResultAggregator`] - Deterministic aggregation in source map order

mod templates;

use crate::parser::SourceMap;
use crate::pipeline::PipelineRun;
use crate::runner::{AnalysisOutcome, FileAnalysis};
use anyhow::Result;
use colored::*;
use handlebars::Handlebars;
use serde::{Deserialize, Serialize};

/// Aggregated analyzer output and source for one contract.
///
/// Immutable once built; serializes with the field names downstream
/// consumers expect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    slither_results: String,
    combined_source_code: String,
}

impl AnalysisResult {
    /// Newline-terminated analyzer outputs, in source map order.
    pub fn slither_results(&self) -> &str {
        &self.slither_results
    }

    /// All file contents joined by newlines, in source map order.
    pub fn combined_source_code(&self) -> &str {
        &self.combined_source_code
    }
}

/// Builds [`AnalysisResult`] values.
pub struct ResultAggregator;

impl ResultAggregator {
    /// Aggregates analyzer results for `sources`.
    ///
    /// Outputs are emitted in source map order regardless of the order of
    /// `analyses`. Files without output (launch failures) contribute
    /// nothing. Identical outputs are kept, not deduplicated.
    pub fn aggregate(sources: &SourceMap, analyses: &[FileAnalysis]) -> AnalysisResult {
        let mut slither_results = String::new();
        for key in sources.keys() {
            let output = analyses
                .iter()
                .find(|a| a.key == key)
                .and_then(|a| a.output());
            if let Some(output) = output {
                slither_results.push_str(output);
                slither_results.push('\n');
            }
        }

        let combined_source_code = sources
            .iter()
            .map(|(_, file)| file.content.as_str())
            .collect::<Vec<_>>()
            .join("\n");

        AnalysisResult {
            slither_results,
            combined_source_code,
        }
    }
}

/// Metadata about one pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    /// Tool version used for the run.
    pub version: String,

    /// Unix timestamp of report creation.
    pub timestamp: String,

    /// Contract address.
    pub address: String,

    /// Compiler version activated for the run.
    pub compiler_version: String,

    /// Library packages found.
    pub libraries: Vec<String>,

    pub files_analyzed: usize,

    pub files_failed: usize,

    /// Line count of the combined source.
    pub source_lines: usize,
}

/// Per-file line of the report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileEntry {
    /// 1-based position in the source map.
    pub index: usize,

    pub key: String,

    /// Staged path, relative to the staging root where possible.
    pub staged_path: String,

    /// Launch failure reason; `None` when the analyzer ran.
    pub error: Option<String>,
}

/// Complete report for one contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub metadata: ReportMetadata,

    pub files: Vec<FileEntry>,

    pub result: AnalysisResult,
}

impl Report {
    /// Creates a report from a finished pipeline run.
    pub fn from_run(run: &PipelineRun) -> Self {
        let files: Vec<FileEntry> = run
            .analyses
            .iter()
            .enumerate()
            .map(|(i, analysis)| FileEntry {
                index: i + 1,
                key: analysis.key.clone(),
                staged_path: pathdiff::diff_paths(&analysis.path, &run.project.staging_root)
                    .unwrap_or_else(|| analysis.path.clone())
                    .display()
                    .to_string(),
                error: match &analysis.outcome {
                    AnalysisOutcome::Completed(_) => None,
                    AnalysisOutcome::Failed(failure) => Some(failure.message.clone()),
                },
            })
            .collect();

        let files_failed = files.iter().filter(|f| f.error.is_some()).count();

        let metadata = ReportMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            timestamp: chrono_lite_timestamp(),
            address: run.address.clone(),
            compiler_version: run.compiler_version.clone(),
            libraries: run.project.libraries.clone(),
            files_analyzed: files.len() - files_failed,
            files_failed,
            source_lines: run.result.combined_source_code().lines().count(),
        };

        Self {
            metadata,
            files,
            result: run.result.clone(),
        }
    }

    /// Prints colorized output to the terminal.
    pub fn print_terminal(&self) {
        println!("\n{}", "[*] Staged Files:".green().bold());
        println!("{}", "=".repeat(60).cyan());

        for file in &self.files {
            match &file.error {
                None => println!(
                    "  {} {} {}",
                    format!("#{}", file.index).cyan(),
                    file.key.white(),
                    format!("({})", file.staged_path).dimmed()
                ),
                Some(error) => println!(
                    "  {} {} {}",
                    format!("#{}", file.index).cyan(),
                    file.key.red(),
                    format!("[failed: {}]", error).red().dimmed()
                ),
            }
        }

        println!("\n{}", "[*] Slither Output:".green().bold());
        println!("{}", "=".repeat(60).cyan());
        if self.result.slither_results().trim().is_empty() {
            println!("{}", "[+] Slither produced no output.".green());
        } else {
            for line in self.result.slither_results().lines() {
                println!("  {}", line);
            }
        }
    }

    /// Prints summary statistics to the terminal.
    pub fn print_summary(&self) {
        println!(
            "{}",
            format!(
                "[*] Summary: {} analyzed | {} failed | solc {} | {} librar{}",
                self.metadata.files_analyzed,
                self.metadata.files_failed,
                self.metadata.compiler_version,
                self.metadata.libraries.len(),
                if self.metadata.libraries.len() == 1 { "y" } else { "ies" }
            )
            .bold()
        );

        if self.metadata.files_failed > 0 {
            println!(
                "{}",
                format!("[!] {} file(s) could not be analyzed", self.metadata.files_failed)
                    .yellow()
                    .bold()
            );
        }
    }

    /// Converts the report to Markdown format.
    pub fn to_markdown(&self) -> Result<String> {
        let mut handlebars = Handlebars::new();
        handlebars.register_escape_fn(handlebars::no_escape);
        Ok(handlebars.render_template(templates::MARKDOWN_TEMPLATE, self)?)
    }

    /// Pretty JSON of the [`AnalysisResult`], the downstream contract.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.result)?)
    }
}

/// Generates a simple timestamp without external dependencies.
fn chrono_lite_timestamp() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};

    let duration = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();

    format!("{}", duration.as_secs())
}
