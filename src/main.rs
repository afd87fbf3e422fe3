//! # Contract-Sentinel CLI Entry Point
//!
//! @title Contract-Sentinel CLI
//! @author Ramprasad
//!
//! This module provides the main entry point for the Contract-Sentinel
//! command-line tool.

use anyhow::{bail, Context, Result};
use clap::Parser;
use colored::*;
use contract_sentinel::cli::{Commands, PipelineArgs};
use contract_sentinel::runner::{AnalysisProgress, FileAnalysis};
use contract_sentinel::{Cli, Pipeline, Report, SentinelConfig};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};

/// ASCII art banner displayed at startup.
const BANNER: &str = r#"
   ____            _                  _     ____             _   _            _
  / ___|___  _ __ | |_ _ __ __ _  ___| |_  / ___|  ___ _ __ | |_(_)_ __   ___| |
 | |   / _ \| '_ \| __| '__/ _` |/ __| __| \___ \ / _ \ '_ \| __| | '_ \ / _ \ |
 | |__| (_) | | | | |_| | | (_| | (__| |_   ___) |  __/ | | | |_| | | | |  __/ |
  \____\___/|_| |_|\__|_|  \__,_|\___|\__| |____/ \___|_| |_|\__|_|_| |_|\___|_|

          Verified Source Reconstruction + Slither Orchestration
"#;

/// Application entry point.
///
/// Initializes the logging system, parses command-line arguments, and
/// dispatches to the appropriate command handler.
fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze {
            address,
            format,
            output,
            pipeline,
        } => {
            // Keep stdout machine-readable for JSON.
            if format != "json" {
                println!("{}", BANNER.cyan().bold());
            }
            run_analyze(&address, &format, output, &pipeline)?;
        }
        Commands::Stage { address, pipeline } => {
            println!("{}", BANNER.cyan().bold());
            run_stage(&address, &pipeline)?;
        }
        Commands::Version => {
            println!(
                "{} {}",
                "Contract-Sentinel version:".green(),
                env!("CARGO_PKG_VERSION").yellow()
            );
        }
    }

    Ok(())
}

/// Builds the pipeline from the config file plus CLI overrides.
fn build_pipeline(args: &PipelineArgs) -> Result<Pipeline> {
    let config = SentinelConfig::load(args.config.as_deref())?.with_overrides(args.overrides());
    log::debug!("Effective configuration: staging={}", config.staging_dir.display());
    Pipeline::from_config(&config)
}

/// Progress bar over the per-file analyzer loop.
struct BarProgress {
    bar: ProgressBar,
}

impl BarProgress {
    fn new(hidden: bool) -> Result<Self> {
        let bar = if hidden {
            ProgressBar::hidden()
        } else {
            ProgressBar::new(0)
        };
        bar.set_style(
            ProgressStyle::default_bar()
                .template(
                    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
                )?
                .progress_chars("=>-"),
        );
        Ok(Self { bar })
    }
}

impl AnalysisProgress for BarProgress {
    fn file_started(&self, key: &str, _index: usize, total: usize) {
        self.bar.set_length(total as u64);
        self.bar.set_message(format!("Analyzing {}", key));
    }

    fn file_finished(&self, analysis: &FileAnalysis) {
        if analysis.output().is_none() {
            self.bar
                .println(format!("{} {}", "[!] Failed to analyze".red(), analysis.key));
        }
        self.bar.inc(1);
    }
}

/// Executes the full analysis and renders the report.
///
/// # Arguments
///
/// * `address` - Contract address to analyze
/// * `format` - Output format: "terminal", "json", or "markdown"
/// * `output` - Optional output directory for the report
/// * `args` - Shared pipeline settings
fn run_analyze(
    address: &str,
    format: &str,
    output: Option<PathBuf>,
    args: &PipelineArgs,
) -> Result<()> {
    if !matches!(format, "terminal" | "json" | "markdown") {
        bail!("Unknown output format: {}", format);
    }

    let pipeline = build_pipeline(args)?;

    if format != "json" {
        println!(
            "{} {}",
            "[*] Analyzing:".green().bold(),
            address.yellow()
        );
    }

    let progress = BarProgress::new(format == "json")?;
    let run = pipeline
        .execute(address, &progress)
        .with_context(|| format!("Failed to analyze the contract {}", address))?;
    progress.bar.finish_and_clear();

    let report = Report::from_run(&run);

    match format {
        "json" => {
            let json = report.to_json()?;
            match output {
                Some(ref dir) => {
                    let path = write_report(dir, "analysis.json", &json)?;
                    eprintln!("[+] Report saved to: {}", path.display());
                }
                None => println!("{}", json),
            }
        }
        "markdown" => {
            let md = report.to_markdown()?;
            match output {
                Some(ref dir) => {
                    let path = write_report(dir, "analysis_report.md", &md)?;
                    println!(
                        "{} {}",
                        "[+] Report saved to:".green(),
                        path.display().to_string().yellow()
                    );
                }
                None => println!("{}", md),
            }
        }
        "terminal" => {
            report.print_terminal();
        }
        other => bail!("Unknown output format: {}", other),
    }

    if format != "json" {
        println!("\n{}", "=".repeat(60).cyan());
        report.print_summary();
    }

    Ok(())
}

fn write_report(dir: &Path, file_name: &str, content: &str) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create {}", dir.display()))?;
    let path = dir.join(file_name);
    std::fs::write(&path, content)?;
    Ok(path)
}

/// Reconstructs a contract without analyzing it.
fn run_stage(address: &str, args: &PipelineArgs) -> Result<()> {
    let pipeline = build_pipeline(args)?;

    println!("{} {}", "[*] Staging:".green().bold(), address.yellow());

    let staged = pipeline
        .stage(address)
        .with_context(|| format!("Failed to stage the contract {}", address))?;

    println!(
        "\n{} {}",
        "[+] Staged into".green().bold(),
        staged.project.staging_root.display().to_string().yellow()
    );
    for file in &staged.project.files {
        println!("    -> {}", file.path.display());
    }

    let origin = if staged.project.dependency_root_preexisted {
        "existing, merged"
    } else {
        "created"
    };
    println!(
        "\n{} {} {}",
        "[*] Dependency root:".green().bold(),
        staged.project.dependency_root.display(),
        format!("({})", origin).dimmed()
    );

    if staged.project.libraries.is_empty() {
        println!("\n{}", "[*] No library packages detected.".dimmed());
    } else {
        println!("\n{}", "[*] Libraries:".green().bold());
        for library in &staged.project.libraries {
            println!("    {}", library.cyan());
        }
    }

    println!("\n{} {}", "[*] Compiler (explorer):".green().bold(), staged.source.compiler_version);
    println!("{} {}", "[*] Remaps:".green().bold(), staged.remaps.to_argument());

    Ok(())
}
