//! # CLI Module
//!
//! @title Command Line Interface
//! @author Ramprasad
//!
//! This module defines the command-line interface for Contract-Sentinel using
//! the `clap` derive macros for declarative argument parsing.
//!
//! ## Commands
//!
//! - `analyze` - Reconstruct a verified contract and run Slither on it
//! - `stage` - Reconstruct only, without touching the compiler or analyzer
//! - `version` - Show version information

use crate::config::ConfigOverrides;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Contract-Sentinel command-line interface.
#[derive(Parser, Debug)]
#[command(name = "contract-sentinel")]
#[command(author = "RamprasadGoud")]
#[command(version)]
#[command(about = "Reconstructs verified smart-contract sources and runs Slither across them")]
#[command(long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Settings shared by every command that talks to the explorer.
#[derive(Args, Debug, Clone)]
pub struct PipelineArgs {
    /// Path to a TOML configuration file.
    ///
    /// Defaults to `sentinel.toml` in the working directory when present.
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Block-explorer API key.
    #[arg(long, env = "BASESCAN_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Directory rebuilt on every run to hold the reconstructed project.
    #[arg(long, value_name = "DIR")]
    pub staging_dir: Option<PathBuf>,

    /// Dependency root for library packages.
    ///
    /// Defaults to `<staging-dir>/node_modules`. Pointing it outside the
    /// staging directory lets pre-installed packages be merged in.
    #[arg(long, value_name = "DIR")]
    pub dependency_dir: Option<PathBuf>,

    /// Static analyzer binary.
    #[arg(long, value_name = "BIN")]
    pub analyzer: Option<String>,

    /// Compiler version manager binary.
    #[arg(long, value_name = "BIN")]
    pub toolchain_manager: Option<String>,
}

impl PipelineArgs {
    /// CLI values that override the configuration file.
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            api_key: self.api_key.clone(),
            staging_dir: self.staging_dir.clone(),
            dependency_dir: self.dependency_dir.clone(),
            analyzer: self.analyzer.clone(),
            toolchain_manager: self.toolchain_manager.clone(),
        }
    }
}

/// Available subcommands for the Contract-Sentinel CLI.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fetch, reconstruct and analyze a verified contract.
    ///
    /// Rebuilds the staging directory, activates the matching solc version
    /// and runs Slither once per source file.
    Analyze {
        /// Contract address.
        #[arg(value_name = "ADDRESS")]
        address: String,

        /// Output format for the report.
        ///
        /// Supported formats:
        /// - `terminal`: Colorized console output (default)
        /// - `json`: `{ slitherResults, combinedSourceCode }`
        /// - `markdown`: Human-readable Markdown report
        #[arg(short, long, default_value = "terminal")]
        format: String,

        /// Output directory for the report.
        ///
        /// If not specified, the report is printed to stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        pipeline: PipelineArgs,
    },

    /// Fetch and reconstruct a verified contract without analyzing it.
    ///
    /// Prints the staged files, detected libraries and the remap argument.
    Stage {
        /// Contract address.
        #[arg(value_name = "ADDRESS")]
        address: String,

        #[command(flatten)]
        pipeline: PipelineArgs,
    },

    /// Print version information.
    Version,
}
