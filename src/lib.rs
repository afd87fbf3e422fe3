//! # Contract-Sentinel Library
//!
//! @title Contract-Sentinel - Verified Source Reconstruction for Slither
//! @author Ramprasad
//!
//! Fetches the verified source of a deployed contract, rebuilds it as a
//! compilable project on disk, selects the matching `solc`, and drives
//! Slither across every file.
//!
//! ## Modules
//!
//! - [`cli`] - Command-line interface definitions and argument parsing
//! - [`config`] - Layered runtime configuration
//! - [`fetcher`] - Block-explorer source retrieval with a single 502 retry
//! - [`parser`] - Explorer payload to ordered source map
//! - [`project`] - Staging tree reconstruction and import remaps
//! - [`toolchain`] - Compiler version resolution and activation
//! - [`runner`] - Subprocess seam and per-file analyzer invocation
//! - [`report`] - Result aggregation and report rendering
//! - [`pipeline`] - The end-to-end entry point
//!
//! ## Example
//!
//! ```rust,ignore
//! use contract_sentinel::{Pipeline, SentinelConfig};
//!
//! let config = SentinelConfig::load(None)?;
//! let pipeline = Pipeline::from_config(&config)?;
//! if let Some(result) = pipeline.analyze("0x1234...") {
//!     println!("{}", result.slither_results());
//! }
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod parser;
pub mod pipeline;
pub mod project;
pub mod report;
pub mod runner;
pub mod toolchain;

pub use cli::Cli;
pub use config::SentinelConfig;
pub use error::{PipelineError, PipelineResult};
pub use parser::SourceMap;
pub use pipeline::{Pipeline, PipelineRun};
pub use report::{AnalysisResult, Report};
