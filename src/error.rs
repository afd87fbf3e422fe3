//! # Pipeline Errors
//!
//! @title Error Types
//! @author Ramprasad
//!
//! Every fatal condition the reconstruction pipeline can hit. Per-file
//! analyzer failures are not errors here; they are recorded as
//! [`crate::runner::AnalysisFailure`] values and never abort a run.

use crate::fetcher::FetchError;
use std::path::PathBuf;
use thiserror::Error;

/// Fatal pipeline errors.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// The explorer reported failure, returned no entry, or an empty source.
    #[error("Source unavailable for {address}: {reason}")]
    SourceUnavailable { address: String, reason: String },

    /// The payload looked like JSON but could not be decoded into sources.
    #[error("Malformed source map: {0}")]
    MalformedSourceMap(String),

    /// Neither a pinned pragma nor the explorer compiler version was usable.
    #[error("Unable to resolve a compiler version (explorer reported {compiler_version:?})")]
    VersionUnresolvable { compiler_version: String },

    /// The toolchain manager failed to install or activate a version.
    #[error("Failed to install or switch to solc version {version}: {message}")]
    ToolchainSwitchFailure { version: String, message: String },

    /// The explorer answered 502 twice in a row.
    #[error("Explorer gateway still failing after retry (HTTP {status})")]
    TransientFetchFailure { status: u16 },

    /// Any other transport or HTTP failure from the explorer.
    #[error("Explorer request failed: {0}")]
    Fetch(#[from] FetchError),

    /// A source key would escape the staging tree.
    #[error("Refusing to stage unsafe source path: {}", .0.display())]
    UnsafePath(PathBuf),

    /// Filesystem errors while staging.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias used across the library.
pub type PipelineResult<T> = Result<T, PipelineError>;

impl PipelineError {
    /// Short machine-friendly name of the error kind, used in logs and reports.
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::SourceUnavailable { .. } => "SourceUnavailable",
            PipelineError::MalformedSourceMap(_) => "MalformedSourceMap",
            PipelineError::VersionUnresolvable { .. } => "VersionUnresolvable",
            PipelineError::ToolchainSwitchFailure { .. } => "ToolchainSwitchFailure",
            PipelineError::TransientFetchFailure { .. } => "TransientFetchFailure",
            PipelineError::Fetch(_) => "FetchFailure",
            PipelineError::UnsafePath(_) => "UnsafePath",
            PipelineError::Io(_) => "Io",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PipelineError::ToolchainSwitchFailure {
            version: "0.8.24".to_string(),
            message: "network down".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Failed to install or switch to solc version 0.8.24: network down"
        );
        assert_eq!(err.kind(), "ToolchainSwitchFailure");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: PipelineError = io_err.into();
        assert!(matches!(err, PipelineError::Io(_)));
    }

    #[test]
    fn test_fetch_error_conversion() {
        let err: PipelineError = FetchError::Status(500).into();
        assert_eq!(err.to_string(), "Explorer request failed: HTTP 500");
        assert_eq!(err.kind(), "FetchFailure");
    }
}
