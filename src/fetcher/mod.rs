//! # Source Fetcher Module
//!
//! @title Verified Source Retrieval
//! @author Ramprasad
//!
//! Retrieves the published source of a contract from a block explorer.
//!
//! ## Retry Policy
//!
//! A 502 from the explorer gateway is retried exactly once. Any other
//! failure, or a second 502, is fatal. No other step of the pipeline retries.

mod explorer;

pub use explorer::*;

use crate::error::{PipelineError, PipelineResult};
use log::{info, warn};
use thiserror::Error;

/// HTTP status that triggers the single retry.
pub const BAD_GATEWAY: u16 = 502;

/// Transport-level failure reported by an [`ExplorerClient`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// Non-success HTTP status.
    #[error("HTTP {0}")]
    Status(u16),

    /// Connection, timeout or decoding failure.
    #[error("{0}")]
    Transport(String),
}

/// Transport seam for the explorer API.
///
/// The production implementation is [`HttpExplorerClient`]; tests plug in
/// scripted clients.
pub trait ExplorerClient: Send + Sync {
    /// Performs one `getsourcecode` request for `address`.
    fn get_source_code(&self, address: &str) -> Result<ExplorerResponse, FetchError>;
}

/// Validated source metadata for one contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedSource {
    /// Raw source payload.
    pub source_code: String,

    /// Explorer-reported compiler version string.
    pub compiler_version: String,

    /// Contract name, possibly empty.
    pub contract_name: String,
}

/// Fetches and validates explorer source metadata.
pub struct SourceFetcher {
    client: Box<dyn ExplorerClient>,
}

impl SourceFetcher {
    /// Wraps an explorer transport.
    pub fn new(client: Box<dyn ExplorerClient>) -> Self {
        Self { client }
    }

    /// Fetches the source for `address`.
    ///
    /// # Errors
    ///
    /// - [`PipelineError::TransientFetchFailure`] after two consecutive 502s
    /// - [`PipelineError::Fetch`] for any other transport failure
    /// - [`PipelineError::SourceUnavailable`] when the explorer reports
    ///   failure or the source field is empty
    pub fn fetch(&self, address: &str) -> PipelineResult<FetchedSource> {
        let response = self.request_with_retry(address)?;
        Self::validate(address, response)
    }

    fn request_with_retry(&self, address: &str) -> PipelineResult<ExplorerResponse> {
        match self.client.get_source_code(address) {
            Err(FetchError::Status(BAD_GATEWAY)) => {
                warn!("502 error encountered. Retrying...");
                match self.client.get_source_code(address) {
                    Err(FetchError::Status(BAD_GATEWAY)) => {
                        Err(PipelineError::TransientFetchFailure {
                            status: BAD_GATEWAY,
                        })
                    }
                    other => other.map_err(PipelineError::from),
                }
            }
            other => other.map_err(PipelineError::from),
        }
    }

    fn validate(address: &str, response: ExplorerResponse) -> PipelineResult<FetchedSource> {
        let unavailable = |reason: String| PipelineError::SourceUnavailable {
            address: address.to_string(),
            reason,
        };

        if !response.is_success() {
            let detail = match &response.result {
                ExplorerResult::Message(msg) => msg.clone(),
                ExplorerResult::Entries(_) => response.message.clone(),
            };
            return Err(unavailable(format!("explorer status {}: {}", response.status, detail)));
        }

        let entry = match response.result {
            ExplorerResult::Entries(entries) => entries.into_iter().next(),
            ExplorerResult::Message(_) => None,
        }
        .ok_or_else(|| unavailable("explorer returned no source entry".to_string()))?;

        if entry.source_code.trim().is_empty() {
            return Err(unavailable(
                "source code not found for the given contract address".to_string(),
            ));
        }

        info!(
            "Fetched source for {} ({} bytes, compiler {})",
            address,
            entry.source_code.len(),
            entry.compiler_version
        );

        Ok(FetchedSource {
            source_code: entry.source_code,
            compiler_version: entry.compiler_version,
            contract_name: entry.contract_name,
        })
    }
}
