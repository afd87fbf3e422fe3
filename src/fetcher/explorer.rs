//! # Block-Explorer Client
//!
//! @title Explorer API Transport
//! @author Ramprasad
//!
//! Wire types for the `getsourcecode` endpoint and the blocking HTTP
//! client that calls it.

use super::{ExplorerClient, FetchError};
use crate::error::PipelineResult;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Envelope returned by `module=contract&action=getsourcecode`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExplorerResponse {
    /// `"1"` on success, `"0"` otherwise.
    pub status: String,

    /// Human-readable status message (`"OK"`, `"NOTOK"`).
    #[serde(default)]
    pub message: String,

    /// Entries on success, an error string on failure.
    pub result: ExplorerResult,
}

/// The `result` field changes shape with the status flag.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExplorerResult {
    Entries(Vec<SourceEntry>),
    Message(String),
}

/// One verified-source record.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceEntry {
    /// Raw payload: plain Solidity or an (escaped) JSON source map.
    #[serde(rename = "SourceCode", default)]
    pub source_code: String,

    /// Compiler used at verification time, e.g. `v0.8.24+commit.e11b9ed9`.
    #[serde(rename = "CompilerVersion", default)]
    pub compiler_version: String,

    #[serde(rename = "ContractName", default)]
    pub contract_name: String,
}

impl ExplorerResponse {
    /// Builds a successful single-entry envelope.
    pub fn success(entry: SourceEntry) -> Self {
        Self {
            status: "1".to_string(),
            message: "OK".to_string(),
            result: ExplorerResult::Entries(vec![entry]),
        }
    }

    /// Whether the explorer flagged the request as successful.
    pub fn is_success(&self) -> bool {
        self.status == "1"
    }
}

/// Blocking `reqwest` client for the explorer API.
pub struct HttpExplorerClient {
    client: reqwest::blocking::Client,
    api_url: String,
    api_key: String,
}

impl HttpExplorerClient {
    /// Creates a client for `api_url` authenticated with `api_key`.
    pub fn new(api_url: &str, api_key: &str, timeout: Duration) -> PipelineResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("contract-sentinel/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            api_url: api_url.to_string(),
            api_key: api_key.to_string(),
        })
    }
}

impl ExplorerClient for HttpExplorerClient {
    fn get_source_code(&self, address: &str) -> Result<ExplorerResponse, FetchError> {
        log::debug!("GET {} (address={})", self.api_url, address);

        let response = self
            .client
            .get(&self.api_url)
            .query(&[
                ("module", "contract"),
                ("action", "getsourcecode"),
                ("address", address),
                ("apiKey", self.api_key.as_str()),
            ])
            .send()
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        response
            .json::<ExplorerResponse>()
            .map_err(|e| FetchError::Transport(format!("invalid explorer response: {}", e)))
    }
}
