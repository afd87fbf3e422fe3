//! # Configuration Module
//!
//! @title Sentinel Configuration
//! @author Ramprasad
//!
//! Runtime settings for the pipeline: explorer endpoint and key, staging
//! locations, and the external binaries to drive.
//!
//! Values are layered: built-in defaults, then an optional TOML file, then
//! whatever the CLI (including environment-backed flags) overrides.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default block-explorer endpoint.
pub const DEFAULT_API_URL: &str = "https://api.basescan.org/api";

/// Default staging directory, relative to the working directory.
pub const DEFAULT_STAGING_DIR: &str = "./tmp/contracts";

/// Config file picked up when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "sentinel.toml";

/// Complete pipeline configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SentinelConfig {
    /// Block-explorer API base URL.
    pub api_url: String,

    /// Explorer API key.
    #[serde(alias = "BASESCAN_KEY")]
    pub api_key: Option<String>,

    /// Directory rebuilt on every run to hold the reconstructed project.
    pub staging_dir: PathBuf,

    /// Dependency root. Defaults to `<staging_dir>/node_modules`.
    pub dependency_dir: Option<PathBuf>,

    /// Static analyzer binary.
    pub analyzer: String,

    /// Compiler version manager binary.
    pub toolchain_manager: String,

    /// Explorer request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for SentinelConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            api_key: None,
            staging_dir: PathBuf::from(DEFAULT_STAGING_DIR),
            dependency_dir: None,
            analyzer: "slither".to_string(),
            toolchain_manager: "solc-select".to_string(),
            request_timeout_secs: 30,
        }
    }
}

/// CLI-level overrides applied on top of the file configuration.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub api_key: Option<String>,
    pub staging_dir: Option<PathBuf>,
    pub dependency_dir: Option<PathBuf>,
    pub analyzer: Option<String>,
    pub toolchain_manager: Option<String>,
}

impl SentinelConfig {
    /// Parses a configuration from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).context("Invalid configuration file")
    }

    /// Loads the configuration file.
    ///
    /// An explicit path must exist. Without one, `sentinel.toml` in the
    /// working directory is used when present, otherwise defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => {
                let text = std::fs::read_to_string(p)
                    .with_context(|| format!("Failed to read config {}", p.display()))?;
                Self::from_toml_str(&text)
            }
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if default_path.is_file() {
                    log::debug!("Using {}", default_path.display());
                    let text = std::fs::read_to_string(default_path)?;
                    Self::from_toml_str(&text)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Applies CLI overrides. `None` fields leave the current value alone.
    pub fn with_overrides(mut self, overrides: ConfigOverrides) -> Self {
        if overrides.api_key.is_some() {
            self.api_key = overrides.api_key;
        }
        if let Some(dir) = overrides.staging_dir {
            self.staging_dir = dir;
        }
        if overrides.dependency_dir.is_some() {
            self.dependency_dir = overrides.dependency_dir;
        }
        if let Some(analyzer) = overrides.analyzer {
            self.analyzer = analyzer;
        }
        if let Some(manager) = overrides.toolchain_manager {
            self.toolchain_manager = manager;
        }
        self
    }

    /// Returns the API key, failing when none was configured.
    pub fn require_api_key(&self) -> Result<&str> {
        match self.api_key.as_deref() {
            Some(key) if !key.trim().is_empty() => Ok(key),
            _ => bail!(
                "No explorer API key configured (set BASESCAN_KEY or api_key in the config file)"
            ),
        }
    }

    /// Resolved dependency root.
    pub fn dependency_root(&self) -> PathBuf {
        self.dependency_dir
            .clone()
            .unwrap_or_else(|| self.staging_dir.join("node_modules"))
    }
}
