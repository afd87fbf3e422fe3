//! # Source Payload Decoding
//!
//! @title Explorer Payload Decoder
//! @author Ramprasad
//!
//! Decodes the explorer `SourceCode` field into a [`SourceMap`].

use super::{SourceFile, SourceMap};
use crate::error::{PipelineError, PipelineResult};
use serde::Deserialize;
use serde_json::{Map, Value};

/// File name used for single-file payloads when the contract name is unknown.
pub const DEFAULT_FILE_NAME: &str = "Contract.sol";

#[derive(Debug, Default, Deserialize)]
struct CompilerSettings {
    #[serde(default)]
    remappings: Vec<String>,
}

/// Parses an explorer source payload.
///
/// JSON-shaped payloads (brace-delimited, optionally double-braced) are
/// decoded into a multi-file map; anything else is one plain source file
/// named after `contract_name`.
///
/// # Errors
///
/// Returns [`PipelineError::MalformedSourceMap`] when a JSON-shaped payload
/// fails to parse or contains no sources.
pub fn parse_source_payload(payload: &str, contract_name: &str) -> PipelineResult<SourceMap> {
    let trimmed = payload.trim();

    if !looks_like_json(trimmed) {
        let file_name = single_file_name(contract_name);
        log::debug!("Plain-text source payload, staging as {}", file_name);
        return Ok(SourceMap::new().with_file(file_name, payload));
    }

    let normalized = strip_doubled_braces(trimmed);
    let value: Value = serde_json::from_str(normalized)
        .map_err(|e| PipelineError::MalformedSourceMap(format!("invalid JSON: {}", e)))?;

    let Value::Object(mut root) = value else {
        return Err(PipelineError::MalformedSourceMap(
            "payload is not a JSON object".to_string(),
        ));
    };

    let (sources, settings) = match root.remove("sources") {
        Some(Value::Object(sources)) => {
            let settings = match root.remove("settings") {
                Some(raw) => serde_json::from_value::<CompilerSettings>(raw).map_err(|e| {
                    PipelineError::MalformedSourceMap(format!("invalid settings: {}", e))
                })?,
                None => CompilerSettings::default(),
            };
            (sources, settings)
        }
        Some(_) => {
            return Err(PipelineError::MalformedSourceMap(
                "`sources` is not an object".to_string(),
            ))
        }
        None => (root, CompilerSettings::default()),
    };

    let map = collect_sources(sources)?.with_remappings(settings.remappings);
    if map.is_empty() {
        return Err(PipelineError::MalformedSourceMap(
            "source map contains no files".to_string(),
        ));
    }

    log::info!("Parsed source map with {} file(s)", map.len());
    Ok(map)
}

fn collect_sources(sources: Map<String, Value>) -> PipelineResult<SourceMap> {
    let mut map = SourceMap::new();
    for (path, raw) in sources {
        let file: SourceFile = serde_json::from_value(raw).map_err(|e| {
            PipelineError::MalformedSourceMap(format!("entry {}: {}", path, e))
        })?;
        map.insert(path, file.content);
    }
    Ok(map)
}

fn looks_like_json(payload: &str) -> bool {
    payload.starts_with('{') && payload.ends_with('}')
}

/// Explorers wrap standard JSON input in an extra brace pair: `{{ ... }}`.
fn strip_doubled_braces(payload: &str) -> &str {
    if payload.len() >= 4 && payload.starts_with("{{") && payload.ends_with("}}") {
        &payload[1..payload.len() - 1]
    } else {
        payload
    }
}

fn single_file_name(contract_name: &str) -> String {
    let name = contract_name.trim();
    if name.is_empty() {
        DEFAULT_FILE_NAME.to_string()
    } else {
        format!("{}.sol", name)
    }
}
