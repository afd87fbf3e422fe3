//! # Compiler Version Resolution
//!
//! @title Pragma and Compiler Version Extraction
//! @author Ramprasad
//!
//! Narrow regex helpers that turn `pragma solidity` declarations and the
//! explorer's compiler string into a concrete `major.minor.patch` version.

use crate::error::{PipelineError, PipelineResult};
use crate::parser::SourceMap;
use regex::Regex;

/// Extracts every `pragma solidity <expr>;` expression from a source file.
///
/// Commented-out lines are ignored.
pub fn pragma_expressions(source: &str) -> Vec<String> {
    let Ok(re) = Regex::new(r"^\s*pragma\s+solidity\s+([^;]+);") else {
        return Vec::new();
    };
    source
        .lines()
        .filter_map(|line| re.captures(line))
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .collect()
}

/// Returns the version a pragma expression pins, if it pins exactly one.
///
/// `0.8.20`, `=0.8.20` and `^0.8.20` pin `0.8.20`. Ranges such as
/// `>=0.6.0 <0.9.0` pin nothing.
pub fn pinned_version(expression: &str) -> Option<String> {
    let re = Regex::new(r"^[\^=]?\s*v?(\d+\.\d+\.\d+)$").ok()?;
    re.captures(expression.trim())
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Returns the version pinned by the pragmas of all files, when unambiguous.
///
/// Every pragma must pin a version and they must all agree.
pub fn pragma_version(sources: &SourceMap) -> Option<String> {
    let mut agreed: Option<String> = None;
    for (_, file) in sources.iter() {
        for expression in pragma_expressions(&file.content) {
            let version = pinned_version(&expression)?;
            match &agreed {
                Some(existing) if *existing != version => return None,
                Some(_) => {}
                None => agreed = Some(version),
            }
        }
    }
    agreed
}

/// Extracts `major.minor.patch` from an explorer compiler string such as
/// `v0.8.24+commit.e11b9ed9`.
pub fn compiler_version(raw: &str) -> Option<String> {
    let re = Regex::new(r"^v?(\d+\.\d+\.\d+)").ok()?;
    re.captures(raw.trim())
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Resolves the compiler version for a contract.
///
/// Prefers an unambiguous pragma; falls back to the explorer string.
///
/// # Errors
///
/// Returns [`PipelineError::VersionUnresolvable`] when neither source
/// yields a version.
pub fn resolve_version(sources: &SourceMap, fallback: &str) -> PipelineResult<String> {
    if let Some(version) = pragma_version(sources) {
        log::debug!("Compiler version {} pinned by pragma", version);
        return Ok(version);
    }

    compiler_version(fallback).ok_or_else(|| PipelineError::VersionUnresolvable {
        compiler_version: fallback.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pragma_expressions() {
        let source = "// SPDX-License-Identifier: MIT\n// pragma solidity 0.4.0;\npragma solidity ^0.8.20;\ncontract A {}";
        assert_eq!(pragma_expressions(source), vec!["^0.8.20"]);
    }

    #[test]
    fn test_pinned_version() {
        assert_eq!(pinned_version("^0.8.20").as_deref(), Some("0.8.20"));
        assert_eq!(pinned_version("0.7.6").as_deref(), Some("0.7.6"));
        assert_eq!(pinned_version("=0.6.12").as_deref(), Some("0.6.12"));
        assert_eq!(pinned_version(">=0.6.0 <0.9.0"), None);
        assert_eq!(pinned_version("~0.8"), None);
    }

    #[test]
    fn test_compiler_version() {
        assert_eq!(compiler_version("v0.8.24+commit.e11b9ed9").as_deref(), Some("0.8.24"));
        assert_eq!(compiler_version("0.5.17").as_deref(), Some("0.5.17"));
        assert_eq!(compiler_version("vyper:0.3.10"), None);
    }

    #[test]
    fn test_agreeing_pragmas_win() {
        let sources = SourceMap::new()
            .with_file("A.sol", "pragma solidity ^0.8.20;")
            .with_file("B.sol", "pragma solidity 0.8.20;");
        assert_eq!(resolve_version(&sources, "v0.8.26+commit.8a97fa7a").unwrap(), "0.8.20");
    }

    #[test]
    fn test_ambiguous_pragmas_fall_back() {
        let sources = SourceMap::new()
            .with_file("A.sol", "pragma solidity ^0.8.20;")
            .with_file("@oz/B.sol", "pragma solidity ^0.8.0;");
        assert_eq!(resolve_version(&sources, "v0.8.26+commit.8a97fa7a").unwrap(), "0.8.26");

        let ranged = SourceMap::new().with_file("A.sol", "pragma solidity >=0.6.0 <0.8.0;");
        assert_eq!(resolve_version(&ranged, "v0.7.6+commit.7338295f").unwrap(), "0.7.6");
    }

    #[test]
    fn test_unresolvable() {
        let sources = SourceMap::new().with_file("A.sol", "contract A {}");
        let err = resolve_version(&sources, "").unwrap_err();
        assert!(matches!(err, PipelineError::VersionUnresolvable { .. }));
    }
}
