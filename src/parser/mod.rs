//! # Parser Module
//!
//! @title Source Map Parser
//! @author Ramprasad
//!
//! Turns the raw `SourceCode` payload published by a block explorer into a
//! logical, ordered multi-file [`SourceMap`].
//!
//! ## Payload Shapes
//!
//! - Standard JSON input, usually wrapped in doubled braces:
//!   `{{"language":"Solidity","sources":{...},"settings":{...}}}`
//! - Multi-file map: `{"A.sol":{"content":"..."},"B.sol":{...}}`
//! - Plain Solidity text for single-file verifications

mod source_map;

pub use source_map::*;

use serde::{Deserialize, Serialize};

/// One file of a verified contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFile {
    /// Full file contents.
    pub content: String,
}

/// Ordered mapping from source path to file contents.
///
/// Iteration order is insertion order; it drives both the analyzer loop and
/// result aggregation, so it must never be re-sorted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceMap {
    entries: Vec<(String, SourceFile)>,
    remappings: Vec<String>,
}

impl SourceMap {
    /// Creates an empty source map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a file. Re-inserting a key replaces its content in place.
    pub fn insert(&mut self, path: impl Into<String>, content: impl Into<String>) {
        let path = path.into();
        let file = SourceFile {
            content: content.into(),
        };
        match self.entries.iter_mut().find(|(key, _)| *key == path) {
            Some(slot) => slot.1 = file,
            None => self.entries.push((path, file)),
        }
    }

    /// Builder-style variant of [`SourceMap::insert`].
    pub fn with_file(mut self, path: impl Into<String>, content: impl Into<String>) -> Self {
        self.insert(path, content);
        self
    }

    /// Sets the explicit `name=target` remappings from compiler settings.
    pub fn with_remappings(mut self, remappings: Vec<String>) -> Self {
        self.remappings = remappings;
        self
    }

    /// Looks up a file by path.
    pub fn get(&self, path: &str) -> Option<&SourceFile> {
        self.entries
            .iter()
            .find(|(key, _)| key == path)
            .map(|(_, file)| file)
    }

    /// Iterates `(path, file)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &SourceFile)> {
        self.entries.iter().map(|(key, file)| (key.as_str(), file))
    }

    /// Iterates paths in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(key, _)| key.as_str())
    }

    /// Explicit remappings declared in `settings.remappings`.
    pub fn remappings(&self) -> &[String] {
        &self.remappings
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
