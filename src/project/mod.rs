//! # Project Reconstruction Module
//!
//! @title Staging Tree Builder
//! @author Ramprasad
//!
//! Materializes a [`SourceMap`] as an on-disk project the compiler and
//! analyzer can resolve.
//!
//! ## Layout
//!
//! ```text
//! <staging_root>/
//!   contracts/Vault.sol               first-party key "contracts/Vault.sol"
//!   node_modules/                     dependency root
//!     @openzeppelin/contracts/...     library key "@openzeppelin/contracts/..."
//! ```
//!
//! Keys starting with [`NAMESPACE_MARKER`] belong to a library package named
//! by their first path segment. Everything else is first-party.

mod remap;

pub use remap::*;

use crate::error::{PipelineError, PipelineResult};
use crate::parser::SourceMap;
use log::{debug, info};
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

/// Prefix that marks a package-style (library) source path.
pub const NAMESPACE_MARKER: char = '@';

/// Where a run stages its files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectLayout {
    /// Directory wiped and rebuilt on every run.
    pub staging_root: PathBuf,

    /// Directory holding one subdirectory per library package.
    pub dependency_root: PathBuf,
}

impl ProjectLayout {
    /// Layout with the dependency root at `<staging_root>/node_modules`.
    pub fn new(staging_root: impl Into<PathBuf>) -> Self {
        let staging_root = staging_root.into();
        let dependency_root = staging_root.join("node_modules");
        Self {
            staging_root,
            dependency_root,
        }
    }

    /// Layout with an explicit dependency root.
    pub fn with_dependency_root(mut self, dependency_root: impl Into<PathBuf>) -> Self {
        self.dependency_root = dependency_root.into();
        self
    }
}

/// Classification of a staged source key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceKind {
    /// Project file, staged under the staging root.
    FirstParty,

    /// File of the named library package, staged under the dependency root.
    Library(String),
}

/// One source key and where it landed on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedFile {
    /// Source map key.
    pub key: String,

    /// Absolute path of the written file.
    pub path: PathBuf,

    pub kind: SourceKind,
}

/// Result of materializing a source map.
#[derive(Debug, Clone)]
pub struct StagedProject {
    /// Absolute staging root.
    pub staging_root: PathBuf,

    /// Absolute dependency root.
    pub dependency_root: PathBuf,

    /// Whether the dependency root existed before this run staged into it.
    pub dependency_root_preexisted: bool,

    /// Staged files in source map order.
    pub files: Vec<StagedFile>,

    /// Library packages: detected from keys first, then pre-seeded ones.
    pub libraries: Vec<String>,
}

impl StagedProject {
    /// Staged path for a source key.
    pub fn path_of(&self, key: &str) -> Option<&Path> {
        self.files
            .iter()
            .find(|f| f.key == key)
            .map(|f| f.path.as_path())
    }

    /// Whether the dependency root lives inside the staging root.
    pub fn dependency_root_is_nested(&self) -> bool {
        self.dependency_root.starts_with(&self.staging_root)
    }

    /// Lists every regular file currently under the staging root.
    pub fn files_on_disk(&self) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = WalkDir::new(&self.staging_root)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| e.into_path())
            .collect();
        files.sort();
        files
    }
}

/// Classifies a source key.
pub fn classify_key(key: &str) -> SourceKind {
    if key.starts_with(NAMESPACE_MARKER) {
        let package = key.split('/').next().unwrap_or(key);
        SourceKind::Library(package.to_string())
    } else {
        SourceKind::FirstParty
    }
}

/// Builds staging trees from source maps.
pub struct ProjectTreeBuilder {
    layout: ProjectLayout,
}

impl ProjectTreeBuilder {
    pub fn new(layout: ProjectLayout) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> &ProjectLayout {
        &self.layout
    }

    /// Rebuilds the staging tree from `sources`.
    ///
    /// The staging root is removed and recreated before anything is written,
    /// so nothing from a previous run survives. First-party files are written
    /// before library packages.
    ///
    /// # Errors
    ///
    /// - [`PipelineError::UnsafePath`] if a key is absolute, contains `..`,
    ///   or names a library package without a file inside it
    /// - [`PipelineError::MalformedSourceMap`] if two keys stage to one file
    /// - [`PipelineError::Io`] on filesystem failures
    pub fn build(&self, sources: &SourceMap) -> PipelineResult<StagedProject> {
        for key in sources.keys() {
            ensure_stageable(key)?;
        }

        let staging_root = self.reset_staging_root()?;

        let mut libraries: Vec<String> = Vec::new();
        for key in sources.keys() {
            if let SourceKind::Library(package) = classify_key(key) {
                if !libraries.contains(&package) {
                    libraries.push(package);
                }
            }
        }

        let mut staged = Vec::with_capacity(sources.len());
        let mut written: HashMap<PathBuf, String> = HashMap::with_capacity(sources.len());

        for (key, file) in sources.iter() {
            if classify_key(key) != SourceKind::FirstParty {
                continue;
            }
            let path = staging_root.join(key);
            claim_path(&mut written, &path, key)?;
            write_source(&path, &file.content)?;
            staged.push(StagedFile {
                key: key.to_string(),
                path,
                kind: SourceKind::FirstParty,
            });
        }

        let dependency_root_preexisted = self.layout.dependency_root.is_dir();
        std::fs::create_dir_all(&self.layout.dependency_root)?;
        let dependency_root = std::fs::canonicalize(&self.layout.dependency_root)?;
        if dependency_root_preexisted && !dependency_root.starts_with(&staging_root) {
            info!("Merging into existing dependency root {}", dependency_root.display());
        }

        for package in &libraries {
            let package_dir = dependency_root.join(package);
            std::fs::create_dir_all(&package_dir)?;

            for (key, file) in sources.iter() {
                if classify_key(key) != SourceKind::Library(package.clone()) {
                    continue;
                }
                let relative = key
                    .strip_prefix(package.as_str())
                    .unwrap_or(key)
                    .trim_start_matches('/');
                let path = package_dir.join(relative);
                claim_path(&mut written, &path, key)?;
                write_source(&path, &file.content)?;
                staged.push(StagedFile {
                    key: key.to_string(),
                    path,
                    kind: SourceKind::Library(package.clone()),
                });
            }
        }

        for package in scan_preseeded_packages(&dependency_root)? {
            if !libraries.contains(&package) {
                debug!("Found pre-seeded package {}", package);
                libraries.push(package);
            }
        }

        // Restore source map order; the analyzer walks files in this order.
        let order: Vec<&str> = sources.keys().collect();
        staged.sort_by_key(|f| order.iter().position(|k| *k == f.key));

        info!("Libraries detected: {}", libraries.join(", "));
        info!(
            "Staged {} file(s) under {}",
            staged.len(),
            staging_root.display()
        );

        Ok(StagedProject {
            staging_root,
            dependency_root,
            dependency_root_preexisted,
            files: staged,
            libraries,
        })
    }

    fn reset_staging_root(&self) -> PipelineResult<PathBuf> {
        let root = &self.layout.staging_root;
        match std::fs::remove_dir_all(root) {
            Ok(()) => debug!("Removed previous staging tree {}", root.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        std::fs::create_dir_all(root)?;
        Ok(std::fs::canonicalize(root)?)
    }
}

fn write_source(path: &Path, content: &str) -> PipelineResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, content)?;
    Ok(())
}

/// Rejects keys that would escape the staging tree or stage no file.
fn ensure_stageable(key: &str) -> PipelineResult<()> {
    let path = Path::new(key);
    let escapes = path
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    let depth = path
        .components()
        .filter(|c| matches!(c, Component::Normal(_)))
        .count();
    // A library key needs a file below its package directory.
    let min_depth = match classify_key(key) {
        SourceKind::FirstParty => 1,
        SourceKind::Library(_) => 2,
    };
    if escapes || depth < min_depth {
        return Err(PipelineError::UnsafePath(path.to_path_buf()));
    }
    Ok(())
}

/// Records `key` as the owner of `path`, failing if another key got there first.
fn claim_path(
    written: &mut HashMap<PathBuf, String>,
    path: &Path,
    key: &str,
) -> PipelineResult<()> {
    if let Some(owner) = written.get(path) {
        return Err(PipelineError::MalformedSourceMap(format!(
            "keys {} and {} both stage to {}",
            owner,
            key,
            path.display()
        )));
    }
    written.insert(path.to_path_buf(), key.to_string());
    Ok(())
}

fn scan_preseeded_packages(dependency_root: &Path) -> PipelineResult<Vec<String>> {
    let mut packages = Vec::new();
    for entry in std::fs::read_dir(dependency_root)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with(NAMESPACE_MARKER) {
            packages.push(name);
        }
    }
    packages.sort();
    Ok(packages)
}
