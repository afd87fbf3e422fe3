//! # Remap Resolution
//!
//! @title Import Remapping Synthesis
//! @author Ramprasad
//!
//! Builds the `--solc-remaps` argument: one entry per library package
//! pointing at its staged directory, followed by any explicit remappings
//! from the compiler settings that do not collide with a staged package.

use super::StagedProject;
use std::fmt;
use std::path::Path;

/// Separator between remaps in the analyzer argument.
pub const REMAP_SEPARATOR: &str = " ";

/// A single `[context:]name=target` remapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Remapping {
    /// Optional compilation-unit context prefix.
    pub context: Option<String>,

    /// Import prefix being remapped.
    pub name: String,

    /// Replacement path.
    pub target: String,
}

impl Remapping {
    /// Parses `name=target` or `context:name=target`.
    ///
    /// Returns `None` when there is no `=` or the name is empty.
    pub fn parse(raw: &str) -> Option<Self> {
        let (lhs, target) = raw.trim().split_once('=')?;
        let (context, name) = match lhs.split_once(':') {
            Some((ctx, name)) => (Some(ctx.to_string()), name),
            None => (None, lhs),
        };
        if name.is_empty() {
            return None;
        }
        Some(Self {
            context,
            name: name.to_string(),
            target: target.to_string(),
        })
    }

    /// Name used for collision checks; `@oz/` and `@oz` are the same package.
    fn key(&self) -> &str {
        self.name.trim_end_matches('/')
    }
}

impl fmt::Display for Remapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.context {
            Some(ctx) => write!(f, "{}:{}={}", ctx, self.name, self.target),
            None => write!(f, "{}={}", self.name, self.target),
        }
    }
}

/// Ordered remap entries, unique by package name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemapTable {
    entries: Vec<Remapping>,
}

impl RemapTable {
    pub fn entries(&self) -> &[Remapping] {
        &self.entries
    }

    /// Looks up the remapping for a package name.
    pub fn get(&self, name: &str) -> Option<&Remapping> {
        let wanted = name.trim_end_matches('/');
        self.entries.iter().find(|r| r.key() == wanted)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Serializes the table in the form the analyzer consumes.
    pub fn to_argument(&self) -> String {
        self.entries
            .iter()
            .map(|r| r.to_string())
            .collect::<Vec<_>>()
            .join(REMAP_SEPARATOR)
    }

    fn push_unique(&mut self, remapping: Remapping) -> bool {
        if self.get(remapping.key()).is_some() {
            return false;
        }
        self.entries.push(remapping);
        true
    }
}

/// Builds remap tables for staged projects.
pub struct RemapResolver;

impl RemapResolver {
    /// Resolves the remap table for `project`.
    ///
    /// # Arguments
    ///
    /// * `project` - The staged project (library set and roots)
    /// * `explicit` - Raw `settings.remappings` strings from the source map
    pub fn resolve(project: &StagedProject, explicit: &[String]) -> RemapTable {
        let mut table = RemapTable::default();

        for package in &project.libraries {
            let target = project.dependency_root.join(package);
            table.push_unique(Remapping {
                context: None,
                name: package.clone(),
                target: target.display().to_string(),
            });
        }

        for raw in explicit {
            let Some(mut remapping) = Remapping::parse(raw) else {
                log::warn!("Ignoring malformed remapping {:?}", raw);
                continue;
            };
            remapping.target = rebase_target(&project.staging_root, &remapping.target);
            if !table.push_unique(remapping) {
                log::debug!("Staged package overrides declared remapping {:?}", raw);
            }
        }

        log::debug!("Remaps: {}", table.to_argument());
        table
    }
}

/// Points a declared relative target inside the staging tree.
fn rebase_target(staging_root: &Path, target: &str) -> String {
    if Path::new(target).is_absolute() {
        return target.to_string();
    }
    let relative = target.trim_start_matches("./");
    format!(
        "{}/{}",
        staging_root.display().to_string().trim_end_matches('/'),
        relative
    )
}
