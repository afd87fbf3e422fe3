//! # Toolchain Module
//!
//! @title Compiler Version Selection
//! @author Ramprasad
//!
//! Picks the compiler version a contract needs and makes it the active one
//! through the toolchain manager (`solc-select` by default).
//!
//! ## Global State
//!
//! The toolchain manager keeps a single system-wide active version. Inside
//! this process that state is guarded by [`ToolchainLease`]: a run acquires
//! the lease before selecting a version and holds it until its last analyzer
//! invocation has finished. Activation needs `&mut ToolchainLease`, so a
//! version can never be switched underneath a running analysis. Separate
//! processes sharing one toolchain manager must still be serialized by the
//! caller.

mod version;

pub use version::*;

use crate::error::{PipelineError, PipelineResult};
use crate::parser::SourceMap;
use crate::runner::{CommandRunner, CommandSpec};
use log::info;
use parking_lot::{Mutex, MutexGuard};

static ACTIVE_TOOLCHAIN: Mutex<Option<String>> = parking_lot::const_mutex(None);

/// Exclusive hold on the process-wide active compiler version.
///
/// Not reentrant: acquiring a second lease on the same thread while one is
/// alive deadlocks.
pub struct ToolchainLease {
    active: MutexGuard<'static, Option<String>>,
}

impl ToolchainLease {
    /// Blocks until no other run holds the toolchain.
    pub fn acquire() -> Self {
        Self {
            active: ACTIVE_TOOLCHAIN.lock(),
        }
    }

    /// Version last activated by this process, if any.
    pub fn active_version(&self) -> Option<&str> {
        self.active.as_deref()
    }
}

/// Resolves, installs and activates compiler versions.
pub struct ToolchainSelector<'a> {
    runner: &'a dyn CommandRunner,
    manager: String,
}

impl<'a> ToolchainSelector<'a> {
    /// Creates a selector driving the `manager` binary through `runner`.
    pub fn new(runner: &'a dyn CommandRunner, manager: impl Into<String>) -> Self {
        Self {
            runner,
            manager: manager.into(),
        }
    }

    /// Resolves the version for `sources` and makes it active.
    ///
    /// # Errors
    ///
    /// - [`PipelineError::VersionUnresolvable`] when no version can be found
    /// - [`PipelineError::ToolchainSwitchFailure`] when install or use fails
    pub fn select(
        &self,
        lease: &mut ToolchainLease,
        sources: &SourceMap,
        fallback_version: &str,
    ) -> PipelineResult<String> {
        let version = resolve_version(sources, fallback_version)?;
        info!("solc version: {}", version);
        self.activate(lease, &version)?;
        Ok(version)
    }

    /// Whether the manager lists `version` as installed.
    ///
    /// A failing listing counts as "not installed".
    pub fn is_installed(&self, version: &str) -> bool {
        let spec = CommandSpec::new(&self.manager).arg("versions");
        match self.runner.run(&spec) {
            Ok(output) if output.success => output
                .stdout
                .lines()
                .filter_map(|line| line.split_whitespace().next())
                .any(|installed| installed == version),
            Ok(output) => {
                log::debug!("{} versions failed: {}", self.manager, output.stderr.trim());
                false
            }
            Err(e) => {
                log::debug!("{} versions could not run: {}", self.manager, e);
                false
            }
        }
    }

    /// Installs `version` if needed, then switches to it.
    pub fn activate(&self, lease: &mut ToolchainLease, version: &str) -> PipelineResult<()> {
        if !self.is_installed(version) {
            info!("Installing solc {}", version);
            self.manager_command(version, "install")?;
        }
        self.manager_command(version, "use")?;

        *lease.active = Some(version.to_string());
        info!("Switched to solc version {}", version);
        Ok(())
    }

    fn manager_command(&self, version: &str, subcommand: &str) -> PipelineResult<()> {
        let spec = CommandSpec::new(&self.manager).arg(subcommand).arg(version);
        let failure = |message: String| PipelineError::ToolchainSwitchFailure {
            version: version.to_string(),
            message,
        };

        let output = self
            .runner
            .run(&spec)
            .map_err(|e| failure(format!("{}: {}", spec, e)))?;

        if !output.success {
            let detail = if output.stderr.trim().is_empty() {
                output.stdout.trim().to_string()
            } else {
                output.stderr.trim().to_string()
            };
            return Err(failure(format!("{} exited with {:?}: {}", spec, output.code, detail)));
        }
        Ok(())
    }
}
