//! # External Process Module
//!
//! @title Subprocess Execution
//! @author Ramprasad
//!
//! Every external tool (the toolchain manager and the static analyzer) is
//! launched through the [`CommandRunner`] trait so the orchestration logic
//! can be exercised without the tools installed.
//!
//! ## Submodules
//!
//! - [`analyzer`] - Per-file static analyzer invocation with failure isolation

mod analyzer;

pub use analyzer::*;

use std::fmt;
use std::path::PathBuf;
use std::process::Command;

/// A fully described subprocess invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    /// Program name or path.
    pub program: String,

    /// Arguments, passed verbatim (no shell).
    pub args: Vec<String>,

    /// Working directory; inherits the current one when `None`.
    pub current_dir: Option<PathBuf>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            current_dir: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            if arg.contains(' ') {
                write!(f, " \"{}\"", arg)?;
            } else {
                write!(f, " {}", arg)?;
            }
        }
        Ok(())
    }
}

/// Captured result of a finished subprocess.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Whether the process exited with status zero.
    pub success: bool,

    /// Exit code, if the process was not killed by a signal.
    pub code: Option<i32>,

    pub stdout: String,

    pub stderr: String,
}

impl CommandOutput {
    /// Successful output with the given stdout.
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            success: true,
            code: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// Failed output with the given exit code and stderr.
    pub fn failed(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            success: false,
            code: Some(code),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }
}

/// Launches subprocesses and waits for them.
///
/// An `Err` means the process could not be run at all (missing binary,
/// permission denied). A process that ran and exited non-zero is an `Ok`
/// with `success == false`.
pub trait CommandRunner: Send + Sync {
    fn run(&self, command: &CommandSpec) -> std::io::Result<CommandOutput>;
}

/// [`CommandRunner`] backed by `std::process::Command`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemCommandRunner;

impl CommandRunner for SystemCommandRunner {
    fn run(&self, command: &CommandSpec) -> std::io::Result<CommandOutput> {
        log::debug!("Running command: {}", command);

        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args);
        if let Some(dir) = &command.current_dir {
            cmd.current_dir(dir);
        }

        let output = cmd.output()?;
        Ok(CommandOutput {
            success: output.status.success(),
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_display_quotes_spaces() {
        let spec = CommandSpec::new("slither")
            .arg("/stage/A.sol")
            .arg("--solc-args=--allow-paths .,/stage");
        assert_eq!(
            spec.to_string(),
            "slither /stage/A.sol \"--solc-args=--allow-paths .,/stage\""
        );
    }

    #[test]
    fn test_missing_binary_is_an_error() {
        let spec = CommandSpec::new("contract-sentinel-definitely-not-installed");
        assert!(SystemCommandRunner.run(&spec).is_err());
    }
}
