//! Child process execution with redirected, mirrored stdio.

pub mod backoff;
pub mod runner;

pub use backoff::IdleBackoff;
pub use runner::TokioCommandRunner;

use crate::core::error::AppError;
use async_trait::async_trait;
use std::path::PathBuf;

/// Error code attached when a child could not be started at all.
pub const SPAWN_FAILURE_CODE: &str = "PROC-SPAWN";

/// One external command and where its standard streams go.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessInvocation {
    pub argv: Vec<String>,
    /// File fed to the child's stdin; `None` gives the child no input.
    pub stdin: Option<PathBuf>,
    /// File capturing stdout; output is still mirrored to our stdout.
    pub stdout: Option<PathBuf>,
    /// File capturing stderr; output is still mirrored to our stderr.
    pub stderr: Option<PathBuf>,
}

impl ProcessInvocation {
    pub fn new(argv: Vec<String>) -> Self {
        Self {
            argv,
            ..Default::default()
        }
    }

    pub fn with_stdin(mut self, path: impl Into<PathBuf>) -> Self {
        self.stdin = Some(path.into());
        self
    }

    pub fn with_stdout(mut self, path: impl Into<PathBuf>) -> Self {
        self.stdout = Some(path.into());
        self
    }

    pub fn with_stderr(mut self, path: impl Into<PathBuf>) -> Self {
        self.stderr = Some(path.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessResult {
    pub exit_code: i32,
}

#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run the invocation to completion and return the child's exit status.
    ///
    /// Returns an error carrying [`SPAWN_FAILURE_CODE`] when the child could not be started.
    async fn run(&self, invocation: &ProcessInvocation) -> Result<ProcessResult, AppError>;
}

pub fn is_spawn_failure(error: &AppError) -> bool {
    error.code == SPAWN_FAILURE_CODE
}
