pub mod loader;
pub mod validation;

pub use loader::ConfigLoader;
pub use validation::ConfigValidator;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Driver configuration loaded from s2s.toml
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct DriverConfig {
    /// Child process handling
    #[serde(default)]
    pub runner: RunnerConfig,

    /// Ephemeral file handling
    #[serde(default)]
    pub temp: TempConfig,

    /// Per-file pipeline behavior
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Logging sinks
    #[serde(default)]
    pub logging: LoggingSection,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunnerConfig {
    /// Mirror child stdout/stderr onto our own streams
    #[serde(default = "default_true")]
    pub echo_child_output: bool,

    /// Size of each chunk fed to a child's stdin
    #[serde(default = "default_stdin_chunk_bytes")]
    pub stdin_chunk_bytes: usize,

    #[serde(default = "default_idle_backoff_step_ms")]
    pub idle_backoff_step_ms: u64,

    #[serde(default = "default_idle_backoff_cap_ms")]
    pub idle_backoff_cap_ms: u64,

    /// How long to keep draining after the child exited while its pipes stay open
    #[serde(default = "default_exit_drain_grace_ms")]
    pub exit_drain_grace_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TempConfig {
    /// Directory for ephemeral files (default: system temp dir)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,

    /// Keep every ephemeral file instead of removing it
    #[serde(default)]
    pub keep: bool,

    #[serde(default = "default_remove_attempts")]
    pub remove_attempts: u32,

    #[serde(default = "default_remove_delay_ms")]
    pub remove_delay_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct PipelineConfig {
    #[serde(default)]
    pub spawn_failure: SpawnFailurePolicy,
}

/// What a failure to start a child process does to the run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum SpawnFailurePolicy {
    /// Abort the whole run.
    #[default]
    Abort,
    /// Record the current file as failed and continue with the next entry.
    FailFile,
}

impl std::str::FromStr for SpawnFailurePolicy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "abort" => Ok(SpawnFailurePolicy::Abort),
            "fail-file" | "fail_file" => Ok(SpawnFailurePolicy::FailFile),
            other => Err(format!(
                "invalid spawn_failure '{}'; supported values are abort, fail-file",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct LoggingSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_level: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub console_output: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,
}

fn default_true() -> bool {
    true
}

fn default_stdin_chunk_bytes() -> usize {
    4096
}

fn default_idle_backoff_step_ms() -> u64 {
    1
}

fn default_idle_backoff_cap_ms() -> u64 {
    20
}

fn default_exit_drain_grace_ms() -> u64 {
    100
}

fn default_remove_attempts() -> u32 {
    60
}

fn default_remove_delay_ms() -> u64 {
    500
}

impl Default for RunnerConfig {
    fn default() -> Self {
        RunnerConfig {
            echo_child_output: true,
            stdin_chunk_bytes: default_stdin_chunk_bytes(),
            idle_backoff_step_ms: default_idle_backoff_step_ms(),
            idle_backoff_cap_ms: default_idle_backoff_cap_ms(),
            exit_drain_grace_ms: default_exit_drain_grace_ms(),
        }
    }
}

impl Default for TempConfig {
    fn default() -> Self {
        TempConfig {
            dir: None,
            keep: false,
            remove_attempts: default_remove_attempts(),
            remove_delay_ms: default_remove_delay_ms(),
        }
    }
}

impl RunnerConfig {
    pub fn idle_backoff_step(&self) -> Duration {
        Duration::from_millis(self.idle_backoff_step_ms)
    }

    pub fn idle_backoff_cap(&self) -> Duration {
        Duration::from_millis(self.idle_backoff_cap_ms)
    }

    pub fn exit_drain_grace(&self) -> Duration {
        Duration::from_millis(self.exit_drain_grace_ms)
    }
}

impl TempConfig {
    pub fn remove_delay(&self) -> Duration {
        Duration::from_millis(self.remove_delay_ms)
    }

    pub fn resolved_dir(&self) -> PathBuf {
        self.dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}
