use crate::core::report::OutputFormat;
use clap::Args;
use std::path::PathBuf;

#[derive(Args, Clone, Debug)]
pub struct ScriptArgs {
    /// Policy script answering what to run at each stage and whether it worked
    #[arg(long, value_name = "FILE")]
    pub script: PathBuf,

    /// Filter script loaded before the policy script (usually defines FilterDBEntry)
    #[arg(long, value_name = "FILE")]
    pub filter: Option<PathBuf>,
}

#[derive(Args, Clone, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub scripts: ScriptArgs,

    /// Directory holding compile_commands.json, or the file itself
    #[arg(long, value_name = "PATH", default_value = ".")]
    pub db: PathBuf,

    /// Path to config file (default: ./s2s.toml when present)
    #[arg(long, value_name = "FILE", help_heading = "Configuration")]
    pub config: Option<PathBuf>,

    /// Directory for working copies and stage outputs (default: system temp dir)
    #[arg(long, value_name = "DIR", help_heading = "Configuration")]
    pub temp_dir: Option<PathBuf>,

    /// Leave every temporary file in place for inspection
    #[arg(long, help_heading = "Configuration")]
    pub keep_temps: bool,

    /// Record a file as failed instead of aborting when a stage command cannot start
    #[arg(long, help_heading = "Configuration")]
    pub contain_spawn_failures: bool,

    /// Enable debug logging
    #[arg(long, short = 'v', help_heading = "Output Options")]
    pub verbose: bool,

    /// Do not mirror child process output to the console
    #[arg(long, help_heading = "Output Options")]
    pub quiet_children: bool,

    /// Report format printed when the run completes
    #[arg(long, value_enum, default_value_t = ReportFormat::Text, help_heading = "Output Options")]
    pub format: ReportFormat,
}

#[derive(Args, Clone, Debug)]
pub struct CheckArgs {
    #[command(flatten)]
    pub scripts: ScriptArgs,

    /// Also load this compilation database and report its entry count
    #[arg(long, value_name = "PATH")]
    pub db: Option<PathBuf>,

    /// Path to config file (default: ./s2s.toml when present)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, short = 'v')]
    pub verbose: bool,
}

#[derive(Clone, Copy, clap::ValueEnum, Debug, PartialEq, Eq)]
pub enum ReportFormat {
    /// Failures, successes and the success rate as plain lines
    Text,
    /// JSON payload suitable for downstream tooling
    Json,
}

impl From<ReportFormat> for OutputFormat {
    fn from(format: ReportFormat) -> Self {
        match format {
            ReportFormat::Text => OutputFormat::Text,
            ReportFormat::Json => OutputFormat::Json,
        }
    }
}
