pub mod args;
pub mod commands;

pub use args::{CheckArgs, ReportFormat, RunArgs, ScriptArgs};
use clap::{Parser, Subcommand};
use std::path::Path;

const HELP_TEMPLATE: &str = "\
{name} {version}\n\
{about-with-newline}\n\
USAGE:\n    {usage}\n\
\nOPTIONS:\n{options}\n\
COMMANDS:\n{subcommands}\n";

#[derive(Parser)]
#[command(name = "s2s")]
#[command(version = crate::VERSION)]
#[command(about = "Scripted source-to-source migration driver over a compilation database")]
#[command(help_template = HELP_TEMPLATE)]
#[command(
    after_long_help = "Typical flow: check the policy script, run it over compile_commands.json, then review the report."
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    #[command(
        about = "Drive every database entry through the pipeline",
        long_about = "Run copies each source file, applies the optional S2S rewrite and the editor, runs the test stages, and overwrites the original when the diff and policy allow it.",
        after_help = "Example:\n    s2s run --script migrate.rhai --db build/"
    )]
    Run(RunArgs),
    #[command(
        about = "Load the scripts and list the policy functions they define",
        long_about = "Check compiles the filter and policy scripts, optionally loads the compilation database, and reports which policy functions are defined.",
        after_help = "Example:\n    s2s check --script migrate.rhai --db build/"
    )]
    Check(CheckArgs),
}

impl Command {
    pub fn config_path(&self) -> Option<&Path> {
        match self {
            Command::Run(args) => args.config.as_deref(),
            Command::Check(args) => args.config.as_deref(),
        }
    }

    pub fn verbose(&self) -> bool {
        match self {
            Command::Run(args) => args.verbose,
            Command::Check(args) => args.verbose,
        }
    }
}

pub async fn run(args: Args) -> crate::Result<()> {
    match args.command {
        Command::Run(run_args) => commands::run(run_args).await,
        Command::Check(check_args) => commands::check(check_args).await,
    }
}
