pub mod compile_db;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod policy;
pub mod process;
pub mod report;
pub mod retry;
pub mod temp_files;
pub mod types;

pub use compile_db::{CompilationDatabase, CompileEntry};
pub use config::{ConfigLoader, ConfigValidator, DriverConfig, SpawnFailurePolicy};
pub use error::AppError;
pub use pipeline::{FileOutcome, PipelineContext, PipelineOrchestrator, SkipReason};
pub use policy::{PolicyProvider, RhaiPolicy};
pub use process::{CommandRunner, ProcessInvocation, ProcessResult, TokioCommandRunner};
pub use report::{OutputFormat, PipelineReport};
pub use temp_files::{Removal, TempFileManager};
pub use types::*;
