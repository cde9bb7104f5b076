//! Decision boundary consulted by the pipeline before and after every stage.

pub mod rhai_policy;

pub use rhai_policy::RhaiPolicy;

use std::path::Path;

/// Declared S2S extension meaning "capture stdout instead of writing a file".
pub const STREAM_STDOUT: &str = "stdout";
/// Declared S2S extension meaning "capture stderr instead of writing a file".
pub const STREAM_STDERR: &str = "stderr";
/// Declared editor extension meaning "feed the S2S result on stdin".
pub const EDITOR_STDIN: &str = "stdin";

/// Names of every function a policy script may define.
pub const POLICY_FUNCTIONS: &[&str] = &[
    "FilterDBEntry",
    "GetS2SExtension",
    "GetS2SCommandLine",
    "IsS2SOk",
    "GetEditorExtension",
    "GetEditorCommandLine",
    "IsEditorOk",
    "GetTestConfigurations",
    "GetTestStages",
    "GetTestExtension",
    "GetTestCommandLine",
    "IsTestOk",
    "GetDiffCommandLine",
    "IsDiffOk",
    "IsOverWriteOk",
];

/// Pure queries answering what to run and whether it worked.
///
/// Paths that do not apply to a call (the S2S output in stream mode, the
/// editor input in stdin mode) are passed as `None`.
pub trait PolicyProvider: Send + Sync {
    /// `true` keeps the entry.
    fn filter_db_entry(&self, argv: &[String], file: &str, directory: &str, exe: &str) -> bool;

    /// Declared S2S output extension; `None` means there is no S2S stage.
    fn s2s_extension(&self) -> Option<String>;

    fn s2s_command_line(
        &self,
        args: &[String],
        input: &Path,
        output: Option<&Path>,
        exe: &str,
    ) -> Option<Vec<String>>;

    fn is_s2s_ok(&self, exit_code: i32) -> bool;

    fn editor_extension(&self) -> Option<String>;

    fn editor_command_line(
        &self,
        args: &[String],
        input: Option<&Path>,
        output: &Path,
        exe: &str,
    ) -> Option<Vec<String>>;

    fn is_editor_ok(&self, exit_code: i32) -> bool;

    fn test_configurations(&self, exe: &str, extension: &str) -> Vec<String>;

    fn test_stages(&self, configuration: &str) -> Vec<String>;

    fn test_extension(&self, stage: &str) -> Option<String>;

    fn test_command_line(
        &self,
        args: &[String],
        configuration: &str,
        stage: &str,
        input: &Path,
        output: &Path,
    ) -> Option<Vec<String>>;

    fn is_test_ok(&self, exit_code: i32, stage: &str) -> bool;

    fn diff_command_line(&self, original: &Path, edited: &Path) -> Option<Vec<String>>;

    fn is_diff_ok(&self, exit_code: i32) -> bool;

    fn is_overwrite_ok(&self) -> bool;
}

/// Where the S2S stage puts its result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum S2SOutput {
    /// Captured stdout is the result.
    Stdout,
    /// Captured stderr is the result.
    Stderr,
    /// A temp file with this extension is the result.
    File(String),
}

impl S2SOutput {
    pub fn from_extension(extension: &str) -> Self {
        match extension {
            STREAM_STDOUT => S2SOutput::Stdout,
            STREAM_STDERR => S2SOutput::Stderr,
            other => S2SOutput::File(other.to_string()),
        }
    }
}

/// How the editor receives the S2S result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorInput {
    Stdin,
    Argument,
}

impl EditorInput {
    pub fn from_extension(extension: Option<&str>) -> Self {
        match extension {
            Some(EDITOR_STDIN) => EditorInput::Stdin,
            _ => EditorInput::Argument,
        }
    }
}
