use serde::{Deserialize, Serialize};

/// Error category enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCategory {
    ValidationError,
    ConfigError,
    DatabaseError,
    PolicyError,
    ProcessError,
    TempFileError,
    SerializationError,
    IoError,
    InternalError,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Error severity enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorSeverity {
    /// Aborts the whole run.
    Fatal,
    /// Contained to the current file or stage.
    Error,
    Warning,
}

/// Stage of the per-file state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PipelineStage {
    Start,
    CopyMade,
    S2SDone,
    EditorDone,
    TestStage,
    Diffed,
    Overwritten,
    Recorded,
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            PipelineStage::Start => "start",
            PipelineStage::CopyMade => "copy-made",
            PipelineStage::S2SDone => "s2s-done",
            PipelineStage::EditorDone => "editor-done",
            PipelineStage::TestStage => "test-stage",
            PipelineStage::Diffed => "diffed",
            PipelineStage::Overwritten => "overwritten",
            PipelineStage::Recorded => "recorded",
        };
        f.write_str(name)
    }
}
