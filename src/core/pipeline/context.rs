use crate::core::types::PipelineStage;
use std::path::{Path, PathBuf};

/// State carried through one file's pass of the pipeline.
#[derive(Debug, Clone)]
pub struct PipelineContext {
    pub original: PathBuf,
    /// Source extension with its leading dot, or empty.
    pub extension: String,
    pub working_copy: PathBuf,
    /// File the next test stage reads.
    pub input: PathBuf,
    pub base_args: Vec<String>,
    pub exe: String,
    pub editor_ok: bool,
    pub test_ok: bool,
    pub overwritten: bool,
    pub stage: PipelineStage,
    ephemeral: Vec<PathBuf>,
}

impl PipelineContext {
    pub fn new(
        original: PathBuf,
        extension: String,
        working_copy: PathBuf,
        base_args: Vec<String>,
        exe: String,
    ) -> Self {
        PipelineContext {
            original,
            extension,
            input: working_copy.clone(),
            ephemeral: vec![working_copy.clone()],
            working_copy,
            base_args,
            exe,
            editor_ok: false,
            test_ok: false,
            overwritten: false,
            stage: PipelineStage::CopyMade,
        }
    }

    pub fn advance(&mut self, stage: PipelineStage) {
        tracing::debug!(
            file = %self.original.display(),
            from = %self.stage,
            to = %stage,
            "pipeline transition"
        );
        self.stage = stage;
    }

    /// Register an ephemeral file owned by this pass.
    pub fn track(&mut self, path: PathBuf) -> PathBuf {
        if !self.ephemeral.contains(&path) {
            self.ephemeral.push(path.clone());
        }
        path
    }

    pub fn untrack(&mut self, path: &Path) {
        self.ephemeral.retain(|p| p != path);
    }

    pub fn take_ephemeral(&mut self) -> Vec<PathBuf> {
        std::mem::take(&mut self.ephemeral)
    }

    pub fn reset_input(&mut self) {
        self.input = self.working_copy.clone();
    }
}
