//! Per-file state machine driving every compilation database entry through
//! rewrite, edit, test and the gated overwrite.

pub mod arguments;
pub mod context;

pub use arguments::scrub_arguments;
pub use context::PipelineContext;

use crate::core::compile_db::CompileEntry;
use crate::core::config::SpawnFailurePolicy;
use crate::core::error::AppError;
use crate::core::policy::{EditorInput, PolicyProvider, S2SOutput};
use crate::core::process::{is_spawn_failure, CommandRunner, ProcessInvocation};
use crate::core::report::PipelineReport;
use crate::core::temp_files::{Removal, TempFileManager};
use crate::core::types::PipelineStage;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Why an entry never entered the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Filtered,
    MissingSource,
    CopyFailed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOutcome {
    Skipped(SkipReason),
    Processed {
        path: PathBuf,
        test_ok: bool,
        overwritten: bool,
    },
}

pub struct PipelineOrchestrator {
    policy: Arc<dyn PolicyProvider>,
    runner: Arc<dyn CommandRunner>,
    temps: TempFileManager,
    spawn_failure: SpawnFailurePolicy,
}

impl PipelineOrchestrator {
    pub fn new(
        policy: Arc<dyn PolicyProvider>,
        runner: Arc<dyn CommandRunner>,
        temps: TempFileManager,
    ) -> Self {
        PipelineOrchestrator {
            policy,
            runner,
            temps,
            spawn_failure: SpawnFailurePolicy::default(),
        }
    }

    pub fn with_spawn_failure_policy(mut self, policy: SpawnFailurePolicy) -> Self {
        self.spawn_failure = policy;
        self
    }

    /// Process every entry in order, one at a time.
    ///
    /// Only a spawn failure under [`SpawnFailurePolicy::Abort`] ends the run early.
    pub async fn run(&self, entries: &[CompileEntry]) -> Result<PipelineReport, AppError> {
        tracing::info!(entries = entries.len(), temp_dir = %self.temps.dir().display(), "starting run");
        let mut report = PipelineReport::new();

        for entry in entries {
            match self.process_entry(entry).await? {
                FileOutcome::Skipped(reason) => {
                    tracing::debug!(file = %entry.file.display(), ?reason, "entry skipped");
                    report.record_skip();
                }
                FileOutcome::Processed {
                    path,
                    test_ok,
                    overwritten,
                } => {
                    if overwritten {
                        report.record_overwrite();
                    }
                    report.record(&path, test_ok);
                }
            }
        }

        report.finish();
        tracing::info!(
            successes = report.successes.len(),
            failures = report.failures.len(),
            skipped = report.skipped,
            overwritten = report.overwritten,
            "run finished"
        );
        Ok(report)
    }

    pub async fn process_entry(&self, entry: &CompileEntry) -> Result<FileOutcome, AppError> {
        let exe = entry.executable().to_string();
        let file = entry.file.display().to_string();
        let directory = entry.directory.display().to_string();
        if !self
            .policy
            .filter_db_entry(&entry.command_line, &file, &directory, &exe)
        {
            return Ok(FileOutcome::Skipped(SkipReason::Filtered));
        }

        let original = entry.absolute_file();
        if !original.is_file() {
            tracing::warn!(file = %original.display(), "Could not find file");
            return Ok(FileOutcome::Skipped(SkipReason::MissingSource));
        }
        tracing::info!(file = %original.display(), "Current file");

        let extension = original
            .extension()
            .map(|ext| format!(".{}", ext.to_string_lossy()))
            .unwrap_or_default();
        let source_dir = original.parent().unwrap_or_else(|| Path::new("/"));
        let base_args =
            scrub_arguments(&entry.command_line, &entry.file, &entry.directory, source_dir);

        let working_copy = match self.temps.copy(&original, &extension).await {
            Ok(path) => path,
            Err(err) => {
                tracing::warn!(file = %original.display(), error = %err, "could not make working copy");
                return Ok(FileOutcome::Skipped(SkipReason::CopyFailed));
            }
        };

        let mut ctx = PipelineContext::new(original, extension, working_copy, base_args, exe);
        let driven = self.drive(&mut ctx).await;
        self.cleanup(&mut ctx).await;

        match driven {
            Ok(()) => {}
            Err(err) if is_spawn_failure(&err) && self.spawn_failure == SpawnFailurePolicy::FailFile => {
                tracing::error!(file = %ctx.original.display(), error = %err, "stage could not start; recording failure");
                ctx.test_ok = false;
                ctx.overwritten = false;
            }
            Err(err) => return Err(err.with_context("file", ctx.original.display().to_string())),
        }

        ctx.advance(PipelineStage::Recorded);
        Ok(FileOutcome::Processed {
            path: ctx.original,
            test_ok: ctx.test_ok,
            overwritten: ctx.overwritten,
        })
    }

    async fn drive(&self, ctx: &mut PipelineContext) -> Result<(), AppError> {
        ctx.editor_ok = self.edit(ctx).await?;
        if ctx.editor_ok {
            ctx.advance(PipelineStage::EditorDone);
            ctx.test_ok = self.test(ctx).await?;
        }
        if ctx.test_ok {
            ctx.overwritten = self.commit(ctx).await?;
        } else {
            tracing::error!(file = %ctx.original.display(), "FAILED");
        }
        Ok(())
    }

    /// Optional S2S stage followed by the editor. Returns `editorOk`.
    async fn edit(&self, ctx: &mut PipelineContext) -> Result<bool, AppError> {
        let Some(declared) = self.policy.s2s_extension() else {
            tracing::debug!("no S2S stage configured; editing the working copy directly");
            return self.run_editor(ctx, None).await;
        };

        let output = S2SOutput::from_extension(&declared);
        let (invocation, result) = match &output {
            S2SOutput::Stdout | S2SOutput::Stderr => {
                let stdout = ctx.track(self.temps.new_name(".stdout"));
                let stderr = ctx.track(self.temps.new_name(".stderr"));
                let Some(argv) =
                    self.policy
                        .s2s_command_line(&ctx.base_args, &ctx.working_copy, None, &ctx.exe)
                else {
                    tracing::warn!(file = %ctx.original.display(), "policy gave no S2S command line");
                    return Ok(false);
                };
                let result = if output == S2SOutput::Stdout {
                    stdout.clone()
                } else {
                    stderr.clone()
                };
                let invocation = ProcessInvocation::new(argv)
                    .with_stdout(stdout)
                    .with_stderr(stderr);
                (invocation, result)
            }
            S2SOutput::File(extension) => {
                let result = ctx.track(self.temps.new_name(extension));
                let Some(argv) = self.policy.s2s_command_line(
                    &ctx.base_args,
                    &ctx.working_copy,
                    Some(result.as_path()),
                    &ctx.exe,
                ) else {
                    tracing::warn!(file = %ctx.original.display(), "policy gave no S2S command line");
                    return Ok(false);
                };
                (ProcessInvocation::new(argv), result)
            }
        };

        let code = self.run_stage("s2s", &invocation).await?;
        if !code.is_some_and(|code| self.policy.is_s2s_ok(code)) {
            tracing::info!(file = %ctx.original.display(), ?code, "S2S stage rejected");
            return Ok(false);
        }
        ctx.advance(PipelineStage::S2SDone);

        let edited = self.run_editor(ctx, Some(result.as_path())).await;
        for capture in [invocation.stdout.as_ref(), invocation.stderr.as_ref(), Some(&result)]
            .into_iter()
            .flatten()
        {
            self.discard(ctx, capture).await;
        }
        edited
    }

    /// Run the editor against `s2s_result`, or against the working copy when
    /// there was no S2S stage. The editor always writes the working copy.
    async fn run_editor(
        &self,
        ctx: &mut PipelineContext,
        s2s_result: Option<&Path>,
    ) -> Result<bool, AppError> {
        let declared = self.policy.editor_extension();
        let mode = EditorInput::from_extension(declared.as_deref());

        let (argv, stdin) = match (mode, s2s_result) {
            (EditorInput::Stdin, Some(result)) => (
                self.policy
                    .editor_command_line(&ctx.base_args, None, &ctx.working_copy, &ctx.exe),
                Some(result.to_path_buf()),
            ),
            (EditorInput::Stdin, None) => {
                // The editor rewrites the working copy, so it reads a snapshot.
                let snapshot = match self.temps.copy(&ctx.working_copy, &ctx.extension).await {
                    Ok(path) => ctx.track(path),
                    Err(err) => {
                        tracing::warn!(file = %ctx.original.display(), error = %err, "could not snapshot working copy for editor");
                        return Ok(false);
                    }
                };
                (
                    self.policy
                        .editor_command_line(&ctx.base_args, None, &ctx.working_copy, &ctx.exe),
                    Some(snapshot),
                )
            }
            (EditorInput::Argument, input) => {
                let input = input.unwrap_or(ctx.working_copy.as_path());
                (
                    self.policy.editor_command_line(
                        &ctx.base_args,
                        Some(input),
                        &ctx.working_copy,
                        &ctx.exe,
                    ),
                    None,
                )
            }
        };

        let Some(argv) = argv else {
            tracing::warn!(file = %ctx.original.display(), "policy gave no editor command line");
            return Ok(false);
        };
        let mut invocation = ProcessInvocation::new(argv);
        if let Some(stdin) = stdin {
            invocation = invocation.with_stdin(stdin);
        }

        let code = self.run_stage("editor", &invocation).await?;
        if let (EditorInput::Stdin, None, Some(snapshot)) = (mode, s2s_result, &invocation.stdin) {
            self.discard(ctx, snapshot).await;
        }
        let ok = code.is_some_and(|code| self.policy.is_editor_ok(code));
        if !ok {
            tracing::info!(file = %ctx.original.display(), ?code, "editor rejected");
        }
        Ok(ok)
    }

    /// Every configuration and every stage runs even after a failure. Returns `testOk`.
    async fn test(&self, ctx: &mut PipelineContext) -> Result<bool, AppError> {
        let configurations = self.policy.test_configurations(&ctx.exe, &ctx.extension);
        let mut test_ok = true;

        for configuration in configurations {
            ctx.reset_input();
            for stage in self.policy.test_stages(&configuration) {
                let extension = self.policy.test_extension(&stage).unwrap_or_default();
                let output = self.temps.new_name(&extension);
                let Some(argv) = self.policy.test_command_line(
                    &ctx.base_args,
                    &configuration,
                    &stage,
                    &ctx.input,
                    &output,
                ) else {
                    // Nothing ran, so nothing validated the edit. The cursor stays put.
                    tracing::error!(
                        file = %ctx.original.display(),
                        configuration = %configuration,
                        stage = %stage,
                        "policy gave no command line for test stage; FAILED"
                    );
                    test_ok = false;
                    continue;
                };
                let output = ctx.track(output);
                ctx.advance(PipelineStage::TestStage);

                let code = self.run_stage(&stage, &ProcessInvocation::new(argv)).await?;
                if !code.is_some_and(|code| self.policy.is_test_ok(code, &stage)) {
                    tracing::error!(
                        file = %ctx.original.display(),
                        configuration = %configuration,
                        stage = %stage,
                        ?code,
                        "FAILED"
                    );
                    test_ok = false;
                }

                let consumed = std::mem::replace(&mut ctx.input, output);
                if consumed != ctx.working_copy {
                    self.discard(ctx, &consumed).await;
                }
            }

            if ctx.input != ctx.working_copy {
                let last = ctx.input.clone();
                self.discard(ctx, &last).await;
            }
        }

        ctx.reset_input();
        Ok(test_ok)
    }

    /// Diff, then overwrite the original when both gates agree. Returns whether it was overwritten.
    async fn commit(&self, ctx: &mut PipelineContext) -> Result<bool, AppError> {
        let Some(argv) = self
            .policy
            .diff_command_line(&ctx.original, &ctx.working_copy)
        else {
            tracing::warn!(file = %ctx.original.display(), "policy gave no diff command line; original left untouched");
            return Ok(false);
        };

        let code = self.run_stage("diff", &ProcessInvocation::new(argv)).await?;
        ctx.advance(PipelineStage::Diffed);
        if !code.is_some_and(|code| self.policy.is_diff_ok(code)) {
            tracing::info!(file = %ctx.original.display(), ?code, "diff rejected; original left untouched");
            return Ok(false);
        }
        if !self.policy.is_overwrite_ok() {
            tracing::info!(file = %ctx.original.display(), "overwrite not allowed by policy");
            return Ok(false);
        }

        match self.temps.overwrite(&ctx.original, &ctx.working_copy).await {
            Ok(()) => {
                ctx.advance(PipelineStage::Overwritten);
                tracing::info!(file = %ctx.original.display(), "original overwritten");
                Ok(true)
            }
            Err(err) => {
                tracing::error!(file = %ctx.original.display(), error = %err, "overwrite failed");
                if err.code == "TMP-004" {
                    // The edited content survives only in the working copy now.
                    let working_copy = ctx.working_copy.clone();
                    ctx.untrack(&working_copy);
                }
                Ok(false)
            }
        }
    }

    /// Run one external command. `None` means the stage ran into an I/O problem
    /// other than a failed start; that counts as the stage failing.
    async fn run_stage(
        &self,
        stage: &str,
        invocation: &ProcessInvocation,
    ) -> Result<Option<i32>, AppError> {
        tracing::info!(stage, argv = %invocation.argv.join(" "), "running");
        match self.runner.run(invocation).await {
            Ok(result) => {
                tracing::debug!(stage, exit_code = result.exit_code, "stage finished");
                Ok(Some(result.exit_code))
            }
            Err(err) if is_spawn_failure(&err) => Err(err.with_context("stage", stage)),
            Err(err) => {
                tracing::error!(stage, error = %err, "stage could not run");
                Ok(None)
            }
        }
    }

    async fn discard(&self, ctx: &mut PipelineContext, path: &Path) {
        if self.temps.remove(path).await != Removal::Kept {
            ctx.untrack(path);
        }
    }

    async fn cleanup(&self, ctx: &mut PipelineContext) {
        let mut kept = Vec::new();
        for path in ctx.take_ephemeral() {
            if self.temps.remove(&path).await == Removal::Kept {
                kept.push(path);
            }
        }
        if !kept.is_empty() {
            tracing::debug!(file = %ctx.original.display(), kept = ?kept, "temporaries retained");
        }
    }
}
