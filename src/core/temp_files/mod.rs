//! Ephemeral file lifecycle: naming, copying, removal with lock retries, and the final overwrite.

use crate::core::config::TempConfig;
use crate::core::error::AppError;
use crate::core::retry::{retry, RetryPolicy, Sleeper, TokioSleeper};
use crate::core::types::ErrorCategory;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

const NAME_PREFIX: &str = "s2s-";

/// Result of a removal request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Removal {
    Removed,
    /// Nothing was there to begin with.
    Absent,
    /// Keep mode is on; the file was left in place.
    Kept,
    /// Every attempt failed; a warning was logged.
    Failed,
}

pub struct TempFileManager {
    dir: PathBuf,
    keep: bool,
    removal: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
}

impl TempFileManager {
    pub fn new(config: &TempConfig) -> Self {
        TempFileManager {
            dir: config.resolved_dir(),
            keep: config.keep,
            removal: RetryPolicy::new(config.remove_attempts, config.remove_delay()),
            sleeper: Arc::new(TokioSleeper),
        }
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// A path in the temp directory that no live ephemeral file uses.
    pub fn new_name(&self, extension: &str) -> PathBuf {
        let extension = normalize_extension(extension);
        loop {
            let candidate = self.dir.join(format!(
                "{}{}{}",
                NAME_PREFIX,
                uuid::Uuid::new_v4().simple(),
                extension
            ));
            if !candidate.exists() {
                return candidate;
            }
        }
    }

    /// Copy `source` into a fresh ephemeral file. A partial target is removed on failure.
    pub async fn copy(&self, source: &Path, extension: &str) -> Result<PathBuf, AppError> {
        let target = self.new_name(extension);
        match fs::copy(source, &target) {
            Ok(bytes) => {
                tracing::debug!(
                    source = %source.display(),
                    target = %target.display(),
                    bytes,
                    "created working copy"
                );
                Ok(target)
            }
            Err(err) => {
                self.remove_now(&target).await;
                Err(AppError::with_source(
                    ErrorCategory::TempFileError,
                    format!("failed to copy {} into temp dir", source.display()),
                    err,
                )
                .with_code("TMP-001")
                .with_context("target", target.display().to_string()))
            }
        }
    }

    pub fn rename(&self, from: &Path, to: &Path) -> Result<(), AppError> {
        fs::rename(from, to).map_err(|err| {
            AppError::with_source(
                ErrorCategory::TempFileError,
                format!("failed to rename {} to {}", from.display(), to.display()),
                err,
            )
            .with_code("TMP-002")
        })
    }

    /// Remove an ephemeral file. Idempotent; honors keep mode.
    pub async fn remove(&self, path: &Path) -> Removal {
        if self.keep {
            if path.exists() {
                tracing::debug!(path = %path.display(), "keeping temporary");
                return Removal::Kept;
            }
            return Removal::Absent;
        }
        self.remove_now(path).await
    }

    /// Replace `target` with the contents of `source`, then discard `source`.
    ///
    /// Not crash-atomic. When the copy fails the source is left in place so its
    /// content is not lost.
    pub async fn overwrite(&self, target: &Path, source: &Path) -> Result<(), AppError> {
        if self.remove_now(target).await == Removal::Failed {
            return Err(AppError::new(
                ErrorCategory::TempFileError,
                format!("could not remove {} before overwrite", target.display()),
            )
            .with_code("TMP-003"));
        }

        fs::copy(source, target).map_err(|err| {
            AppError::with_source(
                ErrorCategory::TempFileError,
                format!(
                    "failed to copy {} over {}; edited content kept at source",
                    source.display(),
                    target.display()
                ),
                err,
            )
            .with_code("TMP-004")
            .with_context("source", source.display().to_string())
        })?;

        self.remove(source).await;
        Ok(())
    }

    async fn remove_now(&self, path: &Path) -> Removal {
        let outcome = retry(
            &self.removal,
            self.sleeper.as_ref(),
            |_| match fs::remove_file(path) {
                Ok(()) => Ok(Removal::Removed),
                Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(Removal::Absent),
                Err(err) => Err(err),
            },
            is_transient_lock,
        )
        .await;

        match outcome {
            Ok(removal) => removal,
            Err(failure) => {
                tracing::warn!(
                    path = %path.display(),
                    attempts = failure.attempts,
                    error = %failure.error,
                    "failed to remove temporary file"
                );
                Removal::Failed
            }
        }
    }
}

/// `"c"` and `".c"` both become `".c"`; empty stays empty.
pub fn normalize_extension(extension: &str) -> String {
    let trimmed = extension.trim();
    if trimmed.is_empty() || trimmed.starts_with('.') {
        trimmed.to_string()
    } else {
        format!(".{}", trimmed)
    }
}

/// A just-exited child can still hold a file open for a moment on some platforms.
fn is_transient_lock(err: &io::Error) -> bool {
    if cfg!(windows) {
        // ERROR_SHARING_VIOLATION, ERROR_LOCK_VIOLATION
        err.kind() == io::ErrorKind::PermissionDenied || matches!(err.raw_os_error(), Some(32 | 33))
    } else {
        // EBUSY
        matches!(err.raw_os_error(), Some(16))
    }
}
