//! `compile_commands.json` loading.

use crate::core::error::AppError;
use crate::core::types::ErrorCategory;
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const DATABASE_FILE: &str = "compile_commands.json";

/// One build invocation from the compilation database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileEntry {
    /// Full command line, `argv[0]` included.
    pub command_line: Vec<String>,
    pub file: PathBuf,
    pub directory: PathBuf,
}

impl CompileEntry {
    pub fn executable(&self) -> &str {
        self.command_line.first().map(String::as_str).unwrap_or("")
    }

    /// The source path made absolute against the entry's working directory.
    pub fn absolute_file(&self) -> PathBuf {
        if self.file.is_absolute() {
            self.file.clone()
        } else {
            self.directory.join(&self.file)
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawEntry {
    directory: PathBuf,
    file: PathBuf,
    #[serde(default)]
    arguments: Option<Vec<String>>,
    #[serde(default)]
    command: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct CompilationDatabase {
    entries: Vec<CompileEntry>,
    source: PathBuf,
}

impl CompilationDatabase {
    /// Load `compile_commands.json` from `dir`, or `dir` itself when it names a file.
    pub fn load_from_directory(dir: &Path) -> Result<Self, AppError> {
        let path = if dir.is_file() {
            dir.to_path_buf()
        } else {
            dir.join(DATABASE_FILE)
        };

        let content = std::fs::read_to_string(&path).map_err(|err| {
            AppError::with_source(
                ErrorCategory::DatabaseError,
                format!("failed to read compilation database {}", path.display()),
                err,
            )
            .with_code("DB-001")
        })?;

        let mut database = Self::from_json(&content).map_err(|mut err| {
            err.add_context("path", &path.display().to_string());
            err
        })?;
        database.source = path;
        Ok(database)
    }

    pub fn from_json(content: &str) -> Result<Self, AppError> {
        let raw: Vec<RawEntry> = serde_json::from_str(content).map_err(|err| {
            AppError::with_source(
                ErrorCategory::DatabaseError,
                format!("failed to parse compilation database: {}", err),
                err,
            )
            .with_code("DB-002")
        })?;

        let mut entries = Vec::with_capacity(raw.len());
        for (index, entry) in raw.into_iter().enumerate() {
            let command_line = match (entry.arguments, entry.command) {
                (Some(arguments), _) if !arguments.is_empty() => arguments,
                (_, Some(command)) => shell_words::split(&command).map_err(|err| {
                    AppError::new(
                        ErrorCategory::DatabaseError,
                        format!("entry {} has an unparsable command: {}", index, err),
                    )
                    .with_code("DB-003")
                })?,
                _ => Vec::new(),
            };

            if command_line.is_empty() {
                tracing::warn!(
                    index,
                    file = %entry.file.display(),
                    "compilation database entry has no command line; skipping"
                );
                continue;
            }

            entries.push(CompileEntry {
                command_line,
                file: entry.file,
                directory: entry.directory,
            });
        }

        Ok(CompilationDatabase {
            entries,
            source: PathBuf::new(),
        })
    }

    pub fn entries(&self) -> &[CompileEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn source(&self) -> &Path {
        &self.source
    }
}
