//! Aggregate outcome of a run and its console renderings.

use crate::core::error::AppError;
use crate::core::types::ErrorCategory;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineReport {
    pub failures: Vec<PathBuf>,
    pub successes: Vec<PathBuf>,
    pub skipped: usize,
    pub overwritten: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

#[derive(Serialize)]
struct JsonReport<'a> {
    failures: &'a [PathBuf],
    successes: &'a [PathBuf],
    skipped: usize,
    overwritten: usize,
    success_rate: Option<f64>,
    finished_at: Option<DateTime<Utc>>,
}

impl PipelineReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Classify a processed file by its test verdict alone.
    pub fn record(&mut self, path: &Path, test_ok: bool) {
        if test_ok {
            self.successes.push(path.to_path_buf());
        } else {
            self.failures.push(path.to_path_buf());
        }
    }

    pub fn record_overwrite(&mut self) {
        self.overwritten += 1;
    }

    pub fn record_skip(&mut self) {
        self.skipped += 1;
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    pub fn processed(&self) -> usize {
        self.successes.len() + self.failures.len()
    }

    /// Percentage of processed files that passed; `None` when nothing was processed.
    pub fn success_rate(&self) -> Option<f64> {
        match self.processed() {
            0 => None,
            total => Some(100.0 * self.successes.len() as f64 / total as f64),
        }
    }

    pub fn render(&self, format: OutputFormat) -> Result<String, AppError> {
        match format {
            OutputFormat::Text => Ok(self.render_text()),
            OutputFormat::Json => self.render_json(),
        }
    }

    pub fn render_text(&self) -> String {
        let Some(rate) = self.success_rate() else {
            return "No work done\n".to_string();
        };

        let mut report = String::new();
        report.push_str("\nFailures\n");
        for path in &self.failures {
            report.push_str(&format!("{}\n", path.display()));
        }
        report.push_str("\nSuccesses\n");
        for path in &self.successes {
            report.push_str(&format!("{}\n", path.display()));
        }
        report.push_str(&format!("Success rate {:.6}\n", rate));
        report
    }

    pub fn render_json(&self) -> Result<String, AppError> {
        let view = JsonReport {
            failures: &self.failures,
            successes: &self.successes,
            skipped: self.skipped,
            overwritten: self.overwritten,
            success_rate: self.success_rate(),
            finished_at: self.finished_at,
        };
        serde_json::to_string_pretty(&view).map_err(|e| {
            AppError::new(
                ErrorCategory::SerializationError,
                format!("Failed to generate JSON report: {}", e),
            )
            .with_code("REPORT-JSON-001")
        })
    }
}
