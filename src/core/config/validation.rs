use super::DriverConfig;
use crate::core::error::AppError;
use crate::core::types::ErrorCategory;

pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate configuration rules
    pub fn validate(config: &DriverConfig) -> Result<(), AppError> {
        if config.runner.stdin_chunk_bytes == 0 {
            return Err(AppError::new(
                ErrorCategory::ConfigError,
                "runner.stdin_chunk_bytes must be greater than zero",
            )
            .with_code("CFG-010"));
        }

        if config.runner.idle_backoff_step_ms == 0 {
            return Err(AppError::new(
                ErrorCategory::ConfigError,
                "runner.idle_backoff_step_ms must be greater than zero",
            )
            .with_code("CFG-011"));
        }

        if config.runner.idle_backoff_cap_ms < config.runner.idle_backoff_step_ms {
            return Err(AppError::new(
                ErrorCategory::ConfigError,
                "runner.idle_backoff_cap_ms cannot be below runner.idle_backoff_step_ms",
            )
            .with_code("CFG-012"));
        }

        if config.temp.remove_attempts == 0 {
            return Err(AppError::new(
                ErrorCategory::ConfigError,
                "temp.remove_attempts must be at least 1",
            )
            .with_code("CFG-013"));
        }

        if let Some(dir) = &config.temp.dir {
            if !dir.is_dir() {
                return Err(AppError::new(
                    ErrorCategory::ConfigError,
                    format!("temp.dir {} is not a directory", dir.display()),
                )
                .with_code("CFG-014"));
            }
        }

        Ok(())
    }
}
