use super::{DriverConfig, SpawnFailurePolicy};
use crate::core::error::AppError;
use crate::core::types::ErrorCategory;
use std::env;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE: &str = "s2s.toml";

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load config from an explicit file, or from ./s2s.toml when present.
    /// Environment variables override config file values.
    pub fn load(explicit: Option<&Path>) -> Result<DriverConfig, AppError> {
        let mut config = match explicit {
            Some(path) => Self::load_from_file(path)?.ok_or_else(|| {
                AppError::new(
                    ErrorCategory::ConfigError,
                    format!("Config file {} does not exist", path.display()),
                )
                .with_code("CFG-001")
            })?,
            None => Self::load_from_file(Path::new(DEFAULT_CONFIG_FILE))?.unwrap_or_default(),
        };

        Self::apply_env_overrides(&mut config)?;
        Ok(config)
    }

    /// Load config from specific file path
    /// Returns Ok(None) if file doesn't exist
    pub fn load_from_file(path: &Path) -> Result<Option<DriverConfig>, AppError> {
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            AppError::new(
                ErrorCategory::ConfigError,
                format!("Failed to read config file {}: {}", path.display(), e),
            )
            .with_code("CFG-002")
        })?;

        let config: DriverConfig = toml::from_str(&content).map_err(|e| {
            AppError::new(
                ErrorCategory::ConfigError,
                format!("Failed to parse config file {}: {}", path.display(), e),
            )
            .with_code("CFG-003")
        })?;

        Ok(Some(config))
    }

    /// Apply environment variable overrides to the configuration
    fn apply_env_overrides(config: &mut DriverConfig) -> Result<(), AppError> {
        if let Ok(keep) = env::var("S2S_KEEP_TEMPS") {
            if let Some(keep) = parse_flag(&keep) {
                config.temp.keep = keep;
            }
        }

        if let Ok(dir) = env::var("S2S_TEMP_DIR") {
            if !dir.trim().is_empty() {
                config.temp.dir = Some(PathBuf::from(dir));
            }
        }

        if let Ok(echo) = env::var("S2S_ECHO_CHILD_OUTPUT") {
            if let Some(echo) = parse_flag(&echo) {
                config.runner.echo_child_output = echo;
            }
        }

        if let Ok(policy) = env::var("S2S_SPAWN_FAILURE") {
            config.pipeline.spawn_failure = policy
                .parse::<SpawnFailurePolicy>()
                .map_err(|msg| AppError::new(ErrorCategory::ConfigError, msg).with_code("CFG-004"))?;
        }

        Ok(())
    }

    /// Get documentation for supported environment variables
    pub fn env_var_documentation() -> &'static [&'static str] {
        &[
            "S2S_KEEP_TEMPS - Keep ephemeral files (true/false)",
            "S2S_TEMP_DIR - Directory used for ephemeral files",
            "S2S_ECHO_CHILD_OUTPUT - Mirror child output on the console (true/false)",
            "S2S_SPAWN_FAILURE - abort | fail-file",
        ]
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
