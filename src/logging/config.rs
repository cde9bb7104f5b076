use crate::core::config::LoggingSection;
use crate::logging::layers::console::ConsoleOutput;
use crate::Result;
use anyhow::anyhow;
use std::path::PathBuf;
use std::str::FromStr;
use tracing_subscriber::filter::Directive;

const DEFAULT_LEVEL: &str = "info";
const VERBOSE_LEVEL: &str = "debug";

/// Resolved logging configuration after reading the `[logging]` section and CLI flags.
///
/// `RUST_LOG` still wins over `default_level`; that is applied when the filter is built.
#[derive(Debug, Clone, PartialEq)]
pub struct LoggingConfig {
    pub default_level: String,
    pub console_output: ConsoleOutput,
    pub log_file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            default_level: DEFAULT_LEVEL.to_string(),
            console_output: ConsoleOutput::default(),
            log_file: None,
        }
    }
}

impl LoggingConfig {
    pub fn resolve(section: &LoggingSection, verbose: bool) -> Result<Self> {
        let mut config = LoggingConfig::default();
        if let Some(level) = &section.default_level {
            config.default_level = level.clone();
        }
        if verbose {
            config.default_level = VERBOSE_LEVEL.to_string();
        }
        if let Some(output) = &section.console_output {
            config.console_output = ConsoleOutput::from_str(output).map_err(|err| anyhow!(err))?;
        }
        config.log_file = section.log_file.clone();
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        Directive::from_str(&self.default_level)
            .map_err(|_| anyhow!("logging.default_level must be a valid tracing directive"))?;
        if let Some(path) = &self.log_file {
            if path.as_os_str().is_empty() {
                return Err(anyhow!("logging.log_file must not be empty"));
            }
        }
        Ok(())
    }
}
