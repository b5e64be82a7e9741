// Logging setup. Diagnostics go through `tracing` to stderr; stdout is
// reserved for the deploy's own progress output.

use crate::error::{DeployError, Result};
use serde::{Deserialize, Serialize};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

/// Environment variable holding a full `EnvFilter` directive string.
pub const LOG_ENV: &str = "FIREBASE_DEPLOY_LOG";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// trace, debug, info, warn, error, off
    #[serde(default = "default_level")]
    pub level: String,

    /// text or json
    #[serde(default = "default_format")]
    pub format: String,

    #[serde(default = "default_true")]
    pub color: bool,
}

fn default_level() -> String {
    "warn".to_string()
}

fn default_format() -> String {
    "text".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: default_format(),
            color: default_true(),
        }
    }
}

impl LoggingConfig {
    pub fn validate(&self) -> Result<()> {
        if self.format != "text" && self.format != "json" {
            return Err(DeployError::Config(format!(
                "Invalid log format: {} (must be 'json' or 'text')",
                self.format
            )));
        }
        self.filter()?;
        Ok(())
    }

    fn filter(&self) -> Result<EnvFilter> {
        if let Ok(filter) = EnvFilter::try_from_env(LOG_ENV) {
            return Ok(filter);
        }
        EnvFilter::try_new(&self.level)
            .map_err(|e| DeployError::Config(format!("Invalid log level '{}': {}", self.level, e)))
    }
}

/// Install the global subscriber. Call once, early in `main`.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    config.validate()?;
    let filter = config.filter()?;
    let base = Registry::default().with(filter);

    if config.format == "json" {
        base.with(
            fmt::layer()
                .json()
                .with_target(true)
                .with_writer(std::io::stderr),
        )
        .init();
    } else {
        base.with(
            fmt::layer()
                .with_target(true)
                .with_ansi(config.color)
                .with_writer(std::io::stderr),
        )
        .init();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(LoggingConfig::default().validate().is_ok());
    }

    #[test]
    fn unknown_format_is_rejected() {
        let config = LoggingConfig {
            format: "xml".into(),
            ..LoggingConfig::default()
        };
        assert!(matches!(config.validate(), Err(DeployError::Config(_))));
    }
}
