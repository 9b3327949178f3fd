//! Configuration for the Mosaic workflow core
//!
//! Values are layered: built-in defaults, then an optional config file, then
//! `MOSAIC_*` environment variables.

use crate::CoreError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

/// Environment variable prefix
pub const ENV_PREFIX: &str = "MOSAIC";

/// Runtime configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MosaicConfig {
    /// Maximum wait for a provider call before it resolves as a timeout
    #[serde(default = "default_stage_timeout_ms")]
    pub stage_timeout_ms: u64,

    /// Service name attached to logs
    #[serde(default = "default_service_name")]
    pub service_name: String,

    /// Log filter (e.g. "info,mosaic_core=debug")
    #[serde(default = "default_log_filter")]
    pub log_filter: String,

    /// Emit JSON logs instead of pretty ones
    #[serde(default)]
    pub json_logs: bool,

    /// Optional log file, rotated daily
    #[serde(default)]
    pub log_file: Option<String>,
}

fn default_stage_timeout_ms() -> u64 {
    30_000
}

fn default_service_name() -> String {
    "mosaic".to_string()
}

fn default_log_filter() -> String {
    "info".to_string()
}

impl Default for MosaicConfig {
    fn default() -> Self {
        Self {
            stage_timeout_ms: default_stage_timeout_ms(),
            service_name: default_service_name(),
            log_filter: default_log_filter(),
            json_logs: false,
            log_file: None,
        }
    }
}

impl MosaicConfig {
    /// Load configuration from an optional file and the environment
    pub fn load(path: Option<&Path>) -> Result<Self, CoreError> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            if !path.exists() {
                warn!(path = %path.display(), "Config file not found, using defaults and environment");
            }
            builder = builder.add_source(config::File::from(path).required(false));
        }

        let settings = builder
            .add_source(config::Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?;

        let config: MosaicConfig = settings.try_deserialize()?;
        config.validate()?;

        info!(
            stage_timeout_ms = config.stage_timeout_ms,
            service_name = %config.service_name,
            "Loaded configuration"
        );
        Ok(config)
    }

    /// Check value constraints
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.stage_timeout_ms == 0 {
            return Err(CoreError::ConfigurationError(
                "stage_timeout_ms must be greater than zero".to_string(),
            ));
        }
        if self.service_name.trim().is_empty() {
            return Err(CoreError::ConfigurationError(
                "service_name must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Stage timeout as a duration
    #[inline]
    pub fn stage_timeout(&self) -> Duration {
        Duration::from_millis(self.stage_timeout_ms)
    }
}
