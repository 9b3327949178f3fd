//! Monitoring module for the Mosaic deal builder.
//!
//! Structured logging setup and a tracing sink for wizard domain events.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use mosaic_core::MosaicConfig;
use serde::{Deserialize, Serialize};

/// Structured logging
pub mod logging;

/// Domain event logging
pub mod events;

pub use events::log_events;
pub use logging::{init_logging, init_test_tracing, LogExt};

/// Configuration for initializing the monitoring system
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitoringConfig {
    /// Service name attached to every log line
    pub service_name: String,
    /// Log level filter (e.g., "info,mosaic_core=debug")
    pub log_filter: String,
    /// JSON output instead of pretty output
    pub json_logs: bool,
    /// Optional log file, rotated daily
    pub log_file: Option<String>,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            service_name: "mosaic".to_string(),
            log_filter: "info".to_string(),
            json_logs: false,
            log_file: None,
        }
    }
}

impl From<&MosaicConfig> for MonitoringConfig {
    fn from(config: &MosaicConfig) -> Self {
        Self {
            service_name: config.service_name.clone(),
            log_filter: config.log_filter.clone(),
            json_logs: config.json_logs,
            log_file: config.log_file.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = MonitoringConfig::default();
        assert_eq!(config.service_name, "mosaic");
        assert!(!config.json_logs);
    }

    #[test]
    fn test_from_core_config() {
        let core = MosaicConfig {
            service_name: "deal-builder".to_string(),
            json_logs: true,
            log_file: Some("/tmp/mosaic.log".to_string()),
            ..MosaicConfig::default()
        };
        let config = MonitoringConfig::from(&core);
        assert_eq!(config.service_name, "deal-builder");
        assert!(config.json_logs);
        assert_eq!(config.log_file.as_deref(), Some("/tmp/mosaic.log"));
        assert_eq!(config.log_filter, "info");
    }
}
