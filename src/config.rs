//! Gateway configuration
//!
//! Loaded from a JSON file:
//!
//! ```json
//! {
//!   "planner": {
//!     "source_preference": ["QS", "EDS"],
//!     "entity_id_columns": { "API": ["id"] }
//!   },
//!   "executor": {
//!     "fetch_timeout_ms": 30000,
//!     "enrichment_failure_policy": "fail_request"
//!   },
//!   "logging": { "min_severity": "info" }
//! }
//! ```

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::executor::ExecutorConfig;
use crate::observability::{log_event_with_fields, Event, LoggingConfig};
use crate::planner::PlannerConfig;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default)]
    pub planner: PlannerConfig,

    #[serde(default)]
    pub executor: ExecutorConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl GatewayConfig {
    /// Load configuration from file
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path)?;
        let config = Self::from_json_str(&content)?;

        let path = path.display().to_string();
        log_event_with_fields(
            Event::ConfigLoaded,
            &[
                ("path", path.as_str()),
                ("policy", config.executor.enrichment_failure_policy.as_str()),
            ],
        );
        Ok(config)
    }

    /// Parse and validate configuration from JSON text
    pub fn from_json_str(content: &str) -> ConfigResult<Self> {
        let config: GatewayConfig = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.executor.fetch_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "executor.fetch_timeout_ms must be > 0".into(),
            ));
        }

        let mut seen = BTreeSet::new();
        for source in &self.planner.source_preference {
            if !seen.insert(source) {
                return Err(ConfigError::Invalid(format!(
                    "planner.source_preference lists '{}' twice",
                    source
                )));
            }
        }

        for (entity_type, keys) in &self.planner.entity_id_columns {
            if keys.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "planner.entity_id_columns.{} must not be empty",
                    entity_type
                )));
            }
        }

        Ok(())
    }
}
