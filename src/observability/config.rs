//! Logging configuration

use serde::{Deserialize, Serialize};

use super::logger::{Logger, Severity};

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Lowest severity written (default: info)
    #[serde(default = "default_min_severity")]
    pub min_severity: Severity,
}

fn default_min_severity() -> Severity {
    Severity::Info
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            min_severity: default_min_severity(),
        }
    }
}

impl LoggingConfig {
    pub fn with_min_severity(mut self, min_severity: Severity) -> Self {
        self.min_severity = min_severity;
        self
    }

    /// Installs the threshold process-wide
    pub fn apply(&self) {
        Logger::set_min_severity(self.min_severity);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_hides_trace() {
        assert_eq!(LoggingConfig::default().min_severity, Severity::Info);
    }

    #[test]
    fn test_parse_min_severity() {
        let config: LoggingConfig = serde_json::from_str(r#"{ "min_severity": "error" }"#).unwrap();
        assert_eq!(config.min_severity, Severity::Error);

        let config: LoggingConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, LoggingConfig::default());
    }
}
