//! Executor configuration

use serde::{Deserialize, Serialize};

/// What a failed enrichment fetch does to the request
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrichmentFailurePolicy {
    /// Fail the whole request
    #[default]
    FailRequest,
    /// Keep the driver rows and fill the failed source's columns with null
    DropColumns,
}

impl EnrichmentFailurePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnrichmentFailurePolicy::FailRequest => "fail_request",
            EnrichmentFailurePolicy::DropColumns => "drop_columns",
        }
    }
}

/// Executor configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutorConfig {
    /// Timeout of every single fetch in milliseconds (default: 30000)
    #[serde(default = "default_fetch_timeout_ms")]
    pub fetch_timeout_ms: u64,

    /// Policy for failed enrichment fetches (default: fail_request)
    #[serde(default)]
    pub enrichment_failure_policy: EnrichmentFailurePolicy,
}

fn default_fetch_timeout_ms() -> u64 {
    30_000
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            fetch_timeout_ms: default_fetch_timeout_ms(),
            enrichment_failure_policy: EnrichmentFailurePolicy::default(),
        }
    }
}

impl ExecutorConfig {
    pub fn with_timeout_ms(mut self, fetch_timeout_ms: u64) -> Self {
        self.fetch_timeout_ms = fetch_timeout_ms;
        self
    }

    pub fn with_policy(mut self, policy: EnrichmentFailurePolicy) -> Self {
        self.enrichment_failure_policy = policy;
        self
    }
}
