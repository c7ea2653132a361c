// src/config.rs

//! Dispatch configuration: loading, defaults, and validation.

use crate::core::SlotcastError;
use crate::core::commands::Version;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Caller-tunable knobs for the dispatcher and router.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct DispatchConfig {
    /// Fallback target for commands with no keys and no routing hint, and for
    /// deployments without a populated slot table.
    pub default_node: Option<String>,

    /// How long a fan-out waits for each node's reply before counting that
    /// node as failed.
    #[serde(with = "humantime_serde")]
    pub fanout_timeout: Duration,

    /// When true, an `AllSucceeded` merge raises `PartialFailure` on any node
    /// error instead of folding it to `false`.
    pub strict_aggregate: bool,

    /// Route single-slot read-only commands to a shard replica when one exists.
    pub read_from_replicas: bool,

    /// When set, arguments gated behind a newer server version are rejected
    /// at encode time.
    pub server_version: Option<Version>,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            default_node: None,
            fanout_timeout: Duration::from_secs(5),
            strict_aggregate: true,
            read_from_replicas: false,
            server_version: None,
        }
    }
}

impl DispatchConfig {
    /// Loads the configuration from a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self, SlotcastError> {
        let config: Self =
            toml::from_str(content).map_err(|e| SlotcastError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), SlotcastError> {
        if self.fanout_timeout.is_zero() {
            return Err(SlotcastError::Config(
                "fanout-timeout must be greater than zero".to_string(),
            ));
        }
        if let Some(node) = &self.default_node
            && node.is_empty()
        {
            return Err(SlotcastError::Config(
                "default-node must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
