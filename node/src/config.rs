//! Node configuration with TOML file support.

use std::path::Path;

use serde::{Deserialize, Serialize};

use mvs_blockchain::BlockchainSettings;

use crate::logging::LogFormat;
use crate::NodeError;

/// Configuration for an MVS node.
///
/// Loaded from a TOML file via [`NodeConfig::from_toml_file`] or built
/// programmatically in tests. Chain settings live under `[blockchain]`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Log format: "human" or "json".
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Whether to collect Prometheus metrics.
    #[serde(default)]
    pub enable_metrics: bool,

    #[serde(default)]
    pub blockchain: BlockchainSettings,
}

fn default_log_format() -> String {
    "human".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl NodeConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, NodeError> {
        let content = std::fs::read_to_string(path).map_err(|e| NodeError::Config(e.to_string()))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, NodeError> {
        let config: Self = toml::from_str(s).map_err(|e| NodeError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String, NodeError> {
        toml::to_string_pretty(self).map_err(|e| NodeError::Config(e.to_string()))
    }

    pub fn log_format(&self) -> Result<LogFormat, NodeError> {
        self.log_format.parse()
    }

    /// Reject settings that would only fail later, at organizer construction.
    pub fn validate(&self) -> Result<(), NodeError> {
        if self.blockchain.block_pool_capacity == 0 {
            return Err(NodeError::Config("block_pool_capacity must be positive".into()));
        }
        self.log_format()?;
        self.blockchain.checkpoints()?;
        Ok(())
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            log_format: default_log_format(),
            log_level: default_log_level(),
            enable_metrics: false,
            blockchain: BlockchainSettings::default(),
        }
    }
}
