//! MVS node service.
//!
//! Wraps the blockchain organizer for a running node:
//! - Loads the node configuration from TOML
//! - Initialises structured logging
//! - Serialises block submissions behind the chain write lock
//! - Records Prometheus metrics for the write path
//! - Coordinates graceful shutdown

pub mod chain_service;
pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod shutdown;

pub use chain_service::{BlockStatus, ChainService};
pub use config::NodeConfig;
pub use error::NodeError;
pub use logging::{init_logging, LogFormat};
pub use metrics::ChainMetrics;
pub use shutdown::ShutdownController;
