//! Prometheus metrics for the chain write path.
//!
//! [`ChainMetrics`] owns a dedicated [`Registry`] that an exporter can encode
//! into the Prometheus text exposition format via [`ChainMetrics::encode`].

use prometheus::{
    register_histogram_with_registry, register_int_counter_with_registry,
    register_int_gauge_with_registry, Encoder, Histogram, HistogramOpts, IntCounter, IntGauge, Opts,
    Registry, TextEncoder,
};

use crate::NodeError;

pub struct ChainMetrics {
    pub registry: Registry,

    // ── Counters ────────────────────────────────────────────────────────
    /// Blocks handed to the organizer.
    pub blocks_organized: IntCounter,
    /// Reorganizations that popped at least one main-chain block.
    pub reorganizations: IntCounter,
    pub blocks_pushed: IntCounter,
    pub blocks_popped: IntCounter,
    /// Blocks rejected by validation.
    pub invalid_blocks: IntCounter,

    // ── Gauges ──────────────────────────────────────────────────────────
    pub orphan_pool_size: IntGauge,
    pub chain_height: IntGauge,

    // ── Histograms ──────────────────────────────────────────────────────
    /// Time spent in one organize pass, in milliseconds.
    pub organize_time_ms: Histogram,
}

impl ChainMetrics {
    pub fn new() -> Result<Self, NodeError> {
        let registry = Registry::new();

        let blocks_organized = register_int_counter_with_registry!(
            Opts::new("mvs_blocks_organized_total", "Blocks handed to the organizer"),
            registry
        )?;
        let reorganizations = register_int_counter_with_registry!(
            Opts::new("mvs_reorganizations_total", "Main chain reorganizations"),
            registry
        )?;
        let blocks_pushed = register_int_counter_with_registry!(
            Opts::new("mvs_blocks_pushed_total", "Blocks connected to the main chain"),
            registry
        )?;
        let blocks_popped = register_int_counter_with_registry!(
            Opts::new("mvs_blocks_popped_total", "Blocks removed from the main chain"),
            registry
        )?;
        let invalid_blocks = register_int_counter_with_registry!(
            Opts::new("mvs_invalid_blocks_total", "Blocks rejected by validation"),
            registry
        )?;

        let orphan_pool_size = register_int_gauge_with_registry!(
            Opts::new("mvs_orphan_pool_size", "Blocks held in the orphan pool"),
            registry
        )?;
        let chain_height = register_int_gauge_with_registry!(
            Opts::new("mvs_chain_height", "Main chain height"),
            registry
        )?;

        // 0.1 ms → ~1.6 s
        let organize_time_ms = register_histogram_with_registry!(
            HistogramOpts::new("mvs_organize_time_ms", "Organize pass time in milliseconds")
                .buckets(prometheus::exponential_buckets(0.1, 2.0, 15)?),
            registry
        )?;

        Ok(Self {
            registry,
            blocks_organized,
            reorganizations,
            blocks_pushed,
            blocks_popped,
            invalid_blocks,
            orphan_pool_size,
            chain_height,
            organize_time_ms,
        })
    }

    /// Text exposition of every registered metric.
    pub fn encode(&self) -> Result<String, NodeError> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| NodeError::Config(e.to_string()))
    }
}
