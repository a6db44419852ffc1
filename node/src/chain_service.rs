//! The chain write path.
//!
//! [`ChainService`] owns the [`Organizer`] and serialises every store+organize
//! pass behind one write lock. Organizing is CPU-bound and touches the store
//! synchronously, so each pass runs on tokio's blocking pool.

use std::sync::{Arc, Mutex};
use std::time::Instant;

use mvs_blockchain::{
    BlockDetail, Mempool, Organizer, OrganizerEvent, ScriptEngine, ValidationError,
};
use mvs_consensus::WitnessRegistry;
use mvs_store::ChainStore;
use mvs_types::{Block, BlockHash};
use mvs_utils::Clock;

use crate::config::NodeConfig;
use crate::metrics::ChainMetrics;
use crate::shutdown::ShutdownController;
use crate::NodeError;

/// Where a submitted block ended up after its organize pass.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BlockStatus {
    /// On the main chain at this height.
    Connected(u64),
    /// Pooled: waiting for its parent, or on a fork without enough work.
    Pending,
    /// Failed validation, or descends from a block that did.
    Rejected(ValidationError),
    /// Already on the main chain or in the orphan pool.
    Duplicate,
    /// The orphan pool is full.
    PoolFull,
}

pub struct ChainService {
    organizer: Arc<Organizer>,
    store: Arc<dyn ChainStore>,
    write_lock: Arc<Mutex<()>>,
    metrics: Option<Arc<ChainMetrics>>,
}

impl ChainService {
    /// Build the organizer from `config` and start it.
    pub fn new(
        config: &NodeConfig,
        store: Arc<dyn ChainStore>,
        witness: Arc<dyn WitnessRegistry>,
        mempool: Arc<dyn Mempool>,
        scripts: Arc<dyn ScriptEngine>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, NodeError> {
        config.validate()?;
        let organizer = Arc::new(Organizer::new(
            &config.blockchain,
            Arc::clone(&store),
            witness,
            mempool,
            scripts,
            clock,
        )?);

        let metrics = if config.enable_metrics {
            let metrics = Arc::new(ChainMetrics::new()?);
            metrics.chain_height.set(store.last_height()? as i64);
            let recorder = Arc::clone(&metrics);
            organizer.subscribe(Box::new(move |event| {
                if let OrganizerEvent::Reorganized { pushed, released, .. } = event {
                    recorder.blocks_pushed.inc_by(pushed.len() as u64);
                    recorder.blocks_popped.inc_by(released.len() as u64);
                    if !released.is_empty() {
                        recorder.reorganizations.inc();
                    }
                }
            }));
            Some(metrics)
        } else {
            None
        };

        organizer.start();
        tracing::info!(
            network = ?config.blockchain.network,
            height = store.last_height()?,
            "chain service started"
        );

        Ok(Self {
            organizer,
            store,
            write_lock: Arc::new(Mutex::new(())),
            metrics,
        })
    }

    pub fn organizer(&self) -> &Organizer {
        &self.organizer
    }

    pub fn metrics(&self) -> Option<&ChainMetrics> {
        self.metrics.as_deref()
    }

    pub fn subscribe(&self, listener: Box<dyn Fn(&OrganizerEvent) + Send + Sync>) {
        self.organizer.subscribe(listener);
    }

    pub fn fork_tips(&self) -> Vec<(BlockHash, u64)> {
        self.organizer.fork_chain_tips()
    }

    pub fn filter_orphans(&self, hashes: Vec<BlockHash>) -> Vec<BlockHash> {
        self.organizer.filter_orphans(hashes)
    }

    /// Trip the organizer's stop signal when `controller` shuts down.
    pub fn register_shutdown(&self, controller: &ShutdownController) {
        controller.register(self.organizer.stop_signal());
    }

    /// Pool `block` and run an organize pass under the write lock.
    pub async fn store_block(&self, block: Block) -> Result<BlockStatus, NodeError> {
        if self.organizer.stopped() {
            return Err(NodeError::Stopped);
        }
        let hash = block.hash();
        if self.store.height_of(&hash)?.is_some() || self.organizer.pool().exists(&hash) {
            tracing::debug!(hash = %hash, "block already known");
            return Ok(BlockStatus::Duplicate);
        }

        let detail = Arc::new(BlockDetail::new(block));
        if !self.organizer.pool().add(Arc::clone(&detail)) {
            return Ok(BlockStatus::PoolFull);
        }

        let organizer = Arc::clone(&self.organizer);
        let store = Arc::clone(&self.store);
        let write_lock = Arc::clone(&self.write_lock);
        let metrics = self.metrics.clone();

        tokio::task::spawn_blocking(move || -> Result<BlockStatus, NodeError> {
            let _guard = write_lock.lock().unwrap();
            let started = Instant::now();
            organizer.organize()?;

            let status = if let Some(error) = detail.error() {
                BlockStatus::Rejected(error)
            } else if let Some(height) = detail.height() {
                BlockStatus::Connected(height)
            } else {
                BlockStatus::Pending
            };

            if let Some(metrics) = metrics {
                metrics.blocks_organized.inc();
                if matches!(status, BlockStatus::Rejected(_)) {
                    metrics.invalid_blocks.inc();
                }
                metrics.orphan_pool_size.set(organizer.pool().len() as i64);
                metrics.chain_height.set(store.last_height()? as i64);
                metrics
                    .organize_time_ms
                    .observe(started.elapsed().as_secs_f64() * 1_000.0);
            }
            Ok(status)
        })
        .await
        .map_err(|e| NodeError::Task(e.to_string()))?
    }

    /// Stop the organizer. A pass in flight returns at its next poll.
    pub fn shutdown(&self) {
        self.organizer.stop();
        tracing::info!("chain service stopped");
    }
}
