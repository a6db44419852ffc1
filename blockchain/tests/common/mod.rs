//! Shared fixture: an organizer over nullable collaborators on regtest.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use mvs_blockchain::{BlockDetail, BlockchainSettings, ExceptionAllowList, Organizer, OrganizerEvent};
use mvs_consensus::{WitnessRegistry, WitnessSchedule};
use mvs_nullables::chain_builder::GENESIS_TIMESTAMP;
use mvs_nullables::{ChainBuilder, NullChainStore, NullClock, NullMempool, NullScriptEngine};
use mvs_store::ChainWriter;
use mvs_types::{Block, NetworkId};

pub struct Fixture {
    pub builder: ChainBuilder,
    pub genesis: Block,
    pub store: Arc<NullChainStore>,
    pub witness: Arc<WitnessSchedule>,
    pub mempool: Arc<NullMempool>,
    pub scripts: Arc<NullScriptEngine>,
    pub clock: Arc<NullClock>,
    pub organizer: Organizer,
    pub events: Arc<Mutex<Vec<OrganizerEvent>>>,
}

pub fn regtest_settings() -> BlockchainSettings {
    BlockchainSettings {
        network: NetworkId::Regtest,
        ..BlockchainSettings::default()
    }
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_settings(regtest_settings())
    }

    pub fn with_settings(settings: BlockchainSettings) -> Self {
        Self::build(settings, ExceptionAllowList::historical())
    }

    pub fn with_exceptions(exceptions: ExceptionAllowList) -> Self {
        Self::build(regtest_settings(), exceptions)
    }

    fn build(settings: BlockchainSettings, exceptions: ExceptionAllowList) -> Self {
        let builder = ChainBuilder::regtest();
        let genesis = builder.genesis();
        let store = Arc::new(NullChainStore::new(genesis.clone()));
        let witness = Arc::new(WitnessSchedule::new(builder.params().witness.clone()));
        let mempool = Arc::new(NullMempool::new());
        let scripts = Arc::new(NullScriptEngine::new());
        let clock = Arc::new(NullClock::new(u64::from(GENESIS_TIMESTAMP) + 100_000));

        let organizer = Organizer::new(
            &settings,
            store.clone(),
            witness.clone(),
            mempool.clone(),
            scripts.clone(),
            clock.clone(),
        )
        .expect("organizer")
        .with_exceptions(exceptions);
        organizer.start();

        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        organizer.subscribe(Box::new(move |event| sink.lock().unwrap().push(event.clone())));

        Self {
            builder,
            genesis,
            store,
            witness,
            mempool,
            scripts,
            clock,
            organizer,
            events,
        }
    }

    /// Write `blocks` straight to the store above the current tip, bypassing validation.
    pub fn push_main(&self, blocks: &[Block]) {
        for block in blocks {
            let height = block.header.number;
            self.store.push(block.clone(), height).expect("push");
        }
    }

    /// Pool `block` and keep a handle on its detail.
    pub fn submit(&self, block: &Block) -> Arc<BlockDetail> {
        let detail = Arc::new(BlockDetail::new(block.clone()));
        assert!(self.organizer.pool().add(Arc::clone(&detail)), "block already pooled");
        detail
    }

    /// Pool every block in order, then organize once.
    pub fn organize(&self, blocks: &[Block]) -> Vec<Arc<BlockDetail>> {
        let details = blocks.iter().map(|b| self.submit(b)).collect();
        self.organizer.organize().expect("organize");
        details
    }

    pub fn reorgs(&self) -> Vec<(u64, usize, usize)> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter_map(|e| match e {
                OrganizerEvent::Reorganized {
                    fork_point,
                    pushed,
                    released,
                } => Some((*fork_point, pushed.len(), released.len())),
                _ => None,
            })
            .collect()
    }

    pub fn witness_list_len(&self) -> usize {
        self.witness.witness_list().len()
    }
}
