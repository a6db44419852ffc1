//! Block organization for a UTXO chain with mixed PoW, PoS and DPoS blocks.
//!
//! Incoming blocks land in the [`OrphanPool`]. The [`Organizer`] traces each
//! block's pooled ancestry back to the main chain, validates the candidate
//! blocks through [`BlockValidator`] and replaces the main chain when the
//! candidate carries more work.

pub mod block_detail;
pub mod cancel;
pub mod chain_context;
pub mod checkpoint;
pub mod collaborators;
pub mod error;
pub mod events;
pub mod exceptions;
pub mod orphan_pool;
pub mod organizer;
pub mod settings;
pub mod validate;

pub use block_detail::BlockDetail;
pub use cancel::StopSignal;
pub use chain_context::{CandidateView, ChainContext, ChainView, InputRef, StoreView};
pub use checkpoint::{Checkpoint, Checkpoints};
pub use collaborators::{Mempool, ScriptEngine};
pub use error::{BlockchainError, ValidationError};
pub use events::{EventBus, OrganizerEvent};
pub use exceptions::ExceptionAllowList;
pub use orphan_pool::OrphanPool;
pub use organizer::{Organizer, ReplaceOutcome};
pub use settings::{BlockchainSettings, ChainParams, CheckpointConfig};
pub use validate::{work_required, BlockValidator, ProofRules};
