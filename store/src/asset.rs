//! Business-object registries (assets, certificates, MITs, DIDs, witness stakes).

use crate::StoreError;
use mvs_types::{CertType, PublicKey};

/// Registration lookups used by block-level uniqueness checks.
///
/// Each returns the height of the main-chain block that registered the
/// object, so callers can ignore registrations above a fork point.
pub trait AssetStore {
    fn asset_height(&self, symbol: &str) -> Result<Option<u64>, StoreError>;

    fn cert_height(&self, symbol: &str, cert: CertType) -> Result<Option<u64>, StoreError>;

    fn mit_height(&self, symbol: &str) -> Result<Option<u64>, StoreError>;

    fn did_height(&self, symbol: &str) -> Result<Option<u64>, StoreError>;

    /// Registered witness candidates and their stake, counting only stake
    /// locked until at least `lock_until`.
    fn witness_stakes(&self, lock_until: u64) -> Result<Vec<(PublicKey, u64)>, StoreError>;
}
