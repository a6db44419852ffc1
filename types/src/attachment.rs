//! Output attachments: the business objects an output can carry besides coin value.

use serde::{Deserialize, Serialize};

/// Certificate kinds that can be issued for an asset symbol.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CertType {
    Issue,
    Domain,
    Naming,
    Mining,
}

/// What an output carries.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Attachment {
    /// Plain coin value.
    #[default]
    Etp,
    /// First issuance of a fungible asset.
    AssetIssue { symbol: String },
    /// Transfer of an existing asset (also used for mining-subsidy token rewards).
    AssetTransfer { symbol: String, quantity: u64 },
    /// Asset certificate issuance or transfer.
    AssetCert { symbol: String, cert: CertType },
    /// Registration of a mintable (non-fungible) token.
    AssetMit { symbol: String },
    /// Registration of a digital identity.
    DidRegister { symbol: String, address: String },
    Message(String),
}

impl Attachment {
    pub fn is_etp(&self) -> bool {
        matches!(self, Attachment::Etp)
    }
}
