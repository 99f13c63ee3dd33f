//! # Portal Store Crate
//!
//! Durable persistence contracts consumed by the portal core, plus two
//! implementations: sled-backed for deployment and in-memory for tests.
//!
//! The store keeps at most one record per `(primary_pubkey, kind)`; an
//! upsert replaces the existing record of the same kind and refreshes
//! its timestamp. Listings are returned newest-first.

pub mod memory;
pub mod sled_store;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use portal_common::eth::EthAddress;
use portal_registry::material::{RegistrationKind, ValidatorKeyMaterial};

pub use memory::MemoryStore;
pub use sled_store::SledStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage backend error: {0}")]
    Backend(String),

    #[error("stored record could not be decoded: {0}")]
    Codec(String),
}

impl From<sled::Error> for StoreError {
    fn from(e: sled::Error) -> Self {
        StoreError::Backend(e.to_string())
    }
}

impl From<bincode::Error> for StoreError {
    fn from(e: bincode::Error) -> Self {
        StoreError::Codec(e.to_string())
    }
}

/// A stored registration: the submitted key material plus the unix
/// timestamp of when it was received or last replaced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredRegistration {
    pub material: ValidatorKeyMaterial,
    pub timestamp: u64,
}

impl StoredRegistration {
    pub fn kind(&self) -> RegistrationKind {
        self.material.kind()
    }
}

/// Durable registration persistence, keyed by `(primary_pubkey, kind)`.
pub trait RegistrationStore: Send + Sync + 'static {
    /// Stores `material`, replacing any existing record of the same kind
    /// for the same primary pubkey (last-write-wins).
    fn upsert(&self, material: &ValidatorKeyMaterial, timestamp: u64) -> Result<(), StoreError>;

    /// All stored registrations for a node pubkey (0, 1 or 2 records),
    /// newest timestamp first.
    fn load_by_pubkey(&self, primary_pubkey: &[u8]) -> Result<Vec<StoredRegistration>, StoreError>;

    /// All stored registrations whose operator matches, newest first.
    fn load_by_operator(&self, operator: &[u8]) -> Result<Vec<StoredRegistration>, StoreError>;
}

/// The durable set of known contribution-contract addresses discovered
/// on chain. Inserts are idempotent.
pub trait ContractDirectory: Send + Sync + 'static {
    /// Records a contract address. Returns `true` if it was new, `false`
    /// if already known (not an error).
    fn insert(&self, address: &EthAddress) -> Result<bool, StoreError>;

    /// All known contract addresses.
    fn all(&self) -> Result<Vec<EthAddress>, StoreError>;
}

/// Newest-first ordering shared by both implementations. Ties keep the
/// kind order stable so repeated loads agree.
pub(crate) fn sort_newest_first(records: &mut [StoredRegistration]) {
    records.sort_by(|a, b| {
        b.timestamp
            .cmp(&a.timestamp)
            .then_with(|| a.kind().tag().cmp(&b.kind().tag()))
    });
}
