//! Immutable snapshots and their atomic publication point.
//!
//! A cycle calls [`SharedIndex::begin_cycle`] to draw a sequence number,
//! builds a whole snapshot off to the side, then publishes it with one
//! pointer swap. A snapshot older than the currently published one is
//! discarded instead of swapped in, so a slow build can never roll the
//! visible state backwards.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use portal_common::eth::EthAddress;

use crate::records::{ContractRecord, ValidatorRecord};
use crate::source::ChainInfo;

/// One published view of the full validator list.
#[derive(Debug, Default)]
pub struct ValidatorIndex {
    pub seq: u64,
    pub info: ChainInfo,
    pub validators: Vec<ValidatorRecord>,
    /// Canonical wallet string to positions in `validators`.
    wallet_to_validators: HashMap<String, Vec<usize>>,
    /// Lowercase hex ed25519 pubkeys of validators currently on chain.
    active_pubkeys: HashSet<String>,
}

impl ValidatorIndex {
    /// Builds the reverse indices from an already-derived validator list.
    /// `wallet_of` maps a raw contributor address to its canonical form.
    pub fn build(
        seq: u64,
        info: ChainInfo,
        validators: Vec<ValidatorRecord>,
        wallet_of: impl Fn(&str) -> String,
    ) -> ValidatorIndex {
        let mut wallet_to_validators: HashMap<String, Vec<usize>> = HashMap::new();
        let mut active_pubkeys = HashSet::new();

        for (pos, record) in validators.iter().enumerate() {
            active_pubkeys.insert(record.chain.pubkey_ed25519.to_lowercase());
            let mut seen = HashSet::new();
            for contributor in &record.chain.contributors {
                let wallet = wallet_of(&contributor.address);
                if seen.insert(wallet.clone()) {
                    wallet_to_validators.entry(wallet).or_default().push(pos);
                }
            }
        }

        ValidatorIndex { seq, info, validators, wallet_to_validators, active_pubkeys }
    }

    /// Validators the given canonical wallet contributes to.
    pub fn validators_for_wallet(&self, wallet: &str) -> Vec<&ValidatorRecord> {
        self.wallet_to_validators
            .get(wallet)
            .map(|positions| positions.iter().map(|&pos| &self.validators[pos]).collect())
            .unwrap_or_default()
    }

    /// Whether the primary pubkey (lowercase hex) is on chain right now.
    pub fn is_active_pubkey(&self, pubkey_hex: &str) -> bool {
        self.active_pubkeys.contains(pubkey_hex)
    }
}

/// One published view of all known contribution contracts.
#[derive(Debug, Default)]
pub struct ContractIndex {
    pub seq: u64,
    contracts: HashMap<EthAddress, ContractRecord>,
    /// Canonical wallet string to contract addresses it contributes to.
    wallet_to_contracts: HashMap<String, Vec<EthAddress>>,
}

impl ContractIndex {
    pub fn build(seq: u64, contracts: HashMap<EthAddress, ContractRecord>) -> ContractIndex {
        let mut wallet_to_contracts: HashMap<String, Vec<EthAddress>> = HashMap::new();
        for (address, record) in &contracts {
            for contribution in &record.contributions {
                let entry = wallet_to_contracts.entry(contribution.address.clone()).or_default();
                if !entry.contains(address) {
                    entry.push(*address);
                }
            }
        }
        ContractIndex { seq, contracts, wallet_to_contracts }
    }

    pub fn get(&self, address: &EthAddress) -> Option<&ContractRecord> {
        self.contracts.get(address)
    }

    pub fn contracts_for_wallet(&self, wallet: &str) -> Vec<&ContractRecord> {
        self.wallet_to_contracts
            .get(wallet)
            .map(|addrs| addrs.iter().filter_map(|a| self.contracts.get(a)).collect())
            .unwrap_or_default()
    }

    /// All contracts still open for contributions.
    pub fn open_contracts(&self) -> Vec<&ContractRecord> {
        let mut open: Vec<&ContractRecord> =
            self.contracts.values().filter(|record| record.is_open()).collect();
        open.sort_by(|a, b| a.address.cmp(&b.address));
        open
    }

    pub fn len(&self) -> usize {
        self.contracts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contracts.is_empty()
    }
}

/// Shared publication point read by the API and written by the cycles.
#[derive(Default)]
pub struct SharedIndex {
    validators: RwLock<Arc<ValidatorIndex>>,
    contracts: RwLock<Arc<ContractIndex>>,
    next_seq: AtomicU64,
}

impl SharedIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Draws the sequence number for a snapshot build that starts now.
    pub fn begin_cycle(&self) -> u64 {
        self.next_seq.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Cheap whole-snapshot handle; never blocks on a build in progress.
    pub fn validators(&self) -> Arc<ValidatorIndex> {
        self.validators.read().clone()
    }

    pub fn contracts(&self) -> Arc<ContractIndex> {
        self.contracts.read().clone()
    }

    /// Swaps in a finished validator snapshot. Returns false when a newer
    /// snapshot has already published, in which case this one is dropped.
    pub fn publish_validators(&self, index: ValidatorIndex) -> bool {
        let mut slot = self.validators.write();
        if index.seq < slot.seq {
            debug!(stale = index.seq, current = slot.seq, "discarding stale validator snapshot");
            return false;
        }
        *slot = Arc::new(index);
        true
    }

    pub fn publish_contracts(&self, index: ContractIndex) -> bool {
        let mut slot = self.contracts.write();
        if index.seq < slot.seq {
            debug!(stale = index.seq, current = slot.seq, "discarding stale contract snapshot");
            return false;
        }
        *slot = Arc::new(index);
        true
    }
}
