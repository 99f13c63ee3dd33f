//! The three reconciliation cycles.
//!
//! Each cycle is a fallible, idempotent unit of work; the runner decides
//! when to trigger them. A fetch failure aborts the whole cycle before
//! anything publishes, so readers keep the previous snapshot.

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, warn};

use portal_common::eth;
use portal_store::{ContractDirectory, StoreError};

use crate::records::{ContractRecord, ValidatorRecord};
use crate::snapshot::{ContractIndex, SharedIndex, ValidatorIndex};
use crate::source::{ChainSource, SourceError};

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("chain fetch failed: {0}")]
    Source(#[from] SourceError),

    #[error("store failure: {0}")]
    Store(#[from] StoreError),
}

/// Canonical form of a contributor address as reported by the chain:
/// 40 bare hex digits become a checksummed account address, anything
/// else (native wallets, already-prefixed strings) passes through.
pub fn canonical_wallet(raw: &str) -> String {
    match eth::parse_unprefixed(raw) {
        Ok(address) => eth::to_checksum(&address),
        Err(_) => raw.to_string(),
    }
}

pub struct Reconciler {
    source: Arc<dyn ChainSource>,
    directory: Arc<dyn ContractDirectory>,
    index: Arc<SharedIndex>,
}

impl Reconciler {
    pub fn new(
        source: Arc<dyn ChainSource>,
        directory: Arc<dyn ContractDirectory>,
        index: Arc<SharedIndex>,
    ) -> Self {
        Self { source, directory, index }
    }

    /// Cycle 1: pull newly created contract addresses into the durable
    /// directory. Re-delivered addresses are no-ops.
    pub async fn discover_contracts(&self) -> Result<usize, ReconcileError> {
        let addresses = self.source.new_contract_addresses().await?;
        let mut added = 0;
        for address in &addresses {
            if self.directory.insert(address)? {
                info!(contract = %eth::to_checksum(address), "discovered contribution contract");
                added += 1;
            }
        }
        Ok(added)
    }

    /// Cycle 2: refresh every known contract's status into a fresh
    /// snapshot. Any single failed status fetch aborts the whole cycle.
    pub async fn refresh_contracts(&self) -> Result<bool, ReconcileError> {
        let seq = self.index.begin_cycle();
        let addresses = self.directory.all()?;

        let mut contracts = HashMap::with_capacity(addresses.len());
        for address in addresses {
            let status = self.source.contract_status(&address).await?;
            contracts.insert(address, ContractRecord::from_status(&address, status));
        }

        let count = contracts.len();
        let published = self.index.publish_contracts(ContractIndex::build(seq, contracts));
        if published {
            debug!(seq, contracts = count, "published contract snapshot");
        }
        Ok(published)
    }

    /// Cycle 3: rebuild the validator snapshot from the full chain list.
    pub async fn refresh_validators(&self) -> Result<bool, ReconcileError> {
        let seq = self.index.begin_cycle();
        let info = self.source.info().await?;
        let nodes = self.source.service_nodes().await?;

        let height = info.height;
        let validators: Vec<ValidatorRecord> = nodes
            .into_iter()
            .map(|chain| ValidatorRecord::derive(chain, height))
            .collect();

        let count = validators.len();
        let published = self
            .index
            .publish_validators(ValidatorIndex::build(seq, info, validators, canonical_wallet));
        if published {
            debug!(seq, validators = count, height, "published validator snapshot");
        } else {
            warn!(seq, "validator snapshot superseded before publish");
        }
        Ok(published)
    }
}
