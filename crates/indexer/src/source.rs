//! Chain data source seam.
//!
//! The reconciler never talks to a blockchain node directly; it consumes
//! this trait. The wire RPC protocol and contract call bindings are
//! deployment concerns outside this crate. [`MockChainSource`] is the
//! in-process implementation used by tests and development wiring.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Serialize;
use thiserror::Error;

use portal_common::currency::AtomicAmount;
use portal_common::eth::EthAddress;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    /// Upstream fetch failed; the cycle should skip this tick and leave
    /// the previous snapshot untouched.
    #[error("transient fetch failure: {0}")]
    Transient(String),

    #[error("invalid upstream data: {0}")]
    Invalid(String),
}

/// General chain info attached to every API response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChainInfo {
    pub nettype: String,
    pub hard_fork: u32,
    pub height: u64,
    pub top_block_hash: String,
    pub version: String,
}

/// One locked per-contributor entry inside a validator's contributor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LockedContribution {
    pub amount: AtomicAmount,
    pub key_image: String,
}

/// A contributor as reported by the validator service.
///
/// `address` is either 40 hex digits (a 20-byte account) or a
/// network-native wallet string; the reconciler normalizes the former.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChainContributor {
    pub address: String,
    pub amount: AtomicAmount,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub locked_contributions: Vec<LockedContribution>,
}

/// Raw on-chain validator record, before derivation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChainValidator {
    pub service_node_pubkey: String,
    pub pubkey_ed25519: String,
    pub bls_key: String,
    pub active: bool,
    pub funded: bool,
    pub earned_downtime_blocks: i64,
    pub staking_requirement: AtomicAmount,
    pub total_contributed: AtomicAmount,
    pub total_reserved: AtomicAmount,
    pub portions_for_operator: u64,
    pub operator_address: String,
    pub requested_unlock_height: u64,
    pub last_uptime_proof: u64,
    pub state_height: u64,
    pub swarm_id: u64,
    pub is_removable: bool,
    pub is_liquidatable: bool,
    pub contributors: Vec<ChainContributor>,
}

/// Current on-chain status of one contribution contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractStatus {
    pub finalized: bool,
    pub cancelled: bool,
    pub bls_pubkey: String,
    /// Operator fee in basis points (0..=10000).
    pub fee: u16,
    pub service_node_pubkey: String,
    pub service_node_signature: String,
    pub contributions: Vec<(EthAddress, AtomicAmount)>,
    pub total_contributions: AtomicAmount,
}

/// Authoritative chain data the reconciliation cycles consume.
#[async_trait]
pub trait ChainSource: Send + Sync + 'static {
    async fn info(&self) -> Result<ChainInfo, SourceError>;

    /// Full current validator list.
    async fn service_nodes(&self) -> Result<Vec<ChainValidator>, SourceError>;

    /// Contribution-contract addresses created since the last call.
    async fn new_contract_addresses(&self) -> Result<Vec<EthAddress>, SourceError>;

    /// Current status of one known contract.
    async fn contract_status(&self, address: &EthAddress) -> Result<ContractStatus, SourceError>;
}

// ════════════════════════════════════════════════════════════════════════════
// MOCK SOURCE
// ════════════════════════════════════════════════════════════════════════════

#[derive(Default)]
struct MockState {
    info: ChainInfo,
    nodes: Vec<ChainValidator>,
    pending_contracts: Vec<EthAddress>,
    statuses: HashMap<EthAddress, ContractStatus>,
    fail_next: bool,
}

/// Scriptable in-process chain source.
///
/// Tests load it with data, optionally inject a one-shot failure, and
/// can add an artificial fetch delay to exercise snapshot atomicity.
#[derive(Default)]
pub struct MockChainSource {
    state: Mutex<MockState>,
    fetch_delay: Mutex<Option<Duration>>,
}

impl MockChainSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_info(&self, info: ChainInfo) {
        self.state.lock().info = info;
    }

    pub fn set_nodes(&self, nodes: Vec<ChainValidator>) {
        self.state.lock().nodes = nodes;
    }

    /// Queues contract creation events for the next discovery fetch.
    pub fn push_new_contracts(&self, addresses: Vec<EthAddress>) {
        self.state.lock().pending_contracts.extend(addresses);
    }

    pub fn set_contract_status(&self, address: EthAddress, status: ContractStatus) {
        self.state.lock().statuses.insert(address, status);
    }

    /// Makes the next fetch (any kind) fail with a transient error.
    pub fn fail_next_fetch(&self) {
        self.state.lock().fail_next = true;
    }

    /// Adds an artificial delay to every fetch, for atomicity tests.
    pub fn set_fetch_delay(&self, delay: Duration) {
        *self.fetch_delay.lock() = Some(delay);
    }

    async fn pre_fetch(&self) -> Result<(), SourceError> {
        let delay = *self.fetch_delay.lock();
        if let Some(d) = delay {
            tokio::time::sleep(d).await;
        }
        let mut state = self.state.lock();
        if state.fail_next {
            state.fail_next = false;
            return Err(SourceError::Transient("injected failure".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl ChainSource for MockChainSource {
    async fn info(&self) -> Result<ChainInfo, SourceError> {
        self.pre_fetch().await?;
        Ok(self.state.lock().info.clone())
    }

    async fn service_nodes(&self) -> Result<Vec<ChainValidator>, SourceError> {
        self.pre_fetch().await?;
        Ok(self.state.lock().nodes.clone())
    }

    async fn new_contract_addresses(&self) -> Result<Vec<EthAddress>, SourceError> {
        self.pre_fetch().await?;
        Ok(std::mem::take(&mut self.state.lock().pending_contracts))
    }

    async fn contract_status(&self, address: &EthAddress) -> Result<ContractStatus, SourceError> {
        self.pre_fetch().await?;
        self.state
            .lock()
            .statuses
            .get(address)
            .cloned()
            .ok_or_else(|| SourceError::Transient(format!("unknown contract 0x{}", hex::encode(address))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_drains_pending_contracts() {
        let source = MockChainSource::new();
        source.push_new_contracts(vec![[1u8; 20], [2u8; 20]]);
        assert_eq!(source.new_contract_addresses().await.unwrap().len(), 2);
        assert!(source.new_contract_addresses().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_mock_one_shot_failure() {
        let source = MockChainSource::new();
        source.fail_next_fetch();
        assert!(matches!(source.info().await, Err(SourceError::Transient(_))));
        assert!(source.info().await.is_ok());
    }
}
