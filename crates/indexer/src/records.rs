//! Reconciled, read-only record types.

use serde::Serialize;

use portal_common::currency::AtomicAmount;
use portal_common::eth::{self, EthAddress};

use crate::source::{ChainValidator, ContractStatus};

/// Lifecycle bucket of a reconciled validator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Lifecycle {
    /// Not yet fully funded; open for contributions.
    Awaiting,
    /// Funded and currently in service.
    Active,
    /// Funded but not in service; counting down to deregistration.
    Inactive,
}

/// On-chain validator state plus derived fields, as served to queries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidatorRecord {
    #[serde(flatten)]
    pub chain: ChainValidator,

    /// `staking_requirement - total_reserved`.
    pub contribution_open: AtomicAmount,
    /// `staking_requirement - total_contributed`.
    pub contribution_required: AtomicAmount,
    /// Count of locked per-contributor entries.
    pub num_contributions: usize,

    pub lifecycle: Lifecycle,

    /// For `inactive` only: `max(earned_downtime_blocks, 0)`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decomm_blocks_remaining: Option<u64>,
    /// For `inactive` only: blocks since the recorded state height.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decomm_blocks: Option<u64>,
}

impl ValidatorRecord {
    /// Computes the derived fields and lifecycle bucket for one raw
    /// chain record at the given chain height.
    pub fn derive(chain: ChainValidator, chain_height: u64) -> ValidatorRecord {
        let contribution_open = chain.staking_requirement.saturating_sub(chain.total_reserved);
        let contribution_required =
            chain.staking_requirement.saturating_sub(chain.total_contributed);
        let num_contributions = chain
            .contributors
            .iter()
            .map(|c| c.locked_contributions.len())
            .sum();

        let (lifecycle, decomm_blocks_remaining, decomm_blocks) = if chain.active {
            (Lifecycle::Active, None, None)
        } else if chain.funded {
            (
                Lifecycle::Inactive,
                Some(chain.earned_downtime_blocks.max(0) as u64),
                Some(chain_height.saturating_sub(chain.state_height)),
            )
        } else {
            (Lifecycle::Awaiting, None, None)
        };

        ValidatorRecord {
            chain,
            contribution_open,
            contribution_required,
            num_contributions,
            lifecycle,
            decomm_blocks_remaining,
            decomm_blocks,
        }
    }
}

/// One contributor entry of a reconciled contract, address already in
/// canonical checksummed form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContractContribution {
    pub address: String,
    pub amount: AtomicAmount,
}

/// Reconciled status of one contribution contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContractRecord {
    /// The contract's own address, checksummed.
    pub address: String,
    pub finalized: bool,
    pub cancelled: bool,
    pub bls_pubkey: String,
    /// Operator fee in basis points.
    pub fee: u16,
    pub service_node_pubkey: String,
    pub service_node_signature: String,
    pub contributions: Vec<ContractContribution>,
    pub total_contributions: AtomicAmount,
}

impl ContractRecord {
    pub fn from_status(address: &EthAddress, status: ContractStatus) -> ContractRecord {
        ContractRecord {
            address: eth::to_checksum(address),
            finalized: status.finalized,
            cancelled: status.cancelled,
            bls_pubkey: status.bls_pubkey,
            fee: status.fee,
            service_node_pubkey: status.service_node_pubkey,
            service_node_signature: status.service_node_signature,
            contributions: status
                .contributions
                .into_iter()
                .map(|(addr, amount)| ContractContribution {
                    address: eth::to_checksum(&addr),
                    amount,
                })
                .collect(),
            total_contributions: status.total_contributions,
        }
    }

    /// Open for contributions: neither finalized nor cancelled.
    pub fn is_open(&self) -> bool {
        !self.finalized && !self.cancelled
    }
}
