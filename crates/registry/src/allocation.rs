//! Stake allocation rules.
//!
//! Two closely related algorithms live here and must not be merged:
//!
//! - [`validate_plan`] applies the unconditional proportional rule used
//!   for bookkeeping: the operator (slot 0) must cover at least a
//!   quarter of the total requirement, and every later contributor at
//!   least an equal share (floor division) of whatever is still
//!   unfilled given the spots still open.
//! - [`validate_registration`] applies the registration-time rule for
//!   reserved, not-yet-committed contributor slots, where the minimum
//!   uses **ceiling** division so the total provably remains reachable
//!   without overshooting the requirement.
//!
//! The floor/ceiling asymmetry is deliberate and mirrors the network's
//! reference behavior; see DESIGN.md before touching either.

use std::collections::HashSet;
use std::hash::Hash;

use thiserror::Error;

use portal_common::currency::AtomicAmount;

/// Network-wide staking constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StakeRequirement {
    /// Total stake needed to fully fund one node.
    pub max_stake: AtomicAmount,
    /// Maximum number of contributor spots, operator included.
    pub max_stakers: usize,
}

impl StakeRequirement {
    /// The operator must always cover at least a quarter of the total.
    pub fn min_operator_stake(&self) -> AtomicAmount {
        self.max_stake / 4
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AllocationError {
    /// Stake and wallet lists have different lengths.
    #[error("stake and wallet lists have different lengths ({stakes} vs {wallets})")]
    MismatchedLists { stakes: usize, wallets: usize },

    /// At least one contributor (the operator) is required.
    #[error("at least one wallet/stake pair is required")]
    EmptyPlan,

    #[error("too many stakers ({count} > {max})")]
    TooManyStakers { count: usize, max: usize },

    #[error("total stake is too large ({total} > {maximum})")]
    TotalTooLarge { total: AtomicAmount, maximum: AtomicAmount },

    #[error("duplicate staking address at position {index}")]
    DuplicateStaker { index: usize },

    /// A specific contribution is below its computed minimum. `index` is
    /// the position within the submitted sequence (0 = operator for
    /// [`validate_plan`], 0 = first reserved slot for
    /// [`validate_registration`]).
    #[error("contribution {index} is too low ({amount} < {minimum})")]
    DeficitAtIndex {
        index: usize,
        amount: AtomicAmount,
        minimum: AtomicAmount,
    },

    /// Solo registrations must stake the exact requirement.
    #[error("a solo registration must stake exactly {required}, got {total}")]
    WrongTotal { total: AtomicAmount, required: AtomicAmount },

    #[error("operator stake is too low ({amount} < {minimum})")]
    InsufficientOperatorStake { amount: AtomicAmount, minimum: AtomicAmount },
}

/// Residual capacity after an accepted multi-contributor registration,
/// for client-side guidance only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemainingContribution {
    /// Stake still unfilled.
    pub stake: AtomicAmount,
    /// Contributor spots still open.
    pub spots: usize,
    /// Ceiling-divided minimum for the next hypothetical contributor
    /// (zero when no spots remain).
    pub min_contribution: AtomicAmount,
}

/// Successful validation outcome. `remaining` is present for
/// multi-contributor registrations only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllocationReport {
    pub remaining: Option<RemainingContribution>,
}

fn div_ceil(a: AtomicAmount, b: AtomicAmount) -> AtomicAmount {
    debug_assert!(b > 0);
    (a + b - 1) / b
}

fn checked_total(stakes: &[AtomicAmount]) -> u128 {
    stakes.iter().map(|&s| s as u128).sum()
}

/// Validates a committed contribution plan: parallel `wallets` / `stakes`
/// sequences whose first entry is the operator.
///
/// Precondition checks run in a fixed order, each with a distinct error:
/// list length mismatch, empty plan, too many stakers, total too large,
/// duplicate wallets. Then the proportional minimum rule is applied left
/// to right: divisor 4 for the operator slot, the number of spots still
/// open (floor) for everyone after.
pub fn validate_plan<W: Eq + Hash>(
    wallets: &[W],
    stakes: &[AtomicAmount],
    requirement: &StakeRequirement,
) -> Result<(), AllocationError> {
    if wallets.len() != stakes.len() {
        return Err(AllocationError::MismatchedLists {
            stakes: stakes.len(),
            wallets: wallets.len(),
        });
    }
    if wallets.is_empty() {
        return Err(AllocationError::EmptyPlan);
    }
    if wallets.len() > requirement.max_stakers {
        return Err(AllocationError::TooManyStakers {
            count: wallets.len(),
            max: requirement.max_stakers,
        });
    }
    let total = checked_total(stakes);
    if total > requirement.max_stake as u128 {
        return Err(AllocationError::TotalTooLarge {
            total: total.min(u64::MAX as u128) as AtomicAmount,
            maximum: requirement.max_stake,
        });
    }
    let mut seen = HashSet::with_capacity(wallets.len());
    for (index, wallet) in wallets.iter().enumerate() {
        if !seen.insert(wallet) {
            return Err(AllocationError::DuplicateStaker { index });
        }
    }

    let mut remaining_stake = requirement.max_stake;
    let mut remaining_spots = requirement.max_stakers;
    for (index, &amount) in stakes.iter().enumerate() {
        let divisor = if index == 0 { 4 } else { remaining_spots as AtomicAmount };
        let minimum = remaining_stake / divisor;
        if amount < minimum {
            return Err(AllocationError::DeficitAtIndex { index, amount, minimum });
        }
        remaining_stake -= amount.min(remaining_stake);
        remaining_spots -= 1;
    }
    Ok(())
}

/// Validates a proposed registration's stake split.
///
/// For a solo registration (`is_solo`) the grand total (operator plus
/// any reserved amounts) must equal the requirement exactly. For a
/// multi-contributor registration the operator must reach the quarter
/// minimum, the grand total must not exceed the requirement, the spot
/// count must fit, and each reserved slot must meet the ceiling-divided
/// share of what the slots after it could still need.
pub fn validate_registration(
    operator_stake: AtomicAmount,
    reserved: &[AtomicAmount],
    is_solo: bool,
    requirement: &StakeRequirement,
) -> Result<AllocationReport, AllocationError> {
    let total = operator_stake as u128 + checked_total(reserved);

    if is_solo {
        if total != requirement.max_stake as u128 {
            return Err(AllocationError::WrongTotal {
                total: total.min(u64::MAX as u128) as AtomicAmount,
                required: requirement.max_stake,
            });
        }
        return Ok(AllocationReport { remaining: None });
    }

    if operator_stake < requirement.min_operator_stake() {
        return Err(AllocationError::InsufficientOperatorStake {
            amount: operator_stake,
            minimum: requirement.min_operator_stake(),
        });
    }
    if total > requirement.max_stake as u128 {
        return Err(AllocationError::TotalTooLarge {
            total: total.min(u64::MAX as u128) as AtomicAmount,
            maximum: requirement.max_stake,
        });
    }
    if 1 + reserved.len() > requirement.max_stakers {
        return Err(AllocationError::TooManyStakers {
            count: 1 + reserved.len(),
            max: requirement.max_stakers,
        });
    }

    let mut remaining_stake = requirement.max_stake - operator_stake;
    let mut remaining_spots = requirement.max_stakers - 1;
    for (index, &amount) in reserved.iter().enumerate() {
        let minimum = div_ceil(remaining_stake, remaining_spots as AtomicAmount);
        if amount < minimum {
            return Err(AllocationError::DeficitAtIndex { index, amount, minimum });
        }
        remaining_stake -= amount.min(remaining_stake);
        remaining_spots -= 1;
    }

    let min_contribution = if remaining_spots == 0 {
        0
    } else {
        div_ceil(remaining_stake, remaining_spots as AtomicAmount)
    };
    Ok(AllocationReport {
        remaining: Some(RemainingContribution {
            stake: remaining_stake,
            spots: remaining_spots,
            min_contribution,
        }),
    })
}
