//! # Portal Indexer Crate
//!
//! Reconciles live on-chain validator and contribution-contract state
//! into queryable, immutable snapshots.
//!
//! ## Cycles
//!
//! Three independent cycles, each triggered periodically and idempotent:
//!
//! 1. **Contract discovery** — new contract addresses into the durable
//!    directory (duplicates are no-ops).
//! 2. **Contract status** — every known contract's on-chain status into
//!    a fresh [`ContractIndex`].
//! 3. **Validator snapshot** — the full validator list, classified and
//!    derived, into a fresh [`ValidatorIndex`].
//!
//! ## Publication
//!
//! Each cycle builds its snapshot in isolation and publishes it with a
//! single atomic swap. Readers always see a whole snapshot; a cycle that
//! fails upstream publishes nothing, and a build that finishes after a
//! newer one has published is discarded (monotonic sequence numbers).
//! The contract and validator snapshots synchronize independently, so
//! they may be momentarily inconsistent with each other; that window is
//! accepted, not a bug.

pub mod reconciler;
pub mod records;
pub mod runner;
pub mod snapshot;
pub mod source;

pub use reconciler::{canonical_wallet, ReconcileError, Reconciler};
pub use records::{ContractRecord, Lifecycle, ValidatorRecord};
pub use runner::ReconcilerRunner;
pub use snapshot::{ContractIndex, SharedIndex, ValidatorIndex};
pub use source::{ChainInfo, ChainSource, ChainValidator, ContractStatus, MockChainSource, SourceError};
