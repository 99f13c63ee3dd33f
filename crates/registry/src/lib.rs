//! # Portal Registry Crate
//!
//! Validation logic for service-node stake registrations:
//!
//! - `material`: the pubkey/signature bundle a registration carries
//! - `signature`: internal-consistency and authenticity checks
//! - `allocation`: the proportional minimum-contribution rules
//!
//! All of this is pure, synchronous logic. I/O (HTTP parsing, durable
//! storage, chain access) lives in the surrounding crates.

pub mod allocation;
pub mod material;
pub mod signature;

pub use allocation::{AllocationError, AllocationReport, StakeRequirement};
pub use material::{RegistrationKind, ValidatorKeyMaterial};
pub use signature::{SignatureBackend, SignatureError, SignatureReport};
