//! # Portal API Crate
//!
//! The HTTP surface of the staking portal: registration storage and
//! validation endpoints plus read-only queries over the reconciled
//! chain-state snapshots.

pub mod error;
pub mod handlers;
pub mod params;

pub use error::{ApiError, ErrorContext};
pub use handlers::{router, AppState};
