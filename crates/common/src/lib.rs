//! # Portal Common Crate
//!
//! Shared primitives for the staking portal services.
//!
//! ## Modules
//! - `currency`: lossless fixed-point currency codec
//! - `eth`: 20-byte address parsing and EIP-55 checksum formatting
//! - `wallet`: network-native wallet textual format validation
//! - `crypto`: Ed25519 helpers (keygen, sign, verify, point check)
//! - `config`: typed TOML configuration

pub mod config;
pub mod crypto;
pub mod currency;
pub mod eth;
pub mod wallet;

pub use config::Config;
pub use currency::AtomicAmount;
pub use eth::EthAddress;

pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;
