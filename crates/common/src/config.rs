//! Typed TOML configuration for the portal services.
//!
//! Every field has a sensible default so a missing or partial file still
//! yields a runnable development configuration.

use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::currency::{AtomicAmount, DEFAULT_DECIMALS};
use crate::wallet::Network;
use crate::Result;

#[derive(Debug, Deserialize, Clone)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Bind address for the HTTP API (e.g. "127.0.0.1:8080").
    pub bind_addr: String,

    /// Directory for the durable registration database.
    pub db_path: String,

    /// Network type, selecting the native wallet format.
    pub network: Network,

    /// Display name of the staking token, used in error messages.
    pub token: String,

    /// When true, registrations whose secondary (BLS) signature cannot be
    /// verified are rejected instead of accepted-with-flag.
    pub require_secondary_signature: bool,

    pub staking: StakingConfig,
    pub intervals: IntervalConfig,
}

/// Network-wide staking constants.
#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default, deny_unknown_fields)]
pub struct StakingConfig {
    /// Total stake needed to fully fund one node, in atomic units.
    pub max_stake: AtomicAmount,
    /// Maximum number of contributor spots, operator included.
    pub max_stakers: usize,
    /// Decimal places of the display denomination.
    pub decimals: u32,
}

/// Periods of the reconciliation cycles, in seconds.
#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default, deny_unknown_fields)]
pub struct IntervalConfig {
    pub contract_discovery_secs: u64,
    pub contract_status_secs: u64,
    pub validator_snapshot_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            bind_addr: "127.0.0.1:8080".to_string(),
            db_path: "./data/portal-db".to_string(),
            network: Network::Mainnet,
            token: "SNT".to_string(),
            require_secondary_signature: false,
            staking: StakingConfig::default(),
            intervals: IntervalConfig::default(),
        }
    }
}

impl Default for StakingConfig {
    fn default() -> Self {
        StakingConfig {
            max_stake: 120_000_000_000_000,
            max_stakers: 10,
            decimals: DEFAULT_DECIMALS,
        }
    }
}

impl Default for IntervalConfig {
    fn default() -> Self {
        IntervalConfig {
            contract_discovery_secs: 10,
            contract_status_secs: 30,
            validator_snapshot_secs: 10,
        }
    }
}

/// Load config from a TOML file path.
/// If the file is missing or fails to parse, an error is returned.
pub fn load_from_file(path: impl AsRef<Path>) -> Result<Config> {
    let s = fs::read_to_string(path.as_ref())?;
    let cfg: Config = toml::from_str(&s)?;
    Ok(cfg)
}
