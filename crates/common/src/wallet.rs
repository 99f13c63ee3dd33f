//! Network-native wallet textual format.
//!
//! Legacy wallets are base58 strings whose prefix and length depend on the
//! network type. These are validated as opaque text; only 20-byte addresses
//! get checksum normalization (see [`crate::eth`]).

use serde::Deserialize;
use std::fmt;

use crate::eth::{self, EthAddress};

/// Base58 alphabet used by native wallets (no `0`, `O`, `I`, `l`).
const B58: &str = "123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";

/// Network type, selecting native wallet prefix/length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Mainnet,
    Testnet,
    Devnet,
    Stagenet,
}

impl Network {
    /// `(prefix, total_length)` of a native wallet on this network.
    fn wallet_shape(self) -> (&'static str, usize) {
        match self {
            Network::Mainnet => ("L", 95),
            Network::Testnet => ("T", 97),
            Network::Devnet => ("dV", 97),
            Network::Stagenet => ("ST", 97),
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Network::Mainnet => "mainnet",
            Network::Testnet => "testnet",
            Network::Devnet => "devnet",
            Network::Stagenet => "stagenet",
        };
        write!(f, "{name}")
    }
}

/// Returns true when `text` is a well-formed native wallet for `network`.
pub fn is_native_wallet(text: &str, network: Network) -> bool {
    let (prefix, len) = network.wallet_shape();
    if text.len() != len || !text.starts_with(prefix) {
        return false;
    }
    text[prefix.len()..].chars().all(|c| B58.contains(c))
}

/// A funding wallet in either supported form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Wallet {
    /// 20-byte account address.
    Eth(EthAddress),
    /// Native wallet, kept as opaque validated text.
    Native(String),
}

impl Wallet {
    /// Classifies a textual wallet. `0x…` addresses must parse (and, if
    /// mixed-case, carry a valid checksum); anything else must match the
    /// network's native wallet shape.
    pub fn parse(text: &str, network: Network) -> Option<Wallet> {
        if text.starts_with("0x") {
            return eth::parse_address(text).ok().map(Wallet::Eth);
        }
        if is_native_wallet(text, network) {
            return Some(Wallet::Native(text.to_string()));
        }
        None
    }

    /// Canonical index key: checksummed form for addresses, the text
    /// itself for native wallets.
    pub fn canonical(&self) -> String {
        match self {
            Wallet::Eth(addr) => eth::to_checksum(addr),
            Wallet::Native(s) => s.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fake_wallet(prefix: &str, total_len: usize) -> String {
        let mut s = prefix.to_string();
        while s.len() < total_len {
            s.push('3');
        }
        s
    }

    #[test]
    fn test_native_wallet_shapes() {
        assert!(is_native_wallet(&fake_wallet("L", 95), Network::Mainnet));
        assert!(is_native_wallet(&fake_wallet("T", 97), Network::Testnet));
        assert!(is_native_wallet(&fake_wallet("dV", 97), Network::Devnet));
        assert!(is_native_wallet(&fake_wallet("ST", 97), Network::Stagenet));
    }

    #[test]
    fn test_native_wallet_rejects_wrong_network() {
        let mainnet = fake_wallet("L", 95);
        assert!(!is_native_wallet(&mainnet, Network::Testnet));
    }

    #[test]
    fn test_native_wallet_rejects_bad_charset() {
        // '0' is not in the base58 alphabet
        let mut w = fake_wallet("L", 95);
        w.replace_range(10..11, "0");
        assert!(!is_native_wallet(&w, Network::Mainnet));
    }

    #[test]
    fn test_native_wallet_rejects_wrong_length() {
        assert!(!is_native_wallet(&fake_wallet("L", 94), Network::Mainnet));
        assert!(!is_native_wallet(&fake_wallet("L", 96), Network::Mainnet));
    }

    #[test]
    fn test_wallet_parse_classifies() {
        let eth = "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed";
        match Wallet::parse(eth, Network::Mainnet) {
            Some(Wallet::Eth(addr)) => assert_eq!(eth::to_checksum(&addr), eth),
            other => panic!("expected eth wallet, got {other:?}"),
        }

        let native = fake_wallet("L", 95);
        assert_eq!(
            Wallet::parse(&native, Network::Mainnet),
            Some(Wallet::Native(native.clone()))
        );

        assert_eq!(Wallet::parse("nonsense", Network::Mainnet), None);
    }

    #[test]
    fn test_canonical_normalizes_case() {
        let lower = "0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed";
        let wallet = Wallet::parse(lower, Network::Mainnet).unwrap();
        assert_eq!(wallet.canonical(), "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed");
    }
}
