//! 20-byte address parsing and EIP-55 checksum formatting.
//!
//! Replaces the ad-hoc address handling the portal previously leaned on:
//! strict `0x`-prefixed parsing (with checksum verification when the input
//! is mixed-case) and canonical checksummed rendering for index keys.

use sha3::{Digest, Keccak256};
use thiserror::Error;

/// Raw 20-byte account address.
pub type EthAddress = [u8; 20];

pub const ETH_ADDRESS_LEN: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EthAddressError {
    #[error("not a 0x-prefixed 40-hex-digit address: {0:?}")]
    BadFormat(String),

    #[error("address checksum failed: {0:?}")]
    BadChecksum(String),
}

/// Parses a `0x`-prefixed textual address into raw bytes.
///
/// All-lowercase and all-uppercase inputs are accepted as-is; mixed-case
/// inputs must carry a valid EIP-55 checksum.
pub fn parse_address(text: &str) -> Result<EthAddress, EthAddressError> {
    let hex_part = text
        .strip_prefix("0x")
        .ok_or_else(|| EthAddressError::BadFormat(text.to_string()))?;
    if hex_part.len() != ETH_ADDRESS_LEN * 2 || !hex_part.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(EthAddressError::BadFormat(text.to_string()));
    }

    let mut out = [0u8; ETH_ADDRESS_LEN];
    // infallible after the hexdigit check above
    hex::decode_to_slice(hex_part, &mut out)
        .map_err(|_| EthAddressError::BadFormat(text.to_string()))?;

    let has_upper = hex_part.bytes().any(|b| b.is_ascii_uppercase());
    let has_lower = hex_part.bytes().any(|b| b.is_ascii_lowercase());
    if has_upper && has_lower && to_checksum(&out) != text {
        return Err(EthAddressError::BadChecksum(text.to_string()));
    }
    Ok(out)
}

/// Parses a bare 40-hex-digit address with no `0x` prefix and no checksum
/// requirement. Chain sources report contributor keys in this form.
pub fn parse_unprefixed(text: &str) -> Result<EthAddress, EthAddressError> {
    if text.len() != ETH_ADDRESS_LEN * 2 || !text.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(EthAddressError::BadFormat(text.to_string()));
    }
    let mut out = [0u8; ETH_ADDRESS_LEN];
    hex::decode_to_slice(text, &mut out)
        .map_err(|_| EthAddressError::BadFormat(text.to_string()))?;
    Ok(out)
}

/// Renders an address in canonical EIP-55 checksummed form.
///
/// A hex digit is uppercased when the corresponding nibble of
/// `keccak256(lowercase_hex)` is at least 8.
pub fn to_checksum(address: &EthAddress) -> String {
    let lower = hex::encode(address);
    let hash = Keccak256::digest(lower.as_bytes());

    let mut out = String::with_capacity(2 + ETH_ADDRESS_LEN * 2);
    out.push_str("0x");
    for (i, c) in lower.chars().enumerate() {
        let nibble = if i % 2 == 0 {
            hash[i / 2] >> 4
        } else {
            hash[i / 2] & 0x0f
        };
        if c.is_ascii_alphabetic() && nibble >= 8 {
            out.push(c.to_ascii_uppercase());
        } else {
            out.push(c);
        }
    }
    out
}
