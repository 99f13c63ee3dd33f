//! Registration key material.
//!
//! A registration is uniquely identified by `(primary_pubkey, kind)`:
//! at most one solo and one contract record may exist per node pubkey at
//! a time, and a new submission replaces the stored record of the same
//! kind.

use serde::{Deserialize, Serialize};

pub const PRIMARY_PUBKEY_LEN: usize = 32;
pub const SECONDARY_PUBKEY_LEN: usize = 64;
pub const PRIMARY_SIGNATURE_LEN: usize = 64;
pub const SECONDARY_SIGNATURE_LEN: usize = 128;
pub const OPERATOR_LEN: usize = 20;

/// Which on-chain path a registration will be submitted through.
///
/// Solo registrations sign the operator address and call the staking
/// contract directly; contract registrations sign the multi-contributor
/// contract address and go through it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegistrationKind {
    Solo,
    Contract,
}

impl RegistrationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            RegistrationKind::Solo => "solo",
            RegistrationKind::Contract => "contract",
        }
    }

    /// Stable one-byte tag used in storage keys.
    pub fn tag(self) -> u8 {
        match self {
            RegistrationKind::Solo => 0,
            RegistrationKind::Contract => 1,
        }
    }

    pub fn from_tag(tag: u8) -> Option<RegistrationKind> {
        match tag {
            0 => Some(RegistrationKind::Solo),
            1 => Some(RegistrationKind::Contract),
            _ => None,
        }
    }
}

/// The pubkeys and signatures needed to submit a node registration
/// on-chain. Nothing here is confidential; the values are broadcast as
/// part of the registration and are constructed so that only the
/// operator wallet can submit a registration using them.
///
/// Fields are kept as raw byte vectors: lengths are part of what the
/// signature validator checks, so the types deliberately do not enforce
/// them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorKeyMaterial {
    /// Primary (Ed25519) node pubkey, 32 bytes.
    pub primary_pubkey: Vec<u8>,
    /// Secondary (BLS) node pubkey, 64 bytes.
    pub secondary_pubkey: Vec<u8>,
    /// Ed25519 signature over `primary_pubkey || secondary_pubkey`, 64 bytes.
    pub primary_signature: Vec<u8>,
    /// BLS signature over the same message, 128 bytes on the wire.
    pub secondary_signature: Vec<u8>,
    /// Operator funding wallet, 20 bytes.
    pub operator: Vec<u8>,
    /// Multi-contributor contract address, 20 bytes; `None` for solo.
    pub contract: Option<Vec<u8>>,
}

impl ValidatorKeyMaterial {
    pub fn kind(&self) -> RegistrationKind {
        if self.contract.is_some() {
            RegistrationKind::Contract
        } else {
            RegistrationKind::Solo
        }
    }

    /// The byte string both registration signatures cover: the raw
    /// primary pubkey followed by the raw secondary pubkey, no separator.
    pub fn signed_message(&self) -> Vec<u8> {
        let mut msg = Vec::with_capacity(self.primary_pubkey.len() + self.secondary_pubkey.len());
        msg.extend_from_slice(&self.primary_pubkey);
        msg.extend_from_slice(&self.secondary_pubkey);
        msg
    }
}
