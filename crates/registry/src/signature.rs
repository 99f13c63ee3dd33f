//! Registration signature validation.
//!
//! Checks that a claimed pubkey pair is internally consistent and that
//! the primary signature authenticates it. The signature primitive is a
//! trait seam so the crate stays free of any particular crypto backend.
//!
//! Secondary (BLS) signature verification is NOT implemented: no BLS
//! backend is wired in. Rather than silently accepting, the gap is
//! surfaced in [`SignatureReport::secondary_checked`] and can be turned
//! into a hard failure via `require_secondary`.

use thiserror::Error;
use tracing::warn;

use portal_common::crypto;

use crate::material::{
    ValidatorKeyMaterial, OPERATOR_LEN, PRIMARY_PUBKEY_LEN, PRIMARY_SIGNATURE_LEN,
    SECONDARY_PUBKEY_LEN,
};

/// Signature primitive the validator relies on. Treated as a trusted
/// external capability.
pub trait SignatureBackend: Send + Sync {
    /// True when the 32 bytes are a valid point on the signing curve.
    fn is_valid_point(&self, pubkey: &[u8; 32]) -> bool;

    /// Verify `signature` over `message` under `pubkey`.
    fn verify(&self, pubkey: &[u8; 32], message: &[u8], signature: &[u8; 64]) -> bool;
}

/// Ed25519 backend over the shared crypto helpers.
#[derive(Debug, Default, Clone, Copy)]
pub struct Ed25519Backend;

impl SignatureBackend for Ed25519Backend {
    fn is_valid_point(&self, pubkey: &[u8; 32]) -> bool {
        crypto::is_valid_point(pubkey)
    }

    fn verify(&self, pubkey: &[u8; 32], message: &[u8], signature: &[u8; 64]) -> bool {
        crypto::verify_signature(pubkey, message, signature).unwrap_or(false)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignatureError {
    #[error("primary pubkey is invalid")]
    InvalidPrimaryKey,

    #[error("secondary pubkey is invalid")]
    InvalidSecondaryKey,

    #[error("operator address is invalid")]
    InvalidOperator,

    #[error("contract address is invalid")]
    InvalidContract,

    #[error("primary signature is invalid")]
    InvalidPrimarySignature,

    /// Secondary-signature verification was required but no backend for
    /// it exists.
    #[error("secondary signature verification is not available")]
    SecondaryUnsupported,
}

/// What a successful validation actually established.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignatureReport {
    /// Always false until a BLS backend exists. Exposed so callers can
    /// report the gap instead of implying full verification.
    pub secondary_checked: bool,
}

/// Validates registration key material.
///
/// Checks, in order: primary pubkey length and curve validity, secondary
/// pubkey length, operator length, contract length (when present), then
/// the primary signature over `primary_pubkey || secondary_pubkey`.
pub fn validate_key_material(
    material: &ValidatorKeyMaterial,
    backend: &dyn SignatureBackend,
    require_secondary: bool,
) -> Result<SignatureReport, SignatureError> {
    if material.primary_pubkey.len() != PRIMARY_PUBKEY_LEN {
        return Err(SignatureError::InvalidPrimaryKey);
    }
    let mut primary = [0u8; PRIMARY_PUBKEY_LEN];
    primary.copy_from_slice(&material.primary_pubkey);
    if !backend.is_valid_point(&primary) {
        return Err(SignatureError::InvalidPrimaryKey);
    }

    if material.secondary_pubkey.len() != SECONDARY_PUBKEY_LEN {
        return Err(SignatureError::InvalidSecondaryKey);
    }
    if material.operator.len() != OPERATOR_LEN {
        return Err(SignatureError::InvalidOperator);
    }
    if let Some(contract) = &material.contract {
        if contract.len() != OPERATOR_LEN {
            return Err(SignatureError::InvalidContract);
        }
    }

    if material.primary_signature.len() != PRIMARY_SIGNATURE_LEN {
        return Err(SignatureError::InvalidPrimarySignature);
    }
    let mut sig = [0u8; PRIMARY_SIGNATURE_LEN];
    sig.copy_from_slice(&material.primary_signature);
    if !backend.verify(&primary, &material.signed_message(), &sig) {
        return Err(SignatureError::InvalidPrimarySignature);
    }

    if require_secondary {
        return Err(SignatureError::SecondaryUnsupported);
    }
    warn!("secondary (BLS) registration signature accepted unverified: no backend available");
    Ok(SignatureReport { secondary_checked: false })
}
