//! Ed25519 helpers: keypair generation, sign, verify, and point validation.
//! Compatible with ed25519-dalek v2 + rand_core feature enabled.
//!
//! Combined key format (64 bytes):
//!   [0..32]  = private key bytes
//!   [32..64] = public key bytes

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;
use thiserror::Error;

pub const PUBKEY_LEN: usize = 32;
pub const SIGNATURE_LEN: usize = 64;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("invalid key length: expected {expected}, found {found}")]
    InvalidKeyLength { expected: usize, found: usize },

    #[error("invalid signature length: expected {expected}, found {found}")]
    InvalidSignatureLength { expected: usize, found: usize },

    #[error("hex decode error: {0}")]
    Hex(#[from] hex::FromHexError),
}

/// Generate a new Ed25519 keypair and return concatenated 64-byte (private + public).
pub fn generate_keypair_bytes() -> Vec<u8> {
    let mut rng = OsRng;
    let sk = SigningKey::generate(&mut rng);
    let vk = sk.verifying_key();

    let mut combined = Vec::with_capacity(64);
    combined.extend_from_slice(&sk.to_bytes());
    combined.extend_from_slice(&vk.to_bytes());
    combined
}

/// Build a SigningKey from combined keypair bytes.
pub fn signing_key_from_bytes(bytes: &[u8]) -> Result<SigningKey, CryptoError> {
    if bytes.len() != 64 {
        return Err(CryptoError::InvalidKeyLength { expected: 64, found: bytes.len() });
    }
    let mut sk_bytes = [0u8; 32];
    sk_bytes.copy_from_slice(&bytes[0..32]);
    Ok(SigningKey::from_bytes(&sk_bytes))
}

/// Extract public key bytes from 64-byte keypair.
pub fn public_key_from_keypair_bytes(kp_bytes: &[u8]) -> Result<[u8; PUBKEY_LEN], CryptoError> {
    if kp_bytes.len() != 64 {
        return Err(CryptoError::InvalidKeyLength { expected: 64, found: kp_bytes.len() });
    }
    let mut pk = [0u8; PUBKEY_LEN];
    pk.copy_from_slice(&kp_bytes[32..64]);
    Ok(pk)
}

/// Sign a message and return a 64-byte signature.
pub fn sign_message(kp_bytes: &[u8], message: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let sk = signing_key_from_bytes(kp_bytes)?;
    let sig = sk.sign(message);
    Ok(sig.to_bytes().to_vec())
}

/// True when the 32 bytes decompress to a valid point on the Ed25519 curve.
pub fn is_valid_point(pubkey: &[u8; PUBKEY_LEN]) -> bool {
    VerifyingKey::from_bytes(pubkey).is_ok()
}

/// Verify a message given public key and signature.
///
/// Returns `Ok(false)` for a well-formed but non-verifying signature;
/// `Err` only for inputs of the wrong shape.
pub fn verify_signature(
    pubkey: &[u8; PUBKEY_LEN],
    message: &[u8],
    sig_bytes: &[u8],
) -> Result<bool, CryptoError> {
    if sig_bytes.len() != SIGNATURE_LEN {
        return Err(CryptoError::InvalidSignatureLength {
            expected: SIGNATURE_LEN,
            found: sig_bytes.len(),
        });
    }

    let vk = match VerifyingKey::from_bytes(pubkey) {
        Ok(vk) => vk,
        Err(_) => return Ok(false),
    };

    let mut sig_arr = [0u8; SIGNATURE_LEN];
    sig_arr.copy_from_slice(sig_bytes);
    let sig = Signature::from_bytes(&sig_arr);

    Ok(vk.verify(message, &sig).is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_verify_roundtrip() {
        let kp_bytes = generate_keypair_bytes();
        let pubkey = public_key_from_keypair_bytes(&kp_bytes).expect("pub bytes");
        let msg = b"registration payload";
        let sig = sign_message(&kp_bytes, msg).expect("sign");
        assert!(verify_signature(&pubkey, msg, &sig).expect("verify"));

        // tamper message
        assert!(!verify_signature(&pubkey, b"registration payload!", &sig).expect("verify"));
    }

    #[test]
    fn test_generated_pubkey_is_valid_point() {
        let kp_bytes = generate_keypair_bytes();
        let pubkey = public_key_from_keypair_bytes(&kp_bytes).expect("pub bytes");
        assert!(is_valid_point(&pubkey));
    }

    #[test]
    fn test_wrong_signature_length() {
        let kp_bytes = generate_keypair_bytes();
        let pubkey = public_key_from_keypair_bytes(&kp_bytes).expect("pub bytes");
        assert!(verify_signature(&pubkey, b"x", &[0u8; 63]).is_err());
    }
}
