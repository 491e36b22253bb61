//! # Signing Module
//!
//! Detached ECDSA P-521 / SHA-512 signatures.
//!
//! Signatures use the fixed-width `r ‖ s` encoding (66 + 66 bytes), the same
//! layout WebCrypto produces, so a packet decoder can slice the signature at a
//! fixed offset. Nonces are derived per RFC 6979, so signing needs no
//! randomness.

use std::fmt;

use p521::ecdsa::{
    signature::{Signer, Verifier},
    Signature as EcdsaSignature, VerifyingKey,
};

use super::keys::{SigningKeyPair, SigningPublicKey};
use crate::error::{Error, Result};

/// Size of a P-521 ECDSA signature in bytes
pub const SIGNATURE_SIZE: usize = 132;

/// A detached signature
#[derive(Clone, PartialEq, Eq)]
pub struct Signature(pub [u8; SIGNATURE_SIZE]);

impl Signature {
    /// Create from raw bytes
    pub fn from_bytes(bytes: [u8; SIGNATURE_SIZE]) -> Self {
        Self(bytes)
    }

    /// Create from a slice, which must be exactly [`SIGNATURE_SIZE`] bytes
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let array: [u8; SIGNATURE_SIZE] = bytes.try_into().map_err(|_| {
            Error::MalformedPacket(format!(
                "signature must be {} bytes, got {}",
                SIGNATURE_SIZE,
                bytes.len()
            ))
        })?;
        Ok(Self(array))
    }

    /// Get the raw bytes
    pub fn as_bytes(&self) -> &[u8; SIGNATURE_SIZE] {
        &self.0
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({}…)", hex::encode(&self.0[..8]))
    }
}

/// Sign a message with a signing key pair
pub fn sign(keypair: &SigningKeyPair, message: &[u8]) -> Result<Signature> {
    let signature: EcdsaSignature = keypair
        .signer()
        .try_sign(message)
        .map_err(|e| Error::Signing(e.to_string()))?;

    Signature::from_slice(&signature.to_bytes())
        .map_err(|_| Error::Signing("unexpected signature length".into()))
}

/// Verify a detached signature
///
/// Returns `Err(Signature)` if the signature does not match the message and
/// key, including when the bytes are not a well-formed ECDSA signature.
pub fn verify(public_key: &SigningPublicKey, message: &[u8], signature: &Signature) -> Result<()> {
    let verifying_key = VerifyingKey::from_affine(*public_key.as_inner().as_affine())
        .map_err(|e| Error::KeyImport(format!("Invalid verification key: {}", e)))?;

    let sig = EcdsaSignature::from_slice(&signature.0).map_err(|_| Error::Signature)?;

    verifying_key
        .verify(message, &sig)
        .map_err(|_| Error::Signature)
}

// ============================================================================
// TESTS
// ============================================================================
