//! # Encryption Module
//!
//! AES-256-GCM for message confidentiality and integrity.
//!
//! ## AEAD Call Shape
//!
//! ```text
//! encrypt(key, plaintext, aad) ──► (nonce, ciphertext ‖ tag)
//! decrypt(key, nonce, ciphertext ‖ tag, aad) ──► plaintext | DecryptionFailed
//! ```
//!
//! The AAD is authenticated but not encrypted. For message packets it is the
//! fixed-width `v=<version>&t=<millis>` header; for sealed vault entries it is
//! `user_id/field`.

use aes_gcm::{
    aead::{Aead, KeyInit, Payload},
    Aes256Gcm, Key, Nonce as AesNonce,
};
use rand::{rngs::OsRng, RngCore};
use zeroize::ZeroizeOnDrop;

use crate::error::{Error, Result};

/// Size of the AES-GCM nonce in bytes (96 bits)
pub const NONCE_SIZE: usize = 12;

/// Size of the AES-GCM authentication tag in bytes (128 bits)
pub const TAG_SIZE: usize = 16;

/// Size of the encryption key in bytes (256 bits)
pub const KEY_SIZE: usize = 32;

/// A nonce (number used once) for AES-GCM encryption
///
/// **Never reuse a nonce with the same key.** Nonces here are always random.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Nonce(pub [u8; NONCE_SIZE]);

impl Nonce {
    /// Generate a cryptographically random nonce
    pub fn random() -> Result<Self> {
        let mut bytes = [0u8; NONCE_SIZE];
        OsRng
            .try_fill_bytes(&mut bytes)
            .map_err(|e| Error::Randomness(format!("OS randomness unavailable: {}", e)))?;
        Ok(Self(bytes))
    }

    /// Create from existing bytes
    pub fn from_bytes(bytes: [u8; NONCE_SIZE]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes
    pub fn as_bytes(&self) -> &[u8; NONCE_SIZE] {
        &self.0
    }
}

/// An AES-256-GCM key
///
/// Zeroized when dropped. The raw bytes cannot be read back outside this
/// crate.
#[derive(ZeroizeOnDrop)]
pub struct EncryptionKey([u8; KEY_SIZE]);

impl EncryptionKey {
    /// Create from raw bytes
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self(bytes)
    }

    /// All-zero key, filled in place by HKDF
    pub(crate) fn zeroed() -> Self {
        Self([0u8; KEY_SIZE])
    }

    pub(crate) fn as_mut_bytes(&mut self) -> &mut [u8; KEY_SIZE] {
        &mut self.0
    }

    fn cipher(&self) -> Aes256Gcm {
        Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&self.0))
    }
}

/// Encrypt with AES-256-GCM under a fresh random nonce
///
/// Returns `(nonce, ciphertext_with_tag)`.
pub fn encrypt(key: &EncryptionKey, plaintext: &[u8], aad: &[u8]) -> Result<(Nonce, Vec<u8>)> {
    let nonce = Nonce::random()?;

    let payload = Payload {
        msg: plaintext,
        aad,
    };

    let ciphertext = key
        .cipher()
        .encrypt(AesNonce::from_slice(&nonce.0), payload)
        .map_err(|e| Error::Encryption(format!("AEAD seal failed: {}", e)))?;

    Ok((nonce, ciphertext))
}

/// Decrypt with AES-256-GCM
///
/// Returns [`Error::Decryption`] if the ciphertext was tampered with, the AAD
/// doesn't match, or the key or nonce is wrong.
pub fn decrypt(key: &EncryptionKey, nonce: &Nonce, ciphertext: &[u8], aad: &[u8]) -> Result<Vec<u8>> {
    let payload = Payload {
        msg: ciphertext,
        aad,
    };

    key.cipher()
        .decrypt(AesNonce::from_slice(&nonce.0), payload)
        .map_err(|_| Error::Decryption("authentication tag mismatch".into()))
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encrypt_decrypt_basic() {
        let key = EncryptionKey::from_bytes([42u8; 32]);
        let plaintext = b"Hello, World!";
        let aad = b"context";

        let (nonce, ciphertext) = encrypt(&key, plaintext, aad).unwrap();
        assert_eq!(ciphertext.len(), plaintext.len() + TAG_SIZE);

        let decrypted = decrypt(&key, &nonce, &ciphertext, aad).unwrap();
        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn test_encrypt_decrypt_empty() {
        let key = EncryptionKey::from_bytes([42u8; 32]);

        let (nonce, ciphertext) = encrypt(&key, b"", b"").unwrap();
        let decrypted = decrypt(&key, &nonce, &ciphertext, b"").unwrap();

        assert!(decrypted.is_empty());
    }

    #[test]
    fn test_tampered_ciphertext_fails() {
        let key = EncryptionKey::from_bytes([42u8; 32]);
        let (nonce, mut ciphertext) = encrypt(&key, b"Hello, World!", b"context").unwrap();

        ciphertext[0] ^= 0xFF;

        let result = decrypt(&key, &nonce, &ciphertext, b"context");
        assert!(matches!(result, Err(Error::Decryption(_))));
    }

    #[test]
    fn test_wrong_aad_fails() {
        let key = EncryptionKey::from_bytes([42u8; 32]);
        let (nonce, ciphertext) = encrypt(&key, b"Hello, World!", b"context").unwrap();

        let result = decrypt(&key, &nonce, &ciphertext, b"wrong context");
        assert!(matches!(result, Err(Error::Decryption(_))));
    }

    #[test]
    fn test_wrong_key_fails() {
        let key1 = EncryptionKey::from_bytes([42u8; 32]);
        let key2 = EncryptionKey::from_bytes([99u8; 32]);
        let (nonce, ciphertext) = encrypt(&key1, b"secret", b"").unwrap();

        assert!(decrypt(&key2, &nonce, &ciphertext, b"").is_err());
    }

    #[test]
    fn test_different_nonces_produce_different_ciphertext() {
        let key = EncryptionKey::from_bytes([42u8; 32]);

        let (n1, ct1) = encrypt(&key, b"Hello, World!", b"context").unwrap();
        let (n2, ct2) = encrypt(&key, b"Hello, World!", b"context").unwrap();

        assert_ne!(n1, n2);
        assert_ne!(ct1, ct2);
    }
}
