//! # Session Key Derivation
//!
//! Turns one ECDH agreement into a fresh AES-256-GCM key per message.
//!
//! ## Pipeline
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                 AGREEMENT → BASE KEY → SESSION KEY                      │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  local_secret × remote_public  (P-521 ECDH, 66 bytes)                   │
//! │                │                                                        │
//! │                ▼                                                        │
//! │  Stage 1: HKDF-SHA512(salt = ∅, info = "KEM")          → BaseKey (64)   │
//! │                │                                                        │
//! │                ▼                                                        │
//! │  Stage 2: HKDF-SHA512(salt = 16 random bytes,                          │
//! │                       info = "SessionKey" ‖ salt)     → SessionKey (32) │
//! │                                                                         │
//! │  The salt travels inside the packet. The receiver runs the same two    │
//! │  stages with its own secret and the sender's public key.              │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The raw agreement output is never used as a key. Stage 1 only separates
//! the key-encapsulation domain from the session-key domain.
//!
//! Nothing here is cached. Every call re-derives from the two agreement keys.

use hkdf::Hkdf;
use rand::{rngs::OsRng, RngCore};
use sha2::Sha512;
use zeroize::ZeroizeOnDrop;

use super::encryption::EncryptionKey;
use super::keys::{AgreementKeyPair, AgreementPublicKey};
use crate::error::{Error, Result};

/// Domain separation labels for HKDF
pub mod domain {
    /// Stage 1: agreement output → base key
    pub const KEY_ENCAPSULATION: &[u8] = b"KEM";

    /// Stage 2 prefix: base key → session key (followed by the salt)
    pub const SESSION_KEY: &[u8] = b"SessionKey";
}

/// Size of the per-message session salt
pub const SALT_SIZE: usize = 16;

/// Size of the intermediate base key
pub const BASE_KEY_SIZE: usize = 64;

/// Random salt for the second derivation stage
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SessionSalt([u8; SALT_SIZE]);

impl SessionSalt {
    /// Generate a fresh random salt
    pub fn random() -> Result<Self> {
        let mut bytes = [0u8; SALT_SIZE];
        OsRng
            .try_fill_bytes(&mut bytes)
            .map_err(|e| Error::Randomness(format!("OS randomness unavailable: {}", e)))?;
        Ok(Self(bytes))
    }

    /// Create from existing bytes
    pub fn from_bytes(bytes: [u8; SALT_SIZE]) -> Self {
        Self(bytes)
    }

    /// Create from a slice, which must be exactly [`SALT_SIZE`] bytes
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        bytes
            .try_into()
            .map(Self)
            .map_err(|_| Error::Session(format!("salt must be {} bytes, got {}", SALT_SIZE, bytes.len())))
    }

    /// Get the raw bytes
    pub fn as_bytes(&self) -> &[u8; SALT_SIZE] {
        &self.0
    }
}

/// Output of stage 1. Only usable as input to stage 2.
#[derive(ZeroizeOnDrop)]
pub struct BaseKey([u8; BASE_KEY_SIZE]);

/// A per-message AES-256-GCM key together with the salt that produced it
///
/// Not `Clone`; the raw key cannot be read outside the crate and is zeroized
/// on drop.
pub struct SessionKey {
    key: EncryptionKey,
    salt: SessionSalt,
}

impl SessionKey {
    /// The salt the receiver needs to re-derive this key
    pub fn salt(&self) -> &SessionSalt {
        &self.salt
    }

    pub(crate) fn encryption_key(&self) -> &EncryptionKey {
        &self.key
    }
}

impl std::fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionKey")
            .field("salt", &hex::encode(self.salt.as_bytes()))
            .finish_non_exhaustive()
    }
}

/// Stage 1: ECDH, then HKDF with an empty salt and the `"KEM"` label
pub fn derive_base_key(local: &AgreementKeyPair, remote: &AgreementPublicKey) -> Result<BaseKey> {
    let shared = local.diffie_hellman(remote);
    let hkdf = Hkdf::<Sha512>::new(None, shared.raw_secret_bytes());

    let mut base = BaseKey([0u8; BASE_KEY_SIZE]);
    hkdf.expand(domain::KEY_ENCAPSULATION, &mut base.0)
        .map_err(|_| Error::Session("Failed to derive base key".into()))?;

    Ok(base)
}

/// Stage 2: HKDF over the base key with a per-message salt
pub fn expand_session_key(base: &BaseKey, salt: SessionSalt) -> Result<SessionKey> {
    let hkdf = Hkdf::<Sha512>::new(Some(salt.as_bytes()), &base.0);

    let mut key = EncryptionKey::zeroed();
    hkdf.expand_multi_info(&[domain::SESSION_KEY, salt.as_bytes()], key.as_mut_bytes())
        .map_err(|_| Error::Session("Failed to derive session key".into()))?;

    Ok(SessionKey { key, salt })
}

/// Sender side: derive a session key under a fresh random salt
pub fn derive_session_key(local: &AgreementKeyPair, remote: &AgreementPublicKey) -> Result<SessionKey> {
    let salt = SessionSalt::random()?;
    let base = derive_base_key(local, remote)?;
    let session = expand_session_key(&base, salt)?;

    tracing::debug!("Derived session key (salt {})", hex::encode(salt.as_bytes()));
    Ok(session)
}

/// Receiver side: re-derive the sender's session key from the packet salt
pub fn recover_session_key(
    local: &AgreementKeyPair,
    remote: &AgreementPublicKey,
    salt: &SessionSalt,
) -> Result<SessionKey> {
    let base = derive_base_key(local, remote)?;
    expand_session_key(&base, *salt)
}

// ============================================================================
// TESTS
// ============================================================================
