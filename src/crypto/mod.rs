//! # Cryptography Module
//!
//! All cryptographic primitives used by Stvor Core.
//!
//! ## Security Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    CRYPTOGRAPHIC ARCHITECTURE                           │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    KEY HIERARCHY                                │   │
//! │  ├─────────────────────────────────────────────────────────────────┤   │
//! │  │                                                                 │   │
//! │  │  IdentityKeyPair (generated, never derived from a phrase)      │   │
//! │  │            ┌─────────────┴─────────────┐                       │   │
//! │  │            ▼                           ▼                       │   │
//! │  │  ┌─────────────────┐         ┌─────────────────┐              │   │
//! │  │  │  Agreement Key  │         │  Signing Key    │              │   │
//! │  │  │  (ECDH P-521)   │         │ (ECDSA P-521)   │              │   │
//! │  │  │                 │         │                 │              │   │
//! │  │  │ • Session keys  │         │ • Packet auth   │              │   │
//! │  │  │ • Confidential  │         │ • Fingerprints  │              │   │
//! │  │  └─────────────────┘         └─────────────────┘              │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 ENCRYPTION SCHEME                               │   │
//! │  ├─────────────────────────────────────────────────────────────────┤   │
//! │  │                                                                 │   │
//! │  │  1. Key Agreement: ECDH P-521                                  │   │
//! │  │     Alice's Private × Bob's Public = Shared Secret            │   │
//! │  │                                                                 │   │
//! │  │  2. Key Derivation: HKDF-SHA512, two stages                    │   │
//! │  │     Shared Secret ─"KEM"─► BaseKey ─salt─► SessionKey         │   │
//! │  │                                                                 │   │
//! │  │  3. Encryption: AES-256-GCM                                    │   │
//! │  │     • 256-bit key, fresh per message                           │   │
//! │  │     • 96-bit nonce (random per message)                        │   │
//! │  │     • 128-bit authentication tag                               │   │
//! │  │                                                                 │   │
//! │  │  4. Signature: ECDSA P-521 / SHA-512 over AAD ‖ ciphertext     │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Algorithm Choices
//!
//! | Algorithm | Purpose | Notes |
//! |-----------|---------|-------|
//! | ECDH P-521 | Key agreement | ~256-bit security |
//! | ECDSA P-521 / SHA-512 | Signing | 132-byte `r ‖ s` |
//! | AES-256-GCM | Encryption | AEAD, 12-byte nonce |
//! | HKDF-SHA512 | Key derivation | Domain-separated stages |
//! | SPKI / PKCS#8 | Key encoding | Base64 text on the wire |
//!
//! ## Security Considerations
//!
//! 1. **Key Zeroization**: secret scalars and derived keys are zeroized on drop
//! 2. **Secure Random**: `rand::rngs::OsRng`, called fallibly
//! 3. **No Key Reuse**: fresh salt and nonce for every message
//! 4. **Typed Keys**: agreement and signing keys cannot be swapped

mod codec;
mod encryption;
mod kdf;
mod keys;
mod signing;

pub use codec::{decode_bytes, encode_bytes};
pub use encryption::{decrypt, encrypt, EncryptionKey, Nonce, KEY_SIZE, NONCE_SIZE, TAG_SIZE};
pub use kdf::{
    derive_base_key, derive_session_key, expand_session_key, recover_session_key, BaseKey,
    SessionKey, SessionSalt, BASE_KEY_SIZE, SALT_SIZE,
};
pub use keys::{
    fingerprint, fingerprint_matches, AgreementKeyPair, AgreementPublicKey, IdentityKeyPair,
    PublicKeyBundle, SigningKeyPair, SigningPublicKey, FINGERPRINT_BYTES, SCALAR_SIZE,
};
pub use signing::{sign, verify, Signature, SIGNATURE_SIZE};

/// HKDF domain separation labels
pub mod domain {
    pub use super::kdf::domain::*;
}
