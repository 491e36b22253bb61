//! # Error Handling
//!
//! Error types for Stvor Core.
//!
//! ## Error Hierarchy
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                           ERROR HIERARCHY                               │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  Error (top-level)                                                     │
//! │  │                                                                      │
//! │  ├── Key Errors (100)                                                  │
//! │  │   ├── KeyGeneration         - RNG or algorithm unavailable          │
//! │  │   ├── KeyImport             - Malformed / wrong-algorithm key       │
//! │  │   ├── KeyExport             - Key could not be encoded              │
//! │  │   └── Randomness            - OS RNG failed (salt, nonce)           │
//! │  │                                                                      │
//! │  ├── Session Errors (200)                                              │
//! │  │   └── Session               - Agreement or derivation failed        │
//! │  │                                                                      │
//! │  ├── Packet Errors (300)                                               │
//! │  │   ├── Encryption            - AEAD seal failed                      │
//! │  │   ├── Signing               - Signature could not be produced       │
//! │  │   ├── MalformedPacket       - Frame too short / not base64          │
//! │  │   ├── UnsupportedVersion    - Unknown protocol tag in the AAD       │
//! │  │   ├── Signature             - Sender authentication failed          │
//! │  │   └── Decryption            - AEAD tag mismatch                     │
//! │  │                                                                      │
//! │  ├── Storage Errors (400)                                              │
//! │  │   └── Storage               - Vault backend failed                  │
//! │  │                                                                      │
//! │  ├── Directory Errors (500)                                            │
//! │  │   └── UnknownPeer           - No published keys for a user          │
//! │  │                                                                      │
//! │  └── Internal Errors (900)                                             │
//! │      ├── Serialization                                                 │
//! │      └── Internal                                                      │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Transient vs. Trust Failures
//!
//! Callers must not fold a `Signature` or `Decryption` error into a generic
//! "message unavailable" state without flagging it: those mean the packet was
//! tampered with or sent by someone else. [`Error::is_trust_failure`] and
//! [`Error::is_transient`] split the taxonomy for that purpose.

use thiserror::Error;

/// Result type alias for Stvor Core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Generic text shown to users in place of a message that failed to open.
pub const UNDECRYPTABLE_PLACEHOLDER: &str = "Could not decrypt message";

/// Main error type for Stvor Core
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Key Errors (100-199)
    // ========================================================================

    /// Key generation failed (randomness source or algorithm unavailable)
    #[error("Key generation failed: {0}")]
    KeyGeneration(String),

    /// A key could not be imported
    #[error("Invalid key: {0}")]
    KeyImport(String),

    /// A key could not be exported
    #[error("Key export failed: {0}")]
    KeyExport(String),

    /// The OS randomness source failed outside key generation
    #[error("Randomness unavailable: {0}")]
    Randomness(String),

    // ========================================================================
    // Session Errors (200-299)
    // ========================================================================

    /// Session key establishment failed
    #[error("Session establishment failed: {0}")]
    Session(String),

    // ========================================================================
    // Packet Errors (300-399)
    // ========================================================================

    /// Encryption failed
    #[error("Encryption failed: {0}")]
    Encryption(String),

    /// Producing a signature failed
    #[error("Signing failed: {0}")]
    Signing(String),

    /// Packet framing is invalid
    #[error("Malformed packet: {0}")]
    MalformedPacket(String),

    /// Packet carries a protocol version this codec does not understand
    #[error("Unsupported protocol version: {0}")]
    UnsupportedVersion(String),

    /// Detached signature did not verify
    #[error("Signature verification failed")]
    Signature,

    /// AEAD decryption failed
    #[error("Decryption failed: {0}")]
    Decryption(String),

    // ========================================================================
    // Storage Errors (400-499)
    // ========================================================================

    /// Key vault backend failed
    #[error("Storage error: {0}")]
    Storage(String),

    // ========================================================================
    // Directory Errors (500-599)
    // ========================================================================

    /// No public keys are published for this user
    #[error("No public keys published for user: {0}")]
    UnknownPeer(String),

    // ========================================================================
    // Internal Errors (900-999)
    // ========================================================================

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Get the numeric error code
    ///
    /// - 100-199: Keys
    /// - 200-299: Session
    /// - 300-399: Packets
    /// - 400-499: Storage
    /// - 500-599: Directory
    /// - 900-999: Internal
    pub fn code(&self) -> i32 {
        match self {
            Error::KeyGeneration(_) => 100,
            Error::KeyImport(_) => 101,
            Error::KeyExport(_) => 102,
            Error::Randomness(_) => 103,

            Error::Session(_) => 200,

            Error::Encryption(_) => 300,
            Error::Signing(_) => 301,
            Error::MalformedPacket(_) => 302,
            Error::UnsupportedVersion(_) => 303,
            Error::Signature => 304,
            Error::Decryption(_) => 305,

            Error::Storage(_) => 400,

            Error::UnknownPeer(_) => 500,

            Error::Serialization(_) => 900,
            Error::Internal(_) => 901,
        }
    }

    /// Environmental failures that may succeed if the caller retries.
    ///
    /// Nothing in this crate retries on its own.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Error::KeyGeneration(_)
                | Error::Randomness(_)
                | Error::Storage(_)
                | Error::Internal(_)
        )
    }

    /// Protocol or security failures: the packet must not be trusted.
    pub fn is_trust_failure(&self) -> bool {
        matches!(
            self,
            Error::Signature
                | Error::Decryption(_)
                | Error::UnsupportedVersion(_)
                | Error::MalformedPacket(_)
        )
    }

    /// Text safe to show to an end user. Never contains internal detail.
    pub fn user_message(&self) -> &'static str {
        match self {
            Error::UnknownPeer(_) => "Recipient keys not found",
            Error::Storage(_) | Error::KeyGeneration(_) => "Secure storage unavailable",
            _ if self.is_trust_failure() => UNDECRYPTABLE_PLACEHOLDER,
            _ => "Secure messaging error",
        }
    }
}

// ============================================================================
// ERROR CONVERSIONS
// ============================================================================

#[cfg(not(target_arch = "wasm32"))]
impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl From<tokio::task::JoinError> for Error {
    fn from(err: tokio::task::JoinError) -> Self {
        Error::Internal(format!("Background task failed: {}", err))
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(Error::KeyGeneration("rng".into()).code(), 100);
        assert_eq!(Error::Session("test".into()).code(), 200);
        assert_eq!(Error::Signature.code(), 304);
        assert_eq!(Error::Storage("disk".into()).code(), 400);
        assert_eq!(Error::UnknownPeer("bob".into()).code(), 500);
        assert_eq!(Error::Internal("test".into()).code(), 901);
    }

    #[test]
    fn test_trust_failures_are_not_transient() {
        let trust = [
            Error::Signature,
            Error::Decryption("tag".into()),
            Error::UnsupportedVersion("v=9".into()),
            Error::MalformedPacket("short".into()),
        ];
        for err in &trust {
            assert!(err.is_trust_failure(), "{} should be a trust failure", err);
            assert!(!err.is_transient(), "{} should not be transient", err);
        }

        assert!(Error::Storage("locked".into()).is_transient());
        assert!(!Error::Storage("locked".into()).is_trust_failure());
    }

    #[test]
    fn test_randomness_failure_is_transient() {
        let err = Error::Randomness("getrandom: EAGAIN".into());
        assert_eq!(err.code(), 103);
        assert!(err.is_transient());
        assert!(!err.is_trust_failure());
        assert!(Error::KeyGeneration("rng".into()).is_transient());
    }

    #[test]
    fn test_user_message_hides_detail() {
        let err = Error::Decryption("authentication tag mismatch".into());
        assert_eq!(err.user_message(), UNDECRYPTABLE_PLACEHOLDER);
        assert!(!err.user_message().contains("tag"));
        assert_eq!(Error::Signature.user_message(), UNDECRYPTABLE_PLACEHOLDER);
    }
}
