//! # Stvor Core
//!
//! End-to-end encryption core for Stvor: two parties exchange confidential,
//! authenticated messages over an untrusted relay using only each other's
//! long-term public keys.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         STVOR CORE MODULES                              │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │  Identity                                                       │   │
//! │  │  - provision / load_or_provision                                │   │
//! │  │  - send / receive / receive_for_display                         │   │
//! │  └──────┬──────────────────────┬──────────────────────┬────────────┘   │
//! │         │                      │                      │                │
//! │  ┌──────▼──────┐  ┌────────────▼────────┐  ┌──────────▼──────────┐     │
//! │  │  Messaging  │  │      Storage        │  │     Directory       │     │
//! │  │             │  │                     │  │                     │     │
//! │  │ - Packet v1 │  │ - KeyVault          │  │ - PublicKeyDirectory│     │
//! │  │ - Seal/Open │  │ - Memory / SQLite   │  │ - MemoryDirectory   │     │
//! │  └──────┬──────┘  └────────────┬────────┘  └─────────────────────┘     │
//! │         │                      │                                       │
//! │  ┌──────▼──────────────────────▼──────────────────────────────────┐    │
//! │  │  Crypto                                                        │    │
//! │  │  - P-521 key pairs (ECDH, ECDSA), SPKI / PKCS#8 codec          │    │
//! │  │  - HKDF-SHA512 session keys, AES-256-GCM, fingerprints         │    │
//! │  └────────────────────────────────────────────────────────────────┘    │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Hierarchy
//!
//! - [`error`] - Error types for the entire library
//! - [`crypto`] - Keys, session derivation, encryption, signing
//! - [`messaging`] - Packet format and the encrypt/decrypt pipeline
//! - [`storage`] - Private key vault and its backends
//! - [`directory`] - Public key lookup interface
//! - [`identity`] - A local user and the send/receive flow
//!
//! ## Security Model
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          SECURITY LAYERS                                │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  Layer 1: Confidentiality (ECDH P-521 + HKDF + AES-256-GCM)            │
//! │  ──────────────────────────────────────────────────────────             │
//! │  Every message gets its own key, derived from the two agreement keys   │
//! │  and a fresh salt carried in the packet.                               │
//! │                                                                         │
//! │  Layer 2: Authentication (ECDSA P-521)                                  │
//! │  ─────────────────────────────────────                                  │
//! │  The sender signs header ‖ ciphertext. Receivers verify before they    │
//! │  decrypt, so forged packets are never fed to the cipher.               │
//! │                                                                         │
//! │  Layer 3: Local Storage (optional AES-256-GCM sealing)                 │
//! │  ──────────────────────────────────────────────────────                 │
//! │  Private keys at rest can be sealed under an application-held key.     │
//! │                                                                         │
//! │  Out of scope: transport security, directory authenticity (compare     │
//! │  fingerprints out of band), group messaging.                           │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```ignore
//! use stvor_core::{directory::MemoryDirectory, storage::KeyVault, Identity};
//!
//! let vault = KeyVault::in_memory();
//! let directory = MemoryDirectory::new();
//!
//! let alice = Identity::load_or_provision("alice", &vault, &directory).await?;
//! let bob = Identity::load_or_provision("bob", &vault, &directory).await?;
//!
//! let envelope = alice.send(&directory, "bob", "hello").await?;
//! assert_eq!(bob.receive(&directory, &envelope).await?, "hello");
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

// ============================================================================
// MODULE DECLARATIONS
// ============================================================================

pub mod crypto;
pub mod directory;
pub mod error;
pub mod identity;
pub mod messaging;
pub mod storage;
/// Platform-aware time utilities for native and WASM targets.
pub mod time;

// ============================================================================
// RE-EXPORTS
// ============================================================================

pub use crypto::{IdentityKeyPair, PublicKeyBundle, SessionKey};
pub use error::{Error, Result};
pub use identity::{Envelope, Identity, ReceivedMessage};
pub use messaging::{decrypt, encrypt, MessagePacket};
pub use storage::{KeyVault, StorageConfig};

// ============================================================================
// VERSION INFO
// ============================================================================

/// Returns the version of Stvor Core
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// Returns build information for debugging
pub fn build_info() -> BuildInfo {
    BuildInfo {
        version: env!("CARGO_PKG_VERSION"),
        protocol: messaging::PROTOCOL_VERSION,
        #[cfg(target_os = "ios")]
        target: "ios",
        #[cfg(target_os = "android")]
        target: "android",
        #[cfg(target_os = "macos")]
        target: "macos",
        #[cfg(target_os = "linux")]
        target: "linux",
        #[cfg(target_os = "windows")]
        target: "windows",
        #[cfg(target_arch = "wasm32")]
        target: "wasm32",
        #[cfg(not(any(
            target_os = "ios",
            target_os = "android",
            target_os = "macos",
            target_os = "linux",
            target_os = "windows",
            target_arch = "wasm32"
        )))]
        target: "unknown",
        profile: if cfg!(debug_assertions) {
            "debug"
        } else {
            "release"
        },
    }
}

/// Build information for debugging
#[derive(Debug, Clone)]
pub struct BuildInfo {
    /// Crate version
    pub version: &'static str,
    /// Packet format version written by this build
    pub protocol: &'static str,
    /// Target platform
    pub target: &'static str,
    /// Build profile (debug/release)
    pub profile: &'static str,
}

// ============================================================================
// TESTS
// ============================================================================
