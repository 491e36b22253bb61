//! # Storage Module
//!
//! Local persistence for identity private keys.
//!
//! ## Storage Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         KEY VAULT                                       │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │  KeyVault                                                       │   │
//! │  │  ────────                                                        │   │
//! │  │  save(keys, user_id)  → PKCS#8 → (seal) → base64 → record      │   │
//! │  │  load(user_id)        → record → (open) → PKCS#8 → keys        │   │
//! │  │  delete(user_id)                                                │   │
//! │  └───────────────────────────────┬─────────────────────────────────┘   │
//! │                                  │ KeyStorage trait                    │
//! │                  ┌───────────────┴───────────────┐                     │
//! │                  ▼                               ▼                     │
//! │  ┌───────────────────────────┐   ┌───────────────────────────┐        │
//! │  │  MemoryKeyStorage         │   │  SqliteKeyStorage         │        │
//! │  │  (tests, demos, wasm)     │   │  (native, table key_vault)│        │
//! │  └───────────────────────────┘   └───────────────────────────┘        │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Security Model
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      AT-REST PROTECTION                                 │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  No storage key:   field = base64(PKCS#8)                              │
//! │                                                                         │
//! │  Storage key set:  field = base64(nonce ‖ AES-256-GCM(PKCS#8))         │
//! │                    AAD   = user_id ‖ "/" ‖ field name                  │
//! │                                                                         │
//! │  The AAD binds every sealed key to its owner and slot, so a record     │
//! │  copied under another user id, or two swapped fields, fail to open.   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! One record per user; a save replaces the previous record in a single
//! write.

#[cfg(not(target_arch = "wasm32"))]
mod database;
mod memory;
#[cfg(not(target_arch = "wasm32"))]
mod schema;
mod vault;

#[cfg(not(target_arch = "wasm32"))]
pub use database::SqliteKeyStorage;
pub use memory::MemoryKeyStorage;
pub use vault::KeyVault;

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::Result;

/// Storage configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Path to the SQLite database file (None = in-memory)
    pub database_path: Option<String>,
}

/// One stored identity
///
/// The two key fields hold base64 text, either plain PKCS#8 or, when
/// `sealed` is set, `nonce ‖ ciphertext` under the vault's storage key.
/// Wiped on drop; `Debug` never prints the key fields.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct KeyVaultRecord {
    /// Owner of the keys
    pub user_id: String,
    /// Agreement private key
    pub encrypted_agreement_private_key: String,
    /// Signing private key
    pub encrypted_signing_private_key: String,
    /// Whether the key fields are sealed with a storage key
    pub sealed: bool,
    /// Last write, unix millis
    pub updated_at: i64,
}

impl fmt::Debug for KeyVaultRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyVaultRecord")
            .field("user_id", &self.user_id)
            .field("encrypted_agreement_private_key", &"[REDACTED]")
            .field("encrypted_signing_private_key", &"[REDACTED]")
            .field("sealed", &self.sealed)
            .field("updated_at", &self.updated_at)
            .finish()
    }
}

/// Durable keyed storage behind a [`KeyVault`]
///
/// Implementations only need single-record atomicity: a `put` either fully
/// replaces the record for its `user_id` or leaves the old one in place.
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
pub trait KeyStorage: Send + Sync {
    /// Fetch the record for `user_id`
    async fn get(&self, user_id: &str) -> Result<Option<KeyVaultRecord>>;

    /// Insert or replace the record for `record.user_id`
    async fn put(&self, record: KeyVaultRecord) -> Result<()>;

    /// Remove the record for `user_id`; returns whether one existed
    async fn delete(&self, user_id: &str) -> Result<bool>;
}
