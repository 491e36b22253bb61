//! In-process key storage.

use std::collections::HashMap;
use std::fmt;

use async_trait::async_trait;
use parking_lot::RwLock;

use super::{KeyStorage, KeyVaultRecord};
use crate::error::Result;

/// Key storage held in memory; lost when dropped
#[derive(Default)]
pub struct MemoryKeyStorage {
    records: RwLock<HashMap<String, KeyVaultRecord>>,
}

impl MemoryKeyStorage {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// Whether the store is empty
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

impl fmt::Debug for MemoryKeyStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryKeyStorage")
            .field("records", &self.len())
            .finish()
    }
}

#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
impl KeyStorage for MemoryKeyStorage {
    async fn get(&self, user_id: &str) -> Result<Option<KeyVaultRecord>> {
        Ok(self.records.read().get(user_id).cloned())
    }

    async fn put(&self, record: KeyVaultRecord) -> Result<()> {
        self.records.write().insert(record.user_id.clone(), record);
        Ok(())
    }

    async fn delete(&self, user_id: &str) -> Result<bool> {
        Ok(self.records.write().remove(user_id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(user_id: &str, marker: &str) -> KeyVaultRecord {
        KeyVaultRecord {
            user_id: user_id.into(),
            encrypted_agreement_private_key: marker.into(),
            encrypted_signing_private_key: marker.into(),
            sealed: false,
            updated_at: 1,
        }
    }

    #[tokio::test]
    async fn test_put_overwrites() {
        let store = MemoryKeyStorage::new();
        store.put(record("alice", "one")).await.unwrap();
        store.put(record("alice", "two")).await.unwrap();

        assert_eq!(store.len(), 1);
        let got = store.get("alice").await.unwrap().unwrap();
        assert_eq!(got.encrypted_agreement_private_key, "two");
    }

    #[tokio::test]
    async fn test_delete() {
        let store = MemoryKeyStorage::new();
        store.put(record("alice", "one")).await.unwrap();

        assert!(store.delete("alice").await.unwrap());
        assert!(!store.delete("alice").await.unwrap());
        assert!(store.get("alice").await.unwrap().is_none());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_debug_hides_key_fields() {
        let store = MemoryKeyStorage::new();
        store.put(record("alice", "MIGHAgEAMBMGByqGSM49")).await.unwrap();
        let got = store.get("alice").await.unwrap().unwrap();

        let printed = format!("{:?} {:?}", got, store);
        assert!(!printed.contains("MIGHAgEAMBMGByqGSM49"));
        assert!(printed.contains("alice"));
        assert!(printed.contains("[REDACTED]"));
    }
}
