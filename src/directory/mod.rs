//! # Public Key Directory
//!
//! Where peers publish and look up each other's [`PublicKeyBundle`].
//!
//! The directory itself (a database, a REST service, a realtime document
//! store) lives outside this crate. Entries are trusted as returned;
//! comparing fingerprints out of band is left to the application.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::crypto::PublicKeyBundle;
use crate::error::Result;

/// Lookup and publication of public key bundles
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
pub trait PublicKeyDirectory: Send + Sync {
    /// Bundle published by `user_id`, if any
    async fn get(&self, user_id: &str) -> Result<Option<PublicKeyBundle>>;

    /// Publish (or replace) the bundle for `user_id`
    async fn publish(&self, user_id: &str, bundle: &PublicKeyBundle) -> Result<()>;
}

/// In-process directory
#[derive(Debug, Default)]
pub struct MemoryDirectory {
    entries: RwLock<HashMap<String, PublicKeyBundle>>,
}

impl MemoryDirectory {
    /// Create an empty directory
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of published bundles
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether nothing has been published
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
impl PublicKeyDirectory for MemoryDirectory {
    async fn get(&self, user_id: &str) -> Result<Option<PublicKeyBundle>> {
        Ok(self.entries.read().get(user_id).copied())
    }

    async fn publish(&self, user_id: &str, bundle: &PublicKeyBundle) -> Result<()> {
        self.entries.write().insert(user_id.to_owned(), *bundle);
        tracing::debug!("Published keys for {}", user_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::IdentityKeyPair;

    #[tokio::test]
    async fn test_publish_and_get() {
        let directory = MemoryDirectory::new();
        let keys = IdentityKeyPair::generate().await.unwrap();

        assert!(directory.get("alice").await.unwrap().is_none());

        directory.publish("alice", &keys.public_bundle()).await.unwrap();
        assert_eq!(
            directory.get("alice").await.unwrap(),
            Some(keys.public_bundle())
        );
        assert_eq!(directory.len(), 1);
    }

    #[tokio::test]
    async fn test_publish_replaces() {
        let directory = MemoryDirectory::new();
        let old = IdentityKeyPair::generate().await.unwrap();
        let new = IdentityKeyPair::generate().await.unwrap();

        directory.publish("alice", &old.public_bundle()).await.unwrap();
        directory.publish("alice", &new.public_bundle()).await.unwrap();

        assert_eq!(
            directory.get("alice").await.unwrap(),
            Some(new.public_bundle())
        );
    }
}
