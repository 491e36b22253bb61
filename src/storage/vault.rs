//! # Key Vault
//!
//! Saves and restores an [`IdentityKeyPair`] by user id.

use std::sync::Arc;

use zeroize::Zeroizing;

use super::{KeyStorage, KeyVaultRecord, MemoryKeyStorage};
use crate::crypto::{
    decode_bytes, decrypt, encode_bytes, encrypt, AgreementKeyPair, EncryptionKey, IdentityKeyPair,
    Nonce, SigningKeyPair, NONCE_SIZE,
};
use crate::error::{Error, Result};

const AGREEMENT_FIELD: &str = "encrypted_agreement_private_key";
const SIGNING_FIELD: &str = "encrypted_signing_private_key";

/// Private key persistence for local identities
pub struct KeyVault {
    storage: Arc<dyn KeyStorage>,
    /// Optional storage key for at-rest sealing
    storage_key: Option<EncryptionKey>,
}

impl KeyVault {
    /// Vault over `storage`, keys stored as plain PKCS#8
    pub fn new(storage: Arc<dyn KeyStorage>) -> Self {
        Self {
            storage,
            storage_key: None,
        }
    }

    /// Vault over `storage` that seals every key with `key`
    pub fn with_storage_key(storage: Arc<dyn KeyStorage>, key: [u8; 32]) -> Self {
        Self {
            storage,
            storage_key: Some(EncryptionKey::from_bytes(key)),
        }
    }

    /// Unsealed vault over a fresh [`MemoryKeyStorage`]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryKeyStorage::new()))
    }

    /// Unsealed vault over SQLite, per `config`
    #[cfg(not(target_arch = "wasm32"))]
    pub async fn open(config: &super::StorageConfig) -> Result<Self> {
        let storage = super::SqliteKeyStorage::open(config.database_path.as_deref()).await?;
        Ok(Self::new(Arc::new(storage)))
    }

    /// Persist both private keys for `user_id`, replacing any earlier record
    pub async fn save(&self, keys: &IdentityKeyPair, user_id: &str) -> Result<()> {
        let agreement = keys.agreement.export_private()?;
        let signing = keys.signing.export_private()?;

        let record = KeyVaultRecord {
            user_id: user_id.to_owned(),
            encrypted_agreement_private_key: self.protect(user_id, AGREEMENT_FIELD, &agreement)?,
            encrypted_signing_private_key: self.protect(user_id, SIGNING_FIELD, &signing)?,
            sealed: self.storage_key.is_some(),
            updated_at: crate::time::now_timestamp_millis(),
        };

        self.storage.put(record).await?;

        tracing::info!(
            "Saved identity keys for {} (sealed: {})",
            user_id,
            self.storage_key.is_some()
        );
        Ok(())
    }

    /// Restore the keys for `user_id`
    ///
    /// `Ok(None)` if nothing was saved. [`Error::KeyImport`] if a record
    /// exists but does not yield valid keys, which includes a sealed record
    /// read without the right storage key.
    pub async fn load(&self, user_id: &str) -> Result<Option<IdentityKeyPair>> {
        let record = match self.storage.get(user_id).await? {
            Some(r) => r,
            None => return Ok(None),
        };

        let agreement_der = self.reveal(&record, AGREEMENT_FIELD, &record.encrypted_agreement_private_key)?;
        let signing_der = self.reveal(&record, SIGNING_FIELD, &record.encrypted_signing_private_key)?;

        let keys = IdentityKeyPair {
            agreement: AgreementKeyPair::import_private_der(&agreement_der)?,
            signing: SigningKeyPair::import_private_der(&signing_der)?,
        };

        tracing::debug!("Loaded identity keys for {}", user_id);
        Ok(Some(keys))
    }

    /// Remove the record for `user_id`; returns whether one existed
    pub async fn delete(&self, user_id: &str) -> Result<bool> {
        let removed = self.storage.delete(user_id).await?;
        if removed {
            tracing::info!("Deleted identity keys for {}", user_id);
        }
        Ok(removed)
    }

    /// Base64 PKCS#8 → stored field text
    fn protect(&self, user_id: &str, field: &str, pkcs8_b64: &str) -> Result<String> {
        let Some(key) = &self.storage_key else {
            return Ok(pkcs8_b64.to_owned());
        };

        let der = Zeroizing::new(decode_bytes(pkcs8_b64)?);
        let (nonce, ciphertext) = encrypt(key, &der, &field_aad(user_id, field))?;

        let mut sealed = nonce.as_bytes().to_vec();
        sealed.extend_from_slice(&ciphertext);
        Ok(encode_bytes(&sealed))
    }

    /// Stored field text → PKCS#8 DER
    fn reveal(&self, record: &KeyVaultRecord, field: &str, text: &str) -> Result<Zeroizing<Vec<u8>>> {
        let bytes = Zeroizing::new(decode_bytes(text)?);

        let key = match (&self.storage_key, record.sealed) {
            (None, false) => return Ok(bytes),
            (Some(key), true) => key,
            (None, true) => {
                return Err(Error::KeyImport(format!(
                    "{} is sealed and no storage key is set",
                    field
                )))
            }
            // A sealing vault only accepts records it sealed itself
            (Some(_), false) => {
                return Err(Error::KeyImport(format!(
                    "{} is stored unsealed but this vault requires sealing",
                    field
                )))
            }
        };

        if bytes.len() < NONCE_SIZE {
            return Err(Error::KeyImport(format!("{} is too short", field)));
        }
        let (nonce, ciphertext) = bytes.split_at(NONCE_SIZE);
        let mut nonce_bytes = [0u8; NONCE_SIZE];
        nonce_bytes.copy_from_slice(nonce);

        decrypt(
            key,
            &Nonce::from_bytes(nonce_bytes),
            ciphertext,
            &field_aad(&record.user_id, field),
        )
        .map(Zeroizing::new)
        .map_err(|_| Error::KeyImport(format!("{} could not be unsealed", field)))
    }
}

/// Binds a sealed key to its owner and slot
fn field_aad(user_id: &str, field: &str) -> Vec<u8> {
    let mut aad = Vec::with_capacity(user_id.len() + 1 + field.len());
    aad.extend_from_slice(user_id.as_bytes());
    aad.push(b'/');
    aad.extend_from_slice(field.as_bytes());
    aad
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{derive_session_key, recover_session_key};
    use crate::messaging;

    /// The restored keys must open what the originals sealed, and vice versa
    fn assert_same_behaviour(original: &IdentityKeyPair, restored: &IdentityKeyPair) {
        let peer = IdentityKeyPair::generate_blocking().unwrap();

        assert_eq!(original.public_bundle(), restored.public_bundle());

        let session = derive_session_key(&original.agreement, &peer.agreement.public_key()).unwrap();
        let packet = messaging::encrypt(&session, "ping", &original.signing).unwrap();

        let salt = messaging::MessagePacket::peek_salt(&packet).unwrap();
        let session = recover_session_key(&restored.agreement, &peer.agreement.public_key(), &salt).unwrap();
        let text = messaging::decrypt(&session, &packet, &restored.signing.public_key()).unwrap();
        assert_eq!(text, "ping");
    }

    #[tokio::test]
    async fn test_save_load_round_trip() {
        let vault = KeyVault::in_memory();
        let keys = IdentityKeyPair::generate().await.unwrap();

        vault.save(&keys, "alice").await.unwrap();
        let restored = vault.load("alice").await.unwrap().unwrap();

        assert_same_behaviour(&keys, &restored);
    }

    #[tokio::test]
    async fn test_unknown_user_is_absent() {
        let vault = KeyVault::in_memory();
        assert!(vault.load("nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_overwrites() {
        let vault = KeyVault::in_memory();
        let first = IdentityKeyPair::generate().await.unwrap();
        let second = IdentityKeyPair::generate().await.unwrap();

        vault.save(&first, "alice").await.unwrap();
        vault.save(&second, "alice").await.unwrap();

        let restored = vault.load("alice").await.unwrap().unwrap();
        assert_eq!(restored.public_bundle(), second.public_bundle());
    }

    #[tokio::test]
    async fn test_sealed_round_trip() {
        let storage = Arc::new(MemoryKeyStorage::new());
        let vault = KeyVault::with_storage_key(storage.clone(), [7u8; 32]);
        let keys = IdentityKeyPair::generate().await.unwrap();

        vault.save(&keys, "alice").await.unwrap();

        let record = storage.get("alice").await.unwrap().unwrap();
        assert!(record.sealed);
        // Sealed text is not the PKCS#8 export
        assert_ne!(
            record.encrypted_agreement_private_key,
            *keys.agreement.export_private().unwrap()
        );

        let restored = vault.load("alice").await.unwrap().unwrap();
        assert_same_behaviour(&keys, &restored);
    }

    #[tokio::test]
    async fn test_sealed_record_needs_right_key() {
        let storage = Arc::new(MemoryKeyStorage::new());
        let keys = IdentityKeyPair::generate().await.unwrap();
        KeyVault::with_storage_key(storage.clone(), [7u8; 32])
            .save(&keys, "alice")
            .await
            .unwrap();

        let wrong = KeyVault::with_storage_key(storage.clone(), [8u8; 32]);
        assert!(matches!(wrong.load("alice").await, Err(Error::KeyImport(_))));

        let plain = KeyVault::new(storage);
        assert!(matches!(plain.load("alice").await, Err(Error::KeyImport(_))));
    }

    #[tokio::test]
    async fn test_sealed_vault_rejects_unsealed_record() {
        let storage = Arc::new(MemoryKeyStorage::new());
        let vault = KeyVault::with_storage_key(storage.clone(), [7u8; 32]);
        let keys = IdentityKeyPair::generate().await.unwrap();
        vault.save(&keys, "alice").await.unwrap();

        // Replace the sealed record with plain keys written straight to storage
        let planted = IdentityKeyPair::generate().await.unwrap();
        KeyVault::new(storage.clone()).save(&planted, "alice").await.unwrap();
        assert!(!storage.get("alice").await.unwrap().unwrap().sealed);

        assert!(matches!(vault.load("alice").await, Err(Error::KeyImport(_))));
    }

    #[tokio::test]
    async fn test_sealed_record_bound_to_user() {
        let storage = Arc::new(MemoryKeyStorage::new());
        let vault = KeyVault::with_storage_key(storage.clone(), [7u8; 32]);
        let keys = IdentityKeyPair::generate().await.unwrap();
        vault.save(&keys, "alice").await.unwrap();

        let mut moved = storage.get("alice").await.unwrap().unwrap();
        moved.user_id = "mallory".into();
        storage.put(moved).await.unwrap();
        assert!(matches!(vault.load("mallory").await, Err(Error::KeyImport(_))));

        let mut swapped = storage.get("alice").await.unwrap().unwrap();
        std::mem::swap(
            &mut swapped.encrypted_agreement_private_key,
            &mut swapped.encrypted_signing_private_key,
        );
        storage.put(swapped).await.unwrap();
        assert!(matches!(vault.load("alice").await, Err(Error::KeyImport(_))));
    }

    #[tokio::test]
    async fn test_corrupt_record_is_import_error() {
        let storage = Arc::new(MemoryKeyStorage::new());
        storage
            .put(KeyVaultRecord {
                user_id: "alice".into(),
                encrypted_agreement_private_key: "bm90IGEga2V5".into(),
                encrypted_signing_private_key: "%%%".into(),
                sealed: false,
                updated_at: 0,
            })
            .await
            .unwrap();

        let vault = KeyVault::new(storage);
        assert!(matches!(vault.load("alice").await, Err(Error::KeyImport(_))));
    }

    #[tokio::test]
    async fn test_delete() {
        let vault = KeyVault::in_memory();
        let keys = IdentityKeyPair::generate().await.unwrap();
        vault.save(&keys, "alice").await.unwrap();

        assert!(vault.delete("alice").await.unwrap());
        assert!(vault.load("alice").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_sqlite_vault_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let config = crate::storage::StorageConfig {
            database_path: Some(dir.path().join("keys.db").to_string_lossy().into_owned()),
        };
        let keys = IdentityKeyPair::generate().await.unwrap();

        KeyVault::open(&config).await.unwrap().save(&keys, "alice").await.unwrap();

        let reopened = KeyVault::open(&config).await.unwrap();
        let restored = reopened.load("alice").await.unwrap().unwrap();
        assert_same_behaviour(&keys, &restored);
    }
}
