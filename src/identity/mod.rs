//! # Identity Module
//!
//! A local user: one [`IdentityKeyPair`] bound to a user id, plus the
//! send and receive pipelines that use it.
//!
//! ## Identity Lifecycle
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      IDENTITY LIFECYCLE                                 │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  load_or_provision(user_id)                                            │
//! │         │                                                               │
//! │         ├── vault hit ───────────────────────────► Identity            │
//! │         │                                                               │
//! │         └── miss / unreadable record                                   │
//! │                    │                                                    │
//! │                    ▼                                                    │
//! │             provision(user_id)                                         │
//! │               1. IdentityKeyPair::generate()                           │
//! │               2. vault.save(keys, user_id)                             │
//! │               3. directory.publish(user_id, public bundle)             │
//! │                    │                                                    │
//! │                    └──────────────────────────────► Identity           │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Message Flow
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        SEND / RECEIVE                                   │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  Alice.send(dir, "bob", text)                                          │
//! │    bundle_B  = dir.get("bob")               ✗ UnknownPeer              │
//! │    session   = derive_session_key(A.agreement, bundle_B.agreement)     │
//! │    packet    = messaging::encrypt(session, text, A.signing)            │
//! │    ──► Envelope { id, sender, recipient, packet, sent_at } ──► relay   │
//! │                                                                         │
//! │  Bob.receive(dir, &envelope)                                           │
//! │    bundle_A  = dir.get(envelope.sender)     ✗ UnknownPeer              │
//! │    salt      = MessagePacket::peek_salt(packet)                        │
//! │    session   = recover_session_key(B.agreement, bundle_A.agreement,    │
//! │                                    salt)                               │
//! │    text      = messaging::decrypt(session, packet, bundle_A.signing)   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};

use crate::crypto::{derive_session_key, recover_session_key, IdentityKeyPair, PublicKeyBundle};
use crate::directory::PublicKeyDirectory;
use crate::error::{Error, Result, UNDECRYPTABLE_PLACEHOLDER};
use crate::messaging::{self, MessagePacket};
use crate::storage::KeyVault;

/// A local user and their long-term keys
#[derive(Debug)]
pub struct Identity {
    user_id: String,
    keys: IdentityKeyPair,
}

impl Identity {
    /// Wrap existing keys
    pub fn new(user_id: impl Into<String>, keys: IdentityKeyPair) -> Self {
        Self {
            user_id: user_id.into(),
            keys,
        }
    }

    /// Generate fresh keys, save them, and publish the public half
    pub async fn provision(
        user_id: &str,
        vault: &KeyVault,
        directory: &dyn PublicKeyDirectory,
    ) -> Result<Self> {
        let keys = IdentityKeyPair::generate().await?;
        vault.save(&keys, user_id).await?;
        directory.publish(user_id, &keys.public_bundle()).await?;

        let identity = Self::new(user_id, keys);
        tracing::info!(
            "Provisioned identity {} (fingerprint {})",
            user_id,
            identity.fingerprint()?
        );
        Ok(identity)
    }

    /// Restore the identity from the vault, provisioning a new one if the
    /// vault has nothing usable
    ///
    /// A record that exists but cannot be read is replaced. Storage failures
    /// are returned as-is.
    pub async fn load_or_provision(
        user_id: &str,
        vault: &KeyVault,
        directory: &dyn PublicKeyDirectory,
    ) -> Result<Self> {
        match vault.load(user_id).await {
            Ok(Some(keys)) => {
                tracing::info!("Loaded identity {}", user_id);
                return Ok(Self::new(user_id, keys));
            }
            Ok(None) => {}
            Err(Error::KeyImport(reason)) => {
                tracing::warn!(
                    "Stored keys for {} are unreadable ({}), provisioning new ones",
                    user_id,
                    reason
                );
            }
            Err(e) => return Err(e),
        }

        Self::provision(user_id, vault, directory).await
    }

    /// The user id these keys belong to
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// The long-term key pairs
    pub fn keys(&self) -> &IdentityKeyPair {
        &self.keys
    }

    /// Public half, as published in the directory
    pub fn public_bundle(&self) -> PublicKeyBundle {
        self.keys.public_bundle()
    }

    /// Fingerprint of the signing key, for out-of-band comparison
    pub fn fingerprint(&self) -> Result<String> {
        self.keys.signing.public_key().fingerprint()
    }

    /// Encrypt `plaintext` for the owner of `recipient`
    pub fn seal_for(&self, recipient: &PublicKeyBundle, plaintext: &str) -> Result<String> {
        let session = derive_session_key(&self.keys.agreement, &recipient.agreement)?;
        messaging::encrypt(&session, plaintext, &self.keys.signing)
    }

    /// Verify and decrypt a packet sent by the owner of `sender`
    pub fn open_from(&self, sender: &PublicKeyBundle, packet: &str) -> Result<String> {
        let packet = MessagePacket::decode(packet)?;
        let session = recover_session_key(&self.keys.agreement, &sender.agreement, &packet.salt)?;
        messaging::open(&session, &packet, &sender.signing)
    }

    /// Look up `recipient_id` and encrypt `plaintext` for them
    pub async fn send(
        &self,
        directory: &dyn PublicKeyDirectory,
        recipient_id: &str,
        plaintext: &str,
    ) -> Result<Envelope> {
        let bundle = lookup(directory, recipient_id).await?;
        let packet = self.seal_for(&bundle, plaintext)?;

        let envelope = Envelope {
            id: uuid::Uuid::new_v4().to_string(),
            sender: self.user_id.clone(),
            recipient: recipient_id.to_owned(),
            packet,
            sent_at: crate::time::now_timestamp_millis(),
        };

        tracing::debug!("Sealed message {} for {}", envelope.id, recipient_id);
        Ok(envelope)
    }

    /// Look up the sender of `envelope` and open it
    pub async fn receive(&self, directory: &dyn PublicKeyDirectory, envelope: &Envelope) -> Result<String> {
        if envelope.recipient != self.user_id {
            return Err(Error::MalformedPacket(format!(
                "envelope {} is addressed to another user",
                envelope.id
            )));
        }

        let bundle = lookup(directory, &envelope.sender).await?;
        self.open_from(&bundle, &envelope.packet)
    }

    /// Like [`Identity::receive`], but never fails
    ///
    /// On failure the text is [`UNDECRYPTABLE_PLACEHOLDER`] and the error
    /// code is kept on the result.
    pub async fn receive_for_display(
        &self,
        directory: &dyn PublicKeyDirectory,
        envelope: &Envelope,
    ) -> ReceivedMessage {
        let (text, error_code) = match self.receive(directory, envelope).await {
            Ok(text) => (text, None),
            Err(e) => {
                if e.is_trust_failure() {
                    tracing::warn!(
                        "Rejected message {} from {}: {}",
                        envelope.id,
                        envelope.sender,
                        e
                    );
                } else {
                    tracing::debug!(
                        "Could not open message {} from {}: {}",
                        envelope.id,
                        envelope.sender,
                        e
                    );
                }
                (UNDECRYPTABLE_PLACEHOLDER.to_owned(), Some(e.code()))
            }
        };

        ReceivedMessage {
            id: envelope.id.clone(),
            sender: envelope.sender.clone(),
            text,
            sent_at: envelope.sent_at,
            error_code,
        }
    }
}

async fn lookup(directory: &dyn PublicKeyDirectory, user_id: &str) -> Result<PublicKeyBundle> {
    directory
        .get(user_id)
        .await?
        .ok_or_else(|| Error::UnknownPeer(user_id.to_owned()))
}

// ============================================================================
// RELAY TYPES
// ============================================================================

/// What travels over the relay
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    /// Unique message id (UUID v4)
    pub id: String,
    /// Sender's user id
    pub sender: String,
    /// Recipient's user id
    pub recipient: String,
    /// Base64 message packet
    pub packet: String,
    /// Unix millis at send time (not authenticated)
    pub sent_at: i64,
}

impl Envelope {
    /// Serialize to JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Deserialize from JSON
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// A message ready to show, whether or not it could be opened
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceivedMessage {
    /// Envelope id
    pub id: String,
    /// Sender's user id
    pub sender: String,
    /// Plaintext, or the placeholder
    pub text: String,
    /// Envelope timestamp
    pub sent_at: i64,
    /// Error code if the message could not be opened
    pub error_code: Option<i32>,
}

impl ReceivedMessage {
    /// Whether `text` is the real plaintext
    pub fn is_readable(&self) -> bool {
        self.error_code.is_none()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::MemoryDirectory;
    use crate::storage::{KeyStorage, KeyVaultRecord, MemoryKeyStorage};
    use std::sync::Arc;

    async fn two_users(directory: &MemoryDirectory) -> (Identity, Identity) {
        let vault = KeyVault::in_memory();
        let alice = Identity::provision("alice", &vault, directory).await.unwrap();
        let bob = Identity::provision("bob", &vault, directory).await.unwrap();
        (alice, bob)
    }

    #[tokio::test]
    async fn test_provision_saves_and_publishes() {
        let vault = KeyVault::in_memory();
        let directory = MemoryDirectory::new();

        let alice = Identity::provision("alice", &vault, &directory).await.unwrap();

        assert_eq!(
            directory.get("alice").await.unwrap(),
            Some(alice.public_bundle())
        );
        let stored = vault.load("alice").await.unwrap().unwrap();
        assert_eq!(stored.public_bundle(), alice.public_bundle());
    }

    #[tokio::test]
    async fn test_load_or_provision_reuses_keys() {
        let vault = KeyVault::in_memory();
        let directory = MemoryDirectory::new();

        let first = Identity::load_or_provision("alice", &vault, &directory).await.unwrap();
        let second = Identity::load_or_provision("alice", &vault, &directory).await.unwrap();

        assert_eq!(first.public_bundle(), second.public_bundle());
        assert_eq!(first.fingerprint().unwrap(), second.fingerprint().unwrap());
    }

    #[tokio::test]
    async fn test_load_or_provision_replaces_unreadable_record() {
        let storage = Arc::new(MemoryKeyStorage::new());
        storage
            .put(KeyVaultRecord {
                user_id: "alice".into(),
                encrypted_agreement_private_key: "garbage".into(),
                encrypted_signing_private_key: "garbage".into(),
                sealed: false,
                updated_at: 0,
            })
            .await
            .unwrap();

        let vault = KeyVault::new(storage);
        let directory = MemoryDirectory::new();

        let alice = Identity::load_or_provision("alice", &vault, &directory).await.unwrap();
        let reloaded = vault.load("alice").await.unwrap().unwrap();
        assert_eq!(reloaded.public_bundle(), alice.public_bundle());
        assert!(directory.get("alice").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_send_receive() {
        let directory = MemoryDirectory::new();
        let (alice, bob) = two_users(&directory).await;

        let envelope = alice.send(&directory, "bob", "hello").await.unwrap();
        assert_eq!(envelope.sender, "alice");
        assert_eq!(envelope.recipient, "bob");
        assert!(uuid::Uuid::parse_str(&envelope.id).is_ok());

        let wire = envelope.to_json().unwrap();
        let envelope = Envelope::from_json(&wire).unwrap();
        assert_eq!(bob.receive(&directory, &envelope).await.unwrap(), "hello");
    }

    #[tokio::test]
    async fn test_unknown_peer() {
        let directory = MemoryDirectory::new();
        let (alice, bob) = two_users(&directory).await;

        let result = alice.send(&directory, "carol", "hi").await;
        assert!(matches!(result, Err(Error::UnknownPeer(id)) if id == "carol"));

        let mut envelope = alice.send(&directory, "bob", "hi").await.unwrap();
        envelope.sender = "carol".into();
        assert!(matches!(
            bob.receive(&directory, &envelope).await,
            Err(Error::UnknownPeer(_))
        ));
    }

    #[tokio::test]
    async fn test_misaddressed_envelope() {
        let directory = MemoryDirectory::new();
        let (alice, _bob) = two_users(&directory).await;

        let envelope = alice.send(&directory, "bob", "hi").await.unwrap();
        assert!(alice.receive(&directory, &envelope).await.is_err());
    }

    #[tokio::test]
    async fn test_receive_for_display_placeholder() {
        let directory = MemoryDirectory::new();
        let (alice, bob) = two_users(&directory).await;

        let envelope = alice.send(&directory, "bob", "hello").await.unwrap();
        let shown = bob.receive_for_display(&directory, &envelope).await;
        assert!(shown.is_readable());
        assert_eq!(shown.text, "hello");

        // Re-pack the envelope with one ciphertext byte flipped
        let mut packet = MessagePacket::decode(&envelope.packet).unwrap();
        packet.ciphertext[0] ^= 0x80;
        let tampered = Envelope {
            packet: packet.encode(),
            ..envelope
        };

        let shown = bob.receive_for_display(&directory, &tampered).await;
        assert!(!shown.is_readable());
        assert_eq!(shown.text, UNDECRYPTABLE_PLACEHOLDER);
        assert_eq!(shown.error_code, Some(Error::Signature.code()));
    }

    #[tokio::test]
    async fn test_seal_for_open_from() {
        let alice = Identity::new("alice", IdentityKeyPair::generate().await.unwrap());
        let bob = Identity::new("bob", IdentityKeyPair::generate().await.unwrap());

        let packet = alice.seal_for(&bob.public_bundle(), "direct").unwrap();
        assert_eq!(bob.open_from(&alice.public_bundle(), &packet).unwrap(), "direct");

        // A third party holding both public bundles cannot open it
        let eve = Identity::new("eve", IdentityKeyPair::generate().await.unwrap());
        assert!(matches!(
            eve.open_from(&alice.public_bundle(), &packet),
            Err(Error::Decryption(_))
        ));
    }
}
