//! # Messaging Module
//!
//! Seals a plaintext into a signed, versioned packet and opens it again.
//!
//! ## Message Encryption Flow
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      MESSAGE ENCRYPTION                                 │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  Sender (Alice)        Input: "hello", SessionKey(salt), signing key   │
//! │                                                                         │
//! │  1. AAD = "v=E2E-v1&t=<millis>" padded to 30 bytes                     │
//! │  2. (nonce, ct) = AES-256-GCM(session_key, plaintext, AAD)             │
//! │  3. sig = ECDSA-P521-SHA512(alice_signing, AAD ‖ ct)                    │
//! │  4. frame = AAD ‖ salt ‖ nonce ‖ sig ‖ ct  ──► base64                  │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Message Decryption Flow
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      MESSAGE DECRYPTION                                 │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  Recipient (Bob)                                                       │
//! │                                                                         │
//! │  1. base64 → frame, split by fixed offsets      ✗ MalformedPacket      │
//! │  2. version tag in AAD is known                  ✗ UnsupportedVersion   │
//! │  3. verify sig over AAD ‖ ct with alice's key   ✗ Signature            │
//! │  4. AES-256-GCM open                             ✗ Decryption           │
//! │  5. UTF-8 plaintext                              ✗ Decryption           │
//! │                                                                         │
//! │  No step runs unless every step before it succeeded.                   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each call is independent. Nothing is cached between messages and there
//! is no shared state, so calls for different messages can run in parallel.

mod packet;

pub use packet::{Aad, MessagePacket, AAD_SIZE, MIN_PACKET_SIZE, PROTOCOL_VERSION, SUPPORTED_VERSIONS};

use crate::crypto::{self, SessionKey, SigningKeyPair, SigningPublicKey};
use crate::error::{Error, Result};

/// Encrypt and sign `plaintext`, returning the structured packet
pub fn seal(session: &SessionKey, plaintext: &str, signer: &SigningKeyPair) -> Result<MessagePacket> {
    let aad = Aad::current();

    let (nonce, ciphertext) =
        crypto::encrypt(session.encryption_key(), plaintext.as_bytes(), aad.as_bytes())?;

    let signature = crypto::sign(signer, &MessagePacket::signed_bytes(&aad, &ciphertext))?;

    let packet = MessagePacket {
        aad,
        salt: *session.salt(),
        nonce,
        signature,
        ciphertext,
    };

    tracing::debug!("Sealed {} byte message", plaintext.len());

    Ok(packet)
}

/// Encrypt and sign `plaintext`, returning the base64 packet for the relay
pub fn encrypt(session: &SessionKey, plaintext: &str, signer: &SigningKeyPair) -> Result<String> {
    seal(session, plaintext, signer).map(|packet| packet.encode())
}

/// Verify and decrypt a parsed packet
pub fn open(session: &SessionKey, packet: &MessagePacket, sender: &SigningPublicKey) -> Result<String> {
    let version = packet.version()?;

    let signed = MessagePacket::signed_bytes(&packet.aad, &packet.ciphertext);
    crypto::verify(sender, &signed, &packet.signature)?;

    let plaintext = crypto::decrypt(
        session.encryption_key(),
        &packet.nonce,
        &packet.ciphertext,
        packet.aad.as_bytes(),
    )?;

    tracing::debug!("Opened {} packet", version);

    String::from_utf8(plaintext)
        .map_err(|_| Error::Decryption("plaintext is not valid UTF-8".into()))
}

/// Verify and decrypt a base64 packet
pub fn decrypt(session: &SessionKey, packet: &str, sender: &SigningPublicKey) -> Result<String> {
    let packet = MessagePacket::decode(packet)?;
    open(session, &packet, sender)
}

// ============================================================================
// TESTS
// ============================================================================
