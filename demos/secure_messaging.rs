//! # Secure Messaging Demo
//!
//! Demonstrates a message going from Alice to Bob through an untrusted relay,
//! and what happens when the relay tampers with it.
//!
//! ## Run
//!
//! ```bash
//! cargo run --example secure_messaging
//! ```

use stvor_core::directory::MemoryDirectory;
use stvor_core::{Envelope, Identity, KeyVault, MessagePacket};

#[tokio::main]
async fn main() {
    println!("=== Stvor Core: Secure Messaging Demo ===\n");

    // Step 1: Both parties provision identities
    println!("Step 1: Provisioning Alice and Bob...");

    let vault = KeyVault::in_memory();
    let directory = MemoryDirectory::new();

    let alice = Identity::provision("alice", &vault, &directory)
        .await
        .expect("Failed to provision Alice");
    let bob = Identity::provision("bob", &vault, &directory)
        .await
        .expect("Failed to provision Bob");

    println!("  Alice: {}", alice.fingerprint().expect("fingerprint"));
    println!("  Bob:   {}", bob.fingerprint().expect("fingerprint"));
    println!();

    // Step 2: Alice sends
    println!("Step 2: Alice sends \"hello\" to Bob...");

    let envelope = alice
        .send(&directory, "bob", "hello")
        .await
        .expect("Failed to send");
    let packet = MessagePacket::decode(&envelope.packet).expect("Failed to parse packet");

    println!();
    println!("  ┌───────────────────────────────────────────────────────────┐");
    println!("  │                       PACKET (v1)                         │");
    println!("  ├───────────────────────────────────────────────────────────┤");
    println!("  │  AAD        {:<46}│", format!("{:?}", packet.aad));
    println!("  │  salt       {:<46}│", hex::encode(packet.salt.as_bytes()));
    println!("  │  nonce      {:<46}│", hex::encode(packet.nonce.as_bytes()));
    println!("  │  signature  {:<46}│", format!("{}… (132 bytes)", hex::encode(&packet.signature.as_bytes()[..8])));
    println!("  │  ciphertext {:<46}│", format!("{} bytes", packet.ciphertext.len()));
    println!("  └───────────────────────────────────────────────────────────┘");
    println!();

    // Step 3: Bob receives
    println!("Step 3: Bob receives...");

    let text = bob
        .receive(&directory, &envelope)
        .await
        .expect("Failed to receive");
    println!("  Decrypted: {:?} ✓", text);
    println!();

    // Step 4: The relay flips one byte
    println!("Step 4: The relay corrupts one byte of the packet...");

    let mut bytes = stvor_core::crypto::decode_bytes(&envelope.packet).expect("base64");
    let last = bytes.len() - 1;
    bytes[last] ^= 0x01;
    let tampered = Envelope {
        packet: stvor_core::crypto::encode_bytes(&bytes),
        ..envelope.clone()
    };

    match bob.receive(&directory, &tampered).await {
        Ok(text) => println!("  Decrypted: {:?} ✗ (should have failed)", text),
        Err(e) => println!(
            "  Rejected: {} (code {}, trust failure: {}) ✓",
            e,
            e.code(),
            e.is_trust_failure()
        ),
    }

    let shown = bob.receive_for_display(&directory, &tampered).await;
    println!("  Shown to Bob: {:?}", shown.text);
    println!();

    // Step 5: A message to someone who never published keys
    println!("Step 5: Alice writes to \"carol\" (no published keys)...");
    match alice.send(&directory, "carol", "hi").await {
        Ok(_) => println!("  Sent ✗ (should have failed)"),
        Err(e) => println!("  {} ✓", e),
    }
    println!();

    println!("=== Demo Complete ===");
}
