//! # Identity Provisioning Demo
//!
//! Demonstrates the key lifecycle of a local identity:
//! 1. Provision a new identity into a SQLite vault
//! 2. Reload it and compare fingerprints
//! 3. Export the public bundle for the directory
//! 4. Seal the vault with a storage key
//!
//! ## Run
//!
//! ```bash
//! cargo run --example identity_provisioning
//! ```

use std::sync::Arc;

use stvor_core::directory::MemoryDirectory;
use stvor_core::storage::{KeyStorage, MemoryKeyStorage};
use stvor_core::{Identity, KeyVault, StorageConfig};

#[tokio::main]
async fn main() {
    println!("=================================================");
    println!("        STVOR IDENTITY PROVISIONING DEMO");
    println!("=================================================\n");

    let dir = std::env::temp_dir().join(format!("stvor-demo-{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&dir).expect("Failed to create temp dir");
    let config = StorageConfig {
        database_path: Some(dir.join("keys.db").to_string_lossy().into_owned()),
    };
    let directory = MemoryDirectory::new();

    // =========================================================================
    // STEP 1: First launch, nothing in the vault yet
    // =========================================================================
    println!("1. First launch: provisioning \"alice\"...\n");

    let vault = KeyVault::open(&config).await.expect("Failed to open vault");
    let alice = Identity::load_or_provision("alice", &vault, &directory)
        .await
        .expect("Failed to provision");

    let fingerprint = alice.fingerprint().expect("Failed to fingerprint");
    println!("   User:        {}", alice.user_id());
    println!("   Fingerprint: {}", fingerprint);
    println!("   Vault:       {}", config.database_path.as_deref().unwrap_or(":memory:"));
    println!();

    // =========================================================================
    // STEP 2: Second launch, keys come back from the vault
    // =========================================================================
    println!("2. Second launch: reloading from the vault...\n");

    let vault = KeyVault::open(&config).await.expect("Failed to reopen vault");
    let again = Identity::load_or_provision("alice", &vault, &directory)
        .await
        .expect("Failed to load");

    let same = again.fingerprint().expect("Failed to fingerprint") == fingerprint;
    println!("   Same fingerprint: {}", if same { "yes ✓" } else { "NO ✗" });
    assert!(same);
    println!();

    // =========================================================================
    // STEP 3: What the directory sees
    // =========================================================================
    println!("3. Public bundle published to the directory:\n");

    let bundle = serde_json::to_string_pretty(&alice.public_bundle()).expect("Failed to serialize");
    for line in bundle.lines() {
        let shown: String = line.chars().take(72).collect();
        println!("   {}{}", shown, if line.len() > 72 { "…" } else { "" });
    }
    println!();

    // =========================================================================
    // STEP 4: Sealing keys at rest
    // =========================================================================
    println!("4. Sealing private keys with a storage key...\n");

    let storage = Arc::new(MemoryKeyStorage::new());
    let sealed_vault = KeyVault::with_storage_key(storage.clone(), [0x42; 32]);
    sealed_vault
        .save(alice.keys(), "alice")
        .await
        .expect("Failed to save");

    let record = storage
        .get("alice")
        .await
        .expect("Failed to read")
        .expect("Record missing");
    println!("   sealed: {}", record.sealed);
    println!(
        "   agreement key field: {}…",
        &record.encrypted_agreement_private_key[..32]
    );

    let plain_vault = KeyVault::new(storage);
    match plain_vault.load("alice").await {
        Err(e) => println!("   Opening without the storage key: {} ✓", e),
        Ok(_) => println!("   Opening without the storage key: succeeded ✗"),
    }
    println!();

    std::fs::remove_dir_all(&dir).ok();

    println!("=================================================");
    println!("                 DEMO COMPLETE");
    println!("=================================================");
}
