//! # Database Schema
//!
//! ```text
//! ┌──────────────────────────────────┐   ┌──────────────────┐
//! │            key_vault             │   │  schema_version  │
//! ├──────────────────────────────────┤   ├──────────────────┤
//! │ user_id                  PK      │   │ version          │
//! │ encrypted_agreement_private_key  │   └──────────────────┘
//! │ encrypted_signing_private_key    │
//! │ sealed                   0 / 1   │
//! │ updated_at               millis  │
//! └──────────────────────────────────┘
//! ```

/// Current schema version
pub const SCHEMA_VERSION: i32 = 1;

/// Fresh database
pub const CREATE_TABLES: &str = r#"
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS key_vault (
    user_id TEXT PRIMARY KEY NOT NULL,
    encrypted_agreement_private_key TEXT NOT NULL,
    encrypted_signing_private_key TEXT NOT NULL,
    sealed INTEGER NOT NULL DEFAULT 0,
    updated_at INTEGER NOT NULL
);
"#;

/// Single-statement upsert keeps each save atomic
pub const UPSERT_RECORD: &str = r#"
INSERT INTO key_vault (
    user_id, encrypted_agreement_private_key, encrypted_signing_private_key, sealed, updated_at
) VALUES (?1, ?2, ?3, ?4, ?5)
ON CONFLICT(user_id) DO UPDATE SET
    encrypted_agreement_private_key = excluded.encrypted_agreement_private_key,
    encrypted_signing_private_key = excluded.encrypted_signing_private_key,
    sealed = excluded.sealed,
    updated_at = excluded.updated_at
"#;

/// Lookup by owner
pub const SELECT_RECORD: &str = r#"
SELECT user_id, encrypted_agreement_private_key, encrypted_signing_private_key, sealed, updated_at
FROM key_vault WHERE user_id = ?1
"#;

/// Removal by owner
pub const DELETE_RECORD: &str = "DELETE FROM key_vault WHERE user_id = ?1";
