//! # SQLite Key Storage
//!
//! [`KeyStorage`] backed by a single `key_vault` table.
//!
//! SQLite calls block, so each one runs on tokio's blocking pool with a
//! clone of the shared connection handle.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};

use super::{schema, KeyStorage, KeyVaultRecord};
use crate::error::{Error, Result};

/// SQLite-backed key storage
#[derive(Clone)]
pub struct SqliteKeyStorage {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteKeyStorage {
    /// Open or create a database
    ///
    /// If path is None, creates an in-memory database (useful for testing).
    pub async fn open(path: Option<&str>) -> Result<Self> {
        let path = path.map(str::to_owned);

        let conn = tokio::task::spawn_blocking(move || -> Result<Connection> {
            let conn = match path.as_deref() {
                Some(p) => Connection::open(p)
                    .map_err(|e| Error::Storage(format!("Failed to open database: {}", e)))?,
                None => Connection::open_in_memory().map_err(|e| {
                    Error::Storage(format!("Failed to create in-memory database: {}", e))
                })?,
            };
            init_schema(&conn)?;
            Ok(conn)
        })
        .await??;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    async fn with_conn<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || f(&conn.lock())).await?
    }
}

fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(schema::CREATE_TABLES)
        .map_err(|e| Error::Storage(format!("Failed to create tables: {}", e)))?;

    let version: Option<i32> = conn
        .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| row.get(0))
        .optional()?;

    match version {
        None => {
            conn.execute(
                "INSERT INTO schema_version (version) VALUES (?1)",
                params![schema::SCHEMA_VERSION],
            )
            .map_err(|e| Error::Storage(format!("Failed to set schema version: {}", e)))?;

            tracing::info!("Key vault schema created (version {})", schema::SCHEMA_VERSION);
        }
        Some(v) if v > schema::SCHEMA_VERSION => {
            return Err(Error::Storage(format!(
                "Key vault schema version {} is newer than supported {}",
                v,
                schema::SCHEMA_VERSION
            )));
        }
        Some(v) => {
            tracing::debug!("Key vault schema version: {}", v);
        }
    }

    Ok(())
}

#[async_trait]
impl KeyStorage for SqliteKeyStorage {
    async fn get(&self, user_id: &str) -> Result<Option<KeyVaultRecord>> {
        let user_id = user_id.to_owned();
        self.with_conn(move |conn| {
            conn.query_row(schema::SELECT_RECORD, params![user_id], |row| {
                Ok(KeyVaultRecord {
                    user_id: row.get(0)?,
                    encrypted_agreement_private_key: row.get(1)?,
                    encrypted_signing_private_key: row.get(2)?,
                    sealed: row.get(3)?,
                    updated_at: row.get(4)?,
                })
            })
            .optional()
            .map_err(|e| Error::Storage(format!("Failed to read key record: {}", e)))
        })
        .await
    }

    async fn put(&self, record: KeyVaultRecord) -> Result<()> {
        self.with_conn(move |conn| {
            conn.execute(
                schema::UPSERT_RECORD,
                params![
                    record.user_id,
                    record.encrypted_agreement_private_key,
                    record.encrypted_signing_private_key,
                    record.sealed,
                    record.updated_at,
                ],
            )
            .map_err(|e| Error::Storage(format!("Failed to write key record: {}", e)))?;
            Ok(())
        })
        .await
    }

    async fn delete(&self, user_id: &str) -> Result<bool> {
        let user_id = user_id.to_owned();
        self.with_conn(move |conn| {
            let removed = conn
                .execute(schema::DELETE_RECORD, params![user_id])
                .map_err(|e| Error::Storage(format!("Failed to delete key record: {}", e)))?;
            Ok(removed > 0)
        })
        .await
    }
}
