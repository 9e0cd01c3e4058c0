//! SQLite-backed `CacheStore`
//!
//! Schema (additive only, destructive changes go through `purge`):
//!
//! ```sql
//! wallet_holdings(wallet_address TEXT PRIMARY KEY, records TEXT NOT NULL,
//!                 record_count INTEGER NOT NULL, updated_at TEXT NOT NULL)
//! ```
//!
//! `records` is the JSON list of `TokenRecord`s in result order.

use super::CacheStore;
use crate::errors::{SyncError, SyncResult};
use crate::logger::{self, LogTag};
use crate::types::TokenRecord;
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::RwLock;

pub struct SqliteCacheStore {
    conn: Mutex<Connection>,
    /// Shared for get/put/remove, exclusive for purge
    gate: RwLock<()>,
    purge_timeout: Duration,
}

impl SqliteCacheStore {
    /// Open (or create) the database file at `path`
    pub fn open(path: &Path, purge_timeout: Duration) -> SyncResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    SyncError::CacheIo(format!("Failed to create cache directory: {}", e))
                })?;
            }
        }

        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.busy_timeout(Duration::from_millis(5_000))?;

        let store = Self::with_connection(conn, purge_timeout)?;
        logger::info(
            LogTag::Cache,
            &format!("Holdings cache opened at {}", path.display()),
        );
        Ok(store)
    }

    /// Non-persistent store, used by tests and as a fallback
    pub fn in_memory(purge_timeout: Duration) -> SyncResult<Self> {
        Self::with_connection(Connection::open_in_memory()?, purge_timeout)
    }

    fn with_connection(conn: Connection, purge_timeout: Duration) -> SyncResult<Self> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS wallet_holdings (
                wallet_address  TEXT    PRIMARY KEY,
                records         TEXT    NOT NULL,
                record_count    INTEGER NOT NULL,
                updated_at      TEXT    NOT NULL
            )",
            [],
        )?;

        Ok(Self {
            conn: Mutex::new(conn),
            gate: RwLock::new(()),
            purge_timeout,
        })
    }

    fn execute<T>(&self, op: impl FnOnce(&Connection) -> SyncResult<T>) -> SyncResult<T> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| SyncError::CacheIo("Cache connection lock poisoned".to_string()))?;
        op(&conn)
    }

    fn read_entry(&self, wallet_address: &str) -> SyncResult<Option<String>> {
        self.execute(|conn| {
            Ok(conn
                .query_row(
                    "SELECT records FROM wallet_holdings WHERE wallet_address = ?1",
                    params![wallet_address],
                    |row| row.get::<_, String>(0),
                )
                .optional()?)
        })
    }

    fn write_entry(&self, wallet_address: &str, records: &[TokenRecord]) -> SyncResult<()> {
        let json = serde_json::to_string(records)?;
        self.execute(|conn| {
            conn.execute(
                "INSERT INTO wallet_holdings (wallet_address, records, record_count, updated_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(wallet_address) DO UPDATE SET
                    records = excluded.records,
                    record_count = excluded.record_count,
                    updated_at = excluded.updated_at",
                params![
                    wallet_address,
                    json,
                    records.len() as i64,
                    Utc::now().to_rfc3339()
                ],
            )?;
            Ok(())
        })
    }
}

#[async_trait]
impl CacheStore for SqliteCacheStore {
    async fn get(&self, wallet_address: &str) -> SyncResult<Option<Vec<TokenRecord>>> {
        let _gate = self.gate.read().await;

        let Some(json) = self.read_entry(wallet_address)? else {
            logger::debug(LogTag::Cache, &format!("Cache miss for {}", wallet_address));
            return Ok(None);
        };

        match serde_json::from_str::<Vec<TokenRecord>>(&json) {
            Ok(records) => {
                logger::debug(
                    LogTag::Cache,
                    &format!("Cache hit for {}: {} records", wallet_address, records.len()),
                );
                Ok(Some(records))
            }
            Err(e) => {
                logger::warning(
                    LogTag::Cache,
                    &format!(
                        "Ignoring unreadable cache entry for {}: {}",
                        wallet_address, e
                    ),
                );
                Ok(None)
            }
        }
    }

    async fn put(&self, wallet_address: &str, records: &[TokenRecord]) -> bool {
        let _gate = self.gate.read().await;

        match self.write_entry(wallet_address, records) {
            Ok(()) => {
                logger::debug(
                    LogTag::Cache,
                    &format!("Cached {} records for {}", records.len(), wallet_address),
                );
                true
            }
            Err(e) => {
                logger::warning(
                    LogTag::Cache,
                    &format!("Failed to cache records for {}: {}", wallet_address, e),
                );
                false
            }
        }
    }

    async fn remove(&self, wallet_address: &str) -> bool {
        let _gate = self.gate.read().await;

        let result = self.execute(|conn| {
            Ok(conn.execute(
                "DELETE FROM wallet_holdings WHERE wallet_address = ?1",
                params![wallet_address],
            )?)
        });

        match result {
            Ok(removed) => {
                if removed > 0 {
                    logger::debug(
                        LogTag::Cache,
                        &format!("Removed cache entry for {}", wallet_address),
                    );
                }
                true
            }
            Err(e) => {
                logger::warning(
                    LogTag::Cache,
                    &format!("Failed to remove cache entry for {}: {}", wallet_address, e),
                );
                false
            }
        }
    }

    async fn purge(&self) -> bool {
        let _gate = match tokio::time::timeout(self.purge_timeout, self.gate.write()).await {
            Ok(guard) => guard,
            Err(_) => {
                logger::warning(
                    LogTag::Cache,
                    &format!(
                        "Cache busy, purge deferred after waiting {:?}",
                        self.purge_timeout
                    ),
                );
                return false;
            }
        };

        match self.execute(|conn| Ok(conn.execute("DELETE FROM wallet_holdings", [])?)) {
            Ok(removed) => {
                logger::info(
                    LogTag::Cache,
                    &format!("Purged {} cached wallets", removed),
                );
                true
            }
            Err(e) => {
                logger::error(LogTag::Cache, &format!("Cache purge failed: {}", e));
                false
            }
        }
    }

    async fn keys(&self) -> SyncResult<Vec<String>> {
        let _gate = self.gate.read().await;

        self.execute(|conn| {
            let mut stmt = conn
                .prepare("SELECT wallet_address FROM wallet_holdings ORDER BY wallet_address")?;
            let keys = stmt
                .query_map([], |row| row.get::<_, String>(0))?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(keys)
        })
    }
}
