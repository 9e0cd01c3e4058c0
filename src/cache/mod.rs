//! Per-wallet holdings cache
//!
//! One entry per wallet address holding the ordered list of resolved
//! records. Write failures are never fatal to a sync: `put`, `remove` and
//! `purge` report success as a bool and log what went wrong.

mod memory;
mod sqlite;

pub use memory::MemoryCacheStore;
pub use sqlite::SqliteCacheStore;

use crate::errors::SyncResult;
use crate::types::TokenRecord;
use async_trait::async_trait;

#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Cached records for `wallet_address`; `Ok(None)` on a miss or an
    /// unreadable entry
    async fn get(&self, wallet_address: &str) -> SyncResult<Option<Vec<TokenRecord>>>;

    /// Replace the entry for `wallet_address`
    async fn put(&self, wallet_address: &str, records: &[TokenRecord]) -> bool;

    /// Drop the entry for `wallet_address` if there is one
    async fn remove(&self, wallet_address: &str) -> bool;

    /// Drop every entry; skipped when in-flight reads and writes do not
    /// drain in time
    async fn purge(&self) -> bool;

    /// Wallet addresses with an entry, sorted
    async fn keys(&self) -> SyncResult<Vec<String>>;
}
