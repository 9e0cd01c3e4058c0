//! In-process `CacheStore` used when the database cannot be opened

use super::CacheStore;
use crate::errors::SyncResult;
use crate::types::TokenRecord;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;

#[derive(Default)]
pub struct MemoryCacheStore {
    entries: RwLock<HashMap<String, Vec<TokenRecord>>>,
    writes: AtomicUsize,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful `put` calls
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get(&self, wallet_address: &str) -> SyncResult<Option<Vec<TokenRecord>>> {
        Ok(self.entries.read().await.get(wallet_address).cloned())
    }

    async fn put(&self, wallet_address: &str, records: &[TokenRecord]) -> bool {
        self.entries
            .write()
            .await
            .insert(wallet_address.to_string(), records.to_vec());
        self.writes.fetch_add(1, Ordering::SeqCst);
        true
    }

    async fn remove(&self, wallet_address: &str) -> bool {
        self.entries.write().await.remove(wallet_address);
        true
    }

    async fn purge(&self) -> bool {
        self.entries.write().await.clear();
        true
    }

    async fn keys(&self) -> SyncResult<Vec<String>> {
        let mut keys: Vec<String> = self.entries.read().await.keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }
}
