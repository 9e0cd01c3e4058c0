//! Wallet reconciliation
//!
//! Merges what the chain says a wallet holds with what was cached last time:
//! cached records for accounts that are gone (or no longer pass the
//! allowlist) are pruned, only the remaining unknown candidates are resolved,
//! and the cache entry is rewritten only when the result actually changed.

use crate::batch::{BatchOptions, BatchScheduler};
use crate::cache::CacheStore;
use crate::errors::{SyncError, SyncResult};
use crate::logger::{self, LogTag};
use crate::metadata::{Allowlist, CandidateResolver};
use crate::rpc::LedgerClient;
use crate::scanner::TokenAccountScanner;
use crate::types::{SyncReport, TokenCandidate, TokenRecord};
use crate::utils::{parse_pubkey, run_cancellable};
use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone)]
pub struct SyncOptions {
    pub caching_enabled: bool,
    pub allowlist: Option<Allowlist>,
    pub batch: BatchOptions,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            caching_enabled: true,
            allowlist: None,
            batch: BatchOptions::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOutcome {
    pub records: Vec<TokenRecord>,
    pub report: SyncReport,
}

pub struct ReconciliationEngine<L> {
    scanner: TokenAccountScanner<L>,
    resolver: Arc<dyn CandidateResolver>,
    scheduler: BatchScheduler,
    cache: Arc<dyn CacheStore>,
    wallet_locks: WalletLocks,
}

impl<L: LedgerClient> ReconciliationEngine<L> {
    pub fn new(
        scanner: TokenAccountScanner<L>,
        resolver: Arc<dyn CandidateResolver>,
        scheduler: BatchScheduler,
        cache: Arc<dyn CacheStore>,
    ) -> Self {
        Self {
            scanner,
            resolver,
            scheduler,
            cache,
            wallet_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Scan the wallet, then reconcile against the cache
    pub async fn sync_wallet(
        &self,
        wallet_address: &str,
        options: &SyncOptions,
        cancel: &CancellationToken,
    ) -> SyncResult<SyncOutcome> {
        let candidates = self.scanner.scan(wallet_address, cancel).await?;
        self.reconcile(wallet_address, &candidates, options, cancel)
            .await
    }

    /// Reconcile a wallet's cached holdings with a fresh candidate list
    pub async fn reconcile(
        &self,
        wallet_address: &str,
        candidates: &[TokenCandidate],
        options: &SyncOptions,
        cancel: &CancellationToken,
    ) -> SyncResult<SyncOutcome> {
        let wallet = parse_pubkey(wallet_address)?.to_string();

        let lock = self.wallet_lock(&wallet);
        let _guard = run_cancellable(cancel, async { Ok(lock.handle().lock_owned().await) }).await?;

        let loaded = self.load_cached(&wallet, options.caching_enabled, cancel).await?;

        let mut candidate_mints: HashMap<&str, &str> = HashMap::with_capacity(candidates.len());
        let mut unique_candidates = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            if let Entry::Vacant(slot) = candidate_mints.entry(&candidate.token_account_address) {
                slot.insert(&candidate.mint_address);
                unique_candidates.push(candidate.clone());
            }
        }

        let allowlist = options.allowlist.as_ref();
        let mut surviving: HashSet<String> = HashSet::with_capacity(loaded.len());
        let kept: Vec<TokenRecord> = loaded
            .iter()
            .filter(|record| {
                candidate_mints.get(record.token_account_address.as_str())
                    == Some(&record.token_mint_address.as_str())
                    && allowlist.map_or(true, |list| list.permits(&record.display_metadata))
                    && surviving.insert(record.token_account_address.clone())
            })
            .cloned()
            .collect();

        let unresolved: Vec<TokenCandidate> = unique_candidates
            .iter()
            .filter(|candidate| !surviving.contains(&candidate.token_account_address))
            .cloned()
            .collect();

        logger::debug(
            LogTag::Sync,
            &format!(
                "{}: {} candidates, {} cached, {} kept, {} to resolve",
                wallet,
                unique_candidates.len(),
                loaded.len(),
                kept.len(),
                unresolved.len()
            ),
        );

        let fresh = self
            .scheduler
            .run(
                self.resolver.as_ref(),
                &unresolved,
                allowlist,
                &options.batch,
                cancel,
            )
            .await?;

        let mut report = SyncReport {
            candidates: unique_candidates.len(),
            cache_hits: kept.len(),
            pruned: loaded.len() - kept.len(),
            resolved: fresh.records.len(),
            dropped: fresh.dropped,
            batches: fresh.batches,
            cache_written: false,
        };

        let mut records = kept;
        for record in fresh.records {
            if surviving.insert(record.token_account_address.clone()) {
                records.push(record);
            }
        }

        if options.caching_enabled && records != loaded {
            if cancel.is_cancelled() {
                return Err(SyncError::Cancelled);
            }
            report.cache_written = self.cache.put(&wallet, &records).await;
        }

        logger::info(
            LogTag::Sync,
            &format!(
                "Synced {}: {} NFTs ({} cached, {} resolved, {} pruned, {} dropped)",
                wallet,
                records.len(),
                report.cache_hits,
                report.resolved,
                report.pruned,
                report.dropped
            ),
        );

        Ok(SyncOutcome { records, report })
    }

    async fn load_cached(
        &self,
        wallet: &str,
        caching_enabled: bool,
        cancel: &CancellationToken,
    ) -> SyncResult<Vec<TokenRecord>> {
        if !caching_enabled {
            self.cache.remove(wallet).await;
            return Ok(Vec::new());
        }

        match run_cancellable(cancel, self.cache.get(wallet)).await {
            Ok(records) => Ok(records.unwrap_or_default()),
            Err(SyncError::Cancelled) => Err(SyncError::Cancelled),
            Err(e) => {
                logger::warning(
                    LogTag::Sync,
                    &format!("Cache read failed for {}, resolving from scratch: {}", wallet, e),
                );
                Ok(Vec::new())
            }
        }
    }

    fn wallet_lock(&self, wallet: &str) -> WalletLock<'_> {
        let mut locks = self
            .wallet_locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let handle = locks
            .entry(wallet.to_string())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone();

        WalletLock {
            locks: &self.wallet_locks,
            wallet: wallet.to_string(),
            handle,
        }
    }
}

type WalletLocks = Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>;

/// A wallet's sync lock; the map entry goes away with its last user
struct WalletLock<'a> {
    locks: &'a WalletLocks,
    wallet: String,
    handle: Arc<tokio::sync::Mutex<()>>,
}

impl WalletLock<'_> {
    fn handle(&self) -> Arc<tokio::sync::Mutex<()>> {
        self.handle.clone()
    }
}

impl Drop for WalletLock<'_> {
    fn drop(&mut self) {
        let mut locks = self
            .locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        // Held by the map and by this handle only
        if Arc::strong_count(&self.handle) == 2
            && locks
                .get(&self.wallet)
                .is_some_and(|entry| Arc::ptr_eq(entry, &self.handle))
        {
            locks.remove(&self.wallet);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCacheStore;
    use crate::metadata::MetadataResolver;
    use crate::rpc::TokenProgram;
    use crate::testing::{MockFetcher, MockLedger};
    use crate::types::TokenAccountInfo;
    use solana_sdk::pubkey::Pubkey;

    struct Harness {
        ledger: Arc<MockLedger>,
        fetcher: Arc<MockFetcher>,
        cache: Arc<MemoryCacheStore>,
        engine: ReconciliationEngine<MockLedger>,
        wallet: Pubkey,
    }

    impl Harness {
        fn new() -> Self {
            let ledger = Arc::new(MockLedger::default());
            let fetcher = Arc::new(MockFetcher::default());
            let cache = Arc::new(MemoryCacheStore::new());
            let resolver = MetadataResolver::new(ledger.clone(), fetcher.clone()).unwrap();
            let engine = ReconciliationEngine::new(
                TokenAccountScanner::new(
                    ledger.clone(),
                    vec![TokenProgram::SplToken, TokenProgram::Token2022],
                ),
                Arc::new(resolver),
                BatchScheduler::default(),
                cache.clone(),
            );

            Self {
                ledger,
                fetcher,
                cache,
                engine,
                wallet: Pubkey::new_unique(),
            }
        }

        fn hold_nft(&self, name: &str, symbol: &str) -> TokenCandidate {
            let candidate = self.ledger.add_nft(name, symbol, &self.fetcher);
            self.ledger.hold(&self.wallet, &candidate);
            candidate
        }

        async fn sync(&self, options: &SyncOptions) -> SyncResult<SyncOutcome> {
            self.engine
                .sync_wallet(&self.wallet.to_string(), options, &CancellationToken::new())
                .await
        }

        async fn cached(&self) -> Option<Vec<TokenRecord>> {
            self.cache.get(&self.wallet.to_string()).await.unwrap()
        }
    }

    fn accounts(records: &[TokenRecord]) -> HashSet<String> {
        records
            .iter()
            .map(|r| r.token_account_address.clone())
            .collect()
    }

    fn uncached() -> SyncOptions {
        SyncOptions {
            caching_enabled: false,
            ..SyncOptions::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_wallet_scenario() {
        let h = Harness::new();
        let listed = h.hold_nft("Degen Ape #12", "DAPE");

        // NFT-shaped account whose mint has no metadata account
        h.ledger.add_token_account(
            &h.wallet,
            TokenProgram::SplToken,
            TokenAccountInfo {
                account_address: Pubkey::new_unique().to_string(),
                mint_address: Pubkey::new_unique().to_string(),
                amount: 1,
                decimals: 0,
            },
        );
        h.ledger.add_token_account(
            &h.wallet,
            TokenProgram::SplToken,
            TokenAccountInfo {
                account_address: Pubkey::new_unique().to_string(),
                mint_address: Pubkey::new_unique().to_string(),
                amount: 5,
                decimals: 0,
            },
        );

        let outcome = h.sync(&SyncOptions::default()).await.unwrap();

        assert_eq!(outcome.report.candidates, 2);
        assert_eq!(outcome.records.len(), 1);
        assert_eq!(outcome.records[0].token_account_address, listed.token_account_address);
        assert_eq!(outcome.report.dropped, 1);
        assert!(outcome.report.cache_written);
        assert_eq!(h.cached().await, Some(outcome.records));
    }

    #[tokio::test(start_paused = true)]
    async fn test_uncached_syncs_are_deterministic() {
        let h = Harness::new();
        h.hold_nft("A", "AAA");
        h.hold_nft("B", "BBB");

        let first = h.sync(&uncached()).await.unwrap();
        let second = h.sync(&uncached()).await.unwrap();

        assert_eq!(accounts(&first.records), accounts(&second.records));
        assert_eq!(first.records.len(), 2);
        assert_eq!(h.fetcher.fetch_count(), 4);
        assert_eq!(h.cache.writes(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cached_sync_is_idempotent() {
        let h = Harness::new();
        h.hold_nft("A", "AAA");
        h.hold_nft("B", "BBB");

        let first = h.sync(&SyncOptions::default()).await.unwrap();
        assert_eq!(h.fetcher.fetch_count(), 2);
        let reads = h.ledger.account_reads();

        let second = h.sync(&SyncOptions::default()).await.unwrap();
        assert_eq!(first.records, second.records);
        assert_eq!(h.fetcher.fetch_count(), 2);
        assert_eq!(h.ledger.account_reads(), reads);
        assert_eq!(second.report.cache_hits, 2);
        assert_eq!(second.report.batches, 0);
        assert!(!second.report.cache_written);
        assert_eq!(h.cache.writes(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_departed_account_is_pruned() {
        let h = Harness::new();
        let kept = h.hold_nft("Keep", "KEEP");
        let sold = h.hold_nft("Sold", "SOLD");
        h.sync(&SyncOptions::default()).await.unwrap();

        h.ledger.release(&h.wallet, &sold.token_account_address);
        let outcome = h.sync(&SyncOptions::default()).await.unwrap();

        assert_eq!(
            accounts(&outcome.records),
            HashSet::from([kept.token_account_address.clone()])
        );
        assert_eq!(outcome.report.pruned, 1);
        assert!(outcome.report.cache_written);
        assert_eq!(accounts(&h.cached().await.unwrap()), accounts(&outcome.records));
        assert_eq!(h.fetcher.fetch_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_account_extends_cache() {
        let h = Harness::new();
        h.hold_nft("First", "ONE");
        h.sync(&SyncOptions::default()).await.unwrap();

        let added = h.hold_nft("Second", "TWO");
        let outcome = h.sync(&SyncOptions::default()).await.unwrap();

        assert_eq!(outcome.records.len(), 2);
        assert_eq!(outcome.records[1].token_account_address, added.token_account_address);
        assert_eq!(outcome.report.cache_hits, 1);
        assert_eq!(outcome.report.resolved, 1);
        assert_eq!(h.fetcher.fetch_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_allowlist_filters_fresh_and_cached_records() {
        let h = Harness::new();
        let wanted = h.hold_nft("Wanted", "WANT");
        h.hold_nft("Other", "OTHR");

        let all = h.sync(&SyncOptions::default()).await.unwrap();
        assert_eq!(all.records.len(), 2);

        let options = SyncOptions {
            allowlist: Some(Allowlist::new([h.ledger.identifier_of(&wanted)])),
            ..SyncOptions::default()
        };
        let filtered = h.sync(&options).await.unwrap();

        assert_eq!(
            accounts(&filtered.records),
            HashSet::from([wanted.token_account_address.clone()])
        );
        assert_eq!(filtered.report.pruned, 1);
        assert_eq!(accounts(&h.cached().await.unwrap()), accounts(&filtered.records));

        let uncached_filtered = h
            .sync(&SyncOptions {
                caching_enabled: false,
                ..options
            })
            .await
            .unwrap();
        assert_eq!(
            accounts(&uncached_filtered.records),
            HashSet::from([wanted.token_account_address])
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_disabling_cache_removes_entry() {
        let h = Harness::new();
        h.hold_nft("A", "AAA");
        h.sync(&SyncOptions::default()).await.unwrap();
        assert!(h.cached().await.is_some());

        let outcome = h.sync(&uncached()).await.unwrap();
        assert_eq!(outcome.records.len(), 1);
        assert!(!outcome.report.cache_written);
        assert_eq!(h.cached().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_sync_leaves_cache_untouched() {
        let h = Harness::new();
        h.hold_nft("A", "AAA");
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = h
            .engine
            .sync_wallet(&h.wallet.to_string(), &SyncOptions::default(), &cancel)
            .await;

        assert_eq!(result, Err(SyncError::Cancelled));
        assert_eq!(h.cached().await, None);
        assert_eq!(h.fetcher.fetch_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_scan_failure_is_fatal_and_skips_cache() {
        let h = Harness::new();
        h.hold_nft("A", "AAA");
        h.ledger.fail_program(TokenProgram::Token2022);

        let result = h.sync(&SyncOptions::default()).await;
        assert!(matches!(result, Err(SyncError::ChainRpc(_))));
        assert_eq!(h.cache.writes(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_wallet_is_rejected() {
        let h = Harness::new();
        let result = h
            .engine
            .reconcile("0xnot-solana", &[], &SyncOptions::default(), &CancellationToken::new())
            .await;
        assert!(matches!(result, Err(SyncError::InvalidAddress { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn test_duplicate_candidates_yield_one_record() {
        let h = Harness::new();
        let candidate = h.hold_nft("Dup", "DUP");

        let outcome = h
            .engine
            .reconcile(
                &h.wallet.to_string(),
                &[candidate.clone(), candidate.clone()],
                &SyncOptions::default(),
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(outcome.records.len(), 1);
        assert_eq!(outcome.report.candidates, 1);
        assert_eq!(h.fetcher.fetch_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_syncs_of_one_wallet_are_serialized() {
        let h = Harness::new();
        h.hold_nft("A", "AAA");
        h.hold_nft("B", "BBB");

        let options = SyncOptions::default();
        let (first, second) = tokio::join!(h.sync(&options), h.sync(&options));

        assert_eq!(first.unwrap().records, second.unwrap().records);
        assert_eq!(h.fetcher.fetch_count(), 2);
        assert_eq!(h.cache.writes(), 1);
        assert!(h.engine.wallet_locks.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_wallet_locks_are_released() {
        let h = Harness::new();
        h.hold_nft("A", "AAA");
        h.sync(&SyncOptions::default()).await.unwrap();
        assert!(h.engine.wallet_locks.lock().unwrap().is_empty());

        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = h
            .engine
            .reconcile(&h.wallet.to_string(), &[], &SyncOptions::default(), &cancel)
            .await;
        assert_eq!(result, Err(SyncError::Cancelled));
        assert!(h.engine.wallet_locks.lock().unwrap().is_empty());

        let held = h.engine.wallet_lock("wallet");
        let waiting = h.engine.wallet_lock("wallet");
        drop(held);
        assert_eq!(h.engine.wallet_locks.lock().unwrap().len(), 1);
        drop(waiting);
        assert!(h.engine.wallet_locks.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_conflicting_duplicate_keeps_first_mint() {
        let h = Harness::new();
        let candidate = h.hold_nft("Dup", "DUP");
        h.sync(&SyncOptions::default()).await.unwrap();

        let conflicting = TokenCandidate::new(
            candidate.token_account_address.clone(),
            Pubkey::new_unique().to_string(),
        );
        let outcome = h
            .engine
            .reconcile(
                &h.wallet.to_string(),
                &[candidate.clone(), conflicting],
                &SyncOptions::default(),
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(outcome.records.len(), 1);
        assert_eq!(outcome.records[0].token_mint_address, candidate.mint_address);
        assert_eq!(outcome.report.cache_hits, 1);
        assert_eq!(outcome.report.pruned, 0);
        assert!(!outcome.report.cache_written);
        assert_eq!(h.fetcher.fetch_count(), 1);
    }
}
