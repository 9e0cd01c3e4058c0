//! Rate-paced batch resolution
//!
//! Candidates are resolved in fixed-size groups. Each group runs fully
//! concurrent and is awaited as a whole before the next one starts, with a
//! cooldown of `batch_size / rate_ceiling` seconds in between so the issue
//! rate stays at the ceiling whatever the batch size.
//!
//! One failing item never takes its batch down: errors and panics while
//! resolving a candidate degrade that candidate to "dropped". Cancellation is
//! the only thing that stops a run early.

use crate::constants::{DEFAULT_BATCH_SIZE, DEFAULT_RATE_CEILING_PER_SEC};
use crate::errors::{SyncError, SyncResult};
use crate::logger::{self, LogTag};
use crate::metadata::{Allowlist, CandidateResolver};
use crate::types::{TokenCandidate, TokenRecord};
use futures::future::join_all;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Called with each batch's records as soon as the batch completes
pub type BatchCallback = Arc<dyn Fn(&[TokenRecord]) + Send + Sync>;

#[derive(Clone)]
pub struct BatchOptions {
    pub batch_size: usize,
    pub on_batch: Option<BatchCallback>,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            on_batch: None,
        }
    }
}

impl BatchOptions {
    pub fn with_batch_size(batch_size: usize) -> Self {
        Self {
            batch_size,
            on_batch: None,
        }
    }
}

impl std::fmt::Debug for BatchOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchOptions")
            .field("batch_size", &self.batch_size)
            .field("on_batch", &self.on_batch.is_some())
            .finish()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    /// Resolved records, in batch order
    pub records: Vec<TokenRecord>,
    pub batches: usize,
    /// Candidates that resolved to nothing or failed
    pub dropped: usize,
}

#[derive(Debug, Clone)]
pub struct BatchScheduler {
    rate_ceiling_per_sec: u32,
}

impl Default for BatchScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_RATE_CEILING_PER_SEC)
    }
}

impl BatchScheduler {
    pub fn new(rate_ceiling_per_sec: u32) -> Self {
        Self {
            rate_ceiling_per_sec: rate_ceiling_per_sec.max(1),
        }
    }

    /// Pause between two batches of `batch_size`
    pub fn cooldown_for(&self, batch_size: usize) -> Duration {
        let micros = (batch_size as u64).saturating_mul(1_000_000) / self.rate_ceiling_per_sec as u64;
        Duration::from_micros(micros)
    }

    pub async fn run<R>(
        &self,
        resolver: &R,
        candidates: &[TokenCandidate],
        allowlist: Option<&Allowlist>,
        options: &BatchOptions,
        cancel: &CancellationToken,
    ) -> SyncResult<BatchOutcome>
    where
        R: CandidateResolver + ?Sized,
    {
        let batch_size = options.batch_size.max(1);
        let cooldown = self.cooldown_for(batch_size);
        let total_batches = candidates.len().div_ceil(batch_size);
        let mut outcome = BatchOutcome::default();

        if candidates.is_empty() {
            return Ok(outcome);
        }

        logger::debug(
            LogTag::Batch,
            &format!(
                "Resolving {} candidates in {} batches of {} (cooldown {:?})",
                candidates.len(),
                total_batches,
                batch_size,
                cooldown
            ),
        );

        for (index, batch) in candidates.chunks(batch_size).enumerate() {
            if cancel.is_cancelled() {
                return Err(SyncError::Cancelled);
            }

            let results = join_all(batch.iter().map(|candidate| {
                AssertUnwindSafe(resolver.resolve(candidate, allowlist, cancel)).catch_unwind()
            }))
            .await;

            let mut records = Vec::with_capacity(batch.len());
            for (candidate, result) in batch.iter().zip(results) {
                match result {
                    Ok(Ok(Some(record))) => records.push(record),
                    Ok(Ok(None)) => outcome.dropped += 1,
                    Ok(Err(SyncError::Cancelled)) => return Err(SyncError::Cancelled),
                    Ok(Err(e)) => {
                        logger::warning(
                            LogTag::Batch,
                            &format!(
                                "Failed to resolve {}: {}",
                                candidate.token_account_address, e
                            ),
                        );
                        outcome.dropped += 1;
                    }
                    Err(_) => {
                        logger::error(
                            LogTag::Batch,
                            &format!(
                                "Resolver panicked on {}",
                                candidate.token_account_address
                            ),
                        );
                        outcome.dropped += 1;
                    }
                }
            }

            outcome.batches += 1;
            logger::debug(
                LogTag::Batch,
                &format!(
                    "Batch {}/{}: {} of {} resolved",
                    index + 1,
                    total_batches,
                    records.len(),
                    batch.len()
                ),
            );

            if let Some(on_batch) = &options.on_batch {
                on_batch(&records);
            }
            outcome.records.extend(records);

            if index + 1 < total_batches {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return Err(SyncError::Cancelled),
                    _ = tokio::time::sleep(cooldown) => {}
                }
            }
        }

        logger::info(
            LogTag::Batch,
            &format!(
                "Resolved {} of {} candidates in {} batches",
                outcome.records.len(),
                candidates.len(),
                outcome.batches
            ),
        );

        Ok(outcome)
    }
}
