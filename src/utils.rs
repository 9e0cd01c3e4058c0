//! Small helpers shared across the sync pipeline

use crate::errors::{SyncError, SyncResult};
use solana_sdk::pubkey::Pubkey;
use std::future::Future;
use std::str::FromStr;
use tokio_util::sync::CancellationToken;

/// Parse a base58 public key, reporting the offending string on failure
pub fn parse_pubkey(address: &str) -> SyncResult<Pubkey> {
    Pubkey::from_str(address.trim()).map_err(|e| SyncError::InvalidAddress {
        address: address.to_string(),
        reason: e.to_string(),
    })
}

/// Await `future` unless `cancel` fires first
///
/// Every suspension point of a sync goes through here so an abandoned sync
/// stops at the next await instead of running to completion.
pub async fn run_cancellable<T, F>(cancel: &CancellationToken, future: F) -> SyncResult<T>
where
    F: Future<Output = SyncResult<T>>,
{
    if cancel.is_cancelled() {
        return Err(SyncError::Cancelled);
    }

    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(SyncError::Cancelled),
        result = future => result,
    }
}
