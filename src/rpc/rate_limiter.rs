//! Per-provider rate limiter using Governor (GCRA algorithm)

use governor::{DefaultDirectRateLimiter, Quota, RateLimiter as GovernorLimiter};
use std::num::NonZeroU32;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

/// Upper bound for a single 429 backoff
const MAX_BACKOFF: Duration = Duration::from_secs(10);

/// Rate limiter shared by every request towards one RPC provider
pub struct ProviderRateLimiter {
    /// Governor rate limiter (GCRA - Generic Cell Rate Algorithm)
    limiter: DefaultDirectRateLimiter,

    /// Base rate limit (calls per second)
    base_rate: u32,

    /// Consecutive 429 errors
    consecutive_429s: AtomicU32,
}

impl ProviderRateLimiter {
    pub fn new(rate_per_second: u32) -> Self {
        let rate = NonZeroU32::new(rate_per_second.max(1)).unwrap_or(NonZeroU32::MIN);

        Self {
            limiter: GovernorLimiter::direct(Quota::per_second(rate)),
            base_rate: rate.get(),
            consecutive_429s: AtomicU32::new(0),
        }
    }

    /// Wait until the quota allows one more request
    pub async fn acquire(&self) {
        self.limiter.until_ready().await;
    }

    /// Record a 429 and return how long the caller should back off
    ///
    /// Honors `retry_after` when the provider sends one, otherwise doubles
    /// from 250ms per consecutive 429.
    pub fn record_429(&self, retry_after: Option<Duration>) -> Duration {
        let count = self.consecutive_429s.fetch_add(1, Ordering::SeqCst) + 1;

        let backoff = match retry_after {
            Some(delay) => delay,
            None => Duration::from_millis(250u64.saturating_mul(1u64 << count.min(6))),
        };

        backoff.min(MAX_BACKOFF)
    }

    pub fn record_success(&self) {
        self.consecutive_429s.store(0, Ordering::SeqCst);
    }

    pub fn base_rate(&self) -> u32 {
        self.base_rate
    }
}

impl std::fmt::Debug for ProviderRateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRateLimiter")
            .field("base_rate", &self.base_rate)
            .field(
                "consecutive_429s",
                &self.consecutive_429s.load(Ordering::SeqCst),
            )
            .finish()
    }
}
