//! JSON-RPC transport towards Solana RPC providers
//!
//! One client is built per configuration and shared by reference. Requests
//! go through the provider rate limiter and fail over to the next configured
//! URL on transport errors, 5xx and 429 responses.
//! A 429 is retried on the same endpoint a few times first.

use super::rate_limiter::ProviderRateLimiter;
use crate::config::RpcConfig;
use crate::errors::{SyncError, SyncResult};
use crate::logger::{self, LogTag};
use serde_json::Value;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

/// Retries of one endpoint after a 429 before failing over
const MAX_RATE_LIMIT_RETRIES: u32 = 3;

pub struct RpcClient {
    http: reqwest::Client,
    urls: Vec<String>,
    /// Index of the endpoint that served the last successful request
    preferred: AtomicUsize,
    request_id: AtomicU64,
    limiter: ProviderRateLimiter,
}

impl RpcClient {
    pub fn new(config: &RpcConfig) -> SyncResult<Self> {
        if config.urls.is_empty() {
            return Err(SyncError::Configuration(
                "No RPC URLs provided".to_string(),
            ));
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()
            .map_err(|e| SyncError::Configuration(format!("Failed to create HTTP client: {}", e)))?;

        let limiter = ProviderRateLimiter::new(config.rate_limit_per_sec);
        logger::debug(
            LogTag::Rpc,
            &format!(
                "RPC client over {} endpoint(s), {} req/s",
                config.urls.len(),
                limiter.base_rate()
            ),
        );

        Ok(Self {
            http,
            urls: config.urls.clone(),
            preferred: AtomicUsize::new(0),
            request_id: AtomicU64::new(1),
            limiter,
        })
    }

    /// Execute a JSON-RPC call and return its `result` member
    ///
    /// Transport failures rotate through every configured endpoint once. A
    /// 429 backs off and retries the same endpoint before failing over.
    /// A JSON-RPC `error` object is returned immediately: the node answered.
    pub async fn execute_raw(&self, method: &str, params: Value) -> SyncResult<Value> {
        let start = self.preferred.load(Ordering::Relaxed) % self.urls.len();
        let mut last_error = String::new();

        for attempt in 0..self.urls.len() {
            let index = (start + attempt) % self.urls.len();
            let url = &self.urls[index];
            let mut rate_limited = 0;

            loop {
                match self.send(url, method, &params).await {
                    Attempt::Done(result) => {
                        if result.is_ok() {
                            self.preferred.store(index, Ordering::Relaxed);
                        }
                        return result;
                    }
                    Attempt::RateLimited(retry_after) => {
                        let backoff = self.limiter.record_429(retry_after);
                        last_error = format!("Rate limited by {}", mask_url(url));
                        logger::warning(
                            LogTag::Rpc,
                            &format!("{}, backing off {}ms", last_error, backoff.as_millis()),
                        );
                        tokio::time::sleep(backoff).await;

                        if rate_limited >= MAX_RATE_LIMIT_RETRIES {
                            break;
                        }
                        rate_limited += 1;
                    }
                    Attempt::Failed(reason) => {
                        logger::warning(LogTag::Rpc, &reason);
                        last_error = reason;
                        break;
                    }
                }
            }
        }

        Err(SyncError::ChainRpc(format!(
            "All RPC endpoints failed for {}: {}",
            method, last_error
        )))
    }

    /// One request against one endpoint
    async fn send(&self, url: &str, method: &str, params: &Value) -> Attempt {
        self.limiter.acquire().await;

        let payload = serde_json::json!({
            "jsonrpc": "2.0",
            "id": self.request_id.fetch_add(1, Ordering::Relaxed),
            "method": method,
            "params": params,
        });

        logger::verbose(LogTag::Rpc, &format!("{} -> {}", method, mask_url(url)));

        let response = match self.http.post(url).json(&payload).send().await {
            Ok(response) => response,
            Err(e) => {
                return Attempt::Failed(format!("Request to {} failed: {}", mask_url(url), e))
            }
        };

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .map(Duration::from_secs);
            return Attempt::RateLimited(retry_after);
        }
        if status.is_server_error() {
            return Attempt::Failed(format!("HTTP {} from {}", status, mask_url(url)));
        }
        if !status.is_success() {
            return Attempt::Done(Err(SyncError::ChainRpc(format!(
                "HTTP {} from {} for {}",
                status,
                mask_url(url),
                method
            ))));
        }

        match response.json::<Value>().await {
            Ok(body) => {
                self.limiter.record_success();
                Attempt::Done(extract_result(method, body))
            }
            Err(e) => Attempt::Failed(format!("Malformed response from {}: {}", mask_url(url), e)),
        }
    }
}

enum Attempt {
    /// The endpoint answered; no other endpoint is tried
    Done(SyncResult<Value>),
    RateLimited(Option<Duration>),
    /// Move on to the next endpoint
    Failed(String),
}

/// Split a JSON-RPC response into its result or error
pub(crate) fn extract_result(method: &str, mut body: Value) -> SyncResult<Value> {
    if let Some(error) = body.get("error").filter(|e| !e.is_null()) {
        let message = error
            .get("message")
            .and_then(|m| m.as_str())
            .unwrap_or("unknown error");
        let code = error.get("code").and_then(|c| c.as_i64()).unwrap_or(0);
        return Err(SyncError::ChainRpc(format!(
            "{} failed ({}): {}",
            method, code, message
        )));
    }

    match body.get_mut("result") {
        Some(result) => Ok(result.take()),
        None => Err(SyncError::ChainRpc(format!(
            "{} response has no result",
            method
        ))),
    }
}

/// Hide API keys embedded in provider URLs
pub(crate) fn mask_url(url: &str) -> String {
    match url.split_once('?') {
        Some((base, _)) => format!("{}?***", base),
        None => url.to_string(),
    }
}
