//! Off-chain metadata documents (the JSON behind a metadata `uri`)

use crate::config::MetadataConfig;
use crate::errors::{SyncError, SyncResult};
use crate::logger::{self, LogTag};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// The fields of an off-chain document this crate keeps
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OffchainDocument {
    pub image: String,
    #[serde(default)]
    pub animation_url: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[async_trait]
pub trait DocumentFetcher: Send + Sync {
    async fn fetch(&self, uri: &str) -> SyncResult<OffchainDocument>;
}

/// Fetches documents over HTTP(S), rewriting `ipfs://` and `ar://` URIs to
/// the configured gateways
pub struct HttpDocumentFetcher {
    http: reqwest::Client,
    ipfs_gateway: String,
    arweave_gateway: String,
}

impl HttpDocumentFetcher {
    pub fn new(config: &MetadataConfig) -> SyncResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.http_timeout_secs.max(1)))
            .build()
            .map_err(|e| SyncError::Configuration(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            ipfs_gateway: config.ipfs_gateway.clone(),
            arweave_gateway: config.arweave_gateway.clone(),
        })
    }
}

#[async_trait]
impl DocumentFetcher for HttpDocumentFetcher {
    async fn fetch(&self, uri: &str) -> SyncResult<OffchainDocument> {
        let url = resolve_gateway_uri(uri, &self.ipfs_gateway, &self.arweave_gateway);
        let fail = |reason: String| SyncError::OffchainFetch {
            uri: uri.to_string(),
            reason,
        };

        logger::debug(LogTag::Metadata, &format!("Fetching metadata from: {}", url));

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| fail(format!("HTTP request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(fail(format!("HTTP error: {}", response.status())));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| fail(format!("Failed to read body: {}", e)))?;

        parse_document(&body).map_err(fail)
    }
}

/// Parse a document body, normalizing empty optional fields to `None`
pub fn parse_document(body: &[u8]) -> Result<OffchainDocument, String> {
    let mut document: OffchainDocument =
        serde_json::from_slice(body).map_err(|e| format!("Failed to parse JSON: {}", e))?;

    if document
        .animation_url
        .as_deref()
        .is_some_and(|url| url.trim().is_empty())
    {
        document.animation_url = None;
    }

    Ok(document)
}

/// Map decentralized-storage URIs onto HTTP gateways
pub fn resolve_gateway_uri(uri: &str, ipfs_gateway: &str, arweave_gateway: &str) -> String {
    let uri = uri.trim();

    if let Some(path) = uri.strip_prefix("ipfs://") {
        let path = path.strip_prefix("ipfs/").unwrap_or(path);
        return join_gateway(ipfs_gateway, path);
    }
    if let Some(path) = uri.strip_prefix("ar://") {
        return join_gateway(arweave_gateway, path);
    }

    uri.to_string()
}

fn join_gateway(gateway: &str, path: &str) -> String {
    format!(
        "{}/{}",
        gateway.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}
