/// Error taxonomy for wallet NFT synchronization
///
/// Only chain transport failures during the scan, invalid caller input and
/// cancellation abort a sync. Decode, off-chain and cache failures are
/// absorbed where they happen and only show up in logs.
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    #[error("Chain RPC error: {0}")]
    ChainRpc(String),

    #[error("Metadata decode error for {address}: {reason}")]
    MetadataDecode { address: String, reason: String },

    #[error("Off-chain fetch error for {uri}: {reason}")]
    OffchainFetch { uri: String, reason: String },

    #[error("Cache error: {0}")]
    CacheIo(String),

    #[error("Invalid address '{address}': {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Sync cancelled")]
    Cancelled,
}

impl From<rusqlite::Error> for SyncError {
    fn from(e: rusqlite::Error) -> Self {
        SyncError::CacheIo(e.to_string())
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(e: serde_json::Error) -> Self {
        SyncError::CacheIo(format!("Serialization error: {}", e))
    }
}

pub type SyncResult<T> = Result<T, SyncError>;
