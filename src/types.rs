/// Shared data model for wallet NFT synchronization
use serde::{Deserialize, Serialize};

/// A token account provisionally believed to hold an NFT
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TokenCandidate {
    pub token_account_address: String,
    pub mint_address: String,
}

impl TokenCandidate {
    pub fn new(token_account_address: impl Into<String>, mint_address: impl Into<String>) -> Self {
        Self {
            token_account_address: token_account_address.into(),
            mint_address: mint_address.into(),
        }
    }
}

/// Raw token account as reported by the ledger, before the NFT heuristic
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenAccountInfo {
    pub account_address: String,
    pub mint_address: String,
    pub amount: u64,
    pub decimals: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Creator {
    pub address: String,
    pub verified: bool,
    pub share: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collection {
    pub key: String,
    pub verified: bool,
}

/// On-chain display metadata decoded from the Metaplex metadata account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayMetadata {
    pub name: String,
    pub symbol: String,
    pub uri: String,
    pub seller_fee_basis_points: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creators: Option<Vec<Creator>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection: Option<Collection>,
}

/// Fully resolved NFT holding, persisted per wallet
///
/// `token_account_address` is the record's identity within a wallet's set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRecord {
    pub token_account_address: String,
    pub token_mint_address: String,
    pub display_metadata: DisplayMetadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edition_number: Option<u64>,
    pub preview_image: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview_animation: Option<String>,
    #[serde(default)]
    pub description: String,
}

/// Counters describing what one sync did
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub candidates: usize,
    pub cache_hits: usize,
    pub pruned: usize,
    pub resolved: usize,
    pub dropped: usize,
    pub batches: usize,
    pub cache_written: bool,
}
