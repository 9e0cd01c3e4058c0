//! Ledger access
//!
//! The sync core talks to the chain only through `LedgerClient`, so the
//! transport (`RpcClient` over JSON-RPC, or a fixture in tests) is swappable.

mod client;
mod methods;
mod rate_limiter;

pub use client::RpcClient;
pub use rate_limiter::ProviderRateLimiter;

use crate::constants::{SPL_TOKEN_PROGRAM_ID, TOKEN_2022_PROGRAM_ID};
use crate::errors::SyncResult;
use crate::types::TokenAccountInfo;
use async_trait::async_trait;
use solana_sdk::pubkey::Pubkey;

/// Token programs whose accounts may hold NFTs
///
/// Resolved once from configuration; every scan iterates the same list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenProgram {
    /// Original SPL token program
    SplToken,
    /// Token-2022 (token extensions)
    Token2022,
}

impl TokenProgram {
    pub fn program_id(&self) -> &'static str {
        match self {
            TokenProgram::SplToken => SPL_TOKEN_PROGRAM_ID,
            TokenProgram::Token2022 => TOKEN_2022_PROGRAM_ID,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            TokenProgram::SplToken => "spl-token",
            TokenProgram::Token2022 => "token-2022",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "spl-token" | "token" => Some(TokenProgram::SplToken),
            "token-2022" | "token2022" => Some(TokenProgram::Token2022),
            _ => None,
        }
    }
}

/// Remote ledger reads used by the sync core
///
/// Retries belong to the implementation; callers treat any `Err` as a
/// transport failure.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Every token account owned by `owner` under `program`
    async fn list_candidate_accounts(
        &self,
        owner: &Pubkey,
        program: TokenProgram,
    ) -> SyncResult<Vec<TokenAccountInfo>>;

    /// Raw account data, `None` when the account does not exist
    async fn get_account_bytes(&self, address: &Pubkey) -> SyncResult<Option<Vec<u8>>>;
}
