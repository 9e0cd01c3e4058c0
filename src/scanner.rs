//! Token account scanning
//!
//! Lists every token account a wallet owns under each configured token
//! program and keeps the ones that look like NFTs (amount 1, decimals 0).
//! Any program failing aborts the scan; a partial candidate list would make
//! reconciliation prune holdings that still exist.

use crate::constants::{NFT_AMOUNT, NFT_DECIMALS};
use crate::errors::SyncResult;
use crate::logger::{self, LogTag};
use crate::rpc::{LedgerClient, TokenProgram};
use crate::types::{TokenAccountInfo, TokenCandidate};
use crate::utils::{parse_pubkey, run_cancellable};
use std::collections::HashSet;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub struct TokenAccountScanner<L> {
    ledger: Arc<L>,
    programs: Vec<TokenProgram>,
}

impl<L: LedgerClient> TokenAccountScanner<L> {
    pub fn new(ledger: Arc<L>, programs: Vec<TokenProgram>) -> Self {
        Self { ledger, programs }
    }

    /// Candidate NFT accounts owned by `wallet_address`, in ledger order,
    /// deduplicated by token account address
    pub async fn scan(
        &self,
        wallet_address: &str,
        cancel: &CancellationToken,
    ) -> SyncResult<Vec<TokenCandidate>> {
        let owner = parse_pubkey(wallet_address)?;

        let mut seen = HashSet::new();
        let mut candidates = Vec::new();

        for program in &self.programs {
            let accounts =
                run_cancellable(cancel, self.ledger.list_candidate_accounts(&owner, *program))
                    .await?;
            let total = accounts.len();

            let before = candidates.len();
            for account in accounts.into_iter().filter(is_nft_candidate) {
                if seen.insert(account.account_address.clone()) {
                    candidates.push(TokenCandidate::new(
                        account.account_address,
                        account.mint_address,
                    ));
                }
            }

            logger::debug(
                LogTag::Scanner,
                &format!(
                    "{}: {} token accounts, {} NFT candidates for {}",
                    program.name(),
                    total,
                    candidates.len() - before,
                    owner
                ),
            );
        }

        logger::info(
            LogTag::Scanner,
            &format!("Found {} NFT candidates for {}", candidates.len(), owner),
        );

        Ok(candidates)
    }
}

/// NFT heuristic over the raw account
pub fn is_nft_candidate(account: &TokenAccountInfo) -> bool {
    account.amount == NFT_AMOUNT && account.decimals == NFT_DECIMALS
}
