//! Metadata resolution
//!
//! Turns one candidate into a `TokenRecord`:
//! 1. Derive the metadata and edition PDAs for the mint
//! 2. Fetch and decode the metadata account (missing/garbled => not an NFT)
//! 3. Apply the optional collection allowlist
//! 4. Fetch the off-chain document (any failure => item dropped)
//! 5. Attach the print edition number when an edition account exists
//!
//! Only ledger transport errors and cancellation leave this module as `Err`.

pub mod allowlist;
pub mod decoder;
pub mod offchain;
pub mod pda;

pub use allowlist::{allowlist_identifier, Allowlist};
pub use decoder::{decode_edition_number, decode_metadata, DecodedMetadata};
pub use offchain::{DocumentFetcher, HttpDocumentFetcher, OffchainDocument};
pub use pda::{derive_metadata_addresses, metaplex_program_id, MetadataAddresses};

use crate::errors::{SyncError, SyncResult};
use crate::logger::{self, LogTag};
use crate::rpc::LedgerClient;
use crate::types::{TokenCandidate, TokenRecord};
use crate::utils::{parse_pubkey, run_cancellable};
use async_trait::async_trait;
use solana_sdk::pubkey::Pubkey;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Resolves a single candidate; `Ok(None)` means "not an NFT we keep"
#[async_trait]
pub trait CandidateResolver: Send + Sync {
    async fn resolve(
        &self,
        candidate: &TokenCandidate,
        allowlist: Option<&Allowlist>,
        cancel: &CancellationToken,
    ) -> SyncResult<Option<TokenRecord>>;
}

pub struct MetadataResolver<L, F> {
    ledger: Arc<L>,
    fetcher: Arc<F>,
    program_id: Pubkey,
}

impl<L, F> MetadataResolver<L, F>
where
    L: LedgerClient,
    F: DocumentFetcher,
{
    pub fn new(ledger: Arc<L>, fetcher: Arc<F>) -> SyncResult<Self> {
        Ok(Self {
            ledger,
            fetcher,
            program_id: metaplex_program_id()?,
        })
    }

    async fn resolve_inner(
        &self,
        candidate: &TokenCandidate,
        allowlist: Option<&Allowlist>,
        cancel: &CancellationToken,
    ) -> SyncResult<Option<TokenRecord>> {
        let mint = match parse_pubkey(&candidate.mint_address) {
            Ok(mint) => mint,
            Err(e) => {
                logger::debug(LogTag::Metadata, &format!("Skipping candidate: {}", e));
                return Ok(None);
            }
        };

        let addresses = derive_metadata_addresses(&self.program_id, &mint);

        let Some(raw) = run_cancellable(cancel, self.ledger.get_account_bytes(&addresses.metadata)).await?
        else {
            logger::debug(
                LogTag::Metadata,
                &format!("No metadata account for mint={}", mint),
            );
            return Ok(None);
        };

        let decoded = match decode_metadata(&raw) {
            Ok(decoded) if decoded.mint == mint => decoded,
            Ok(decoded) => {
                log_dropped(&SyncError::MetadataDecode {
                    address: addresses.metadata.to_string(),
                    reason: format!("describes mint {} instead of {}", decoded.mint, mint),
                });
                return Ok(None);
            }
            Err(reason) => {
                log_dropped(&SyncError::MetadataDecode {
                    address: addresses.metadata.to_string(),
                    reason,
                });
                return Ok(None);
            }
        };

        if let Some(allowlist) = allowlist {
            if !allowlist.permits(&decoded.display) {
                logger::debug(
                    LogTag::Metadata,
                    &format!("Mint {} is not in the allowlist", mint),
                );
                return Ok(None);
            }
        }

        if decoded.display.uri.is_empty() {
            logger::debug(
                LogTag::Metadata,
                &format!("Mint {} has no metadata uri", mint),
            );
            return Ok(None);
        }

        let document = match run_cancellable(cancel, async {
            Ok(self.fetcher.fetch(&decoded.display.uri).await)
        })
        .await?
        {
            Ok(document) => document,
            Err(e) => {
                log_dropped(&e);
                return Ok(None);
            }
        };

        let edition_number =
            match run_cancellable(cancel, self.ledger.get_account_bytes(&addresses.edition)).await?
            {
                Some(bytes) => decode_edition_number(&bytes),
                None => None,
            };

        Ok(Some(TokenRecord {
            token_account_address: candidate.token_account_address.clone(),
            token_mint_address: candidate.mint_address.clone(),
            display_metadata: decoded.display,
            edition_number,
            preview_image: document.image,
            preview_animation: document.animation_url,
            description: document.description.unwrap_or_default(),
        }))
    }
}

#[async_trait]
impl<L, F> CandidateResolver for MetadataResolver<L, F>
where
    L: LedgerClient,
    F: DocumentFetcher,
{
    async fn resolve(
        &self,
        candidate: &TokenCandidate,
        allowlist: Option<&Allowlist>,
        cancel: &CancellationToken,
    ) -> SyncResult<Option<TokenRecord>> {
        self.resolve_inner(candidate, allowlist, cancel).await
    }
}

fn log_dropped(error: &SyncError) {
    logger::warning(LogTag::Metadata, &format!("Dropping candidate: {}", error));
}
