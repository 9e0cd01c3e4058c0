//! Test fixtures: an in-memory ledger, a scripted document fetcher and
//! byte builders for Metaplex accounts.

use crate::errors::{SyncError, SyncResult};
use crate::metadata::{
    allowlist_identifier, derive_metadata_addresses, metaplex_program_id, DocumentFetcher,
    OffchainDocument,
};
use crate::rpc::{LedgerClient, TokenProgram};
use crate::types::{Creator, DisplayMetadata, TokenAccountInfo, TokenCandidate, TokenRecord};
use async_trait::async_trait;
use solana_sdk::pubkey::Pubkey;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

// ============================================================================
// METAPLEX ACCOUNT BYTES
// ============================================================================

/// Builder for Borsh-encoded metadata accounts
#[derive(Debug, Clone)]
pub struct MetadataFixture {
    mint: Pubkey,
    name: String,
    symbol: String,
    uri: String,
    creators: Option<Vec<(Pubkey, bool, u8)>>,
    collection: Option<(Pubkey, bool)>,
    padded: bool,
    legacy: bool,
}

impl MetadataFixture {
    pub fn new(mint: Pubkey, name: &str, symbol: &str, uri: &str) -> Self {
        Self {
            mint,
            name: name.to_string(),
            symbol: symbol.to_string(),
            uri: uri.to_string(),
            creators: None,
            collection: None,
            padded: false,
            legacy: false,
        }
    }

    pub fn with_creators(mut self, creators: Vec<(Pubkey, bool, u8)>) -> Self {
        self.creators = Some(creators);
        self
    }

    pub fn with_collection(mut self, key: Pubkey, verified: bool) -> Self {
        self.collection = Some((key, verified));
        self
    }

    /// Right-pad string fields with NUL the way the program stores them
    pub fn padded(mut self) -> Self {
        self.padded = true;
        self
    }

    /// Stop after `is_mutable`, like accounts written before the tail existed
    pub fn legacy(mut self) -> Self {
        self.legacy = true;
        self
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let (name, symbol, uri) = if self.padded {
            (
                pad(&self.name, 32),
                pad(&self.symbol, 10),
                pad(&self.uri, 200),
            )
        } else {
            (self.name.clone(), self.symbol.clone(), self.uri.clone())
        };

        let mut out = vec![4u8];
        out.extend_from_slice(Pubkey::new_unique().as_ref());
        out.extend_from_slice(self.mint.as_ref());
        out.extend(borsh::to_vec(&name).unwrap());
        out.extend(borsh::to_vec(&symbol).unwrap());
        out.extend(borsh::to_vec(&uri).unwrap());
        out.extend(500u16.to_le_bytes());

        match &self.creators {
            None => out.push(0),
            Some(creators) => {
                out.push(1);
                out.extend((creators.len() as u32).to_le_bytes());
                for (address, verified, share) in creators {
                    out.extend_from_slice(address.as_ref());
                    out.push(*verified as u8);
                    out.push(*share);
                }
            }
        }

        // primary_sale_happened, is_mutable
        out.extend([0u8, 1u8]);
        if self.legacy {
            return out;
        }

        // edition_nonce = Some(255), token_standard = Some(NonFungible)
        out.extend([1u8, 255u8, 1u8, 0u8]);
        match self.collection {
            None => out.push(0),
            Some((key, verified)) => {
                out.push(1);
                out.push(verified as u8);
                out.extend_from_slice(key.as_ref());
            }
        }
        // uses, collection_details, programmable_config
        out.extend([0u8, 0u8, 0u8]);
        out
    }
}

fn pad(value: &str, width: usize) -> String {
    let mut padded = value.to_string();
    while padded.len() < width {
        padded.push('\0');
    }
    padded
}

/// Print edition account (`EditionV1`) carrying `number`
pub fn edition_account_bytes(number: u64) -> Vec<u8> {
    let mut out = vec![1u8];
    out.extend_from_slice(Pubkey::new_unique().as_ref());
    out.extend(number.to_le_bytes());
    out
}

/// Master edition account (`MasterEditionV2`) with unlimited supply
pub fn master_edition_account_bytes() -> Vec<u8> {
    let mut out = vec![6u8];
    out.extend(0u64.to_le_bytes());
    out.push(0);
    out
}

// ============================================================================
// LEDGER
// ============================================================================

#[derive(Default)]
struct LedgerState {
    holdings: HashMap<(Pubkey, TokenProgram), Vec<TokenAccountInfo>>,
    accounts: HashMap<Pubkey, Vec<u8>>,
    failing_accounts: HashSet<Pubkey>,
    failing_programs: HashSet<TokenProgram>,
    identifiers: HashMap<String, String>,
    account_reads: usize,
}

/// In-memory `LedgerClient`
#[derive(Default)]
pub struct MockLedger {
    state: Mutex<LedgerState>,
}

impl MockLedger {
    pub fn set_account(&self, address: Pubkey, bytes: Vec<u8>) {
        self.state.lock().unwrap().accounts.insert(address, bytes);
    }

    /// Create a mint with metadata and an off-chain document; returns the
    /// candidate for a fresh token account holding it
    pub fn add_nft(&self, name: &str, symbol: &str, fetcher: &MockFetcher) -> TokenCandidate {
        let mint = Pubkey::new_unique();
        let creator = Pubkey::new_unique();
        let uri = format!("https://arweave.example/{}.json", mint);
        let program = metaplex_program_id().unwrap();

        self.set_account(
            derive_metadata_addresses(&program, &mint).metadata,
            MetadataFixture::new(mint, name, symbol, &uri)
                .with_creators(vec![(creator, true, 100)])
                .padded()
                .to_bytes(),
        );
        fetcher.add_document(
            &uri,
            OffchainDocument {
                image: format!("https://arweave.example/{}.png", mint),
                animation_url: None,
                description: Some(format!("{} description", name)),
            },
        );

        let creators = [Creator {
            address: creator.to_string(),
            verified: true,
            share: 100,
        }];
        self.state.lock().unwrap().identifiers.insert(
            mint.to_string(),
            allowlist_identifier(symbol, Some(&creators[..])),
        );

        TokenCandidate::new(Pubkey::new_unique().to_string(), mint.to_string())
    }

    /// Allowlist identifier of an NFT created by `add_nft`
    pub fn identifier_of(&self, candidate: &TokenCandidate) -> String {
        self.state.lock().unwrap().identifiers[&candidate.mint_address].clone()
    }

    pub fn add_token_account(&self, owner: &Pubkey, program: TokenProgram, info: TokenAccountInfo) {
        self.state
            .lock()
            .unwrap()
            .holdings
            .entry((*owner, program))
            .or_default()
            .push(info);
    }

    /// Put a candidate into `owner`'s wallet as a 1-of-1 SPL token account
    pub fn hold(&self, owner: &Pubkey, candidate: &TokenCandidate) {
        self.add_token_account(
            owner,
            TokenProgram::SplToken,
            TokenAccountInfo {
                account_address: candidate.token_account_address.clone(),
                mint_address: candidate.mint_address.clone(),
                amount: 1,
                decimals: 0,
            },
        );
    }

    /// Remove a token account from `owner`'s wallet under every program
    pub fn release(&self, owner: &Pubkey, token_account_address: &str) {
        let mut state = self.state.lock().unwrap();
        for ((holder, _), accounts) in state.holdings.iter_mut() {
            if holder == owner {
                accounts.retain(|a| a.account_address != token_account_address);
            }
        }
    }

    /// Make reads of the candidate mint's metadata account fail
    pub fn fail_mint(&self, mint_address: &str) {
        let mint: Pubkey = mint_address.parse().unwrap();
        let program = metaplex_program_id().unwrap();
        self.state
            .lock()
            .unwrap()
            .failing_accounts
            .insert(derive_metadata_addresses(&program, &mint).metadata);
    }

    pub fn fail_program(&self, program: TokenProgram) {
        self.state.lock().unwrap().failing_programs.insert(program);
    }

    pub fn account_reads(&self) -> usize {
        self.state.lock().unwrap().account_reads
    }
}

#[async_trait]
impl LedgerClient for MockLedger {
    async fn list_candidate_accounts(
        &self,
        owner: &Pubkey,
        program: TokenProgram,
    ) -> SyncResult<Vec<TokenAccountInfo>> {
        let state = self.state.lock().unwrap();
        if state.failing_programs.contains(&program) {
            return Err(SyncError::ChainRpc(format!(
                "getTokenAccountsByOwner failed for {}",
                program.name()
            )));
        }
        Ok(state
            .holdings
            .get(&(*owner, program))
            .cloned()
            .unwrap_or_default())
    }

    async fn get_account_bytes(&self, address: &Pubkey) -> SyncResult<Option<Vec<u8>>> {
        let mut state = self.state.lock().unwrap();
        state.account_reads += 1;
        if state.failing_accounts.contains(address) {
            return Err(SyncError::ChainRpc(format!("getAccountInfo failed for {}", address)));
        }
        Ok(state.accounts.get(address).cloned())
    }
}

// ============================================================================
// OFF-CHAIN DOCUMENTS
// ============================================================================

/// Scripted `DocumentFetcher` that counts every fetch
#[derive(Default)]
pub struct MockFetcher {
    documents: Mutex<HashMap<String, OffchainDocument>>,
    fail_all: Mutex<bool>,
    fetches: AtomicUsize,
}

impl MockFetcher {
    pub fn add_document(&self, uri: &str, document: OffchainDocument) {
        self.documents
            .lock()
            .unwrap()
            .insert(uri.to_string(), document);
    }

    pub fn fail_all(&self) {
        *self.fail_all.lock().unwrap() = true;
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DocumentFetcher for MockFetcher {
    async fn fetch(&self, uri: &str) -> SyncResult<OffchainDocument> {
        self.fetches.fetch_add(1, Ordering::SeqCst);

        if *self.fail_all.lock().unwrap() {
            return Err(SyncError::OffchainFetch {
                uri: uri.to_string(),
                reason: "HTTP error: 503 Service Unavailable".to_string(),
            });
        }

        self.documents
            .lock()
            .unwrap()
            .get(uri)
            .cloned()
            .ok_or_else(|| SyncError::OffchainFetch {
                uri: uri.to_string(),
                reason: "HTTP error: 404 Not Found".to_string(),
            })
    }
}

// ============================================================================
// RECORDS
// ============================================================================

/// Minimal resolved record for scheduler and cache tests
pub fn sample_record(token_account_address: &str, mint_address: &str) -> TokenRecord {
    TokenRecord {
        token_account_address: token_account_address.to_string(),
        token_mint_address: mint_address.to_string(),
        display_metadata: DisplayMetadata {
            name: format!("NFT {}", mint_address),
            symbol: "NFT".to_string(),
            uri: format!("https://arweave.example/{}.json", mint_address),
            seller_fee_basis_points: 500,
            creators: None,
            collection: None,
        },
        edition_number: None,
        preview_image: format!("https://arweave.example/{}.png", mint_address),
        preview_animation: None,
        description: String::new(),
    }
}
