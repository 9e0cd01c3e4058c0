//! Metaplex program-derived addresses

use crate::constants::{EDITION_SEED, METADATA_SEED, METAPLEX_PROGRAM_ID};
use crate::errors::SyncResult;
use crate::utils::parse_pubkey;
use solana_sdk::pubkey::Pubkey;

/// Metadata and edition accounts belonging to one mint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetadataAddresses {
    pub metadata: Pubkey,
    pub edition: Pubkey,
}

pub fn metaplex_program_id() -> SyncResult<Pubkey> {
    parse_pubkey(METAPLEX_PROGRAM_ID)
}

/// Derive `["metadata", program, mint]` and `["metadata", program, mint, "edition"]`
pub fn derive_metadata_addresses(program_id: &Pubkey, mint: &Pubkey) -> MetadataAddresses {
    let (metadata, _bump) = Pubkey::find_program_address(
        &[METADATA_SEED, program_id.as_ref(), mint.as_ref()],
        program_id,
    );
    let (edition, _bump) = Pubkey::find_program_address(
        &[METADATA_SEED, program_id.as_ref(), mint.as_ref(), EDITION_SEED],
        program_id,
    );

    MetadataAddresses { metadata, edition }
}
