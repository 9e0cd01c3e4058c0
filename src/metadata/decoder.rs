//! Metaplex token metadata account decoding
//!
//! Metadata accounts are Borsh-encoded. The fixed head (key through
//! `is_mutable`) must decode; the optional tail (edition nonce, token
//! standard, collection) is absent on legacy accounts and decoded leniently.

use crate::constants::{KEY_EDITION_V1, KEY_METADATA_V1};
use crate::types::{Collection, Creator, DisplayMetadata};
use borsh::BorshDeserialize;
use solana_sdk::pubkey::Pubkey;

#[derive(Debug, BorshDeserialize)]
struct RawCreator {
    address: [u8; 32],
    verified: bool,
    share: u8,
}

#[derive(Debug, BorshDeserialize)]
struct RawData {
    name: String,
    symbol: String,
    uri: String,
    seller_fee_basis_points: u16,
    creators: Option<Vec<RawCreator>>,
}

#[derive(Debug, BorshDeserialize)]
struct RawMetadataHead {
    key: u8,
    _update_authority: [u8; 32],
    mint: [u8; 32],
    data: RawData,
    _primary_sale_happened: bool,
    _is_mutable: bool,
}

#[derive(Debug, BorshDeserialize)]
struct RawCollection {
    verified: bool,
    key: [u8; 32],
}

#[derive(Debug, BorshDeserialize)]
struct RawEdition {
    key: u8,
    _parent: [u8; 32],
    edition: u64,
}

/// Decoded metadata account plus the mint it claims to describe
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedMetadata {
    pub mint: Pubkey,
    pub display: DisplayMetadata,
}

/// Decode a metadata account
pub fn decode_metadata(data: &[u8]) -> Result<DecodedMetadata, String> {
    match data.first() {
        None => return Err("Metadata account is empty".to_string()),
        Some(&key) if key != KEY_METADATA_V1 => {
            return Err(format!("Unexpected account key {}", key));
        }
        _ => {}
    }

    let mut cursor = data;
    let head = RawMetadataHead::deserialize(&mut cursor)
        .map_err(|e| format!("Invalid metadata layout: {}", e))?;
    debug_assert_eq!(head.key, KEY_METADATA_V1);

    let collection = decode_collection_tail(&mut cursor);

    let creators = head.data.creators.map(|creators| {
        creators
            .into_iter()
            .map(|c| Creator {
                address: Pubkey::new_from_array(c.address).to_string(),
                verified: c.verified,
                share: c.share,
            })
            .collect()
    });

    Ok(DecodedMetadata {
        mint: Pubkey::new_from_array(head.mint),
        display: DisplayMetadata {
            name: strip_padding(&head.data.name),
            symbol: strip_padding(&head.data.symbol),
            uri: strip_padding(&head.data.uri),
            seller_fee_basis_points: head.data.seller_fee_basis_points,
            creators,
            collection,
        },
    })
}

/// Edition number of a print edition account; master editions have none
pub fn decode_edition_number(data: &[u8]) -> Option<u64> {
    if data.first() != Some(&KEY_EDITION_V1) {
        return None;
    }

    let mut cursor = data;
    let edition = RawEdition::deserialize(&mut cursor).ok()?;
    (edition.key == KEY_EDITION_V1).then_some(edition.edition)
}

fn decode_collection_tail(cursor: &mut &[u8]) -> Option<Collection> {
    let _edition_nonce = Option::<u8>::deserialize(cursor).ok()?;
    let _token_standard = Option::<u8>::deserialize(cursor).ok()?;
    let collection = Option::<RawCollection>::deserialize(cursor).ok()??;

    Some(Collection {
        key: Pubkey::new_from_array(collection.key).to_string(),
        verified: collection.verified,
    })
}

/// Fixed-width string fields are right-padded with NUL bytes on chain
fn strip_padding(value: &str) -> String {
    value.trim_end_matches('\0').to_string()
}
