//! Collection allowlist identifiers
//!
//! An identifier is the lowercase hex SHA-256 of the compact JSON
//! `{"symbol":..,"creators":[{"address":..,"share":..},..]}` with creators
//! in on-chain order. The `verified` flag is left out so that a creator
//! signing after mint does not move an item out of its collection.

use crate::types::{Creator, DisplayMetadata};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::HashSet;

#[derive(Serialize)]
struct IdentifierSource<'a> {
    symbol: &'a str,
    creators: Vec<CreatorSource<'a>>,
}

#[derive(Serialize)]
struct CreatorSource<'a> {
    address: &'a str,
    share: u8,
}

/// Identifier of an item's collection, computed from symbol and creators
pub fn allowlist_identifier(symbol: &str, creators: Option<&[Creator]>) -> String {
    let source = IdentifierSource {
        symbol,
        creators: creators
            .unwrap_or_default()
            .iter()
            .map(|c| CreatorSource {
                address: &c.address,
                share: c.share,
            })
            .collect(),
    };

    // Serializing borrowed strings and integers cannot fail
    let canonical = serde_json::to_vec(&source).unwrap_or_default();
    format!("{:x}", Sha256::digest(&canonical))
}

/// Set of accepted collection identifiers for one sync call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Allowlist {
    identifiers: HashSet<String>,
}

impl Allowlist {
    pub fn new<I, S>(identifiers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            identifiers: identifiers
                .into_iter()
                .map(|id| id.into().trim().to_lowercase())
                .filter(|id| !id.is_empty())
                .collect(),
        }
    }

    /// Parse one identifier per line; blank lines and `#` comments are skipped
    pub fn from_lines(text: &str) -> Self {
        Self::new(
            text.lines()
                .map(str::trim)
                .filter(|line| !line.starts_with('#')),
        )
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.identifiers.contains(identifier)
    }

    /// Whether an item with this display metadata belongs to the allowlist
    pub fn permits(&self, metadata: &DisplayMetadata) -> bool {
        self.contains(&allowlist_identifier(
            &metadata.symbol,
            metadata.creators.as_deref(),
        ))
    }

    pub fn len(&self) -> usize {
        self.identifiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.identifiers.is_empty()
    }
}
