/// Global constants used across nft-inventory
///
/// This module contains system-wide constants that are not configurable
/// and are used across multiple modules.

// ============================================================================
// SOLANA PROGRAM IDS
// ============================================================================

/// Metaplex token metadata program
pub const METAPLEX_PROGRAM_ID: &str = "metaqbxxUerdq28cj1RbAWkYQm3ybzjb6a8bt518x1s";

/// Legacy SPL token program
pub const SPL_TOKEN_PROGRAM_ID: &str = "TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA";

/// Token-2022 program
pub const TOKEN_2022_PROGRAM_ID: &str = "TokenzQdBNbLqP5VEhdkAS6EPFLZ9qRpgvqnvq4GLFaX";

// ============================================================================
// METAPLEX LAYOUT CONSTANTS
// ============================================================================

/// PDA seed prefix shared by metadata and edition accounts
pub const METADATA_SEED: &[u8] = b"metadata";

/// PDA seed suffix for edition accounts
pub const EDITION_SEED: &[u8] = b"edition";

/// Account key discriminators (first byte of every token metadata account)
pub const KEY_EDITION_V1: u8 = 1;
pub const KEY_METADATA_V1: u8 = 4;

// ============================================================================
// SCHEDULING DEFAULTS
// ============================================================================

/// Platform ceiling for resolution requests per second
pub const DEFAULT_RATE_CEILING_PER_SEC: u32 = 40;

/// Default number of candidates resolved per batch
pub const DEFAULT_BATCH_SIZE: usize = 40;

/// NFT heuristic: held amount and decimal precision
pub const NFT_AMOUNT: u64 = 1;
pub const NFT_DECIMALS: u8 = 0;
