/// Configuration schemas - all config sections defined once with defaults
///
/// Each section is declared with `config_struct!`, so a TOML file only needs
/// to mention the values it overrides.
use crate::config_struct;
use crate::constants::{DEFAULT_BATCH_SIZE, DEFAULT_RATE_CEILING_PER_SEC};

// ============================================================================
// RPC CONFIGURATION
// ============================================================================

config_struct! {
    /// Ledger RPC endpoint configuration
    pub struct RpcConfig {
        /// RPC URLs, tried in order on transport failure
        urls: Vec<String> = vec!["https://api.mainnet-beta.solana.com".to_string()],
        /// Per-request timeout
        timeout_secs: u64 = 15,
        /// Requests per second allowed towards the RPC provider
        rate_limit_per_sec: u32 = 40,
        /// Token programs scanned for candidates ("spl-token", "token-2022")
        token_programs: Vec<String> = vec!["spl-token".to_string(), "token-2022".to_string()],
    }
}

// ============================================================================
// BATCH CONFIGURATION
// ============================================================================

config_struct! {
    /// Batched metadata resolution
    pub struct BatchConfig {
        /// Candidates resolved concurrently per batch
        batch_size: usize = DEFAULT_BATCH_SIZE,
        /// Aggregate resolution ceiling; cooldown = batch_size / ceiling
        rate_ceiling_per_sec: u32 = DEFAULT_RATE_CEILING_PER_SEC,
    }
}

// ============================================================================
// METADATA CONFIGURATION
// ============================================================================

config_struct! {
    /// Off-chain metadata document fetching
    pub struct MetadataConfig {
        http_timeout_secs: u64 = 10,
        /// Gateway prefix substituted for `ipfs://`
        ipfs_gateway: String = "https://ipfs.io/ipfs/".to_string(),
        /// Gateway prefix substituted for `ar://`
        arweave_gateway: String = "https://arweave.net/".to_string(),
    }
}

// ============================================================================
// CACHE CONFIGURATION
// ============================================================================

config_struct! {
    /// Persistent per-wallet holdings cache
    pub struct CacheConfig {
        enabled: bool = true,
        /// SQLite file; empty means the platform data directory
        database_path: String = String::new(),
        /// How long purge waits for in-flight cache work before deferring
        purge_timeout_ms: u64 = 5_000,
    }
}

// ============================================================================
// LOGGING CONFIGURATION
// ============================================================================

config_struct! {
    pub struct LoggingConfig {
        min_level: String = "info".to_string(),
        /// Tags with debug output enabled (e.g. ["cache", "batch"])
        debug_tags: Vec<String> = Vec::new(),
        /// Optional log file; empty disables file logging
        file_path: String = String::new(),
    }
}

config_struct! {
    /// Root configuration
    pub struct Config {
        rpc: RpcConfig = RpcConfig::default(),
        batch: BatchConfig = BatchConfig::default(),
        metadata: MetadataConfig = MetadataConfig::default(),
        cache: CacheConfig = CacheConfig::default(),
        logging: LoggingConfig = LoggingConfig::default(),
    }
}
