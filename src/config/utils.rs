use super::schemas::Config;
/// Configuration utilities - loading and validation
///
/// Configuration is loaded once into an owned `Config` and handed to the
/// components that need it. There is no process-wide mutable instance.
use crate::errors::{SyncError, SyncResult};
use crate::logger::{self, LogLevel, LogTag, LoggerConfig};
use crate::rpc::TokenProgram;
use std::path::{Path, PathBuf};

/// Default configuration file path
pub const CONFIG_FILE_PATH: &str = "data/config.toml";

/// Load configuration from a TOML file
///
/// A missing file yields the defaults; a malformed file is an error.
pub fn load_config_from_path(path: &Path) -> SyncResult<Config> {
    if !path.exists() {
        logger::warning(
            LogTag::System,
            &format!(
                "Config file '{}' not found, using default values",
                path.display()
            ),
        );
        return Ok(Config::default());
    }

    let contents = std::fs::read_to_string(path).map_err(|e| {
        SyncError::Configuration(format!(
            "Failed to read config file '{}': {}",
            path.display(),
            e
        ))
    })?;

    let config = parse_config(&contents).map_err(|e| match e {
        SyncError::Configuration(msg) => {
            SyncError::Configuration(format!("{} ({})", msg, path.display()))
        }
        other => other,
    })?;

    Ok(config)
}

/// Parse and validate configuration text
pub fn parse_config(contents: &str) -> SyncResult<Config> {
    let config = toml::from_str::<Config>(contents)
        .map_err(|e| SyncError::Configuration(format!("Failed to parse config: {}", e)))?;
    validate_config(&config)?;
    Ok(config)
}

pub fn validate_config(config: &Config) -> SyncResult<()> {
    if config.rpc.urls.is_empty() {
        return Err(SyncError::Configuration(
            "rpc.urls must list at least one endpoint".to_string(),
        ));
    }
    if config.rpc.rate_limit_per_sec == 0 {
        return Err(SyncError::Configuration(
            "rpc.rate_limit_per_sec must be positive".to_string(),
        ));
    }
    if config.batch.rate_ceiling_per_sec == 0 {
        return Err(SyncError::Configuration(
            "batch.rate_ceiling_per_sec must be positive".to_string(),
        ));
    }
    token_programs(config)?;
    config
        .logging
        .min_level
        .parse::<LogLevel>()
        .map_err(|e| SyncError::Configuration(format!("logging.min_level: {}", e)))?;
    Ok(())
}

/// Resolve the configured token program names once
pub fn token_programs(config: &Config) -> SyncResult<Vec<TokenProgram>> {
    config
        .rpc
        .token_programs
        .iter()
        .map(|name| {
            TokenProgram::from_name(name).ok_or_else(|| {
                SyncError::Configuration(format!("Unknown token program '{}'", name))
            })
        })
        .collect()
}

/// Location of the holdings database
pub fn cache_database_path(config: &Config) -> PathBuf {
    if !config.cache.database_path.is_empty() {
        return PathBuf::from(&config.cache.database_path);
    }

    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("data"))
        .join("nft-inventory")
        .join("holdings.db")
}

/// Merge the `[logging]` section with flag-derived logger settings
///
/// Explicit `--verbose`/`--quiet` flags win over the configured level; debug
/// tags from both sources are combined.
pub fn merge_logging_config(config: &Config, flags: &LoggerConfig) -> LoggerConfig {
    let mut merged = flags.clone();

    if flags.min_level == LoggerConfig::default().min_level {
        if let Ok(level) = config.logging.min_level.parse::<LogLevel>() {
            merged.min_level = level;
        }
    }

    merged.debug_tags.extend(
        config
            .logging
            .debug_tags
            .iter()
            .filter_map(|key| LogTag::from_debug_key(key)),
    );

    merged
}
