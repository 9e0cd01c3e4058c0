//! Configuration system
//!
//! Sections are declared with `config_struct!` in `schemas`, loaded from TOML
//! by `utils`, and passed explicitly to the components that use them.

pub mod macros;
pub mod schemas;
pub mod utils;

pub use schemas::{BatchConfig, CacheConfig, Config, LoggingConfig, MetadataConfig, RpcConfig};
pub use utils::{
    cache_database_path, merge_logging_config, load_config_from_path, parse_config,
    token_programs, validate_config, CONFIG_FILE_PATH,
};
