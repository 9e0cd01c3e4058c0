use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use nft_inventory::{
    batch::{BatchOptions, BatchScheduler},
    cache::{CacheStore, MemoryCacheStore, SqliteCacheStore},
    config::{
        cache_database_path, load_config_from_path, merge_logging_config, token_programs, Config,
        CONFIG_FILE_PATH,
    },
    logger::{self, LogTag},
    metadata::{Allowlist, HttpDocumentFetcher, MetadataResolver},
    rpc::RpcClient,
    scanner::TokenAccountScanner,
    sync::{ReconciliationEngine, SyncOptions},
    types::TokenRecord,
    utils::parse_pubkey,
};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Logging flags are handled by the logger and hidden from clap:
/// `--verbose`, `--quiet`, `--no-color`, `--debug-all`, `--debug-<tag>`
#[derive(Parser)]
#[command(name = "nft-inventory")]
#[command(about = "Synchronize the NFT holdings of a Solana wallet", long_about = None)]
struct Args {
    /// Path to the TOML configuration file
    #[arg(long, global = true, default_value = CONFIG_FILE_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Sync a wallet and print its NFTs as JSON
    Sync {
        /// Wallet address (base58)
        wallet: String,

        /// Resolve everything from chain and drop the wallet's cache entry
        #[arg(long)]
        no_cache: bool,

        /// Candidates resolved per batch
        #[arg(long)]
        batch_size: Option<usize>,

        /// File with one collection identifier per line
        #[arg(long)]
        allowlist: Option<PathBuf>,

        /// Log every completed batch
        #[arg(long)]
        progress: bool,
    },
    /// Print the cached holdings of a wallet without touching the chain
    Show { wallet: String },
    /// List wallets that have cached holdings
    List,
    /// Delete every cached wallet
    Purge,
}

#[tokio::main]
async fn main() {
    logger::init();

    let args = Args::parse_from(std::env::args().filter(|arg| !is_logger_flag(arg)));

    let code = match run(args).await {
        Ok(()) => 0,
        Err(e) => {
            logger::error(LogTag::System, &format!("{:#}", e));
            1
        }
    };

    logger::flush();
    std::process::exit(code);
}

fn is_logger_flag(arg: &str) -> bool {
    matches!(arg, "--verbose" | "--quiet" | "--no-color") || arg.starts_with("--debug-")
}

async fn run(args: Args) -> Result<()> {
    let config = load_config_from_path(&args.config)?;
    logger::set_logger_config(merge_logging_config(&config, &logger::get_logger_config()));

    if !config.logging.file_path.is_empty() {
        let path = Path::new(&config.logging.file_path);
        logger::init_file(path)
            .with_context(|| format!("Failed to open log file {}", path.display()))?;
    }

    let cache = open_cache(&config);

    match args.command {
        Command::Sync {
            wallet,
            no_cache,
            batch_size,
            allowlist,
            progress,
        } => {
            let allowlist = match allowlist {
                Some(path) => {
                    let text = std::fs::read_to_string(&path)
                        .with_context(|| format!("Failed to read allowlist {}", path.display()))?;
                    Some(Allowlist::from_lines(&text))
                }
                None => None,
            };

            let mut batch = BatchOptions::with_batch_size(
                batch_size.unwrap_or(config.batch.batch_size),
            );
            if progress {
                batch.on_batch = Some(Arc::new(|records: &[TokenRecord]| {
                    logger::info(
                        LogTag::Sync,
                        &format!("Batch complete: {} NFTs", records.len()),
                    );
                }));
            }

            let options = SyncOptions {
                caching_enabled: config.cache.enabled && !no_cache,
                allowlist,
                batch,
            };

            sync_wallet(&config, cache, &wallet, &options).await
        }
        Command::Show { wallet } => {
            let wallet = parse_pubkey(&wallet)?.to_string();
            let records = cache.get(&wallet).await?;
            print_json(&json!({
                "wallet": wallet,
                "cached": records.is_some(),
                "records": records.unwrap_or_default(),
            }))
        }
        Command::List => print_json(&json!({ "wallets": cache.keys().await? })),
        Command::Purge => {
            if cache.purge().await {
                logger::info(LogTag::Cache, "Holdings cache purged");
                Ok(())
            } else {
                anyhow::bail!("Cache purge was deferred, try again later")
            }
        }
    }
}

async fn sync_wallet(
    config: &Config,
    cache: Arc<dyn CacheStore>,
    wallet: &str,
    options: &SyncOptions,
) -> Result<()> {
    let ledger = Arc::new(RpcClient::new(&config.rpc)?);
    let fetcher = Arc::new(HttpDocumentFetcher::new(&config.metadata)?);
    let resolver = MetadataResolver::new(ledger.clone(), fetcher)?;

    let engine = ReconciliationEngine::new(
        TokenAccountScanner::new(ledger, token_programs(config)?),
        Arc::new(resolver),
        BatchScheduler::new(config.batch.rate_ceiling_per_sec),
        cache,
    );

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            logger::warning(LogTag::System, "Interrupted, cancelling sync");
            on_interrupt.cancel();
        }
    });

    let outcome = engine.sync_wallet(wallet, options, &cancel).await?;

    print_json(&json!({
        "wallet": wallet,
        "records": outcome.records,
        "report": outcome.report,
    }))
}

/// The SQLite store, or an in-memory one when the database cannot be opened
fn open_cache(config: &Config) -> Arc<dyn CacheStore> {
    let path = cache_database_path(config);
    let purge_timeout = Duration::from_millis(config.cache.purge_timeout_ms);

    match SqliteCacheStore::open(&path, purge_timeout) {
        Ok(store) => Arc::new(store),
        Err(e) => {
            logger::warning(
                LogTag::Cache,
                &format!(
                    "Holdings cache unavailable at {} ({}), caching in memory for this run",
                    path.display(),
                    e
                ),
            );
            Arc::new(MemoryCacheStore::new())
        }
    }
}

fn print_json(value: &serde_json::Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
