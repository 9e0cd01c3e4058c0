pub mod batch;
pub mod cache;
pub mod config;
pub mod constants;
pub mod errors;
pub mod logger;
pub mod metadata;
pub mod rpc;
pub mod scanner;
pub mod sync;
pub mod types;
pub mod utils;

#[cfg(test)]
pub(crate) mod testing;
