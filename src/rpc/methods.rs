//! `LedgerClient` implementation backed by Solana JSON-RPC

use super::client::RpcClient;
use super::{LedgerClient, TokenProgram};
use crate::errors::{SyncError, SyncResult};
use crate::types::TokenAccountInfo;
use async_trait::async_trait;
use base64::Engine;
use solana_sdk::pubkey::Pubkey;

#[async_trait]
impl LedgerClient for RpcClient {
    async fn list_candidate_accounts(
        &self,
        owner: &Pubkey,
        program: TokenProgram,
    ) -> SyncResult<Vec<TokenAccountInfo>> {
        let params = serde_json::json!([
            owner.to_string(),
            { "programId": program.program_id() },
            { "encoding": "jsonParsed", "commitment": "confirmed" }
        ]);

        let result = self.execute_raw("getTokenAccountsByOwner", params).await?;

        let values = result
            .get("value")
            .and_then(|v| v.as_array())
            .ok_or_else(|| {
                SyncError::ChainRpc("Invalid getTokenAccountsByOwner response".to_string())
            })?;

        Ok(values.iter().filter_map(parse_token_account_info).collect())
    }

    async fn get_account_bytes(&self, address: &Pubkey) -> SyncResult<Option<Vec<u8>>> {
        let params = serde_json::json!([
            address.to_string(),
            { "encoding": "base64", "commitment": "confirmed" }
        ]);

        let result = self.execute_raw("getAccountInfo", params).await?;

        match result.get("value") {
            None | Some(serde_json::Value::Null) => Ok(None),
            Some(value) => parse_account_data(value).map(Some),
        }
    }
}

/// Parse token account info from a jsonParsed response item
///
/// Items that are not parsed SPL token accounts are skipped.
fn parse_token_account_info(item: &serde_json::Value) -> Option<TokenAccountInfo> {
    let pubkey_str = item.get("pubkey")?.as_str()?;
    let info = item
        .get("account")?
        .get("data")?
        .get("parsed")?
        .get("info")?;

    let mint_str = info.get("mint")?.as_str()?;
    let token_amount = info.get("tokenAmount")?;
    let amount = token_amount.get("amount")?.as_str()?.parse::<u64>().ok()?;
    let decimals = u8::try_from(token_amount.get("decimals")?.as_u64()?).ok()?;

    Some(TokenAccountInfo {
        account_address: pubkey_str.to_string(),
        mint_address: mint_str.to_string(),
        amount,
        decimals,
    })
}

/// Decode the `data` member of a base64-encoded account
fn parse_account_data(value: &serde_json::Value) -> SyncResult<Vec<u8>> {
    let data = value
        .get("data")
        .ok_or_else(|| SyncError::ChainRpc("Account response missing data".to_string()))?;

    let encoded = if let Some(arr) = data.as_array() {
        // [data_base64, encoding]
        let encoding = arr.get(1).and_then(|v| v.as_str()).unwrap_or("base64");
        if encoding != "base64" {
            return Err(SyncError::ChainRpc(format!(
                "Unsupported encoding: {}",
                encoding
            )));
        }
        arr.first().and_then(|v| v.as_str())
    } else {
        data.as_str()
    }
    .ok_or_else(|| SyncError::ChainRpc("Invalid account data format".to_string()))?;

    base64::engine::general_purpose::STANDARD
        .decode(encoded)
        .map_err(|e| SyncError::ChainRpc(format!("Failed to decode base64: {}", e)))
}
