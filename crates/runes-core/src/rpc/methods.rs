//! Typed call sites.
//!
//! Every method here is a thin wrapper over [`RpcClient::invoke`]: validate
//! the caller's input, name the RPC method, pick the result shape. New call
//! sites should follow the same three steps rather than talking to the
//! transport directly.

use async_trait::async_trait;
use bitcoin::Txid;
use serde_json::{json, Value};

use crate::error::CoreError;

use super::client::RpcClient;
use super::types::{ChainInfo, MempoolInfo, NetworkInfo, RuneInfo, TransactionInfo, TransferStatus};

// ==============================================================================
// Node Health
// ==============================================================================

/// Read-only node queries used by status checks.
#[async_trait]
pub trait NodeRpc: Send + Sync {
    async fn get_blockchain_info(&self) -> Result<ChainInfo, CoreError>;

    async fn get_network_info(&self) -> Result<NetworkInfo, CoreError>;

    async fn get_mempool_info(&self) -> Result<MempoolInfo, CoreError>;

    async fn get_block_count(&self) -> Result<u64, CoreError>;
}

#[async_trait]
impl NodeRpc for RpcClient {
    async fn get_blockchain_info(&self) -> Result<ChainInfo, CoreError> {
        self.invoke("get blockchain info", "getblockchaininfo", Vec::new())
            .await
    }

    async fn get_network_info(&self) -> Result<NetworkInfo, CoreError> {
        self.invoke("get network info", "getnetworkinfo", Vec::new())
            .await
    }

    async fn get_mempool_info(&self) -> Result<MempoolInfo, CoreError> {
        self.invoke("get mempool info", "getmempoolinfo", Vec::new())
            .await
    }

    async fn get_block_count(&self) -> Result<u64, CoreError> {
        self.invoke("get block count", "getblockcount", Vec::new())
            .await
    }
}

// ==============================================================================
// Runes
// ==============================================================================

/// Runes indexer methods.
#[async_trait]
pub trait RunesRpc: Send + Sync {
    async fn get_rune(&self, name: &str) -> Result<RuneInfo, CoreError>;

    async fn get_transaction(&self, txid: &Txid) -> Result<TransactionInfo, CoreError>;

    /// Verbose `getrawtransaction`; the decoded shape is left to the caller.
    async fn get_raw_transaction(&self, txid: &Txid) -> Result<Value, CoreError>;

    async fn get_transfer_status(&self, transfer_id: &str) -> Result<TransferStatus, CoreError>;

    async fn send_raw_transaction(&self, hex: &str) -> Result<Txid, CoreError>;

    async fn get_transaction_history(
        &self,
        address: &str,
        limit: Option<u32>,
    ) -> Result<Vec<Value>, CoreError>;
}

#[async_trait]
impl RunesRpc for RpcClient {
    async fn get_rune(&self, name: &str) -> Result<RuneInfo, CoreError> {
        let name = require_non_empty(name, "rune name")
            .map_err(|e| e.context("Failed to get rune info"))?;
        self.invoke("get rune info", "getrune", vec![json!(name)])
            .await
    }

    async fn get_transaction(&self, txid: &Txid) -> Result<TransactionInfo, CoreError> {
        self.invoke("get transaction", "gettransaction", vec![json!(txid.to_string())])
            .await
            .map_err(|err| normalize_tx_not_found(txid, err))
    }

    async fn get_raw_transaction(&self, txid: &Txid) -> Result<Value, CoreError> {
        self.invoke(
            "get raw transaction",
            "getrawtransaction",
            vec![json!(txid.to_string()), json!(true)],
        )
        .await
        .map_err(|err| normalize_tx_not_found(txid, err))
    }

    async fn get_transfer_status(&self, transfer_id: &str) -> Result<TransferStatus, CoreError> {
        let transfer_id = require_non_empty(transfer_id, "transfer id")
            .map_err(|e| e.context("Failed to get transfer status"))?;
        self.invoke("get transfer status", "gettransferstatus", vec![json!(transfer_id)])
            .await
    }

    async fn send_raw_transaction(&self, hex: &str) -> Result<Txid, CoreError> {
        validate_hex(hex).map_err(|e| e.context("Failed to send raw transaction"))?;
        self.invoke("send raw transaction", "sendrawtransaction", vec![json!(hex)])
            .await
    }

    async fn get_transaction_history(
        &self,
        address: &str,
        limit: Option<u32>,
    ) -> Result<Vec<Value>, CoreError> {
        let address = require_non_empty(address, "address")
            .map_err(|e| e.context("Failed to get transaction history"))?;
        let mut params = vec![json!(address)];
        if let Some(limit) = limit {
            params.push(json!(limit));
        }
        self.invoke("get transaction history", "gettransactionhistory", params)
            .await
    }
}

// ==============================================================================
// Input Validation
// ==============================================================================

/// Parse a caller-supplied txid. Malformed input never reaches the node.
pub fn parse_txid(raw: &str) -> Result<Txid, CoreError> {
    raw.trim()
        .parse::<Txid>()
        .map_err(|e| CoreError::Validation(format!("invalid txid `{raw}`: {e}")))
}

fn require_non_empty<'a>(value: &'a str, what: &str) -> Result<&'a str, CoreError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(CoreError::Validation(format!("{what} must not be empty")));
    }
    Ok(trimmed)
}

fn validate_hex(hex: &str) -> Result<(), CoreError> {
    if hex.is_empty() || hex.len() % 2 != 0 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(CoreError::Validation(
            "raw transaction must be a non-empty, even-length hex string".to_owned(),
        ));
    }
    Ok(())
}

// ==============================================================================
// RPC Error Normalization
// ==============================================================================

/// Convert the node's "missing tx" error (code -5) into `TxNotFound`,
/// keeping the operation prefix. Other failures pass through unchanged.
fn normalize_tx_not_found(txid: &Txid, err: CoreError) -> CoreError {
    let not_found = match err.root() {
        CoreError::Rpc(crate::error::RpcError::Server { code, message }) => {
            is_tx_not_found_server_error(*code, message)
        }
        _ => false,
    };
    if !not_found {
        return err;
    }
    match err {
        CoreError::Operation { operation, .. } => CoreError::TxNotFound(*txid).context(operation),
        _ => CoreError::TxNotFound(*txid),
    }
}

fn is_tx_not_found_server_error(code: i64, message: &str) -> bool {
    if code != -5 {
        return false;
    }

    let msg = message.to_ascii_lowercase();
    msg.contains("not found") || msg.contains("no such mempool or blockchain transaction")
}
