//! Result shapes for the typed call sites in [`super::methods`].
//!
//! Node-specific payloads keep unknown fields in a flattened `extra` map so
//! indexer extensions survive decoding.

use bitcoin::{BlockHash, Txid};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ==============================================================================
// Node Health
// ==============================================================================

/// Basic chain information from `getblockchaininfo`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainInfo {
    pub chain: String,
    pub blocks: u64,
    #[serde(rename = "bestblockhash")]
    pub best_block_hash: BlockHash,
    #[serde(default)]
    pub pruned: bool,
}

/// Subset of `getnetworkinfo`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkInfo {
    pub version: u64,
    #[serde(rename = "subversion", default)]
    pub sub_version: String,
    pub connections: u32,
    #[serde(rename = "networkactive", default = "default_true")]
    pub network_active: bool,
}

/// Subset of `getmempoolinfo`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MempoolInfo {
    pub size: u64,
    pub bytes: u64,
    #[serde(default)]
    pub usage: u64,
    #[serde(rename = "maxmempool", default)]
    pub max_mempool: u64,
    #[serde(rename = "mempoolminfee", default)]
    pub min_fee: f64,
}

fn default_true() -> bool {
    true
}

// ==============================================================================
// Runes
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuneInfo {
    #[serde(alias = "rune", alias = "spaced_rune")]
    pub name: String,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub divisibility: u8,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionInfo {
    pub txid: Txid,
    /// Negative when the transaction conflicts with the active chain.
    #[serde(default)]
    pub confirmations: i64,
    #[serde(rename = "blockhash", default)]
    pub block_hash: Option<BlockHash>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferStatus {
    pub status: String,
    #[serde(default)]
    pub confirmations: i64,
    #[serde(default)]
    pub txid: Option<Txid>,
}
