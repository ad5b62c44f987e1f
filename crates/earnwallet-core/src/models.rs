//! Response shapes returned by the upstream APIs.
//!
//! Unknown fields are kept in `extra` maps where the payload is handed back to
//! callers verbatim (the transactions proxy, the quote body), so a
//! deserialize/serialize cycle does not drop data.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ============================================================================
// Dune Sim - Activity
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityResponse {
    #[serde(default)]
    pub activity: Vec<ActivityItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_offset: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityItem {
    #[serde(default)]
    pub chain_id: u64,
    #[serde(default)]
    pub block_number: u64,
    #[serde(default)]
    pub block_time: String,
    #[serde(default)]
    pub tx_hash: String,
    /// "send", "receive", "mint", "burn", "swap", "approve", "call"
    #[serde(rename = "type", default)]
    pub activity_type: String,
    #[serde(default)]
    pub asset_type: Option<String>,
    #[serde(default)]
    pub token_address: Option<String>,
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub to: Option<String>,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub value_usd: Option<f64>,
    #[serde(default)]
    pub token_metadata: Option<TokenMetadata>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenMetadata {
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub decimals: Option<u32>,
    #[serde(default)]
    pub logo: Option<String>,
    #[serde(default)]
    pub price_usd: Option<f64>,
}

// ============================================================================
// Dune Sim - Token Info
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenInfoResponse {
    #[serde(default)]
    pub contract_address: String,
    #[serde(default)]
    pub tokens: Vec<TokenInfo>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenInfo {
    #[serde(default)]
    pub chain_id: u64,
    #[serde(default)]
    pub chain: Option<String>,
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub decimals: Option<u32>,
    #[serde(default)]
    pub price_usd: Option<f64>,
    #[serde(default)]
    pub logo: Option<String>,
    #[serde(default)]
    pub total_supply: Option<String>,
}

// ============================================================================
// Dune Sim - Transactions (served through /api/transactions)
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuneTransactionResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_offset: Option<String>,
    #[serde(default)]
    pub transactions: Vec<DuneTransaction>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Only `address` and `hash` are guaranteed; everything else is optional
/// so that partial rows still decode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuneTransaction {
    pub address: String,
    pub hash: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_number: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decoded: Option<DecodedCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logs: Option<Vec<DuneLog>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecodedCall {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inputs: Option<Vec<DecodedInput>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecodedInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub input_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuneLog {
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topics: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decoded: Option<DecodedCall>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// ============================================================================
// 0x - Swap Quote (served through /api/quote)
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteResponse {
    #[serde(default)]
    pub liquidity_available: bool,
    #[serde(default)]
    pub buy_amount: Option<String>,
    #[serde(default)]
    pub sell_amount: Option<String>,
    #[serde(default)]
    pub min_buy_amount: Option<String>,
    #[serde(default)]
    pub buy_token: Option<String>,
    #[serde(default)]
    pub sell_token: Option<String>,
    #[serde(default)]
    pub transaction: Option<QuoteTransaction>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteTransaction {
    pub to: String,
    pub data: String,
    #[serde(default)]
    pub gas: Option<String>,
    #[serde(default)]
    pub gas_price: Option<String>,
    #[serde(default)]
    pub value: Option<String>,
}
