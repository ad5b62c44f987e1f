use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use std::time::Instant;

use super::{http_client, truncate};
use crate::config::{credential, key_preview, DuneConfig};
use crate::error::{AppError, AppResult};

const TRANSACTIONS_FAILED: &str = "Failed to fetch transactions";

/// Filters for the transactions endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransactionsParams {
    pub log_address: String,
    pub limit: u32,
    pub decode: bool,
}

/// Dune Sim indexing API.
#[derive(Clone)]
pub struct DuneClient {
    client: Client,
    api_url: String,
    api_key: Option<String>,
}

impl DuneClient {
    pub fn new(config: &DuneConfig) -> AppResult<Self> {
        tracing::debug!(api_key = %key_preview(&config.api_key), "Creating Dune client");
        Ok(Self {
            client: http_client()?,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }

    pub fn is_configured(&self) -> bool {
        credential(&self.api_key).is_some()
    }

    /// Decoded transactions of `contract_address`, narrowed by `params`.
    /// The body is handed back exactly as Dune sent it.
    pub async fn get_transactions(
        &self,
        contract_address: &str,
        params: &TransactionsParams,
    ) -> AppResult<Value> {
        let api_key = credential(&self.api_key).ok_or_else(|| {
            AppError::upstream(TRANSACTIONS_FAILED, "DUNE_API_KEY not configured")
        })?;

        let start = Instant::now();
        let url = format!("{}/v1/evm/transactions/{}", self.api_url, contract_address);
        tracing::debug!(
            contract = %contract_address,
            log_address = %params.log_address,
            limit = %params.limit,
            "Fetching transactions from Dune"
        );

        let response = self
            .client
            .get(&url)
            .query(params)
            .header("X-Sim-Api-Key", api_key)
            .send()
            .await
            .map_err(|e| {
                AppError::upstream(TRANSACTIONS_FAILED, format!("Dune request failed: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::upstream(
                TRANSACTIONS_FAILED,
                format!("Dune API error {}: {}", status, truncate(&body)),
            ));
        }

        let transactions: Value = response.json().await.map_err(|e| {
            AppError::upstream(
                TRANSACTIONS_FAILED,
                format!("Failed to parse Dune response: {}", e),
            )
        })?;

        tracing::info!(
            contract = %contract_address,
            count = %transaction_count(&transactions),
            duration_ms = %start.elapsed().as_millis(),
            "Fetched transactions"
        );
        Ok(transactions)
    }
}

/// Length of the `transactions` array, for logs.
pub fn transaction_count(body: &Value) -> usize {
    body.get("transactions")
        .and_then(Value::as_array)
        .map_or(0, Vec::len)
}
