use reqwest::Client;
use serde_json::Value;
use std::time::Instant;

use super::{http_client, truncate};
use crate::config::{credential, key_preview, ZeroExConfig};
use crate::error::{AppError, AppResult};

const QUOTE_FAILED: &str = "Failed to fetch quote";

/// 0x Swap API, permit2 quotes.
#[derive(Clone)]
pub struct ZeroExClient {
    client: Client,
    api_url: String,
    api_version: String,
    api_key: Option<String>,
}

impl ZeroExClient {
    pub fn new(config: &ZeroExConfig) -> AppResult<Self> {
        tracing::debug!(api_key = %key_preview(&config.api_key), "Creating 0x client");
        Ok(Self {
            client: http_client()?,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            api_version: config.api_version.clone(),
            api_key: config.api_key.clone(),
        })
    }

    pub fn is_configured(&self) -> bool {
        credential(&self.api_key).is_some()
    }

    /// Forward `params` untouched and hand back the upstream JSON body.
    pub async fn get_quote(&self, params: &[(String, String)]) -> AppResult<Value> {
        let api_key =
            credential(&self.api_key).ok_or(AppError::CredentialNotConfigured("0x API key"))?;

        let start = Instant::now();
        let url = format!("{}/swap/permit2/quote", self.api_url);
        tracing::debug!(params = ?params, "Requesting quote from 0x");

        let response = self
            .client
            .get(&url)
            .query(params)
            .header("0x-api-key", api_key)
            .header("0x-version", &self.api_version)
            .send()
            .await
            .map_err(|e| AppError::upstream(QUOTE_FAILED, format!("0x request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::upstream(
                QUOTE_FAILED,
                format!("0x API error {}: {}", status, truncate(&body)),
            ));
        }

        let quote: Value = response.json().await.map_err(|e| {
            AppError::upstream(QUOTE_FAILED, format!("Failed to parse 0x response: {}", e))
        })?;

        tracing::info!(duration_ms = %start.elapsed().as_millis(), "Fetched quote from 0x");
        Ok(quote)
    }
}
