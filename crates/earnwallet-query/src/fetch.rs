//! Remote fetch functions, one per data kind.
//!
//! Activity and token info go straight to the Dune Sim JSON API; swap quotes
//! and transactions go through the same-origin proxy routes so the upstream
//! credentials stay on the server. No retries happen here.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::{Duration, Instant};

use earnwallet_core::{
    resolve_token, to_base_units, ActivityResponse, DuneTransactionResponse, QuoteResponse,
    TokenInfoResponse, BASE_CHAIN_ID,
};

use crate::error::{FetchResult, RemoteFetchError};
use crate::query::{ActivityQuery, SwapQuoteQuery, TokenInfoQuery};

/// Longest slice of an error body kept in a [`RemoteFetchError`] message.
const MAX_ERROR_BODY: usize = 200;

#[async_trait]
pub trait RemoteFetch: Send + Sync {
    async fn fetch_activity(&self, query: &ActivityQuery) -> FetchResult<ActivityResponse>;

    async fn fetch_swap_quote(&self, query: &SwapQuoteQuery) -> FetchResult<QuoteResponse>;

    async fn fetch_token_info(&self, query: &TokenInfoQuery) -> FetchResult<TokenInfoResponse>;

    async fn fetch_transactions(
        &self,
        address: &str,
        limit: Option<u32>,
    ) -> FetchResult<DuneTransactionResponse>;
}

/// Where the fetchers send their requests.
#[derive(Debug, Clone, Deserialize)]
pub struct FetcherConfig {
    /// Origin serving `/api/quote` and `/api/transactions`
    #[serde(default = "default_app_url")]
    pub app_url: String,
    #[serde(default = "default_sim_api_url")]
    pub sim_api_url: String,
    /// Public Dune Sim key, sent as `X-Sim-Api-Key` when present
    #[serde(default)]
    pub sim_api_key: Option<String>,
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            app_url: default_app_url(),
            sim_api_url: default_sim_api_url(),
            sim_api_key: None,
            timeout_seconds: default_timeout(),
        }
    }
}

fn default_app_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_sim_api_url() -> String {
    "https://api.sim.dune.com".to_string()
}

fn default_timeout() -> u64 {
    30
}

pub struct HttpFetcher {
    client: Client,
    config: FetcherConfig,
}

impl HttpFetcher {
    pub fn new(config: FetcherConfig) -> FetchResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| RemoteFetchError::Network(format!("Failed to create HTTP client: {}", e)))?;

        tracing::debug!(
            app_url = %config.app_url,
            sim_api_url = %config.sim_api_url,
            "Creating HTTP fetcher"
        );

        Ok(Self { client, config })
    }

    fn app_url(&self, path: &str) -> String {
        format!("{}{}", self.config.app_url.trim_end_matches('/'), path)
    }

    /// GET on the Sim API. Each segment is percent-encoded, so a caller
    /// supplied address cannot reshape the path or add a query string.
    fn sim_request(&self, segments: &[&str]) -> FetchResult<RequestBuilder> {
        let mut url = Url::parse(&self.config.sim_api_url).map_err(|e| {
            RemoteFetchError::InvalidParams(format!("Invalid Sim API url: {}", e))
        })?;
        url.path_segments_mut()
            .map_err(|_| RemoteFetchError::InvalidParams("Sim API url cannot have a path".into()))?
            .pop_if_empty()
            .extend(segments);

        let mut request = self.client.get(url);
        if let Some(key) = &self.config.sim_api_key {
            request = request.header("X-Sim-Api-Key", key);
        }
        Ok(request)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        label: &str,
    ) -> FetchResult<T> {
        let start = Instant::now();
        let response = request.send().await.map_err(|e| {
            tracing::warn!(error = %e, fetch = %label, "Request failed");
            RemoteFetchError::Network(e.to_string())
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = error_message(&body, status.canonical_reason().unwrap_or("Unknown"));
            tracing::warn!(
                status = %status.as_u16(),
                fetch = %label,
                message = %message,
                "Remote fetch returned an error status"
            );
            return Err(RemoteFetchError::Http {
                status: status.as_u16(),
                message,
            });
        }

        let data = response.json::<T>().await.map_err(|e| {
            tracing::warn!(error = %e, fetch = %label, "Failed to parse response");
            RemoteFetchError::Parse(e.to_string())
        })?;

        tracing::debug!(
            fetch = %label,
            duration_ms = %start.elapsed().as_millis(),
            "Remote fetch completed"
        );
        Ok(data)
    }
}

#[async_trait]
impl RemoteFetch for HttpFetcher {
    async fn fetch_activity(&self, query: &ActivityQuery) -> FetchResult<ActivityResponse> {
        let mut request = self.sim_request(&["v1", "evm", "activity", &query.address])?;
        if let Some(chain_ids) = &query.chain_ids {
            request = request.query(&[("chain_ids", chain_ids)]);
        }
        self.get_json(request, "activity").await
    }

    async fn fetch_swap_quote(&self, query: &SwapQuoteQuery) -> FetchResult<QuoteResponse> {
        let sell = resolve_token(&query.sell_token)?;
        let buy = resolve_token(&query.buy_token)?;
        let sell_amount = to_base_units(&query.sell_amount, sell.decimals)?;

        let request = self.client.get(self.app_url("/api/quote")).query(&[
            ("chainId", BASE_CHAIN_ID.to_string()),
            ("sellToken", sell.address.to_string()),
            ("buyToken", buy.address.to_string()),
            ("sellAmount", sell_amount),
            ("taker", query.taker.clone()),
        ]);
        self.get_json(request, "swap-quote").await
    }

    async fn fetch_token_info(&self, query: &TokenInfoQuery) -> FetchResult<TokenInfoResponse> {
        let mut request =
            self.sim_request(&["v1", "evm", "token-info", &query.contract_address])?;
        if let Some(chain_ids) = &query.chain_ids {
            request = request.query(&[("chain_ids", chain_ids)]);
        }
        self.get_json(request, "token-info").await
    }

    async fn fetch_transactions(
        &self,
        address: &str,
        limit: Option<u32>,
    ) -> FetchResult<DuneTransactionResponse> {
        let mut request = self
            .client
            .get(self.app_url("/api/transactions"))
            .query(&[("address", address)]);
        if let Some(limit) = limit {
            request = request.query(&[("limit", limit)]);
        }
        self.get_json(request, "transactions").await
    }
}

/// Pull a readable message out of an error body: the `error` or `message`
/// field of a JSON body, otherwise the (truncated) text itself.
fn error_message(body: &str, fallback: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        for field in ["error", "message", "reason"] {
            if let Some(text) = value.get(field).and_then(|v| v.as_str()) {
                return text.to_string();
            }
        }
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        return fallback.to_string();
    }
    trimmed.chars().take(MAX_ERROR_BODY).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{extract::Query, http::StatusCode, routing::get, Json, Router};
    use serde_json::json;
    use std::collections::HashMap;
    use tokio_test::{assert_err, assert_ok};

    async fn spawn_upstream(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn fetcher_for(base: &str) -> HttpFetcher {
        HttpFetcher::new(FetcherConfig {
            app_url: base.to_string(),
            sim_api_url: base.to_string(),
            sim_api_key: Some("sim-key".to_string()),
            timeout_seconds: 5,
        })
        .unwrap()
    }

    #[test]
    fn test_error_message_prefers_json_fields() {
        assert_eq!(error_message(r#"{"error":"Address is required"}"#, "Bad Request"), "Address is required");
        assert_eq!(error_message(r#"{"message":"rate limited"}"#, "x"), "rate limited");
        assert_eq!(error_message("plain text", "x"), "plain text");
        assert_eq!(error_message("", "Not Found"), "Not Found");
        assert_eq!(error_message(&"a".repeat(500), "x").len(), MAX_ERROR_BODY);
    }

    #[tokio::test]
    async fn test_activity_success_sends_key_and_chain_ids() {
        let router = Router::new().route(
            "/v1/evm/activity/{address}",
            get(
                |axum::extract::Path(address): axum::extract::Path<String>,
                 headers: axum::http::HeaderMap,
                 Query(params): Query<HashMap<String, String>>| async move {
                    assert_eq!(headers["x-sim-api-key"], "sim-key");
                    Json(json!({
                        "activity": [{
                            "chain_id": 8453,
                            "type": "receive",
                            "tx_hash": format!("0x{}", address),
                            "value": params.get("chain_ids").cloned().unwrap_or_default()
                        }]
                    }))
                },
            ),
        );
        let base = spawn_upstream(router).await;
        let fetcher = fetcher_for(&base);

        let result = fetcher
            .fetch_activity(&ActivityQuery::new("abc").with_chain_ids("8453"))
            .await;
        let activity = assert_ok!(result);
        assert_eq!(activity.activity.len(), 1);
        assert_eq!(activity.activity[0].tx_hash, "0xabc");
        assert_eq!(activity.activity[0].value.as_deref(), Some("8453"));
    }

    #[tokio::test]
    async fn test_client_error_message_contains_status() {
        let router = Router::new().route(
            "/v1/evm/token-info/{address}",
            get(|| async { (StatusCode::NOT_FOUND, Json(json!({"error": "token not found"}))) }),
        );
        let base = spawn_upstream(router).await;
        let fetcher = fetcher_for(&base);

        let err = assert_err!(fetcher.fetch_token_info(&TokenInfoQuery::new("0xdef")).await);
        assert_eq!(err.status(), Some(404));
        assert!(err.to_string().contains("status: 404"));
        assert!(err.is_client_error());
        assert!(err.to_string().contains("token not found"));
    }

    #[tokio::test]
    async fn test_server_error_is_not_client_error() {
        let router = Router::new().route(
            "/api/transactions",
            get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"error": "Failed to fetch transactions"}))) }),
        );
        let base = spawn_upstream(router).await;
        let fetcher = fetcher_for(&base);

        let err = assert_err!(fetcher.fetch_transactions("0xabc", Some(5)).await);
        assert_eq!(err.status(), Some(500));
        assert!(!err.is_client_error());
        assert!(err.is_retriable());
    }

    #[tokio::test]
    async fn test_swap_quote_resolves_symbols_and_units() {
        let router = Router::new().route(
            "/api/quote",
            get(|Query(params): Query<HashMap<String, String>>| async move {
                Json(json!({
                    "liquidityAvailable": true,
                    "sellToken": params["sellToken"],
                    "buyToken": params["buyToken"],
                    "sellAmount": params["sellAmount"],
                    "chainId": params["chainId"],
                    "taker": params["taker"],
                }))
            }),
        );
        let base = spawn_upstream(router).await;
        let fetcher = fetcher_for(&base);

        let quote = assert_ok!(
            fetcher
                .fetch_swap_quote(&SwapQuoteQuery::new("USDC", "WETH", "10", "0xabc"))
                .await
        );
        assert_eq!(quote.sell_amount.as_deref(), Some("10000000"));
        assert_eq!(
            quote.sell_token.as_deref(),
            Some("0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913")
        );
        assert_eq!(quote.extra["chainId"], json!("8453"));
        assert_eq!(quote.extra["taker"], json!("0xabc"));
    }

    #[tokio::test]
    async fn test_swap_quote_unknown_token_never_hits_network() {
        let fetcher = fetcher_for("http://127.0.0.1:9");
        let err = assert_err!(
            fetcher
                .fetch_swap_quote(&SwapQuoteQuery::new("DOGE", "WETH", "10", "0xabc"))
                .await
        );
        assert!(matches!(err, RemoteFetchError::InvalidParams(_)));
        assert!(err.to_string().contains("Unknown token symbol: DOGE"));
        assert!(!err.is_retriable());
    }

    #[tokio::test]
    async fn test_address_cannot_escape_its_path_segment() {
        let router = Router::new()
            .route(
                "/v1/evm/activity/{address}",
                get(|axum::extract::Path(address): axum::extract::Path<String>| async move {
                    Json(json!({"activity": [{"tx_hash": address}]}))
                }),
            )
            .route(
                "/v1/evm/token-info/{address}",
                get(|| async { Json(json!({"activity": [{"tx_hash": "wrong route"}]})) }),
            );
        let base = spawn_upstream(router).await;
        let fetcher = fetcher_for(&base);

        let hostile = "0xabc/../../token-info/0xdef?chain_ids=1#x";
        let activity = assert_ok!(fetcher.fetch_activity(&ActivityQuery::new(hostile)).await);
        assert_eq!(activity.activity[0].tx_hash, hostile);
    }

    #[tokio::test]
    async fn test_unreachable_host_is_network_error() {
        let fetcher = fetcher_for("http://127.0.0.1:9");
        let err = assert_err!(fetcher.fetch_transactions("0xabc", None).await);
        assert!(matches!(err, RemoteFetchError::Network(_)));
        assert!(err.is_retriable());
    }
}
