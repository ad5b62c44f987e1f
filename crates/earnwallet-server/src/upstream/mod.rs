//! Clients for the upstream APIs the proxy routes forward to.

pub mod dune;
pub mod zeroex;

pub use dune::{transaction_count, DuneClient, TransactionsParams};
pub use zeroex::ZeroExClient;

use std::time::Duration;

use crate::error::{AppError, AppResult};

const UPSTREAM_TIMEOUT: Duration = Duration::from_secs(30);

/// Longest slice of an upstream error body written to the log.
const MAX_LOGGED_BODY: usize = 500;

fn http_client() -> AppResult<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(UPSTREAM_TIMEOUT)
        .build()
        .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {}", e)))
}

fn truncate(body: &str) -> &str {
    match body.char_indices().nth(MAX_LOGGED_BODY) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}
