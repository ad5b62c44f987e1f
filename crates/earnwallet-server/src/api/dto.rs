use serde::{Deserialize, Serialize};

pub const DEFAULT_TRANSACTIONS_LIMIT: u32 = 10;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub zeroex: String,
    pub dune: String,
}

/// Both fields stay raw strings so a bad `limit` falls back instead of
/// rejecting the request.
#[derive(Debug, Default, Deserialize)]
pub struct TransactionsQuery {
    pub address: Option<String>,
    pub limit: Option<String>,
}

impl TransactionsQuery {
    pub fn address(&self) -> Option<&str> {
        self.address
            .as_deref()
            .map(str::trim)
            .filter(|a| !a.is_empty())
    }

    pub fn limit(&self) -> u32 {
        parse_limit(self.limit.as_deref())
    }
}

pub fn parse_limit(raw: Option<&str>) -> u32 {
    raw.and_then(|l| l.trim().parse::<u32>().ok())
        .filter(|&l| l > 0)
        .unwrap_or(DEFAULT_TRANSACTIONS_LIMIT)
}
