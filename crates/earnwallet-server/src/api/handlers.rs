use axum::{
    extract::{Query, State},
    Json,
};
use serde_json::Value;
use std::time::Instant;

use super::dto::*;
use crate::error::{AppError, AppResult};
use crate::upstream::{transaction_count, TransactionsParams};
use crate::AppState;

fn configured(yes: bool) -> String {
    let status = if yes { "configured" } else { "missing" };
    status.to_string()
}

pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    tracing::debug!("Processing health check request");
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        zeroex: configured(state.zeroex.is_configured()),
        dune: configured(state.dune.is_configured()),
    })
}

/// Swap quote pass-through. Parameters are forwarded as received.
pub async fn get_quote(
    State(state): State<AppState>,
    Query(params): Query<Vec<(String, String)>>,
) -> AppResult<Json<Value>> {
    let start = Instant::now();
    println!("[REQUEST] GET /api/quote ({} params)", params.len());
    tracing::info!(params = %params.len(), "Processing quote request");

    let quote = state.zeroex.get_quote(&params).await?;

    let duration = start.elapsed().as_millis();
    println!("[RESPONSE] GET /api/quote -> 200 OK ({}ms)", duration);
    tracing::info!(duration_ms = %duration, "Quote request completed");

    Ok(Json(quote))
}

pub async fn get_transactions(
    State(state): State<AppState>,
    Query(query): Query<TransactionsQuery>,
) -> AppResult<Json<Value>> {
    let start = Instant::now();

    let Some(address) = query.address() else {
        println!("[RESPONSE] GET /api/transactions -> 400 Bad Request (no address)");
        return Err(AppError::MissingParam("Address is required".to_string()));
    };
    let limit = query.limit();
    println!("[REQUEST] GET /api/transactions?address={}&limit={}", address, limit);
    tracing::info!(address = %address, limit = %limit, "Processing transactions request");

    let params = TransactionsParams {
        log_address: address.to_string(),
        limit,
        decode: true,
    };
    let transactions = state
        .dune
        .get_transactions(&state.config.dune.contract_address, &params)
        .await?;

    let duration = start.elapsed().as_millis();
    let count = transaction_count(&transactions);
    println!(
        "[RESPONSE] GET /api/transactions -> 200 OK ({}ms) count={}",
        duration, count
    );
    tracing::info!(
        address = %address,
        duration_ms = %duration,
        count = %count,
        "Transactions request completed"
    );

    Ok(Json(transactions))
}
