pub mod dto;
pub mod handlers;

use axum::{routing::get, Router};

use crate::AppState;

pub fn create_router() -> Router<AppState> {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Credential-injecting proxies
        .route("/api/quote", get(handlers::get_quote))
        .route("/api/transactions", get(handlers::get_transactions))
}
