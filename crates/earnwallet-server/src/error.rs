use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Errors returned by the proxy routes.
///
/// The client only ever sees the short `{ "error": ... }` envelope; upstream
/// detail stays in the server log.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    MissingParam(String),

    #[error("{0} not configured")]
    CredentialNotConfigured(&'static str),

    #[error("{context}: {detail}")]
    Upstream {
        context: &'static str,
        detail: String,
    },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn upstream(context: &'static str, detail: impl Into<String>) -> Self {
        AppError::Upstream {
            context,
            detail: detail.into(),
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::MissingParam(msg) => {
                tracing::warn!(message = %msg, error_code = "MISSING_PARAM", "Missing parameter");
                (StatusCode::BAD_REQUEST, "MISSING_PARAM", msg.clone())
            }
            AppError::CredentialNotConfigured(name) => {
                tracing::error!(credential = %name, error_code = "CREDENTIAL_NOT_CONFIGURED", "Credential not configured");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "CREDENTIAL_NOT_CONFIGURED",
                    self.to_string(),
                )
            }
            AppError::Upstream { context, detail } => {
                tracing::error!(detail = %detail, error_code = "UPSTREAM_ERROR", "{}", context);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "UPSTREAM_ERROR",
                    context.to_string(),
                )
            }
            AppError::Internal(msg) => {
                tracing::error!(message = %msg, error_code = "INTERNAL_ERROR", "Internal error occurred");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "Internal server error".to_string(),
                )
            }
        };

        tracing::debug!(
            status_code = %status.as_u16(),
            error_code = %code,
            "Returning error response"
        );

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
