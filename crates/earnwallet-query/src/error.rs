use thiserror::Error;

/// Text every HTTP 4xx failure carries in its message. The retry policy keys
/// off this substring rather than the structured status.
pub const CLIENT_ERROR_MARKER: &str = "status: 4";

/// Failure of a single remote fetch.
///
/// Cloneable because one in-flight fetch is shared by every observer of its key.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RemoteFetchError {
    #[error("HTTP error! status: {status}, message: {message}")]
    Http { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Failed to parse response: {0}")]
    Parse(String),

    #[error("Invalid request parameters: {0}")]
    InvalidParams(String),
}

impl RemoteFetchError {
    pub fn status(&self) -> Option<u16> {
        match self {
            RemoteFetchError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_client_error(&self) -> bool {
        self.to_string().contains(CLIENT_ERROR_MARKER)
    }

    /// Server errors and network failures are worth another attempt.
    pub fn is_retriable(&self) -> bool {
        match self {
            RemoteFetchError::Http { .. } | RemoteFetchError::Parse(_) => !self.is_client_error(),
            RemoteFetchError::Network(_) => true,
            RemoteFetchError::InvalidParams(_) => false,
        }
    }
}

impl From<earnwallet_core::CoreError> for RemoteFetchError {
    fn from(err: earnwallet_core::CoreError) -> Self {
        RemoteFetchError::InvalidParams(err.to_string())
    }
}

pub type FetchResult<T> = std::result::Result<T, RemoteFetchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_message_carries_status() {
        let err = RemoteFetchError::Http {
            status: 404,
            message: "Not Found".into(),
        };
        assert_eq!(err.to_string(), "HTTP error! status: 404, message: Not Found");
        assert!(err.is_client_error());
        assert!(!err.is_retriable());
        assert_eq!(err.status(), Some(404));
    }

    #[test]
    fn test_server_and_network_errors_are_retriable() {
        let server = RemoteFetchError::Http {
            status: 503,
            message: "unavailable".into(),
        };
        assert!(!server.is_client_error());
        assert!(server.is_retriable());

        let network = RemoteFetchError::Network("connection refused".into());
        assert!(network.is_retriable());
        assert_eq!(network.status(), None);
    }
}
