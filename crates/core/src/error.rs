//! Error types shared by venue adapters and data manager implementations.

use thiserror::Error;

/// Errors surfaced by a [`crate::traits::VenueAdapter`] or
/// [`crate::traits::DataManager`] call.
#[derive(Debug, Error)]
pub enum VenueError {
    #[error("network error: {0}")]
    Network(String),

    #[error("request timeout: {0}")]
    Timeout(String),

    #[error("rate limit exceeded, retry after {retry_after_secs}s")]
    RateLimit { retry_after_secs: u64 },

    #[error("API error: {status_code} - {message}")]
    Api { status_code: u16, message: String },

    #[error("invalid order: {0}")]
    InvalidOrder(String),

    #[error("order rejected: {0}")]
    OrderRejected(String),

    #[error("unsupported operation: {0}")]
    Unsupported(String),

    #[error("snapshot invalid for symbol")]
    InvalidSnapshot,

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl VenueError {
    #[must_use]
    pub fn api(status_code: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status_code,
            message: message.into(),
        }
    }

    /// Transient errors are retried next cycle rather than aborting it.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Network(_) | Self::Timeout(_) | Self::RateLimit { .. } => true,
            Self::Api { status_code, .. } => *status_code >= 500,
            _ => false,
        }
    }
}

impl From<serde_json::Error> for VenueError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, VenueError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_over_500_is_transient() {
        let err = VenueError::api(503, "unavailable");
        assert!(err.is_transient());
    }

    #[test]
    fn api_error_under_500_is_not_transient() {
        let err = VenueError::api(400, "bad request");
        assert!(!err.is_transient());
    }

    #[test]
    fn network_and_timeout_are_transient() {
        assert!(VenueError::Network("x".into()).is_transient());
        assert!(VenueError::Timeout("x".into()).is_transient());
        assert!(VenueError::RateLimit { retry_after_secs: 1 }.is_transient());
    }

    #[test]
    fn invalid_order_is_not_transient() {
        assert!(!VenueError::InvalidOrder("bad size".into()).is_transient());
    }
}
