//! Error type shared by both client facades.

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T, E = SerpshotError> = std::result::Result<T, E>;

/// Everything that can go wrong while talking to the SerpShot API.
#[derive(Debug, Error)]
pub enum SerpshotError {
    /// Request parameters were rejected before anything was sent.
    #[error("Invalid request: {message}")]
    Validation {
        message: String,
        /// Name of the offending parameter, when there is one.
        field: Option<&'static str>,
    },

    /// The API key is missing, empty or was rejected upstream (HTTP 401).
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// The account does not have enough credits (HTTP 402, or 403 with a credits payload).
    #[error("Insufficient credits: {message}")]
    InsufficientCredits {
        message: String,
        credits_required: Option<u64>,
        credits_available: Option<u64>,
    },

    /// Too many requests (HTTP 429).
    #[error("Rate limit exceeded: {message}")]
    RateLimit {
        message: String,
        /// Seconds the server asked us to wait, from `Retry-After`.
        retry_after: Option<u64>,
    },

    /// Any other non-2xx answer, or an error envelope inside a 2xx body.
    #[error("API error (HTTP {status}): {message}")]
    Api {
        status: u16,
        message: String,
        body: Option<serde_json::Value>,
    },

    /// Connection, DNS or timeout failure.
    #[error("Network error: {message}")]
    Network {
        message: String,
        #[source]
        source: Option<reqwest::Error>,
    },

    /// A 2xx body that could not be turned into a `SearchResponse`.
    #[error("Invalid response from SerpShot: {0}")]
    Decode(String),

    /// The caller cancelled the call at a suspension point.
    #[error("Request was cancelled")]
    Cancelled,

    /// The client was used after `close()`.
    #[error("Client is closed")]
    Closed,
}

impl SerpshotError {
    pub(crate) fn validation(field: &'static str, message: impl Into<String>) -> Self {
        SerpshotError::Validation {
            message: message.into(),
            field: Some(field),
        }
    }

    pub(crate) fn network(message: impl Into<String>, source: reqwest::Error) -> Self {
        SerpshotError::Network {
            message: message.into(),
            source: Some(source),
        }
    }

    /// Whether a failed attempt may succeed if sent again.
    pub fn is_retryable(&self) -> bool {
        match self {
            SerpshotError::RateLimit { .. } => true,
            SerpshotError::Network { .. } => true,
            SerpshotError::Api { status, .. } => *status >= 500,
            SerpshotError::Validation { .. }
            | SerpshotError::Authentication(_)
            | SerpshotError::InsufficientCredits { .. }
            | SerpshotError::Decode(_)
            | SerpshotError::Cancelled
            | SerpshotError::Closed => false,
        }
    }

    /// HTTP-equivalent status code for the error, if it has one.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            SerpshotError::Validation { .. } => Some(400),
            SerpshotError::Authentication(_) => Some(401),
            SerpshotError::InsufficientCredits { .. } => Some(402),
            SerpshotError::RateLimit { .. } => Some(429),
            SerpshotError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}
