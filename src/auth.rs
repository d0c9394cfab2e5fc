//! API key handling.

use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use std::fmt;

use crate::error::{Result, SerpshotError};

/// Header carrying the API key.
pub const API_KEY_HEADER: &str = "x-api-key";

const MIN_KEY_LEN: usize = 10;

/// A trimmed, non-empty SerpShot API key.
///
/// The `Debug` output is redacted so keys do not end up in logs.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    /// Trims `key`; blank keys are an authentication error.
    pub fn new(key: impl AsRef<str>) -> Result<Self> {
        let key = key.as_ref().trim();
        if key.is_empty() {
            return Err(SerpshotError::Authentication(
                "API key is required".to_string(),
            ));
        }
        Ok(Self(key.to_string()))
    }

    /// The raw key. Never log it.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Rejects keys that are obviously too short to be real.
    pub fn validate_format(&self) -> Result<()> {
        if self.0.len() < MIN_KEY_LEN {
            return Err(SerpshotError::Authentication(
                "API key appears to be invalid".to_string(),
            ));
        }
        Ok(())
    }

    /// Default headers for every request.
    pub fn headers(&self) -> Result<HeaderMap> {
        let mut value = HeaderValue::from_str(&self.0).map_err(|_| {
            SerpshotError::Authentication("API key contains invalid characters".to_string())
        })?;
        value.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(HeaderName::from_static(API_KEY_HEADER), value);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        Ok(headers)
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let visible: String = self.0.chars().take(4).collect();
        write!(f, "ApiKey({}***)", visible)
    }
}
