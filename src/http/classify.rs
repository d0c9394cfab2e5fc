//! Maps HTTP outcomes onto [`SerpshotError`] variants.

use log::debug;
use reqwest::StatusCode;
use serde_json::Value;

use super::transport::RawResponse;
use crate::error::{Result, SerpshotError};

/// Retry-After fallback, in seconds, when a 429 does not carry a usable hint.
pub const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

/// Returns the body of a 2xx response, or the error the status maps to.
///
/// | Status | Error | Retryable |
/// |---|---|---|
/// | 401 | `Authentication` | no |
/// | 402, 403 with a credits payload | `InsufficientCredits` | no |
/// | 429 | `RateLimit` | yes |
/// | 5xx | `Api` | yes |
/// | other | `Api` | no |
pub fn classify_response(response: RawResponse) -> Result<String> {
    let RawResponse {
        status,
        retry_after,
        body,
    } = response;

    let status = StatusCode::from_u16(status).map_err(|_| SerpshotError::Api {
        status,
        message: format!("invalid HTTP status {}", status),
        body: None,
    })?;

    if status.is_success() {
        return Ok(body);
    }

    let json: Option<Value> = serde_json::from_str(&body).ok();
    let message = error_message(json.as_ref(), status);
    debug!("HTTP {} from SerpShot: {}", status.as_u16(), message);

    let error = match status {
        StatusCode::UNAUTHORIZED => SerpshotError::Authentication(message),
        StatusCode::PAYMENT_REQUIRED => insufficient_credits(message, json.as_ref()),
        StatusCode::FORBIDDEN if mentions_credits(&body) => {
            insufficient_credits(message, json.as_ref())
        }
        StatusCode::TOO_MANY_REQUESTS => {
            let retry_after = retry_after
                .as_deref()
                .and_then(|v| v.trim().parse::<u64>().ok())
                .unwrap_or(DEFAULT_RETRY_AFTER_SECS);
            SerpshotError::RateLimit {
                message: format!("{}. Retry after {} seconds", message, retry_after),
                retry_after: Some(retry_after),
            }
        }
        s => SerpshotError::Api {
            status: s.as_u16(),
            message,
            body: json,
        },
    };

    Err(error)
}

/// Classifies a failure that happened before a status line was received.
pub fn classify_transport_error(error: reqwest::Error) -> SerpshotError {
    let message = if error.is_timeout() {
        "request timed out".to_string()
    } else if error.is_connect() {
        "failed to connect".to_string()
    } else if error.is_body() || error.is_decode() {
        "failed to read response body".to_string()
    } else {
        "request failed".to_string()
    };
    SerpshotError::network(message, error)
}

fn error_message(json: Option<&Value>, status: StatusCode) -> String {
    json.and_then(|v| {
        ["error", "message", "msg"]
            .iter()
            .find_map(|key| v.get(key).and_then(Value::as_str))
    })
    .map(str::to_string)
    .unwrap_or_else(|| format!("HTTP {}", status.as_u16()))
}

fn mentions_credits(body: &str) -> bool {
    body.to_ascii_lowercase().contains("credit")
}

fn insufficient_credits(message: String, json: Option<&Value>) -> SerpshotError {
    SerpshotError::InsufficientCredits {
        message,
        credits_required: find_u64(json, &["credits_required", "required_credits", "required"]),
        credits_available: find_u64(
            json,
            &["credits_available", "available_credits", "balance"],
        ),
    }
}

/// Looks for a numeric field at the top level or under `details`.
fn find_u64(json: Option<&Value>, keys: &[&str]) -> Option<u64> {
    let json = json?;
    [Some(json), json.get("details")]
        .into_iter()
        .flatten()
        .find_map(|scope| keys.iter().find_map(|key| scope.get(key)?.as_u64()))
}
