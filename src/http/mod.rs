//! HTTP transport, error classification and retry logic.

mod classify;
mod retry;
mod transport;

pub use classify::{DEFAULT_RETRY_AFTER_SECS, classify_response, classify_transport_error};
pub use retry::{
    DEFAULT_BASE_DELAY, DEFAULT_MAX_DELAY, DEFAULT_MAX_RETRIES, RetryPolicy, Sleeper,
    SystemSleeper, with_retry, with_retry_blocking,
};
pub use transport::{
    AsyncTransport, BlockingReqwestTransport, BlockingTransport, RawResponse, ReqwestTransport,
};

#[cfg(test)]
pub(crate) use transport::{MockAsyncTransport, MockBlockingTransport};
