//! Blocking client.
//!
//! Same surface as the async [`SerpshotClient`](crate::SerpshotClient)
//! without cancellation. Every call runs on the calling thread, and backoff
//! delays block that thread. Do not use it from inside an async runtime.

use log::debug;
use std::sync::{Arc, PoisonError, RwLock};

use crate::client::{SEARCH_PATH, single};
use crate::config::{BatchStrategy, ClientConfig};
use crate::error::{Result, SerpshotError};
use crate::http::{
    BlockingReqwestTransport, BlockingTransport, Sleeper, SystemSleeper, classify_response,
    with_retry_blocking,
};
use crate::request::SearchRequest;
use crate::response::{SearchResponse, assemble_batch, parse_search_body};
use crate::types::SearchType;

/// Blocking SerpShot client.
///
/// ```no_run
/// use serpshot::blocking::SerpshotClient;
///
/// let client = SerpshotClient::from_env()?;
/// let responses = client.search_batch(["Python", "JavaScript", "Rust"])?;
/// for response in &responses {
///     println!("{}: {} results", response.query(), response.results().len());
/// }
/// # Ok::<(), serpshot::SerpshotError>(())
/// ```
#[derive(Clone)]
pub struct SerpshotClient {
    inner: Arc<Inner>,
}

struct Inner {
    config: ClientConfig,
    transport: RwLock<Option<Arc<dyn BlockingTransport>>>,
    sleeper: Arc<dyn Sleeper>,
}

impl SerpshotClient {
    /// Creates a client with a blocking `reqwest` transport.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let transport = BlockingReqwestTransport::new(&config)?;
        Ok(Self::with_transport(
            config,
            Arc::new(transport),
            Arc::new(SystemSleeper),
        ))
    }

    /// Creates a client with default settings and the API key taken from
    /// `SERPSHOT_API_KEY`.
    pub fn from_env() -> Result<Self> {
        Self::new(ClientConfig::from_env()?)
    }

    /// Creates a client over a custom transport and sleeper.
    pub fn with_transport(
        config: ClientConfig,
        transport: Arc<dyn BlockingTransport>,
        sleeper: Arc<dyn Sleeper>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                transport: RwLock::new(Some(transport)),
                sleeper,
            }),
        }
    }

    /// Settings this client was built with.
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// Web search for one query with default parameters.
    pub fn search(&self, query: impl Into<String>) -> Result<SearchResponse> {
        single(self.execute(&SearchRequest::new(query))?)
    }

    /// Web search for several queries; responses follow input order.
    pub fn search_batch<I, S>(&self, queries: I) -> Result<Vec<SearchResponse>>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.execute(&SearchRequest::batch(queries))
    }

    /// Image search for one query with default parameters.
    pub fn image_search(&self, query: impl Into<String>) -> Result<SearchResponse> {
        let request = SearchRequest::new(query).with_search_type(SearchType::Image);
        single(self.execute(&request)?)
    }

    /// Image search for several queries; responses follow input order.
    pub fn image_search_batch<I, S>(&self, queries: I) -> Result<Vec<SearchResponse>>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.execute(&SearchRequest::batch(queries).with_search_type(SearchType::Image))
    }

    /// Runs a fully specified request. Fan-out batches are sent one query
    /// at a time.
    #[tracing::instrument(skip(self, request), fields(queries = request.queries().len()))]
    pub fn execute(&self, request: &SearchRequest) -> Result<Vec<SearchResponse>> {
        let transport = self.transport()?;
        request.validate()?;

        match self.inner.config.batch_strategy() {
            BatchStrategy::FanOut { .. } if request.queries().len() > 1 => {
                debug!("Sending {} queries one by one", request.queries().len());
                request
                    .split()
                    .iter()
                    .map(|part| single(self.send(transport.as_ref(), part)?))
                    .collect()
            }
            _ => self.send(transport.as_ref(), request),
        }
    }

    /// Releases the connection pool; later calls fail with
    /// [`SerpshotError::Closed`].
    pub fn close(&self) {
        let mut transport = self
            .inner
            .transport
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if transport.take().is_some() {
            debug!("SerpShot client closed");
        }
    }

    /// Whether [`close`](Self::close) has been called on any clone.
    pub fn is_closed(&self) -> bool {
        self.inner
            .transport
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }

    fn transport(&self) -> Result<Arc<dyn BlockingTransport>> {
        self.inner
            .transport
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(SerpshotError::Closed)
    }

    fn send(
        &self,
        transport: &dyn BlockingTransport,
        request: &SearchRequest,
    ) -> Result<Vec<SearchResponse>> {
        let payload = request.to_payload()?;

        debug!(
            "Searching {} quer{} ({})...",
            request.queries().len(),
            if request.queries().len() == 1 { "y" } else { "ies" },
            request.search_type()
        );

        let body = with_retry_blocking(
            self.inner.config.retry_policy(),
            self.inner.sleeper.as_ref(),
            "Searching",
            || {
                transport
                    .post_json(SEARCH_PATH, &payload)
                    .and_then(classify_response)
            },
        )?;

        let responses = parse_search_body(&body, request.search_type())?;
        assemble_batch(responses, request.queries())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{MockBlockingTransport, RawResponse};
    use crate::test_utils::{RecordingSleeper, search_item};
    use serde_json::{Value, json};
    use std::time::Duration;

    fn client_with(
        transport: MockBlockingTransport,
        sleeper: RecordingSleeper,
        batch: BatchStrategy,
    ) -> SerpshotClient {
        let config = ClientConfig::builder()
            .api_key("test-key-12345")
            .base_delay(Duration::from_millis(50))
            .batch_strategy(batch)
            .build()
            .unwrap();
        SerpshotClient::with_transport(config, Arc::new(transport), Arc::new(sleeper))
    }

    fn ok(body: Value) -> Result<RawResponse> {
        Ok(RawResponse {
            status: 200,
            retry_after: None,
            body: body.to_string(),
        })
    }

    #[test]
    fn test_search() {
        let mut transport = MockBlockingTransport::new();
        transport
            .expect_post_json()
            .withf(|path, body| path == SEARCH_PATH && body["num"] == 10 && body["gl"] == "us")
            .times(1)
            .returning(|_, _| ok(search_item("rust")));
        let client = client_with(transport, RecordingSleeper::default(), BatchStrategy::Combined);

        let response = client.search("rust").unwrap();
        assert_eq!(response.query(), "rust");
    }

    #[test]
    fn test_execute_sends_custom_parameters() {
        let mut transport = MockBlockingTransport::new();
        transport
            .expect_post_json()
            .withf(|_, body| {
                body["num"] == 20 && body["page"] == 2 && body["location"] == "GB"
            })
            .times(1)
            .returning(|_, _| ok(search_item("rust")));
        let client = client_with(transport, RecordingSleeper::default(), BatchStrategy::Combined);

        let request = SearchRequest::new("rust")
            .with_num(20)
            .with_page(2)
            .with_location(crate::LocationType::GB);
        let responses = client.execute(&request).unwrap();
        assert_eq!(responses.len(), 1);
    }

    #[test]
    fn test_validation_error_makes_no_calls() {
        let mut transport = MockBlockingTransport::new();
        transport.expect_post_json().never();
        let client = client_with(transport, RecordingSleeper::default(), BatchStrategy::Combined);

        let err = client.search("").unwrap_err();
        assert!(matches!(err, SerpshotError::Validation { .. }));
    }

    #[test]
    fn test_server_errors_are_retried_with_backoff() {
        let mut transport = MockBlockingTransport::new();
        let mut seq = mockall::Sequence::new();
        transport
            .expect_post_json()
            .times(2)
            .in_sequence(&mut seq)
            .returning(|_, _| {
                Ok(RawResponse {
                    status: 502,
                    retry_after: None,
                    body: "bad gateway".to_string(),
                })
            });
        transport
            .expect_post_json()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| ok(search_item("rust")));
        let sleeper = RecordingSleeper::default();
        let client = client_with(transport, sleeper.clone(), BatchStrategy::Combined);

        client.search("rust").unwrap();
        assert_eq!(
            sleeper.recorded(),
            vec![Duration::from_millis(50), Duration::from_millis(100)]
        );
    }

    #[test]
    fn test_insufficient_credits_is_terminal() {
        let mut transport = MockBlockingTransport::new();
        transport.expect_post_json().times(1).returning(|_, _| {
            Ok(RawResponse {
                status: 402,
                retry_after: None,
                body: json!({"message": "Out of credits", "credits_required": 2, "credits_available": 0})
                    .to_string(),
            })
        });
        let client = client_with(transport, RecordingSleeper::default(), BatchStrategy::Combined);

        let err = client.search("rust").unwrap_err();
        assert!(matches!(
            err,
            SerpshotError::InsufficientCredits {
                credits_required: Some(2),
                credits_available: Some(0),
                ..
            }
        ));
    }

    #[test]
    fn test_fan_out_is_sequential_and_ordered() {
        let mut transport = MockBlockingTransport::new();
        let mut seq = mockall::Sequence::new();
        for query in ["a", "b", "c"] {
            transport
                .expect_post_json()
                .withf(move |_, body| body["queries"] == json!([query]))
                .times(1)
                .in_sequence(&mut seq)
                .returning(move |_, _| ok(search_item(query)));
        }
        let client = client_with(
            transport,
            RecordingSleeper::default(),
            BatchStrategy::FanOut { concurrency: 4 },
        );

        let responses = client.search_batch(["a", "b", "c"]).unwrap();
        let order: Vec<&str> = responses.iter().map(|r| r.query()).collect();
        assert_eq!(order, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_close() {
        let mut transport = MockBlockingTransport::new();
        transport.expect_post_json().never();
        let client = client_with(transport, RecordingSleeper::default(), BatchStrategy::Combined);

        client.close();

        assert!(client.is_closed());
        assert!(matches!(client.search("rust"), Err(SerpshotError::Closed)));
    }
}
