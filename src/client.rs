//! Async client.

use futures_util::{StreamExt, TryStreamExt, stream};
use log::debug;
use std::sync::{Arc, PoisonError, RwLock};
use tokio_util::sync::CancellationToken;

use crate::config::{BatchStrategy, ClientConfig};
use crate::error::{Result, SerpshotError};
use crate::http::{
    AsyncTransport, ReqwestTransport, Sleeper, SystemSleeper, classify_response, with_retry,
};
use crate::request::SearchRequest;
use crate::response::{SearchResponse, assemble_batch, parse_search_body};
use crate::types::SearchType;

/// Path of the search endpoint, relative to the base URL.
pub const SEARCH_PATH: &str = "/api/search/google";

/// Async SerpShot client.
///
/// Cloning is cheap; clones share one connection pool. The pool is released
/// by [`close`](Self::close) or when the last clone is dropped.
///
/// ```no_run
/// # async fn demo() -> serpshot::Result<()> {
/// use serpshot::{ClientConfig, SerpshotClient};
///
/// let client = SerpshotClient::new(ClientConfig::builder().api_key("your-api-key").build()?)?;
/// let response = client.search("rust async runtime").await?;
/// for result in response.results() {
///     println!("{} {}", result.title(), result.link());
/// }
/// client.close();
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct SerpshotClient {
    inner: Arc<Inner>,
}

struct Inner {
    config: ClientConfig,
    transport: RwLock<Option<Arc<dyn AsyncTransport>>>,
    sleeper: Arc<dyn Sleeper>,
}

impl SerpshotClient {
    /// Creates a client with a pooled `reqwest` transport.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let transport = ReqwestTransport::new(&config)?;
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
        transport: Arc<dyn AsyncTransport>,
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
    pub async fn search(&self, query: impl Into<String>) -> Result<SearchResponse> {
        self.search_cancellable(query, &CancellationToken::new()).await
    }

    /// [`search`](Self::search) that stops when `cancel` fires.
    pub async fn search_cancellable(
        &self,
        query: impl Into<String>,
        cancel: &CancellationToken,
    ) -> Result<SearchResponse> {
        let request = SearchRequest::new(query);
        single(self.execute_cancellable(&request, cancel).await?)
    }

    /// Web search for several queries; responses follow input order.
    pub async fn search_batch<I, S>(&self, queries: I) -> Result<Vec<SearchResponse>>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.search_batch_cancellable(queries, &CancellationToken::new()).await
    }

    /// [`search_batch`](Self::search_batch) that stops when `cancel` fires.
    pub async fn search_batch_cancellable<I, S>(
        &self,
        queries: I,
        cancel: &CancellationToken,
    ) -> Result<Vec<SearchResponse>>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.execute_cancellable(&SearchRequest::batch(queries), cancel).await
    }

    /// Image search for one query with default parameters.
    pub async fn image_search(&self, query: impl Into<String>) -> Result<SearchResponse> {
        self.image_search_cancellable(query, &CancellationToken::new()).await
    }

    /// [`image_search`](Self::image_search) that stops when `cancel` fires.
    pub async fn image_search_cancellable(
        &self,
        query: impl Into<String>,
        cancel: &CancellationToken,
    ) -> Result<SearchResponse> {
        let request = SearchRequest::new(query).with_search_type(SearchType::Image);
        single(self.execute_cancellable(&request, cancel).await?)
    }

    /// Image search for several queries; responses follow input order.
    pub async fn image_search_batch<I, S>(&self, queries: I) -> Result<Vec<SearchResponse>>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.image_search_batch_cancellable(queries, &CancellationToken::new()).await
    }

    /// [`image_search_batch`](Self::image_search_batch) that stops when `cancel` fires.
    pub async fn image_search_batch_cancellable<I, S>(
        &self,
        queries: I,
        cancel: &CancellationToken,
    ) -> Result<Vec<SearchResponse>>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let request = SearchRequest::batch(queries).with_search_type(SearchType::Image);
        self.execute_cancellable(&request, cancel).await
    }

    /// Runs a fully specified request. Returns one response per query, in
    /// input order.
    pub async fn execute(&self, request: &SearchRequest) -> Result<Vec<SearchResponse>> {
        self.execute_cancellable(request, &CancellationToken::new()).await
    }

    /// [`execute`](Self::execute) that stops when `cancel` fires, before an
    /// attempt, while one is in flight or during backoff.
    #[tracing::instrument(skip(self, request, cancel), fields(queries = request.queries().len()))]
    pub async fn execute_cancellable(
        &self,
        request: &SearchRequest,
        cancel: &CancellationToken,
    ) -> Result<Vec<SearchResponse>> {
        let transport = self.transport()?;
        request.validate()?;

        match self.inner.config.batch_strategy() {
            BatchStrategy::FanOut { concurrency } if request.queries().len() > 1 => {
                self.fan_out(transport.as_ref(), request, concurrency, cancel)
                    .await
            }
            _ => self.send(transport.as_ref(), request, cancel).await,
        }
    }

    /// Releases the connection pool. Calls started afterwards fail with
    /// [`SerpshotError::Closed`]; calls already in flight complete.
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

    fn transport(&self) -> Result<Arc<dyn AsyncTransport>> {
        self.inner
            .transport
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(SerpshotError::Closed)
    }

    async fn send(
        &self,
        transport: &dyn AsyncTransport,
        request: &SearchRequest,
        cancel: &CancellationToken,
    ) -> Result<Vec<SearchResponse>> {
        let payload = request.to_payload()?;
        let payload = &payload;

        debug!(
            "Searching {} quer{} ({})...",
            request.queries().len(),
            if request.queries().len() == 1 { "y" } else { "ies" },
            request.search_type()
        );

        let body = with_retry(
            self.inner.config.retry_policy(),
            self.inner.sleeper.as_ref(),
            cancel,
            "Searching",
            || async move {
                transport
                    .post_json(SEARCH_PATH, payload)
                    .await
                    .and_then(classify_response)
            },
        )
        .await?;

        let responses = parse_search_body(&body, request.search_type())?;
        assemble_batch(responses, request.queries())
    }

    async fn fan_out(
        &self,
        transport: &dyn AsyncTransport,
        request: &SearchRequest,
        concurrency: usize,
        cancel: &CancellationToken,
    ) -> Result<Vec<SearchResponse>> {
        debug!(
            "Fanning out {} queries, {} at a time",
            request.queries().len(),
            concurrency
        );

        let mut indexed: Vec<(usize, SearchResponse)> =
            stream::iter(request.split().into_iter().enumerate())
                .map(|(index, part)| self.send_part(transport, index, part, cancel))
                .buffer_unordered(concurrency)
                .try_collect::<Vec<_>>()
                .await?;

        indexed.sort_by_key(|(index, _)| *index);
        Ok(indexed.into_iter().map(|(_, response)| response).collect())
    }

    /// Sends one fan-out query, tagged with its input index.
    async fn send_part<'a>(
        &'a self,
        transport: &'a dyn AsyncTransport,
        index: usize,
        part: SearchRequest,
        cancel: &'a CancellationToken,
    ) -> Result<(usize, SearchResponse)> {
        let response = single(self.send(transport, &part, cancel).await?)?;
        Ok((index, response))
    }
}

/// Unwraps the only response of a single-query call.
pub(crate) fn single(responses: Vec<SearchResponse>) -> Result<SearchResponse> {
    let count = responses.len();
    let mut responses = responses.into_iter();
    match (responses.next(), responses.next()) {
        (Some(response), None) => Ok(response),
        _ => Err(SerpshotError::Decode(format!(
            "expected exactly one response, got {}",
            count
        ))),
    }
}
