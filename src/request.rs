//! Request building and validation.
//!
//! A [`SearchRequest`] is checked in full before it is serialized, so an
//! invalid request never reaches the transport.

use serde::Serialize;

use crate::error::{Result, SerpshotError};
use crate::types::SearchType;

/// Maximum number of queries accepted in one batch.
pub const MAX_QUERIES: usize = 100;

/// Maximum length of a single query, in characters.
pub const MAX_QUERY_CHARS: usize = 2048;

/// Largest accepted `num` value.
pub const MAX_RESULTS_PER_PAGE: u32 = 100;

const DEFAULT_NUM: u32 = 10;
const DEFAULT_PAGE: u32 = 1;
const DEFAULT_GL: &str = "us";
const DEFAULT_HL: &str = "en";
const DEFAULT_LR: &str = "en";

const PREMIUM_REGIONS: [&str; 4] = ["us", "uk", "ca", "au"];

/// Parameters for one call to the search endpoint.
///
/// ```
/// use serpshot::{LocationType, SearchRequest};
///
/// let request = SearchRequest::new("rust async")
///     .with_num(20)
///     .with_page(2)
///     .with_location(LocationType::GB);
/// assert!(request.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    queries: Vec<String>,
    search_type: SearchType,
    num: u32,
    page: u32,
    gl: String,
    hl: String,
    lr: String,
    location: Option<String>,
}

/// JSON body sent to `/api/search/google`.
#[derive(Debug, Serialize)]
struct SearchPayload<'a> {
    queries: &'a [String],
    #[serde(rename = "type")]
    search_type: SearchType,
    num: u32,
    page: u32,
    gl: &'a str,
    hl: &'a str,
    lr: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    location: Option<&'a str>,
}

impl SearchRequest {
    /// A single-query web search with default parameters.
    pub fn new(query: impl Into<String>) -> Self {
        Self::batch([query.into()])
    }

    /// A batch of queries sharing the same parameters.
    pub fn batch<I, S>(queries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            queries: queries.into_iter().map(Into::into).collect(),
            search_type: SearchType::Search,
            num: DEFAULT_NUM,
            page: DEFAULT_PAGE,
            gl: DEFAULT_GL.to_string(),
            hl: DEFAULT_HL.to_string(),
            lr: DEFAULT_LR.to_string(),
            location: None,
        }
    }

    /// Web or image search.
    pub fn with_search_type(mut self, search_type: SearchType) -> Self {
        self.search_type = search_type;
        self
    }

    /// Results per page (1-100).
    pub fn with_num(mut self, num: u32) -> Self {
        self.num = num;
        self
    }

    /// Page number, starting at 1.
    pub fn with_page(mut self, page: u32) -> Self {
        self.page = page;
        self
    }

    /// Country code, e.g. `us` or `cn`.
    pub fn with_gl(mut self, gl: impl Into<String>) -> Self {
        self.gl = gl.into();
        self
    }

    /// Interface language, e.g. `en` or `zh-CN`.
    pub fn with_hl(mut self, hl: impl Into<String>) -> Self {
        self.hl = hl.into();
        self
    }

    /// Content language restriction.
    pub fn with_lr(mut self, lr: impl Into<String>) -> Self {
        self.lr = lr.into();
        self
    }

    /// Location for local search. Accepts a free-form string or a
    /// [`LocationType`](crate::LocationType) preset.
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Queries in input order.
    pub fn queries(&self) -> &[String] {
        &self.queries
    }

    /// Requested search type.
    pub fn search_type(&self) -> SearchType {
        self.search_type
    }

    /// Results per page.
    pub fn num(&self) -> u32 {
        self.num
    }

    /// 1-based page number.
    pub fn page(&self) -> u32 {
        self.page
    }

    /// Country code.
    pub fn gl(&self) -> &str {
        &self.gl
    }

    /// Interface language.
    pub fn hl(&self) -> &str {
        &self.hl
    }

    /// Content language restriction.
    pub fn lr(&self) -> &str {
        &self.lr
    }

    /// Location, if one was set.
    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }

    /// Checks every parameter against the limits the API enforces.
    pub fn validate(&self) -> Result<()> {
        if self.queries.is_empty() {
            return Err(SerpshotError::validation(
                "queries",
                "at least one query is required",
            ));
        }
        if self.queries.len() > MAX_QUERIES {
            return Err(SerpshotError::validation(
                "queries",
                format!(
                    "at most {} queries per call, got {}",
                    MAX_QUERIES,
                    self.queries.len()
                ),
            ));
        }
        for (index, query) in self.queries.iter().enumerate() {
            let chars = query.chars().count();
            if chars == 0 || chars > MAX_QUERY_CHARS {
                return Err(SerpshotError::validation(
                    "queries",
                    format!(
                        "query #{} must be between 1 and {} characters, got {}",
                        index + 1,
                        MAX_QUERY_CHARS,
                        chars
                    ),
                ));
            }
        }
        if !(1..=MAX_RESULTS_PER_PAGE).contains(&self.num) {
            return Err(SerpshotError::validation(
                "num",
                format!(
                    "num must be between 1 and {}, got {}",
                    MAX_RESULTS_PER_PAGE, self.num
                ),
            ));
        }
        if self.page < 1 {
            return Err(SerpshotError::validation(
                "page",
                format!("page must be at least 1, got {}", self.page),
            ));
        }
        Ok(())
    }

    /// Validates the request and serializes it into the JSON body.
    pub fn to_payload(&self) -> Result<serde_json::Value> {
        self.validate()?;

        let payload = SearchPayload {
            queries: &self.queries,
            search_type: self.search_type,
            num: self.num,
            page: self.page,
            gl: &self.gl,
            hl: &self.hl,
            lr: &self.lr,
            location: self.location.as_deref(),
        };

        serde_json::to_value(payload).map_err(|e| SerpshotError::Validation {
            message: format!("failed to serialize request: {}", e),
            field: None,
        })
    }

    /// One single-query request per query, each with the same parameters.
    pub(crate) fn split(&self) -> Vec<SearchRequest> {
        self.queries
            .iter()
            .map(|query| SearchRequest {
                queries: vec![query.clone()],
                ..self.clone()
            })
            .collect()
    }

    /// Client-side estimate of the credits this request will cost per query.
    ///
    /// Informational only; the authoritative figure is
    /// [`SearchResponse::credits_used`](crate::SearchResponse::credits_used).
    pub fn estimated_credits(&self) -> u32 {
        let mut cost: u32 = match self.search_type {
            SearchType::Search => 1,
            SearchType::Image => 2,
        };

        if self.num > 10 {
            cost += (self.num - 10) / 10;
        }

        if PREMIUM_REGIONS
            .iter()
            .any(|r| r.eq_ignore_ascii_case(&self.gl))
        {
            // x1.2, truncated
            cost = cost * 6 / 5;
        }

        cost.max(1)
    }
}
