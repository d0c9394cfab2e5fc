//! Response parsing.
//!
//! The search endpoint answers in a couple of shapes: optionally wrapped in a
//! `{code, msg, data}` envelope, with `data` holding one item or a list, and
//! each item either flat or in the backend's nested `search_params` /
//! `search_info` layout. Everything is normalized into [`SearchResponse`].

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::{Result, SerpshotError};
use crate::types::SearchType;

/// A web (organic) result.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrganicResult {
    pub position: u32,
    pub title: String,
    pub link: String,
    pub snippet: String,
}

/// An image result.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageResult {
    pub position: u32,
    pub title: String,
    /// Direct URL of the image.
    pub link: String,
    pub thumbnail: String,
    /// Name of the website hosting the image.
    pub source: String,
    /// Page the image was found on.
    pub source_link: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

/// One entry of [`SearchResponse::results`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum SearchResult {
    Organic(OrganicResult),
    Image(ImageResult),
}

impl SearchResult {
    /// 1-based rank in the result page.
    pub fn position(&self) -> u32 {
        match self {
            SearchResult::Organic(r) => r.position,
            SearchResult::Image(r) => r.position,
        }
    }

    /// Result title.
    pub fn title(&self) -> &str {
        match self {
            SearchResult::Organic(r) => &r.title,
            SearchResult::Image(r) => &r.title,
        }
    }

    /// Target URL; the image itself for image results.
    pub fn link(&self) -> &str {
        match self {
            SearchResult::Organic(r) => &r.link,
            SearchResult::Image(r) => &r.link,
        }
    }

    /// The web result, if this is one.
    pub fn as_organic(&self) -> Option<&OrganicResult> {
        match self {
            SearchResult::Organic(r) => Some(r),
            SearchResult::Image(_) => None,
        }
    }

    /// The image result, if this is one.
    pub fn as_image(&self) -> Option<&ImageResult> {
        match self {
            SearchResult::Image(r) => Some(r),
            SearchResult::Organic(_) => None,
        }
    }
}

/// Parsed answer for one query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchResponse {
    success: bool,
    query: String,
    total_results: String,
    search_time: String,
    results: Vec<SearchResult>,
    credits_used: u64,
}

impl SearchResponse {
    /// Always `true`; failed items are rejected while parsing.
    pub fn success(&self) -> bool {
        self.success
    }

    /// The query as echoed back by the API.
    pub fn query(&self) -> &str {
        &self.query
    }

    /// Upstream estimate of the total number of matches, verbatim.
    pub fn total_results(&self) -> &str {
        &self.total_results
    }

    /// Upstream search time, verbatim.
    pub fn search_time(&self) -> &str {
        &self.search_time
    }

    /// Results in upstream rank order.
    pub fn results(&self) -> &[SearchResult] {
        &self.results
    }

    /// Credits charged for this query.
    pub fn credits_used(&self) -> u64 {
        self.credits_used
    }

    /// Consumes the response, keeping only the results.
    pub fn into_results(self) -> Vec<SearchResult> {
        self.results
    }
}

#[derive(Debug, Deserialize)]
struct RawItem {
    success: Option<bool>,
    error: Option<String>,
    query: Option<String>,
    #[serde(default, deserialize_with = "opaque_string")]
    total_results: Option<String>,
    #[serde(default, deserialize_with = "opaque_string")]
    search_time: Option<String>,
    credits_used: Option<u64>,
    credits: Option<u64>,
    search_params: Option<RawSearchParams>,
    search_info: Option<RawSearchInfo>,
    results: Option<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
struct RawSearchParams {
    q: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawSearchInfo {
    #[serde(default, deserialize_with = "opaque_string")]
    total_results: Option<String>,
    #[serde(default, deserialize_with = "opaque_string")]
    search_time: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawOrganic {
    title: String,
    link: String,
    snippet: Option<String>,
    position: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct RawImage {
    title: String,
    #[serde(rename = "imageUrl")]
    image_url: Option<String>,
    link: Option<String>,
    #[serde(alias = "thumbnailUrl")]
    thumbnail: Option<String>,
    source: Option<String>,
    source_link: Option<String>,
    #[serde(alias = "imageWidth")]
    width: Option<u32>,
    #[serde(alias = "imageHeight")]
    height: Option<u32>,
    position: Option<u32>,
}

/// Accepts a JSON string or number and keeps it as text.
fn opaque_string<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}

/// Parses a successful response body into one response per item, in
/// upstream order.
pub fn parse_search_body(body: &str, search_type: SearchType) -> Result<Vec<SearchResponse>> {
    let json: Value = serde_json::from_str(body)
        .map_err(|e| SerpshotError::Decode(format!("body is not valid JSON: {}", e)))?;

    let data = unwrap_envelope(json)?;

    let items = match data {
        Value::Array(items) => items,
        item @ Value::Object(_) => vec![item],
        other => {
            return Err(SerpshotError::Decode(format!(
                "expected an object or array, got {}",
                json_kind(&other)
            )));
        }
    };

    if items.is_empty() {
        return Err(SerpshotError::Decode("empty response from API".to_string()));
    }

    items
        .into_iter()
        .map(|item| parse_item(item, search_type))
        .collect()
}

fn unwrap_envelope(json: Value) -> Result<Value> {
    let Value::Object(mut map) = json else {
        return Ok(json);
    };

    if !map.contains_key("data") {
        return Ok(Value::Object(map));
    }

    // An envelope without a numeric `code` is an error, reported as 500.
    let code = map.get("code").and_then(Value::as_i64);
    if code != Some(200) {
        let message = map
            .get("msg")
            .and_then(Value::as_str)
            .unwrap_or("API returned error")
            .to_string();
        let status = code
            .and_then(|c| u16::try_from(c).ok())
            .filter(|s| (100..=599).contains(s))
            .unwrap_or(500);
        return Err(SerpshotError::Api {
            status,
            message,
            body: Some(Value::Object(map)),
        });
    }

    Ok(map.remove("data").unwrap_or(Value::Null))
}

fn parse_item(item: Value, search_type: SearchType) -> Result<SearchResponse> {
    let raw: RawItem = serde_json::from_value(item)
        .map_err(|e| SerpshotError::Decode(format!("malformed search item: {}", e)))?;

    if raw.success == Some(false) {
        return Err(SerpshotError::Decode(format!(
            "API reported failure: {}",
            raw.error.as_deref().unwrap_or("no error message")
        )));
    }

    let query = raw
        .query
        .or_else(|| raw.search_params.and_then(|p| p.q))
        .ok_or_else(|| SerpshotError::Decode("missing query in search item".to_string()))?;

    let (info_total, info_time) = match raw.search_info {
        Some(info) => (info.total_results, info.search_time),
        None => (None, None),
    };

    let results = raw
        .results
        .unwrap_or_default()
        .into_iter()
        .enumerate()
        .map(|(index, value)| parse_result(value, index, search_type))
        .collect::<Result<Vec<_>>>()?;

    Ok(SearchResponse {
        success: true,
        query,
        total_results: raw
            .total_results
            .or(info_total)
            .unwrap_or_else(|| "0".to_string()),
        search_time: raw
            .search_time
            .or(info_time)
            .unwrap_or_else(|| "0".to_string()),
        results,
        credits_used: raw.credits_used.or(raw.credits).unwrap_or(1),
    })
}

fn parse_result(value: Value, index: usize, search_type: SearchType) -> Result<SearchResult> {
    let fallback_position = u32::try_from(index + 1).unwrap_or(u32::MAX);

    match search_type {
        SearchType::Search => {
            let raw: RawOrganic = serde_json::from_value(value).map_err(|e| {
                SerpshotError::Decode(format!("malformed result #{}: {}", index + 1, e))
            })?;
            Ok(SearchResult::Organic(OrganicResult {
                position: raw.position.unwrap_or(fallback_position),
                title: raw.title,
                link: raw.link,
                snippet: raw.snippet.unwrap_or_default(),
            }))
        }
        SearchType::Image => {
            let raw: RawImage = serde_json::from_value(value).map_err(|e| {
                SerpshotError::Decode(format!("malformed image result #{}: {}", index + 1, e))
            })?;

            // Backend layout: `imageUrl` is the image and `link` the hosting page.
            let (link, source_link) = match raw.image_url {
                Some(image_url) => (Some(image_url), raw.link.or(raw.source_link)),
                None => (raw.link, raw.source_link),
            };
            let link = link.ok_or_else(|| {
                SerpshotError::Decode(format!("image result #{} has no link", index + 1))
            })?;

            Ok(SearchResult::Image(ImageResult {
                position: raw.position.unwrap_or(fallback_position),
                title: raw.title,
                link,
                thumbnail: raw.thumbnail.unwrap_or_default(),
                source: raw.source.unwrap_or_default(),
                source_link: source_link.unwrap_or_default(),
                width: raw.width,
                height: raw.height,
            }))
        }
    }
}

/// Puts batch responses back in input order.
///
/// Fails if the count does not match. If the echoed queries are a
/// permutation of the input they are reordered, otherwise upstream order
/// is kept (the API may normalize the echoed text).
pub(crate) fn assemble_batch(
    responses: Vec<SearchResponse>,
    queries: &[String],
) -> Result<Vec<SearchResponse>> {
    if responses.len() != queries.len() {
        return Err(SerpshotError::Decode(format!(
            "expected {} responses for {} queries, got {}",
            queries.len(),
            queries.len(),
            responses.len()
        )));
    }

    if responses.iter().zip(queries).all(|(r, q)| r.query == *q) {
        return Ok(responses);
    }

    let mut slots: Vec<Option<SearchResponse>> = responses.into_iter().map(Some).collect();
    let mut order = Vec::with_capacity(queries.len());
    for query in queries {
        // Duplicate queries map to distinct responses.
        let found = (0..slots.len()).find(|index| {
            !order.contains(index) && slots[*index].as_ref().is_some_and(|r| r.query == *query)
        });
        match found {
            Some(index) => order.push(index),
            None => return Ok(slots.into_iter().flatten().collect()),
        }
    }

    Ok(order
        .into_iter()
        .filter_map(|index| slots[index].take())
        .collect())
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn response(query: &str) -> SearchResponse {
        SearchResponse {
            success: true,
            query: query.to_string(),
            total_results: "0".to_string(),
            search_time: "0".to_string(),
            results: Vec::new(),
            credits_used: 1,
        }
    }

    fn queries(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_flat_item() {
        let body = json!({
            "success": true,
            "query": "rust",
            "total_results": "About 1,000 results",
            "search_time": "0.31",
            "results": [
                {"title": "Rust", "link": "https://rust-lang.org", "snippet": "A language", "position": 1}
            ],
            "credits_used": 2
        })
        .to_string();

        let parsed = parse_search_body(&body, SearchType::Search).unwrap();

        assert_eq!(parsed.len(), 1);
        let r = &parsed[0];
        assert!(r.success());
        assert_eq!(r.query(), "rust");
        assert_eq!(r.total_results(), "About 1,000 results");
        assert_eq!(r.search_time(), "0.31");
        assert_eq!(r.credits_used(), 2);
        assert_eq!(
            r.results()[0],
            SearchResult::Organic(OrganicResult {
                position: 1,
                title: "Rust".to_string(),
                link: "https://rust-lang.org".to_string(),
                snippet: "A language".to_string(),
            })
        );
    }

    #[test]
    fn test_parse_backend_envelope_batch() {
        let body = json!({
            "code": 200,
            "msg": "ok",
            "data": [
                {
                    "search_params": {"q": "a", "type": "search"},
                    "search_info": {"total_results": 12345, "search_time": 0.5},
                    "results": [{"title": "A", "link": "https://a.example", "snippet": "s", "position": 1}],
                    "credits": 1
                },
                {
                    "search_params": {"q": "b", "type": "search"},
                    "results": []
                }
            ]
        })
        .to_string();

        let parsed = parse_search_body(&body, SearchType::Search).unwrap();

        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].query(), "a");
        assert_eq!(parsed[0].total_results(), "12345");
        assert_eq!(parsed[0].search_time(), "0.5");
        assert_eq!(parsed[1].query(), "b");
        assert_eq!(parsed[1].total_results(), "0");
        assert_eq!(parsed[1].credits_used(), 1);
        assert!(parsed[1].results().is_empty());
    }

    #[test]
    fn test_parse_backend_image_fields() {
        let body = json!({
            "search_params": {"q": "puppies", "type": "image"},
            "results": [{
                "title": "Puppy",
                "imageUrl": "https://img.example/puppy.jpg",
                "thumbnailUrl": "https://img.example/thumb.jpg",
                "source": "Example",
                "link": "https://example.com/puppies",
                "imageWidth": 640,
                "imageHeight": 480,
                "position": 1
            }]
        })
        .to_string();

        let parsed = parse_search_body(&body, SearchType::Image).unwrap();
        let image = parsed[0].results()[0].as_image().unwrap();

        assert_eq!(image.link, "https://img.example/puppy.jpg");
        assert_eq!(image.thumbnail, "https://img.example/thumb.jpg");
        assert_eq!(image.source, "Example");
        assert_eq!(image.source_link, "https://example.com/puppies");
        assert_eq!(image.width, Some(640));
        assert_eq!(image.height, Some(480));
    }

    #[test]
    fn test_missing_position_uses_rank() {
        let body = json!({
            "query": "q",
            "results": [
                {"title": "one", "link": "https://1.example"},
                {"title": "two", "link": "https://2.example"}
            ]
        })
        .to_string();

        let parsed = parse_search_body(&body, SearchType::Search).unwrap();
        let positions: Vec<u32> = parsed[0].results().iter().map(|r| r.position()).collect();
        assert_eq!(positions, vec![1, 2]);
    }

    #[test]
    fn test_error_envelope() {
        let body = json!({"code": 402, "msg": "no credits", "data": null}).to_string();

        let err = parse_search_body(&body, SearchType::Search).unwrap_err();
        assert!(matches!(
            err,
            SerpshotError::Api { status: 402, ref message, .. } if message == "no credits"
        ));
    }

    #[test]
    fn test_envelope_without_code_is_an_error() {
        let body = json!({"msg": "oops", "data": [{"query": "x", "results": []}]}).to_string();

        let err = parse_search_body(&body, SearchType::Search).unwrap_err();
        assert!(matches!(
            err,
            SerpshotError::Api { status: 500, ref message, .. } if message == "oops"
        ));
    }

    #[test]
    fn test_success_false_is_decode_error() {
        let body = json!({"success": false, "query": "q", "error": "bad"}).to_string();
        let err = parse_search_body(&body, SearchType::Search).unwrap_err();
        assert!(matches!(err, SerpshotError::Decode(ref m) if m.contains("bad")));
    }

    #[test]
    fn test_missing_query_is_decode_error() {
        let body = json!({"results": []}).to_string();
        assert!(matches!(
            parse_search_body(&body, SearchType::Search),
            Err(SerpshotError::Decode(_))
        ));
    }

    #[test]
    fn test_malformed_results_are_rejected() {
        let body = json!({"query": "q", "results": "nope"}).to_string();
        assert!(parse_search_body(&body, SearchType::Search).is_err());

        let body = json!({"query": "q", "results": [{"title": "no link"}]}).to_string();
        assert!(parse_search_body(&body, SearchType::Search).is_err());
    }

    #[test]
    fn test_empty_array_and_invalid_json() {
        assert!(parse_search_body("[]", SearchType::Search).is_err());
        assert!(parse_search_body("not json", SearchType::Search).is_err());
        assert!(parse_search_body("42", SearchType::Search).is_err());
    }

    #[test]
    fn test_assemble_keeps_matching_order() {
        let out = assemble_batch(
            vec![response("a"), response("b"), response("c")],
            &queries(&["a", "b", "c"]),
        )
        .unwrap();
        let echoed: Vec<&str> = out.iter().map(|r| r.query()).collect();
        assert_eq!(echoed, ["a", "b", "c"]);
    }

    #[test]
    fn test_assemble_reorders_permutation() {
        let out = assemble_batch(
            vec![response("c"), response("a"), response("b")],
            &queries(&["a", "b", "c"]),
        )
        .unwrap();
        let echoed: Vec<&str> = out.iter().map(|r| r.query()).collect();
        assert_eq!(echoed, ["a", "b", "c"]);
    }

    #[test]
    fn test_assemble_handles_duplicates() {
        let out = assemble_batch(
            vec![response("b"), response("a"), response("a")],
            &queries(&["a", "a", "b"]),
        )
        .unwrap();
        let echoed: Vec<&str> = out.iter().map(|r| r.query()).collect();
        assert_eq!(echoed, ["a", "a", "b"]);
    }

    #[test]
    fn test_assemble_keeps_upstream_order_when_not_a_permutation() {
        let out = assemble_batch(
            vec![response("rust lang"), response("go")],
            &queries(&["Rust Lang", "go"]),
        )
        .unwrap();
        let echoed: Vec<&str> = out.iter().map(|r| r.query()).collect();
        assert_eq!(echoed, ["rust lang", "go"]);
    }

    #[test]
    fn test_assemble_rejects_count_mismatch() {
        let err = assemble_batch(vec![response("a")], &queries(&["a", "b"])).unwrap_err();
        assert!(matches!(err, SerpshotError::Decode(_)));
    }
}
