//! Rust client for the SerpShot Google search API.
//!
//! Two facades share one request builder, retry loop and response parser:
//! the async [`SerpshotClient`] (tokio) and [`blocking::SerpshotClient`].
//!
//! ```no_run
//! # async fn demo() -> serpshot::Result<()> {
//! use serpshot::{SearchRequest, SerpshotClient};
//!
//! let client = SerpshotClient::from_env()?;
//! let response = client.search("best restaurants").await?;
//! println!("{} results in {}s", response.total_results(), response.search_time());
//!
//! let request = SearchRequest::batch(["Python", "JavaScript", "Rust"]).with_num(20);
//! for response in client.execute(&request).await? {
//!     println!("{}: {}", response.query(), response.results().len());
//! }
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod blocking;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod request;
pub mod response;
pub mod types;

pub use auth::ApiKey;
pub use client::SerpshotClient;
pub use config::{BatchStrategy, ClientConfig, ClientConfigBuilder, Environment, SystemEnvironment};
pub use error::{Result, SerpshotError};
pub use http::RetryPolicy;
pub use request::SearchRequest;
pub use response::{ImageResult, OrganicResult, SearchResponse, SearchResult};
pub use tokio_util::sync::CancellationToken;
pub use types::{LocationType, SearchType};

/// `User-Agent` sent with every request.
pub fn user_agent() -> String {
    format!("serpshot-rust/{}", env!("SERPSHOT_SDK_VERSION"))
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_agent() {
        let ua = user_agent();
        assert!(ua.starts_with("serpshot-rust/"));
        assert!(ua.len() > "serpshot-rust/".len());
    }
}
