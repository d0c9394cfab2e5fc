//! Blocking usage: single, batch and image searches with error handling.
//!
//! Run with `SERPSHOT_API_KEY=... cargo run --example sync_search`.

use anyhow::{Context, Result};
use serpshot::blocking::SerpshotClient;
use serpshot::{ClientConfig, LocationType, SearchRequest, SerpshotError};
use std::time::Duration;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let config = ClientConfig::builder()
        .from_env(&serpshot::SystemEnvironment)
        .timeout(Duration::from_secs(20))
        .max_retries(2)
        .build()
        .context("Failed to load SerpShot configuration")?;
    let client = SerpshotClient::new(config)?;

    println!("=== Search with parameters ===");
    let request = SearchRequest::new("best restaurants")
        .with_num(20)
        .with_location(LocationType::US);
    println!("Estimated credits per query: {}", request.estimated_credits());
    for response in client.execute(&request)? {
        println!("Found {} results for {}", response.results().len(), response.query());
        for result in response.results().iter().take(3) {
            println!("  {}. {}", result.position(), result.title());
        }
    }

    println!("\n=== Batch search ===");
    for response in client.search_batch(["Python", "JavaScript", "Rust"])? {
        println!("{}: {} results", response.query(), response.results().len());
    }

    println!("\n=== Image search ===");
    let response = client.image_search("mountain landscape")?;
    for result in response.results().iter().take(3) {
        if let Some(image) = result.as_image() {
            println!("{} from {}", image.link, image.source);
        }
    }

    println!("\n=== Error handling ===");
    match client.execute(&SearchRequest::new("too many").with_num(500)) {
        Err(SerpshotError::Validation { message, field }) => {
            println!("Rejected locally ({:?}): {}", field, message)
        }
        Err(SerpshotError::RateLimit { retry_after, .. }) => {
            println!("Rate limited, retry after {:?}s", retry_after)
        }
        Err(SerpshotError::InsufficientCredits { message, .. }) => {
            println!("Out of credits: {}", message)
        }
        Err(e) => println!("Error: {}", e),
        Ok(_) => println!("Unexpectedly accepted"),
    }

    client.close();
    Ok(())
}
