//! Async usage: single, batch, concurrent and cancellable searches.
//!
//! Run with `SERPSHOT_API_KEY=... cargo run --example async_search`.

use anyhow::{Context, Result};
use serpshot::{CancellationToken, SearchRequest, SerpshotClient, SerpshotError};
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let client = SerpshotClient::from_env().context("Failed to create SerpShot client")?;

    println!("=== Basic search ===");
    let response = client.search("Python async programming").await?;
    println!("Query: {}", response.query());
    println!("Total results: {}", response.total_results());
    println!("Credits used: {}", response.credits_used());
    for (i, result) in response.results().iter().take(5).enumerate() {
        println!("{}. {}\n   {}", i + 1, result.title(), result.link());
    }

    println!("\n=== Batch search (one API call) ===");
    let queries = [
        "Python programming",
        "JavaScript tutorials",
        "Rust language",
        "Go programming",
    ];
    let request = SearchRequest::batch(queries).with_num(5);
    for response in client.execute(&request).await? {
        println!("{}: {} results", response.query(), response.results().len());
        if let Some(top) = response.results().first() {
            println!("  Top result: {}", top.title());
        }
    }

    println!("\n=== Concurrent searches with different parameters ===");
    let python = SearchRequest::new("Python programming").with_gl("us");
    let javascript = SearchRequest::new("JavaScript tutorials").with_num(5).with_gl("uk");
    let rust = SearchRequest::new("Rust language").with_num(20);
    let (a, b, c) = tokio::join!(
        client.execute(&python),
        client.execute(&javascript),
        client.execute(&rust),
    );
    for responses in [a?, b?, c?] {
        for response in responses {
            println!("{}: {} results", response.query(), response.results().len());
        }
    }

    println!("\n=== Image search ===");
    let response = client.image_search("cute puppies").await?;
    for result in response.results().iter().take(3) {
        if let Some(image) = result.as_image() {
            println!("{} ({})", image.title, image.thumbnail);
        }
    }

    println!("\n=== Cancellation ===");
    let token = CancellationToken::new();
    let canceller = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        canceller.cancel();
    });
    match client.search_cancellable("slow query", &token).await {
        Err(SerpshotError::Cancelled) => println!("Search cancelled"),
        Ok(response) => println!("Finished before cancel: {}", response.query()),
        Err(e) => return Err(e.into()),
    }

    client.close();
    Ok(())
}
