//! Article Search Example
//!
//! This example searches the encyclopedia for articles to add to a track.
//!
//! To run this example:
//! ```
//! cargo run --example search_articles -- "graph theory"
//! ```

use track_sdk::article_search_client;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let query = std::env::args().nth(1).unwrap_or_else(|| "Rust programming language".to_string());
    println!("Searching articles for {:?}...", query);

    let client = article_search_client()?;
    let results = client.search(&query).await?;

    if results.is_empty() {
        println!("No articles found");
    }

    for (i, result) in results.iter().enumerate() {
        println!("\n{}. {}", i + 1, result.title);
        println!("   {}", result.url);
        println!("   {}", result.description);
    }

    Ok(())
}
