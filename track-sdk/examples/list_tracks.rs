//! Track Listing Example
//!
//! This example lists the signed-in user's tracks with their progress and
//! prints the diagnostic events recorded along the way.
//!
//! To run this example:
//! ```
//! TRACKS_ACCESS_TOKEN=your_token TRACKS_API_BASE_URL=http://localhost:8000 cargo run --example list_tracks
//! ```

use anyhow::Context;
use track_sdk::{diagnostics, tracks_client};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    println!("Track Listing Example");

    let client = tracks_client().context("Please set TRACKS_ACCESS_TOKEN")?;

    match client.list_tracks().await {
        Ok(tracks) => {
            println!("\nFound {} tracks:", tracks.len());
            for track in &tracks {
                let progress = track.progress();
                println!(
                    "  {} ({}/{} articles, {:.0}%)",
                    track.title, progress.completed, progress.total, progress.percent
                );
            }
        }
        Err(e) if e.requires_login() => eprintln!("Please sign in again: {}", e),
        Err(e) if e.is_retryable() => eprintln!("Network problem, try again later: {}", e),
        Err(e) => return Err(e.into()),
    }

    println!("\nRecent diagnostic events:");
    for event in diagnostics::recorder().recent(10) {
        println!("  [{}] {} {:?}", event.severity, event.message, event.correlation_id());
    }

    Ok(())
}
