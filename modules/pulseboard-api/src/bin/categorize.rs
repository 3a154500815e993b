//! One-shot categorizer run: groups the stored suggestions into poll
//! categories via the LLM and prints the proposed poll options.

use anyhow::Result;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::EnvFilter;

use pulseboard_common::Config;
use pulseboard_tracker::categorizer::format_poll_options;
use pulseboard_tracker::{PgEngagementStore, SuggestionCategorizer};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("pulseboard=info".parse()?))
        .init();

    let config = Config::from_env();
    if config.openrouter_api_key.is_empty() {
        anyhow::bail!("OPENROUTER_API_KEY is required to run the categorizer");
    }

    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&config.database_url)
        .await?;

    let store = PgEngagementStore::new(pool);
    store.migrate().await?;

    let categorizer = SuggestionCategorizer::new(&config.openrouter_api_key);
    let categories = categorizer.categorize(&store).await?;

    for category in &categories {
        println!(
            "{}: {} ({} suggestions, {} likes)",
            category.name,
            category.description,
            category.suggestions.len(),
            category.total_likes
        );
    }

    println!("\nProposed poll options:");
    for option in format_poll_options(&categories) {
        println!("  - {option}");
    }

    Ok(())
}
