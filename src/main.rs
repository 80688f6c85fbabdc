//! Quotekit - Internal sales quoting engine
//!
//! The binary is the composition root: it loads configuration, builds the
//! database pool, verifies connectivity, and brings the schema up to date.
//! Quote traffic arrives through the library API; there is no HTTP layer
//! here.

use anyhow::Result;
use std::path::Path;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use quotekit::{
    config::Config,
    db::{
        self,
        repositories::{SqlxCatalogRepository, SqlxQuoteRepository},
    },
    services::QuoteService,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "quotekit=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Quotekit...");

    // Load configuration
    let config = Config::load_with_env(Path::new("config.yml"))?;
    tracing::info!("Configuration loaded");

    // Build the (lazily connected) pool and verify the backend is reachable.
    let pool = db::create_pool(&config.database)?;
    pool.connect_check().await?;
    tracing::info!("Database connected: {}", config.database.driver);

    // Run migrations
    db::migrations::run_migrations(&pool).await?;
    tracing::info!(
        "Database schema up to date ({} migrations known)",
        db::migrations::total_migrations()
    );

    // Wire the services; embedders pick this up from here.
    let catalog = SqlxCatalogRepository::boxed(pool.clone());
    let quotes = SqlxQuoteRepository::boxed(pool.clone());
    let service = QuoteService::new(catalog, quotes);

    let quote_count = service.list_quotes().await?.len();
    tracing::info!("Ready: {} quote(s) on record", quote_count);

    pool.close().await;
    Ok(())
}
