//! Applies pending migrations, then exits.
//!
//! `migrate [DATABASE_URL]`; falls back to the `DATABASE_URL` environment variable.

use anyhow::Context;
use ecomm_api::db::{create_pool, run_migrations};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let database_url = match std::env::args().nth(1) {
        Some(url) => url,
        None => std::env::var("DATABASE_URL").context("DATABASE_URL is not set")?,
    };

    let pool = create_pool(&database_url, 1).await?;
    run_migrations(&pool).await?;
    tracing::info!("migrations applied");
    pool.close().await;
    Ok(())
}
