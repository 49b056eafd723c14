// Todotree - multi-tenant hierarchical todo service
// Entry point and server setup

use todotree::app;
use todotree::config::ServerConfig;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[rocket::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "todotree=debug,info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Todotree server");

    let rocket = rocket::build();
    let config: ServerConfig = rocket.figment().extract()?;

    let state = app::setup(&config).await?;

    app::build(rocket, state)
        .launch()
        .await
        .map_err(|e| anyhow::anyhow!("Server failed: {}", e))?;

    tracing::info!("Todotree server stopped");

    Ok(())
}
