use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use campsite_booking::config::AppConfig;
use campsite_booking::db;
use campsite_booking::handlers;
use campsite_booking::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::from_env();

    let conn = db::init_shared(&config.database_url)?;
    tracing::info!(database = %config.database_url, "database ready");

    if config.admin_token == "changeme" {
        tracing::warn!("ADMIN_TOKEN is the default; set it before exposing this server");
    }

    let state = Arc::new(AppState::sqlite(config.clone(), conn));
    let app = handlers::router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
