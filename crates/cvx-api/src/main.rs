//! CVX API Server
//!
//! Configuration comes from `CVX_CONFIG` (TOML file, optional) with
//! environment overrides.

use std::path::PathBuf;
use std::sync::Arc;

use cvx_api::{create_router, state::AppState};
use cvx_core::config::{AppConfig, LoggingConfig};
use tracing_subscriber::EnvFilter;

fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!(
            "cvx_api={0},cvx_parser={0},cvx_extractor={0},cvx_dispatch={0},tower_http=info",
            logging.level
        )
        .into()
    });

    if logging.json_format {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config_path = std::env::var("CVX_CONFIG").ok().map(PathBuf::from);
    let config = AppConfig::load(config_path)?;

    init_tracing(&config.logging);

    let addr = format!("{}:{}", config.server.host, config.server.port);

    // Create application state
    let state = Arc::new(AppState::new(config)?);
    if !state.pipeline.recognizer_ready() {
        tracing::warn!("NER model not loaded; records will have no entities");
    } else if !state.pipeline.recognizer_pretrained() {
        tracing::warn!("No pretrained NER model; names fall back to the first line");
    }

    // Create router
    let app = create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("CVX API Server starting on http://{}", addr);
    tracing::info!("OpenAPI spec at http://{}/api-docs/openapi.json", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
