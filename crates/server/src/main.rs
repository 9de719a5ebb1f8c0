//! tradex-api server entry point.
//!
//! Boots the HTTP service that answers natural-language questions about the
//! logistics performance dataset.

use std::sync::Arc;

use anyhow::Result;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;
use tradex_client::{OpenRouterClient, StoreConfig, SupabaseClient, TranslatorConfig};
use tradex_core::{ActivityLog, AppConfig, AskPipeline, LogCategory, QueryExecutor, SnapshotCache};

mod error;
mod handlers;
mod routes;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .init();

    let config = AppConfig::load()?;
    config.require_store_credentials()?;
    config.require_translator_api_key()?;

    let log = Arc::new(ActivityLog::new(config.log_capacity));

    let store = SupabaseClient::new(StoreConfig::from_app(&config)?)?;
    let translator = OpenRouterClient::new(TranslatorConfig::from_app(&config)?)?;

    let cache = Arc::new(SnapshotCache::new(Arc::new(store), Arc::clone(&log), config.cache_ttl()));
    let executor = QueryExecutor::new(config.store_table.clone(), config.query_timeout());
    let pipeline = Arc::new(AskPipeline::new(cache, Arc::new(translator), executor, Arc::clone(&log)));

    let app = routes::create_router(Arc::new(handlers::AppState::new(pipeline)), &config.api_prefix);

    let listener = TcpListener::bind(config.bind_addr()).await?;
    tracing::info!("Starting tradex-api on {}", listener.local_addr()?);
    log.record(LogCategory::System, format!("Server started on port {}", config.port), None);

    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;

    tracing::info!("tradex-api stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {err}");
        std::future::pending::<()>().await;
    }
}
