use anyhow::Result;
use monbridge_query::{build_router, AppState, QueryConfig, QueryEngine};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let config = Arc::new(QueryConfig::load()?);
    config.validate()?;
    info!("Loaded configuration: {:?}", config);

    // Initialize query engine
    let query_engine = Arc::new(QueryEngine::new(config.clone())?);
    info!("Initialized query engine");

    // Create shared state
    let state = AppState {
        query_engine,
        config: config.clone(),
    };

    let app = build_router(state);

    // Start server
    let listener = TcpListener::bind(&config.bind_address).await?;
    let addr = listener.local_addr()?;
    info!("Monitoring bridge query service listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
