use std::time::Duration;

use anyhow::Result;
use publicsphere_api::{build_router, build_state, ApiConfig};
use publicsphere_observability::init_tracing;

const PURGE_INTERVAL: Duration = Duration::from_secs(60 * 60);

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing("publicsphere_api");

    let config = ApiConfig::from_env();
    let state = build_state(&config).await?;

    let assistant = state.assistant.clone();
    let retention = config.transcript_retention;
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(PURGE_INTERVAL);
        loop {
            ticker.tick().await;
            if let Err(error) = assistant.purge_expired(retention).await {
                tracing::warn!(error = %format!("{error:#}"), "transcript purge failed");
            }
        }
    });

    let listener = tokio::net::TcpListener::bind(&config.bind).await?;
    tracing::info!(
        bind = %config.bind,
        storage = state.storage_backend,
        "publicsphere portal api started"
    );

    axum::serve(listener, build_router(state)).await?;
    Ok(())
}
