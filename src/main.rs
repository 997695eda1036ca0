use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    http::{
        header::{ACCEPT, CONTENT_TYPE},
        HeaderValue, Method,
    },
    Server,
};
use tower_http::cors::CorsLayer;
use tracing_subscriber::EnvFilter;

use axum_todo_auth_api::{config::Config, route::create_router, store, AppState};

// Entry point of the application
#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "axum_todo_auth_api=debug,tower_http=info".into()),
        )
        .init();

    let store = store::open(&config.database_url)
        .await
        .with_context(|| format!("failed to open store at {}", config.database_url))?;
    tracing::info!("✅ Connection to the store is successful!");

    let app_state = Arc::new(AppState::new(store, &config).await?);
    spawn_session_purger(app_state.clone(), config.session_purge_interval);

    // Configure CORS settings for the application
    let origin = config
        .cors_origin
        .parse::<HeaderValue>()
        .with_context(|| format!("invalid CORS_ORIGIN {}", config.cors_origin))?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_credentials(true)
        .allow_headers([ACCEPT, CONTENT_TYPE]);

    let app = create_router(app_state).layer(cors);

    tracing::info!("🚀 Server started successfully on {}", config.addr);

    Server::bind(&config.addr)
        .serve(app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    Ok(())
}

fn spawn_session_purger(app_state: Arc<AppState>, every: std::time::Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        loop {
            ticker.tick().await;
            match app_state.sessions.purge_expired().await {
                Ok(0) => {}
                Ok(purged) => tracing::debug!(purged, "expired sessions removed"),
                Err(e) => tracing::warn!(error = %e, "session purge failed"),
            }
        }
    });
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
