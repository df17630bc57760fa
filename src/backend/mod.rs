mod error;
pub mod handlers;
mod routes;

pub use error::ApiError;

use axum::{routing::get, Router};
use sqlx::{Pool, Sqlite};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::forecast::ForecastContext;

/// Shared, read-only handler state.
#[derive(Clone)]
pub struct AppState {
    pub db: Pool<Sqlite>,
    pub forecasts: Arc<ForecastContext>,
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "Backend is running" }))
        .merge(routes::api_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run_server(config: &Config, state: AppState) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(config.bind_addr()).await?;
    tracing::info!("Server listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
