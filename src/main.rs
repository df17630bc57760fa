// src/main.rs
use dotenvy::dotenv;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use umkm_forecast_service::{backend, config::Config, database, forecast::ForecastContext};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "umkm_forecast_service=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    let pool = database::db::connection::get_db_pool(&config).await?;
    if config.run_migrations {
        database::db::migrate::run_migrations(&pool).await?;
        tracing::info!("database migrations applied");
    }

    // Artifacts are loaded once; a signal that fails here answers 503 until restart.
    let forecasts = Arc::new(ForecastContext::load(&config));

    let state = backend::AppState {
        db: pool,
        forecasts,
    };
    backend::run_server(&config, state).await
}
