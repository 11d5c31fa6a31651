use anyhow::Context;
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use townsquare::{
    config::{Config, LogFormat, StorageBackend},
    database::Database,
    repository::Repositories,
    services::{seed, NoWeather, OpenMeteoClient, WeatherProvider},
    AppState,
};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Config::from_env().context("invalid configuration")?;

    let filter = tracing_subscriber::EnvFilter::new(&config.app.rust_log);
    match config.app.log_format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init(),
    }

    info!("Starting Townsquare API ({})", config.app.environment);

    let repos = match config.database.storage {
        StorageBackend::Postgres => {
            let url = config
                .database
                .url
                .as_deref()
                .context("DATABASE_URL must be set")?;
            let db = Database::new(
                url,
                config.database.pool_size,
                Duration::from_secs(config.database.acquire_timeout_secs),
            )
            .await
            .context("failed to connect to database")?;
            info!("Database connected");

            db.run_migrations()
                .await
                .context("failed to run migrations")?;
            Repositories::postgres(&db)
        }
        StorageBackend::Memory => {
            info!("Using in-memory storage; data is lost on exit");
            Repositories::in_memory()
        }
    };

    let admin = seed::run(&repos, &config.seed)
        .await
        .context("bootstrap seed failed")?;
    info!("Admin account ready: {}", admin.email);

    let weather: Arc<dyn WeatherProvider> = if config.weather.enabled {
        Arc::new(OpenMeteoClient::from_config(&config.weather).context("weather client")?)
    } else {
        Arc::new(NoWeather)
    };

    let (host, port) = (&config.app.host, config.app.port);
    let app = townsquare::app(AppState::new(&repos, weather));

    let addr: SocketAddr = format!("{host}:{port}")
        .parse()
        .with_context(|| format!("invalid listen address {host}:{port}"))?;
    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    axum::serve(listener, app.into_make_service())
        .await
        .context("server error")?;

    Ok(())
}
