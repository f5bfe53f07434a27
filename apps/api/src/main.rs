use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use tracker::config::{Config, StoreBackend};
use tracker::db::{create_pool, setup_local_schema};
use tracker::routes::build_router;
use tracker::state::AppState;
use tracker::store::{ApplicationStore, SqliteStore, SupabaseStore};
use tracker::supabase::SupabaseClient;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting tracker API v{}", env!("CARGO_PKG_VERSION"));

    let store = build_store(&config).await?;
    info!("Application store initialized (backend: {})", store.backend());

    let state = AppState { store };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins once the frontend host is fixed

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Opens the configured backend. The SQLite backend bootstraps its schema.
async fn build_store(config: &Config) -> Result<Arc<dyn ApplicationStore>> {
    match config.backend {
        StoreBackend::Sqlite => {
            let pool = create_pool(&config.database_url).await?;
            setup_local_schema(&pool).await?;
            Ok(Arc::new(SqliteStore::new(pool)))
        }
        StoreBackend::Supabase => {
            let supabase = config
                .supabase
                .as_ref()
                .context("Supabase backend selected without credentials")?;
            let client = SupabaseClient::new(supabase)?;
            Ok(Arc::new(SupabaseStore::new(client)))
        }
    }
}
