mod config;

use std::net::SocketAddr;
use std::sync::Arc;

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use stash_api::auth::AppStateInner;
use stash_api::enrich::{Enricher, EnricherConfig};
use stash_db::{JsonStore, Repository, SqliteStore};

use crate::config::{Config, ConfigError, StoreKind};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "stash=debug,tower_http=debug".into()),
        )
        .init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(ConfigError::MissingSecret) => {
            eprintln!("FATAL: STASH_JWT_SECRET is unset or still a placeholder.");
            eprintln!("       Set it in your .env file and restart.");
            std::process::exit(1);
        }
        Err(e) => return Err(e.into()),
    };

    // Init store
    let repo: Arc<dyn Repository> = match config.store {
        StoreKind::Json => Arc::new(JsonStore::open(&config.db_path)?),
        StoreKind::Sqlite => Arc::new(SqliteStore::open(&config.db_path)?),
    };

    let enricher = Enricher::new(EnricherConfig {
        summarizer_url: config.summarizer_url.clone(),
        ..EnricherConfig::default()
    })?;

    let state = AppStateInner::new(repo, config.jwt_secret.clone(), enricher);

    let app = stash_api::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("Stash server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
