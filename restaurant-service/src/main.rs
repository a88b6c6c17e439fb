use std::sync::Arc;

use anyhow::Context;
use common_observability::init_tracing;
use restaurant_service::accounts::ensure_admin;
use restaurant_service::config::{ServiceConfig, StoreBackend};
use restaurant_service::store::{MemoryStore, PgStore, Store};
use restaurant_service::{build_router, AppState};
use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;
use tracing::{info, warn};

async fn build_store(config: &ServiceConfig) -> anyhow::Result<Arc<dyn Store>> {
    match config.store_backend {
        StoreBackend::Postgres => {
            let url = config
                .database_url
                .as_deref()
                .context("DATABASE_URL must be set")?;
            let pool = PgPoolOptions::new()
                .max_connections(config.database_max_connections)
                .connect(url)
                .await
                .context("Failed to connect to Postgres")?;
            // Ensure database schema is up to date before serving traffic
            sqlx::migrate!("./migrations")
                .run(&pool)
                .await
                .context("Failed to run migrations")?;
            info!(max_connections = config.database_max_connections, "Postgres store ready");
            Ok(Arc::new(PgStore::new(pool)))
        }
        StoreBackend::Memory => {
            warn!("Using in-memory store; data is lost on restart");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing("info");

    let config = ServiceConfig::from_env()?;
    let store = build_store(&config).await?;

    if let Some(admin) = &config.admin {
        ensure_admin(store.as_ref(), &admin.username, &admin.password)
            .await
            .context("Failed to bootstrap admin account")?;
    }

    let addr = config.bind_addr();
    let state = AppState::new(store, config)?;
    let app = build_router(state);

    info!(%addr, "starting restaurant-service");
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
