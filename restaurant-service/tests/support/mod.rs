use std::env;

use anyhow::{Context, Result};
use sqlx::{postgres::PgPoolOptions, PgPool};

pub struct TestDatabase {
    pool: PgPool,
}

impl TestDatabase {
    /// Connects to `TEST_DATABASE_URL` and applies migrations; `None` when the variable is unset.
    pub async fn setup() -> Result<Option<Self>> {
        let Ok(database_url) = env::var("TEST_DATABASE_URL") else {
            eprintln!("Skipping restaurant-service Postgres tests: set TEST_DATABASE_URL to run them.");
            return Ok(None);
        };

        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(&database_url)
            .await
            .context("failed to connect to TEST_DATABASE_URL")?;
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .context("failed to apply migrations")?;

        Ok(Some(Self { pool }))
    }

    pub fn pool_clone(&self) -> PgPool {
        self.pool.clone()
    }
}

/// Usernames shared across runs against the same database must not collide.
pub fn unique_name(prefix: &str) -> String {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    format!("{prefix}-{nanos}")
}
