//! # studyhall-db
//!
//! Database layer for StudyHall. Manages connections to:
//! - **PostgreSQL** — users, rooms, messages, posts, groups, tasks (relational data)
//! - **Redis** — optional response cache; an in-process TTL map is used when
//!   no Redis URL is configured or the connection drops.

pub mod cache;
pub mod repository;

pub use cache::Cache;

use anyhow::Result;
use sqlx::PgPool;

/// Shared database state passed through Axum extractors.
#[derive(Clone)]
pub struct Database {
    pub pool: PgPool,
}

impl Database {
    /// Connect to PostgreSQL.
    pub async fn connect(config: &studyhall_common::config::AppConfig) -> Result<Self> {
        tracing::info!("Connecting to PostgreSQL...");
        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(config.database.max_connections)
            .min_connections(config.database.min_connections)
            .connect(&config.database.url)
            .await?;
        tracing::info!("Connected to PostgreSQL");

        Ok(Self { pool })
    }

    /// Run database migrations.
    pub async fn migrate(&self) -> Result<()> {
        tracing::info!("Running database migrations...");
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        tracing::info!("Migrations complete");
        Ok(())
    }
}
