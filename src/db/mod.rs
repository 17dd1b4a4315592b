//! Postgres connection pool and migrations.
//!
//! The pool backs the pgmq control queue used by [`crate::transport::PgmqTransport`].

pub mod pgmq;

use crate::error::{Error, Result};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

/// Database handle.
pub struct Db {
    pool: PgPool,
}

impl Db {
    /// Connect to Postgres. An unreachable server surfaces as a storage error.
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(4)
            .connect(url)
            .await?;
        Ok(Self { pool })
    }

    /// Run pending migrations (installs the pgmq extension).
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| Error::Other(format!("migration failed: {e}")))
    }

    pub async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
