use sqlx::{postgres::PgPoolOptions, Pool, Postgres};
use std::{future::Future, time::Duration};
use tracing::{info, warn};

use crate::error::{AppError, AppResult};

#[derive(Clone)]
pub struct Database {
    pub pool: Pool<Postgres>,
}

impl Database {
    pub async fn new(
        database_url: &str,
        pool_size: u32,
        acquire_timeout: Duration,
    ) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(pool_size)
            .acquire_timeout(acquire_timeout)
            .connect(database_url)
            .await?;

        Ok(Database { pool })
    }

    pub fn from_pool(pool: Pool<Postgres>) -> Self {
        Database { pool }
    }

    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        info!("Running database migrations...");
        sqlx::migrate!("./src/migrations").run(&self.pool).await?;
        info!("Migrations completed");
        Ok(())
    }
}

/// Serialization failures, deadlocks and connection hiccups. Anything else
/// (constraint violations included) is final.
pub fn is_transient(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db) => matches!(db.code().as_deref(), Some("40001") | Some("40P01")),
        sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) => true,
        _ => false,
    }
}

/// Runs `op` and, if it failed on a transient storage condition, runs it
/// exactly once more. `op` must build a fresh transaction on every call.
pub async fn retry_transient<T, F, Fut>(operation: &str, mut op: F) -> AppResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = AppResult<T>>,
{
    match op().await {
        Err(AppError::Database(e)) if is_transient(&e) => {
            warn!("{} hit a transient storage failure, retrying once: {}", operation, e);
            op().await
        }
        other => other,
    }
}
