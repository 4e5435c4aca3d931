pub mod models;
pub mod db;
pub mod services;
pub mod handlers;
pub mod routes;
pub mod error;
pub mod utils;
pub mod constants;

pub use utils::config::Config;
pub use db::connection::get_db_pool;
pub use error::{MatchingError, MatchingResult};

// Re-export common types
pub use sqlx::PgPool;
pub use anyhow::Result;
pub use uuid::Uuid;
pub use chrono::{DateTime, Utc};

use std::sync::Arc;

use db::{DatabaseConfig, InMemoryMatchingStore, MatchingStore, PgMatchingStore};
use utils::StorageBackend;

/// Build the configured storage gateway. Postgres runs pending migrations first.
pub async fn open_store(config: &Config) -> Result<Arc<dyn MatchingStore>> {
    match config.storage_backend {
        StorageBackend::Postgres => {
            let db_config = DatabaseConfig::from_env()?;
            let pool = get_db_pool(&db_config).await?;
            db::migrations::run_migrations(&pool).await?;
            Ok(Arc::new(PgMatchingStore::new(pool)))
        }
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage; data will not survive a restart");
            Ok(Arc::new(InMemoryMatchingStore::new()))
        }
    }
}
