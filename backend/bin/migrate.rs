use matchings::{utils, get_db_pool};
use matchings::db::DatabaseConfig;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    utils::init_logging();

    let db_config = DatabaseConfig::from_env()?;
    let pool = get_db_pool(&db_config).await?;

    info!("🔄 Running matchings schema migrations...");
    matchings::db::migrations::run_migrations(&pool).await?;
    info!("✅ Matchings schema is up to date");

    pool.close().await;
    Ok(())
}
