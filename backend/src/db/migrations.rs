use anyhow::Result;
use sqlx::PgPool;
use sqlx::migrate::Migrator;

/// Schema for matchings, memberships and the read-only user directory.
static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    MIGRATOR.run(pool).await?;
    tracing::info!("Applied {} schema migration(s)", MIGRATOR.iter().count());
    Ok(())
}
