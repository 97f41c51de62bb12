//! Embedded schema migrations.

use sqlx::PgPool;
use tracing::info;

use tally_core::error::{AppError, ErrorKind};

/// Apply every migration under `migrations/` that has not run yet.
pub async fn run_migrations(pool: &PgPool) -> Result<(), AppError> {
    let migrator = sqlx::migrate!("../../migrations");
    info!(available = migrator.iter().count(), "Applying database migrations");

    migrator.run(pool).await.map_err(|e| {
        AppError::with_source(ErrorKind::Database, format!("Migration failed: {e}"), e)
    })?;

    info!("Database schema is up to date");
    Ok(())
}

/// Versions and descriptions of embedded migrations not yet applied.
pub async fn pending_migrations(pool: &PgPool) -> Result<Vec<(i64, String)>, AppError> {
    use sqlx::migrate::Migrate;

    let migrator = sqlx::migrate!("../../migrations");
    let mut conn = pool.acquire().await.map_err(|e| {
        AppError::with_source(ErrorKind::Database, format!("Failed to acquire connection: {e}"), e)
    })?;
    let applied = async {
        conn.ensure_migrations_table().await?;
        conn.list_applied_migrations().await
    }
    .await
    .map_err(|e| {
        AppError::with_source(ErrorKind::Database, format!("Migration status failed: {e}"), e)
    })?;

    Ok(migrator
        .iter()
        .filter(|m| !m.migration_type.is_down_migration())
        .filter(|m| applied.iter().all(|a| a.version != m.version))
        .map(|m| (m.version, m.description.to_string()))
        .collect())
}
