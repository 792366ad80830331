//! Database schema migrations
//!
//! Versioned, idempotent migrations tracked in the `schema_version` table.
//! They run after the `CREATE TABLE IF NOT EXISTS` pass, so every migration
//! must tolerate both a fresh schema and an old one.
//!
//! # Migration Guidelines
//!
//! 1. **Never modify existing migrations** - databases in the field may already have them applied
//! 2. **Always add new migrations** - one function per schema change
//! 3. **Check before altering** - a fresh database already has the new shape

use crate::Result;
use sqlx::SqlitePool;
use tracing::{info, warn};

/// Current schema version
///
/// **IMPORTANT:** Increment this when adding new migrations
const CURRENT_SCHEMA_VERSION: i32 = 2;

/// Get current schema version from database
///
/// Returns 0 if schema_version table doesn't exist or has no rows
pub async fn get_schema_version(pool: &SqlitePool) -> Result<i32> {
    let table_exists: bool = sqlx::query_scalar(
        r#"
        SELECT EXISTS(
            SELECT 1 FROM sqlite_master
            WHERE type='table' AND name='schema_version'
        )
        "#,
    )
    .fetch_one(pool)
    .await?;

    if !table_exists {
        return Ok(0);
    }

    let version: Option<i32> =
        sqlx::query_scalar("SELECT version FROM schema_version ORDER BY version DESC LIMIT 1")
            .fetch_optional(pool)
            .await?;

    Ok(version.unwrap_or(0))
}

async fn set_schema_version(pool: &SqlitePool, version: i32) -> Result<()> {
    sqlx::query("INSERT INTO schema_version (version) VALUES (?)")
        .bind(version)
        .execute(pool)
        .await?;

    Ok(())
}

/// Run all pending migrations
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    let current_version = get_schema_version(pool).await?;

    if current_version == CURRENT_SCHEMA_VERSION {
        info!("Database schema is up to date (v{})", current_version);
        return Ok(());
    }

    if current_version > CURRENT_SCHEMA_VERSION {
        warn!(
            "Database schema version ({}) is newer than code version ({})",
            current_version, CURRENT_SCHEMA_VERSION
        );
        return Ok(());
    }

    info!(
        "Running database migrations: v{} -> v{}",
        current_version, CURRENT_SCHEMA_VERSION
    );

    if current_version < 1 {
        migrate_v1(pool).await?;
        set_schema_version(pool, 1).await?;
        info!("✓ Migration v1 completed");
    }

    if current_version < 2 {
        migrate_v2(pool).await?;
        set_schema_version(pool, 2).await?;
        info!("✓ Migration v2 completed");
    }

    Ok(())
}

/// Migration v1: backfill `sessions.last_activity`
///
/// Sessions created before activity tracking have no `last_activity`. Using
/// `created_at` makes them eligible for the abandonment check like any other.
async fn migrate_v1(pool: &SqlitePool) -> Result<()> {
    let result = sqlx::query(
        "UPDATE sessions SET last_activity = created_at WHERE last_activity IS NULL",
    )
    .execute(pool)
    .await?;

    if result.rows_affected() > 0 {
        info!(
            "  Backfilled last_activity for {} session(s)",
            result.rows_affected()
        );
    }
    Ok(())
}

/// Migration v2: add `prompt_votes.updated_at`
///
/// Databases from before revisable votes lack the column.
async fn migrate_v2(pool: &SqlitePool) -> Result<()> {
    let has_column: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM pragma_table_info('prompt_votes') WHERE name = 'updated_at'",
    )
    .fetch_one(pool)
    .await?;

    if has_column > 0 {
        return Ok(());
    }

    sqlx::query("ALTER TABLE prompt_votes ADD COLUMN updated_at TIMESTAMP")
        .execute(pool)
        .await?;

    info!("  Added updated_at column to prompt_votes");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn bare_pool() -> SqlitePool {
        SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_version_zero_without_table() {
        let pool = bare_pool().await;
        assert_eq!(get_schema_version(&pool).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_backfills_last_activity_and_adds_column() {
        let pool = bare_pool().await;

        // Old shape: no last_activity values, no updated_at column
        sqlx::query(
            "CREATE TABLE schema_version (version INTEGER PRIMARY KEY, \
             applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP)",
        )
        .execute(&pool)
        .await
        .unwrap();
        sqlx::query(
            "CREATE TABLE sessions (id TEXT PRIMARY KEY, created_at TIMESTAMP NOT NULL, \
             last_activity TIMESTAMP, completed_at TIMESTAMP, status TEXT NOT NULL, chunk_id TEXT)",
        )
        .execute(&pool)
        .await
        .unwrap();
        sqlx::query(
            "CREATE TABLE prompt_votes (id TEXT PRIMARY KEY, session_id TEXT NOT NULL, \
             prompt_id TEXT NOT NULL, winner_model TEXT NOT NULL, reaction_time_ms INTEGER, \
             created_at TIMESTAMP NOT NULL)",
        )
        .execute(&pool)
        .await
        .unwrap();
        sqlx::query(
            "INSERT INTO sessions (id, created_at, status) VALUES ('s1', '2025-10-01 10:00:00', 'active')",
        )
        .execute(&pool)
        .await
        .unwrap();

        run_migrations(&pool).await.unwrap();

        let last_activity: String =
            sqlx::query_scalar("SELECT last_activity FROM sessions WHERE id = 's1'")
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(last_activity, "2025-10-01 10:00:00");

        let has_column: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM pragma_table_info('prompt_votes') WHERE name = 'updated_at'",
        )
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(has_column, 1);
        assert_eq!(get_schema_version(&pool).await.unwrap(), CURRENT_SCHEMA_VERSION);

        // Second run is a no-op
        run_migrations(&pool).await.unwrap();
    }
}
