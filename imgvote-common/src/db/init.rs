//! Database initialization
//!
//! Creates the survey schema on first run and opens it on later runs. All
//! `CREATE` statements are idempotent, so calling [`init_database`] against an
//! existing file is safe.

use crate::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    // WAL lets concurrent readers proceed while one request writes
    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_millis(5000));

    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect_with(options)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    create_schema(&pool).await?;

    // Manual migrations run after CREATE TABLE IF NOT EXISTS
    crate::db::migrations::run_migrations(&pool).await?;

    Ok(pool)
}

/// Open a private in-memory database with the full schema
///
/// The pool holds a single connection that never expires: every connection
/// to `sqlite::memory:` gets its own database, so a second one would see
/// empty tables.
pub async fn init_memory_database() -> Result<SqlitePool> {
    let options = SqliteConnectOptions::new()
        .in_memory(true)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?;

    create_schema(&pool).await?;
    crate::db::migrations::run_migrations(&pool).await?;

    Ok(pool)
}

/// Create every survey table (idempotent)
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    create_schema_version_table(pool).await?;

    // Catalog (read-only after ingestion)
    create_prompts_table(pool).await?;
    create_images_table(pool).await?;
    create_pairs_table(pool).await?;

    // Chunk partition (built once by the partition job)
    create_chunks_table(pool).await?;
    create_chunk_prompts_table(pool).await?;
    create_chunk_pairs_table(pool).await?;

    // Participant state
    create_sessions_table(pool).await?;
    create_prompt_votes_table(pool).await?;
    create_pair_votes_table(pool).await?;

    Ok(())
}

async fn create_schema_version_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_prompts_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS prompts (
            id TEXT PRIMARY KEY,
            text TEXT NOT NULL,
            category TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_images_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS images (
            id TEXT PRIMARY KEY,
            prompt_id TEXT NOT NULL REFERENCES prompts(id),
            model TEXT NOT NULL,
            url TEXT NOT NULL,
            CONSTRAINT uq_images_prompt_model UNIQUE (prompt_id, model)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_pairs_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS pairs (
            id TEXT PRIMARY KEY,
            prompt_id TEXT NOT NULL REFERENCES prompts(id),
            image_a_id TEXT NOT NULL REFERENCES images(id),
            image_b_id TEXT NOT NULL REFERENCES images(id),
            CONSTRAINT uq_pairs_prompt UNIQUE (prompt_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_chunks_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS chunks (
            id TEXT PRIMARY KEY,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Chunk membership for prompt mode
///
/// The second unique constraint keeps the mapping a partition: a prompt
/// lives in at most one chunk.
async fn create_chunk_prompts_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS chunk_prompts (
            chunk_id TEXT NOT NULL REFERENCES chunks(id) ON DELETE CASCADE,
            prompt_id TEXT NOT NULL REFERENCES prompts(id) ON DELETE CASCADE,
            CONSTRAINT uq_chunk_prompts_chunk_prompt UNIQUE (chunk_id, prompt_id),
            CONSTRAINT uq_chunk_prompts_prompt UNIQUE (prompt_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Chunk membership for pair mode
async fn create_chunk_pairs_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS chunk_pairs (
            chunk_id TEXT NOT NULL REFERENCES chunks(id) ON DELETE CASCADE,
            pair_id TEXT NOT NULL REFERENCES pairs(id) ON DELETE CASCADE,
            CONSTRAINT uq_chunk_pairs_chunk_pair UNIQUE (chunk_id, pair_id),
            CONSTRAINT uq_chunk_pairs_pair UNIQUE (pair_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Participant sessions
///
/// `chunk_id` NULL marks a session over the unpartitioned catalog.
/// `last_activity` is nullable only for rows that predate activity tracking;
/// migration v1 backfills them.
async fn create_sessions_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sessions (
            id TEXT PRIMARY KEY,
            created_at TIMESTAMP NOT NULL,
            last_activity TIMESTAMP,
            completed_at TIMESTAMP,
            status TEXT NOT NULL DEFAULT 'active'
                CHECK (status IN ('active', 'completed', 'abandoned')),
            chunk_id TEXT REFERENCES chunks(id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_sessions_chunk_status ON sessions(chunk_id, status)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Prompt-mode votes (revisable: second vote updates in place)
async fn create_prompt_votes_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS prompt_votes (
            id TEXT PRIMARY KEY,
            session_id TEXT NOT NULL REFERENCES sessions(id) ON DELETE CASCADE,
            prompt_id TEXT NOT NULL REFERENCES prompts(id),
            winner_model TEXT NOT NULL,
            reaction_time_ms INTEGER,
            created_at TIMESTAMP NOT NULL,
            updated_at TIMESTAMP,
            CONSTRAINT uq_prompt_votes_session_prompt UNIQUE (session_id, prompt_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Pair-mode votes (immutable once cast)
async fn create_pair_votes_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS pair_votes (
            id TEXT PRIMARY KEY,
            session_id TEXT NOT NULL REFERENCES sessions(id) ON DELETE CASCADE,
            pair_id TEXT NOT NULL REFERENCES pairs(id),
            winner_model TEXT NOT NULL,
            left_model TEXT NOT NULL,
            reaction_time_ms INTEGER,
            created_at TIMESTAMP NOT NULL,
            CONSTRAINT uq_pair_votes_session_pair UNIQUE (session_id, pair_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
