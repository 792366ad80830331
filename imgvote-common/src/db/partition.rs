//! Chunk partition: a fixed division of the catalog into disjoint groups
//!
//! The partition is built once by the `build-chunks` job and is read-only on
//! the request path. Storage enforces the partition property: the join
//! relations carry a unique constraint on the item column, so an item can
//! never land in two chunks.

use crate::types::VotingMode;
use crate::{time, uuid_utils, Error, Result};
use rand::seq::SliceRandom;
use rand::Rng;
use sqlx::SqliteConnection;
use tracing::{info, warn};

/// Number of chunks the partition job builds unless told otherwise
pub const DEFAULT_CHUNK_COUNT: usize = 10;

// ========================================
// Reads
// ========================================

pub async fn chunk_count(conn: &mut SqliteConnection) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM chunks")
        .fetch_one(&mut *conn)
        .await?;
    Ok(count)
}

/// Item ids assigned to one chunk
pub async fn chunk_item_ids(
    conn: &mut SqliteConnection,
    mode: VotingMode,
    chunk_id: &str,
) -> Result<Vec<String>> {
    let sql = format!(
        "SELECT {col} FROM {table} WHERE chunk_id = ? ORDER BY {col}",
        col = mode.item_column(),
        table = mode.chunk_item_table()
    );
    let ids: Vec<String> = sqlx::query_scalar(&sql)
        .bind(chunk_id)
        .fetch_all(&mut *conn)
        .await?;
    Ok(ids)
}

pub async fn chunk_item_count(
    conn: &mut SqliteConnection,
    mode: VotingMode,
    chunk_id: &str,
) -> Result<i64> {
    let sql = format!(
        "SELECT COUNT(*) FROM {} WHERE chunk_id = ?",
        mode.chunk_item_table()
    );
    let count: i64 = sqlx::query_scalar(&sql)
        .bind(chunk_id)
        .fetch_one(&mut *conn)
        .await?;
    Ok(count)
}

/// Coverage of the catalog by the partition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionReport {
    pub chunks: i64,
    pub items: i64,
    pub assigned: i64,
    pub smallest_chunk: i64,
    pub largest_chunk: i64,
}

impl PartitionReport {
    /// Every item sits in exactly one chunk
    pub fn is_complete(&self) -> bool {
        self.items == self.assigned
    }
}

/// Count how much of the catalog the partition covers
pub async fn verify_partition(
    conn: &mut SqliteConnection,
    mode: VotingMode,
) -> Result<PartitionReport> {
    let items_sql = format!("SELECT COUNT(*) FROM {}", mode.item_table());
    let items: i64 = sqlx::query_scalar(&items_sql)
        .fetch_one(&mut *conn)
        .await?;

    let assigned_sql = format!(
        "SELECT COUNT(DISTINCT {}) FROM {}",
        mode.item_column(),
        mode.chunk_item_table()
    );
    let assigned: i64 = sqlx::query_scalar(&assigned_sql)
        .fetch_one(&mut *conn)
        .await?;

    let sizes_sql = format!(
        r#"
        SELECT COUNT(ci.chunk_id)
        FROM chunks c
        LEFT JOIN {} ci ON ci.chunk_id = c.id
        GROUP BY c.id
        "#,
        mode.chunk_item_table()
    );
    let sizes: Vec<i64> = sqlx::query_scalar(&sizes_sql)
        .fetch_all(&mut *conn)
        .await?;

    Ok(PartitionReport {
        chunks: sizes.len() as i64,
        items,
        assigned,
        smallest_chunk: sizes.iter().copied().min().unwrap_or(0),
        largest_chunk: sizes.iter().copied().max().unwrap_or(0),
    })
}

// ========================================
// Construction
// ========================================

/// Shuffle `ids` and deal them into `chunks` groups whose sizes differ by at most one
///
/// `chunks` is clamped to the number of ids so no group comes out empty.
pub fn split_into_chunks<R: Rng + ?Sized>(
    mut ids: Vec<String>,
    chunks: usize,
    rng: &mut R,
) -> Vec<Vec<String>> {
    let chunks = chunks.min(ids.len());
    if chunks == 0 {
        return Vec::new();
    }

    ids.shuffle(rng);

    let base = ids.len() / chunks;
    let extra = ids.len() % chunks;
    let mut remaining = ids.into_iter();

    (0..chunks)
        .map(|i| {
            let size = if i < extra { base + 1 } else { base };
            remaining.by_ref().take(size).collect()
        })
        .collect()
}

/// Write a partition built by [`split_into_chunks`]
///
/// Refuses to run over an existing partition; call [`clear_partition`] first.
/// Returns the new chunk ids.
pub async fn write_partition(
    conn: &mut SqliteConnection,
    mode: VotingMode,
    groups: &[Vec<String>],
) -> Result<Vec<String>> {
    if groups.is_empty() {
        return Err(Error::Config(format!(
            "no {} in the catalog to partition",
            mode.item_table()
        )));
    }

    let existing = chunk_count(conn).await?;
    if existing > 0 {
        return Err(Error::InvalidState(format!(
            "partition already built ({} chunks)",
            existing
        )));
    }

    let insert_member = format!(
        "INSERT INTO {} (chunk_id, {}) VALUES (?, ?)",
        mode.chunk_item_table(),
        mode.item_column()
    );

    let created_at = time::now();
    let mut chunk_ids = Vec::with_capacity(groups.len());

    for group in groups {
        let chunk_id = uuid_utils::generate().to_string();
        sqlx::query("INSERT INTO chunks (id, created_at) VALUES (?, ?)")
            .bind(&chunk_id)
            .bind(created_at)
            .execute(&mut *conn)
            .await?;

        for item_id in group {
            sqlx::query(&insert_member)
                .bind(&chunk_id)
                .bind(item_id)
                .execute(&mut *conn)
                .await?;
        }

        info!("Chunk {}: {} {}", chunk_id, group.len(), mode.item_table());
        chunk_ids.push(chunk_id);
    }

    Ok(chunk_ids)
}

/// Remove every chunk and its membership rows
///
/// Refused while any session references a chunk: those sessions would lose
/// their scope.
pub async fn clear_partition(conn: &mut SqliteConnection) -> Result<u64> {
    let referencing: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM sessions WHERE chunk_id IS NOT NULL")
            .fetch_one(&mut *conn)
            .await?;
    if referencing > 0 {
        return Err(Error::InvalidState(format!(
            "{} session(s) reference existing chunks",
            referencing
        )));
    }

    sqlx::query("DELETE FROM chunk_prompts")
        .execute(&mut *conn)
        .await?;
    sqlx::query("DELETE FROM chunk_pairs")
        .execute(&mut *conn)
        .await?;
    let removed = sqlx::query("DELETE FROM chunks")
        .execute(&mut *conn)
        .await?
        .rows_affected();

    if removed > 0 {
        warn!("Cleared existing partition of {} chunks", removed);
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::catalog::insert_prompt;
    use crate::db::init_memory_database;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    fn ids(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("item-{:03}", i)).collect()
    }

    #[test]
    fn test_split_sizes_differ_by_at_most_one() {
        let mut rng = StdRng::seed_from_u64(7);
        let groups = split_into_chunks(ids(23), 10, &mut rng);

        assert_eq!(groups.len(), 10);
        let sizes: Vec<usize> = groups.iter().map(Vec::len).collect();
        assert_eq!(sizes.iter().sum::<usize>(), 23);
        assert!(sizes.iter().max().unwrap() - sizes.iter().min().unwrap() <= 1);

        let unique: HashSet<&String> = groups.iter().flatten().collect();
        assert_eq!(unique.len(), 23);
    }

    #[test]
    fn test_split_clamps_chunk_count() {
        let mut rng = StdRng::seed_from_u64(7);
        let groups = split_into_chunks(ids(3), 10, &mut rng);
        assert_eq!(groups.len(), 3);
        assert!(groups.iter().all(|g| g.len() == 1));

        assert!(split_into_chunks(Vec::new(), 10, &mut rng).is_empty());
    }

    #[tokio::test]
    async fn test_write_and_verify_partition() {
        let pool = init_memory_database().await.unwrap();
        let mut conn = pool.acquire().await.unwrap();

        let mut prompt_ids = Vec::new();
        for i in 0..7 {
            prompt_ids.push(
                insert_prompt(&mut conn, &format!("prompt {}", i), None)
                    .await
                    .unwrap(),
            );
        }

        let mut rng = StdRng::seed_from_u64(42);
        let groups = split_into_chunks(prompt_ids, 3, &mut rng);
        let chunk_ids = write_partition(&mut conn, VotingMode::Prompt, &groups)
            .await
            .unwrap();
        assert_eq!(chunk_ids.len(), 3);

        let report = verify_partition(&mut conn, VotingMode::Prompt).await.unwrap();
        assert!(report.is_complete());
        assert_eq!(report.chunks, 3);
        assert_eq!((report.smallest_chunk, report.largest_chunk), (2, 3));

        let members = chunk_item_ids(&mut conn, VotingMode::Prompt, &chunk_ids[0])
            .await
            .unwrap();
        assert_eq!(members.len(), 3);

        // Second build without clearing is refused
        let err = write_partition(&mut conn, VotingMode::Prompt, &groups)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidState(_)));
    }

    #[tokio::test]
    async fn test_empty_catalog_is_config_error() {
        let pool = init_memory_database().await.unwrap();
        let mut conn = pool.acquire().await.unwrap();

        let err = write_partition(&mut conn, VotingMode::Pair, &[])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[tokio::test]
    async fn test_clear_refused_while_sessions_reference_chunks() {
        let pool = init_memory_database().await.unwrap();
        let mut conn = pool.acquire().await.unwrap();

        let prompt_id = insert_prompt(&mut conn, "only", None).await.unwrap();
        let chunk_ids = write_partition(&mut conn, VotingMode::Prompt, &[vec![prompt_id]])
            .await
            .unwrap();
        sqlx::query(
            "INSERT INTO sessions (id, created_at, last_activity, status, chunk_id) \
             VALUES ('s1', '2025-11-01T00:00:00Z', '2025-11-01T00:00:00Z', 'active', ?)",
        )
        .bind(&chunk_ids[0])
        .execute(&mut *conn)
        .await
        .unwrap();

        let err = clear_partition(&mut conn).await.unwrap_err();
        assert!(matches!(err, Error::InvalidState(_)));

        sqlx::query("DELETE FROM sessions")
            .execute(&mut *conn)
            .await
            .unwrap();
        assert_eq!(clear_partition(&mut conn).await.unwrap(), 1);
        assert_eq!(chunk_count(&mut conn).await.unwrap(), 0);
    }
}
