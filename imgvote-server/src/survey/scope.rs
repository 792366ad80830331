//! Session scope: the items a session works through
//!
//! A session with a chunk is scoped to that chunk's items; a session without
//! one covers the whole catalog of the configured mode.

use imgvote_common::db::{catalog, partition};
use imgvote_common::types::VotingMode;
use imgvote_common::Result;
use sqlx::SqliteConnection;

pub async fn item_ids(
    conn: &mut SqliteConnection,
    mode: VotingMode,
    chunk_id: Option<&str>,
) -> Result<Vec<String>> {
    match chunk_id {
        Some(chunk_id) => partition::chunk_item_ids(conn, mode, chunk_id).await,
        None => catalog::all_item_ids(conn, mode).await,
    }
}

pub async fn total_items(
    conn: &mut SqliteConnection,
    mode: VotingMode,
    chunk_id: Option<&str>,
) -> Result<i64> {
    match chunk_id {
        Some(chunk_id) => partition::chunk_item_count(conn, mode, chunk_id).await,
        None => catalog::item_count(conn, mode).await,
    }
}

pub async fn contains(
    conn: &mut SqliteConnection,
    mode: VotingMode,
    chunk_id: Option<&str>,
    item_id: &str,
) -> Result<bool> {
    match chunk_id {
        Some(chunk_id) => {
            let sql = format!(
                "SELECT EXISTS(SELECT 1 FROM {} WHERE chunk_id = ? AND {} = ?)",
                mode.chunk_item_table(),
                mode.item_column()
            );
            let exists: bool = sqlx::query_scalar(&sql)
                .bind(chunk_id)
                .bind(item_id)
                .fetch_one(&mut *conn)
                .await?;
            Ok(exists)
        }
        None => catalog::item_exists(conn, mode, item_id).await,
    }
}

/// Items this session has a vote on
pub async fn voted_item_ids(
    conn: &mut SqliteConnection,
    mode: VotingMode,
    session_id: &str,
) -> Result<Vec<String>> {
    let sql = format!(
        "SELECT {} FROM {} WHERE session_id = ?",
        mode.item_column(),
        mode.vote_table()
    );
    let ids: Vec<String> = sqlx::query_scalar(&sql)
        .bind(session_id)
        .fetch_all(&mut *conn)
        .await?;
    Ok(ids)
}

/// Distinct items this session has voted on
///
/// Votes are only accepted for items in scope, so this never exceeds
/// [`total_items`].
pub async fn votes_cast(
    conn: &mut SqliteConnection,
    mode: VotingMode,
    session_id: &str,
) -> Result<i64> {
    let sql = format!(
        "SELECT COUNT(DISTINCT {}) FROM {} WHERE session_id = ?",
        mode.item_column(),
        mode.vote_table()
    );
    let count: i64 = sqlx::query_scalar(&sql)
        .bind(session_id)
        .fetch_one(&mut *conn)
        .await?;
    Ok(count)
}
