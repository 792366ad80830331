//! Chunk assignment for new sessions
//!
//! Greedy and stateless: the only input is the number of completed sessions
//! per chunk, read from the session rows. While some chunk is below the
//! completion goal, a new session goes to one of the least-completed chunks
//! below the goal (ties broken uniformly at random). Once every chunk has
//! reached the goal, assignment is uniform over all chunks.
//!
//! The read and the session insert share a transaction but no lock, so
//! concurrent session creation can pick the same "neediest" chunk. Balance is
//! statistical, not exact.

use imgvote_common::types::SessionStatus;
use imgvote_common::{Error, Result};
use rand::seq::SliceRandom;
use rand::Rng;
use sqlx::SqliteConnection;
use tracing::{debug, info};

/// Completed-session count of one chunk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkLoad {
    pub chunk_id: String,
    pub completed: i64,
}

/// Completed sessions per chunk, zero for chunks nobody has finished
pub async fn completed_counts(conn: &mut SqliteConnection) -> Result<Vec<ChunkLoad>> {
    let rows: Vec<(String, i64)> = sqlx::query_as(
        r#"
        SELECT c.id, COUNT(s.id)
        FROM chunks c
        LEFT JOIN sessions s ON s.chunk_id = c.id AND s.status = ?
        GROUP BY c.id
        ORDER BY c.created_at, c.id
        "#,
    )
    .bind(SessionStatus::Completed.as_str())
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(chunk_id, completed)| ChunkLoad {
            chunk_id,
            completed,
        })
        .collect())
}

/// Pick a chunk from `loads` given completion goal `goal`
///
/// Returns `None` only when `loads` is empty.
pub fn select_chunk<'a, R: Rng + ?Sized>(
    loads: &'a [ChunkLoad],
    goal: i64,
    rng: &mut R,
) -> Option<&'a ChunkLoad> {
    let below_goal: Vec<&ChunkLoad> = loads.iter().filter(|l| l.completed < goal).collect();

    match below_goal.iter().map(|l| l.completed).min() {
        Some(min) => {
            let neediest: Vec<&ChunkLoad> = below_goal
                .into_iter()
                .filter(|l| l.completed == min)
                .collect();
            neediest.choose(rng).copied()
        }
        None => loads.choose(rng),
    }
}

/// Choose the chunk for a new session
///
/// Fails with a configuration error when no partition has been built.
pub async fn assign<R: Rng + Send + ?Sized>(
    conn: &mut SqliteConnection,
    goal: i64,
    rng: &mut R,
) -> Result<String> {
    let loads = completed_counts(conn).await?;
    debug!("Chunk loads: {:?}", loads);

    let chosen = select_chunk(&loads, goal, rng).ok_or_else(|| {
        Error::Config("no chunks exist; run build-chunks to create the partition".to_string())
    })?;

    info!(
        "Assigned chunk {} ({} completed, goal {})",
        chosen.chunk_id, chosen.completed, goal
    );
    Ok(chosen.chunk_id.clone())
}
