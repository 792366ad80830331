//! Session lifecycle: active → completed | abandoned
//!
//! There is no background sweep. Abandonment is detected lazily by [`touch`],
//! which every session-facing operation calls first. A stale session that is
//! never contacted again stays `active` in storage indefinitely; reports that
//! count statuses see it as active.
//!
//! Both transitions are guarded by `status = 'active'` in the UPDATE, so
//! re-evaluating a terminal session is a no-op and `completed_at` is written
//! at most once.

use chrono::{DateTime, Utc};
use imgvote_common::config::SurveyConfig;
use imgvote_common::db::{SessionRow, SESSION_COLUMNS};
use imgvote_common::types::SessionStatus;
use imgvote_common::{time, Error, Result};
use sqlx::SqliteConnection;
use tracing::{info, warn};

use super::scope;

pub async fn insert_session(
    conn: &mut SqliteConnection,
    session_id: &str,
    chunk_id: Option<&str>,
    now: DateTime<Utc>,
) -> Result<()> {
    sqlx::query(
        "INSERT INTO sessions (id, created_at, last_activity, status, chunk_id) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(session_id)
    .bind(now)
    .bind(now)
    .bind(SessionStatus::Active.as_str())
    .bind(chunk_id)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

pub async fn load_session(conn: &mut SqliteConnection, session_id: &str) -> Result<SessionRow> {
    let sql = format!("SELECT {} FROM sessions WHERE id = ?", SESSION_COLUMNS);
    let row = sqlx::query(&sql)
        .bind(session_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| Error::NotFound(format!("session {}", session_id)))?;
    SessionRow::from_row(&row)
}

/// Record contact with a session, abandoning it first if it went stale
///
/// The abandonment check runs against the stored `last_activity`, before it
/// is refreshed: an active session idle for longer than the configured
/// threshold that has not voted on every item in scope becomes `abandoned`.
/// Returns the session as stored afterwards.
pub async fn touch(
    conn: &mut SqliteConnection,
    config: &SurveyConfig,
    session_id: &str,
    now: DateTime<Utc>,
) -> Result<SessionRow> {
    let session = load_session(conn, session_id).await?;

    if session.is_active() && time::is_stale(session.last_activity, now, config.abandon_after()) {
        let chunk_id = session.chunk_id.as_deref();
        let voted = scope::votes_cast(conn, config.mode, &session.id).await?;
        let total = scope::total_items(conn, config.mode, chunk_id).await?;

        if voted < total {
            let result = sqlx::query(
                "UPDATE sessions SET status = ? WHERE id = ? AND status = ?",
            )
            .bind(SessionStatus::Abandoned.as_str())
            .bind(&session.id)
            .bind(SessionStatus::Active.as_str())
            .execute(&mut *conn)
            .await?;

            if result.rows_affected() > 0 {
                warn!(
                    "Session {} abandoned after {}h idle ({}/{} items voted)",
                    session.id,
                    now.signed_duration_since(session.last_activity).num_hours(),
                    voted,
                    total
                );
            }
        }
    }

    sqlx::query("UPDATE sessions SET last_activity = ? WHERE id = ?")
        .bind(now)
        .bind(&session.id)
        .execute(&mut *conn)
        .await?;

    load_session(conn, &session.id).await
}

/// Mark an active session completed
///
/// Returns true when this call made the transition.
pub async fn complete(
    conn: &mut SqliteConnection,
    session_id: &str,
    now: DateTime<Utc>,
) -> Result<bool> {
    let result = sqlx::query(
        "UPDATE sessions SET status = ?, completed_at = ? WHERE id = ? AND status = ?",
    )
    .bind(SessionStatus::Completed.as_str())
    .bind(now)
    .bind(session_id)
    .bind(SessionStatus::Active.as_str())
    .execute(&mut *conn)
    .await?;

    let transitioned = result.rows_affected() > 0;
    if transitioned {
        info!("Session {} completed", session_id);
    }
    Ok(transitioned)
}
