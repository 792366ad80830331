//! Vote recording
//!
//! One decision per (session, item), backed by a unique constraint in
//! storage. The two modes treat a repeat differently:
//!
//! - pair mode: votes are immutable, a repeat is `Conflict`
//! - prompt mode: a repeat revises the stored outcome in place and reports
//!   `updated`. The earlier answer is lost; this lets a participant change
//!   their mind or a flaky client double-submit without an error.

use chrono::{DateTime, Utc};
use imgvote_common::api::types::{CastVoteRequest, VoteDisposition};
use imgvote_common::config::SurveyConfig;
use imgvote_common::db::catalog::{self, Item};
use imgvote_common::db::SessionRow;
use imgvote_common::error::is_unique_violation;
use imgvote_common::types::{ModelName, Outcome, VotingMode};
use imgvote_common::{uuid_utils, Error, Result};
use sqlx::SqliteConnection;
use tracing::{debug, info};

use super::scope;

/// A validated vote, ready to record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ballot {
    pub session_id: String,
    pub item_id: String,
    pub winner: Outcome,
    /// Model shown on the left; always `Some` in pair mode
    pub left_model: Option<ModelName>,
    pub reaction_time_ms: Option<i64>,
}

impl Ballot {
    /// Validate a request body for the given mode
    ///
    /// Identifier and enumeration problems are all `InvalidInput`.
    pub fn parse(request: &CastVoteRequest, mode: VotingMode) -> Result<Self> {
        let session_id = uuid_utils::parse_field("session_id", &request.session_id)?;

        let item_id = match mode {
            VotingMode::Pair => uuid_utils::parse_field("item_id", &request.item_id)?.to_string(),
            VotingMode::Prompt => {
                let id = request.item_id.trim();
                if id.is_empty() {
                    return Err(Error::InvalidInput("item_id must not be empty".to_string()));
                }
                id.to_string()
            }
        };

        let winner: Outcome = request.winner_model.parse()?;

        let left_model = match mode {
            VotingMode::Pair => {
                let left = request.left_model.as_deref().ok_or_else(|| {
                    Error::InvalidInput("left_model is required in pair mode".to_string())
                })?;
                Some(left.parse::<ModelName>()?)
            }
            VotingMode::Prompt => None,
        };

        if let Some(ms) = request.reaction_time_ms {
            if ms < 0 {
                return Err(Error::InvalidInput(format!(
                    "reaction_time_ms must not be negative, got {}",
                    ms
                )));
            }
        }

        Ok(Self {
            session_id: session_id.to_string(),
            item_id,
            winner,
            left_model,
            reaction_time_ms: request.reaction_time_ms,
        })
    }
}

/// Check the ballot against the item it names
fn check_against_item(ballot: &Ballot, item: &Item) -> Result<()> {
    if let Some(model) = ballot.winner.model() {
        if !item.shows_model(model) {
            return Err(Error::InvalidInput(format!(
                "winner {} is not shown in item {}",
                model,
                item.id()
            )));
        }
    }

    if let Some(left) = ballot.left_model {
        if !item.shows_model(left) {
            return Err(Error::InvalidInput(format!(
                "left_model {} is not shown in item {}",
                left,
                item.id()
            )));
        }
    }

    Ok(())
}

/// Persist a ballot for `session`
///
/// The item must exist (`NotFound`) and lie inside the session's scope
/// (`InvalidInput`).
pub async fn record(
    conn: &mut SqliteConnection,
    config: &SurveyConfig,
    session: &SessionRow,
    ballot: &Ballot,
    now: DateTime<Utc>,
) -> Result<VoteDisposition> {
    if !catalog::item_exists(conn, config.mode, &ballot.item_id).await? {
        return Err(Error::NotFound(format!(
            "{} {}",
            config.mode.item_column().trim_end_matches("_id"),
            ballot.item_id
        )));
    }

    if !scope::contains(conn, config.mode, session.chunk_id.as_deref(), &ballot.item_id).await? {
        return Err(Error::InvalidInput(format!(
            "item {} is not part of session {}",
            ballot.item_id, session.id
        )));
    }

    let item = catalog::resolve_item(conn, config, &ballot.item_id).await?;
    check_against_item(ballot, &item)?;

    let disposition = match config.mode {
        VotingMode::Pair => insert_pair_vote(conn, ballot, now).await?,
        VotingMode::Prompt => upsert_prompt_vote(conn, ballot, now).await?,
    };

    info!(
        "Vote {:?} for session {} item {}: {}",
        disposition, ballot.session_id, ballot.item_id, ballot.winner
    );
    Ok(disposition)
}

async fn insert_pair_vote(
    conn: &mut SqliteConnection,
    ballot: &Ballot,
    now: DateTime<Utc>,
) -> Result<VoteDisposition> {
    let left_model = ballot
        .left_model
        .ok_or_else(|| Error::InvalidInput("left_model is required in pair mode".to_string()))?;

    let result = sqlx::query(
        r#"
        INSERT INTO pair_votes (id, session_id, pair_id, winner_model, left_model, reaction_time_ms, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(uuid_utils::generate().to_string())
    .bind(&ballot.session_id)
    .bind(&ballot.item_id)
    .bind(ballot.winner.as_str())
    .bind(left_model.as_str())
    .bind(ballot.reaction_time_ms)
    .bind(now)
    .execute(&mut *conn)
    .await;

    match result {
        Ok(_) => Ok(VoteDisposition::Created),
        Err(e) if is_unique_violation(&e) => Err(Error::Conflict(format!(
            "vote already exists for session {} and pair {}",
            ballot.session_id, ballot.item_id
        ))),
        Err(e) => Err(e.into()),
    }
}

async fn upsert_prompt_vote(
    conn: &mut SqliteConnection,
    ballot: &Ballot,
    now: DateTime<Utc>,
) -> Result<VoteDisposition> {
    let existing: Option<String> =
        sqlx::query_scalar("SELECT id FROM prompt_votes WHERE session_id = ? AND prompt_id = ?")
            .bind(&ballot.session_id)
            .bind(&ballot.item_id)
            .fetch_optional(&mut *conn)
            .await?;

    if existing.is_some() {
        update_prompt_vote(conn, ballot, now).await?;
        return Ok(VoteDisposition::Updated);
    }

    let result = sqlx::query(
        r#"
        INSERT INTO prompt_votes (id, session_id, prompt_id, winner_model, reaction_time_ms, created_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(uuid_utils::generate().to_string())
    .bind(&ballot.session_id)
    .bind(&ballot.item_id)
    .bind(ballot.winner.as_str())
    .bind(ballot.reaction_time_ms)
    .bind(now)
    .execute(&mut *conn)
    .await;

    match result {
        Ok(_) => Ok(VoteDisposition::Created),
        // Lost a race with a concurrent first vote; revise it instead
        Err(e) if is_unique_violation(&e) => {
            debug!(
                "Concurrent vote for session {} prompt {}, updating",
                ballot.session_id, ballot.item_id
            );
            update_prompt_vote(conn, ballot, now).await?;
            Ok(VoteDisposition::Updated)
        }
        Err(e) => Err(e.into()),
    }
}

async fn update_prompt_vote(
    conn: &mut SqliteConnection,
    ballot: &Ballot,
    now: DateTime<Utc>,
) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE prompt_votes
        SET winner_model = ?, reaction_time_ms = ?, updated_at = ?
        WHERE session_id = ? AND prompt_id = ?
        "#,
    )
    .bind(ballot.winner.as_str())
    .bind(ballot.reaction_time_ms)
    .bind(now)
    .bind(&ballot.session_id)
    .bind(&ballot.item_id)
    .execute(&mut *conn)
    .await?;
    Ok(())
}
