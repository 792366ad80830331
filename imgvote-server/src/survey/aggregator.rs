//! Read-only reporting over recorded votes
//!
//! Status counts come straight from storage. Abandonment is lazy, so a
//! stale session nobody has contacted since still counts as active here.

use imgvote_common::api::types::{
    ChunkSummary, ItemResults, ModelWins, SessionCounts, WinStats,
};
use imgvote_common::config::SurveyConfig;
use imgvote_common::types::{ModelName, Outcome, SessionStatus, VotingMode};
use imgvote_common::{Error, Result};
use sqlx::SqliteConnection;
use std::collections::{BTreeMap, HashMap};

/// Build win statistics from (winner, count) tallies
///
/// Configured models are always listed, in configured order. A model that
/// has votes but is no longer configured is appended so that the wins still
/// add up to the decisive votes.
pub fn win_stats(models: &[ModelName], tallies: &[(Outcome, i64)]) -> WinStats {
    let mut wins: HashMap<ModelName, i64> = HashMap::new();
    let mut tie_votes = 0;

    for (outcome, count) in tallies {
        match outcome {
            Outcome::Tie => tie_votes += count,
            Outcome::Model(model) => *wins.entry(*model).or_default() += count,
        }
    }

    let total_votes: i64 = tallies.iter().map(|(_, count)| count).sum();
    let decisive_votes = total_votes - tie_votes;

    let mut order: Vec<ModelName> = models.to_vec();
    let mut extra: Vec<ModelName> = wins
        .keys()
        .copied()
        .filter(|model| !models.contains(model))
        .collect();
    extra.sort();
    order.extend(extra);

    let models = order
        .into_iter()
        .map(|model| {
            let model_wins = wins.get(&model).copied().unwrap_or(0);
            ModelWins {
                model,
                display_name: model.display_name().to_string(),
                wins: model_wins,
                win_percentage: win_percentage(model_wins, decisive_votes),
            }
        })
        .collect();

    WinStats {
        total_votes,
        tie_votes,
        decisive_votes,
        models,
    }
}

/// wins / decisive * 100, or 0 without decisive votes
pub fn win_percentage(wins: i64, decisive_votes: i64) -> f64 {
    if decisive_votes == 0 {
        0.0
    } else {
        wins as f64 / decisive_votes as f64 * 100.0
    }
}

fn parse_outcome(raw: &str) -> Result<Outcome> {
    raw.parse().map_err(|_| {
        Error::InternalConsistency(format!("vote with unknown winner in storage: {}", raw))
    })
}

/// Win statistics across every vote of the configured mode
pub async fn global_stats(conn: &mut SqliteConnection, config: &SurveyConfig) -> Result<WinStats> {
    let sql = format!(
        "SELECT winner_model, COUNT(*) FROM {} GROUP BY winner_model",
        config.mode.vote_table()
    );
    let rows: Vec<(String, i64)> = sqlx::query_as(&sql).fetch_all(&mut *conn).await?;

    let tallies = rows
        .iter()
        .map(|(winner, count)| Ok((parse_outcome(winner)?, *count)))
        .collect::<Result<Vec<_>>>()?;

    Ok(win_stats(&config.models, &tallies))
}

/// Win statistics per item, including items nobody has voted on yet
pub async fn per_item_stats(
    conn: &mut SqliteConnection,
    config: &SurveyConfig,
) -> Result<Vec<ItemResults>> {
    let items_sql = match config.mode {
        VotingMode::Pair => {
            "SELECT pa.id, pa.prompt_id, pr.text FROM pairs pa JOIN prompts pr ON pr.id = pa.prompt_id ORDER BY pr.text, pa.id"
        }
        VotingMode::Prompt => "SELECT id, id, text FROM prompts ORDER BY text, id",
    };
    let items: Vec<(String, String, String)> =
        sqlx::query_as(items_sql).fetch_all(&mut *conn).await?;

    let votes_sql = format!(
        "SELECT {col}, winner_model, COUNT(*) FROM {table} GROUP BY {col}, winner_model",
        col = config.mode.item_column(),
        table = config.mode.vote_table()
    );
    let rows: Vec<(String, String, i64)> = sqlx::query_as(&votes_sql)
        .fetch_all(&mut *conn)
        .await?;

    let mut tallies: HashMap<String, Vec<(Outcome, i64)>> = HashMap::new();
    for (item_id, winner, count) in rows {
        tallies
            .entry(item_id)
            .or_default()
            .push((parse_outcome(&winner)?, count));
    }

    Ok(items
        .into_iter()
        .map(|(item_id, prompt_id, prompt_text)| {
            let stats = win_stats(
                &config.models,
                tallies.get(&item_id).map(Vec::as_slice).unwrap_or(&[]),
            );
            ItemResults {
                item_id,
                prompt_id,
                prompt_text,
                stats,
            }
        })
        .collect())
}

/// Coverage per chunk
pub async fn chunk_summaries(
    conn: &mut SqliteConnection,
    config: &SurveyConfig,
) -> Result<Vec<ChunkSummary>> {
    let sql = format!(
        r#"
        SELECT
            c.id,
            (SELECT COUNT(*) FROM {items} ci WHERE ci.chunk_id = c.id),
            (SELECT COUNT(*) FROM sessions s WHERE s.chunk_id = c.id AND s.status = ?),
            (SELECT COUNT(*) FROM sessions s WHERE s.chunk_id = c.id AND s.status = ?),
            (SELECT COUNT(*) FROM sessions s WHERE s.chunk_id = c.id AND s.status = ?),
            (SELECT COUNT(*) FROM {votes} v JOIN sessions s ON s.id = v.session_id WHERE s.chunk_id = c.id)
        FROM chunks c
        ORDER BY c.created_at, c.id
        "#,
        items = config.mode.chunk_item_table(),
        votes = config.mode.vote_table()
    );
    let rows: Vec<(String, i64, i64, i64, i64, i64)> =
        sqlx::query_as(&sql)
            .bind(SessionStatus::Completed.as_str())
            .bind(SessionStatus::Active.as_str())
            .bind(SessionStatus::Abandoned.as_str())
            .fetch_all(&mut *conn)
            .await?;

    Ok(rows
        .into_iter()
        .map(
            |(chunk_id, item_count, completed, active, abandoned, total_votes)| ChunkSummary {
                chunk_id,
                item_count,
                completed_sessions: completed,
                active_sessions: active,
                abandoned_sessions: abandoned,
                total_sessions: completed + active + abandoned,
                total_votes,
                meets_goal: completed >= config.completion_goal,
            },
        )
        .collect())
}

/// Sessions by stored status
pub async fn session_counts(conn: &mut SqliteConnection) -> Result<SessionCounts> {
    let rows: Vec<(String, i64)> =
        sqlx::query_as("SELECT status, COUNT(*) FROM sessions GROUP BY status")
            .fetch_all(&mut *conn)
            .await?;

    let by_status: BTreeMap<String, i64> = rows.into_iter().collect();
    let mut counts = SessionCounts::default();
    for (status, count) in by_status {
        match status.parse::<SessionStatus>()? {
            SessionStatus::Active => counts.active = count,
            SessionStatus::Completed => counts.completed = count,
            SessionStatus::Abandoned => counts.abandoned = count,
        }
        counts.total += count;
    }
    Ok(counts)
}
