//! Survey core
//!
//! [`Survey`] is the only writer of sessions and votes. Each operation runs in
//! a single transaction so its reads and writes commit together; in
//! particular a chunk is never chosen without its session row being stored.
//!
//! Every operation has an `_at` variant taking the clock reading and the
//! random source explicitly. The plain variants use the wall clock and a
//! freshly seeded `StdRng`.

pub mod aggregator;
pub mod balancer;
pub mod lifecycle;
pub mod recorder;
pub mod scope;
pub mod selector;

use chrono::{DateTime, Utc};
use imgvote_common::api::types::{
    AdminSummaryResponse, CastVoteRequest, CastVoteResponse, CreateSessionResponse,
    GlobalResultsResponse, ItemResultsResponse, NextItemResponse, SessionStatusResponse,
};
use imgvote_common::config::SurveyConfig;
use imgvote_common::db::{catalog, partition, SessionRow};
use imgvote_common::types::SessionStatus;
use imgvote_common::{time, uuid_utils, Error, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sqlx::{Sqlite, SqliteConnection, SqlitePool, Transaction};
use std::sync::Arc;
use tracing::info;

pub use recorder::Ballot;

#[derive(Clone)]
pub struct Survey {
    db: SqlitePool,
    config: Arc<SurveyConfig>,
}

impl Survey {
    pub fn new(db: SqlitePool, config: Arc<SurveyConfig>) -> Self {
        Self { db, config }
    }

    pub fn config(&self) -> &SurveyConfig {
        &self.config
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.db
    }

    // ========================================
    // Sessions
    // ========================================

    pub async fn create_session(&self) -> Result<CreateSessionResponse> {
        self.create_session_at(time::now(), &mut StdRng::from_entropy())
            .await
    }

    /// Create an active session and assign it a chunk
    ///
    /// Without any chunks the session covers the whole catalog when
    /// `allow_unpartitioned` is set; otherwise this is a configuration error.
    pub async fn create_session_at<R: Rng + Send>(
        &self,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> Result<CreateSessionResponse> {
        let mut tx = self.begin_write().await?;

        let chunk_id = if self.config.allow_unpartitioned
            && partition::chunk_count(&mut tx).await? == 0
        {
            None
        } else {
            Some(balancer::assign(&mut tx, self.config.completion_goal, rng).await?)
        };

        let session_id = uuid_utils::generate().to_string();
        lifecycle::insert_session(&mut tx, &session_id, chunk_id.as_deref(), now).await?;
        tx.commit().await?;

        match &chunk_id {
            Some(chunk) => info!("Created session {} on chunk {}", session_id, chunk),
            None => info!("Created unpartitioned session {}", session_id),
        }

        Ok(CreateSessionResponse {
            user_session_id: session_id,
            chunk_id,
        })
    }

    pub async fn session_status(&self, session_id: &str) -> Result<SessionStatusResponse> {
        self.session_status_at(session_id, time::now()).await
    }

    pub async fn session_status_at(
        &self,
        session_id: &str,
        now: DateTime<Utc>,
    ) -> Result<SessionStatusResponse> {
        let session_id = uuid_utils::parse_field("session_id", session_id)?.to_string();
        let mut tx = self.begin_write().await?;

        let session = lifecycle::touch(&mut tx, &self.config, &session_id, now).await?;
        let (votes_cast, total_items) = self.progress(&mut tx, &session).await?;
        tx.commit().await?;

        Ok(SessionStatusResponse {
            session_id: session.id,
            status: session.status,
            created_at: session.created_at,
            last_activity: session.last_activity,
            completed_at: session.completed_at,
            chunk_id: session.chunk_id,
            votes_cast,
            total_items,
        })
    }

    // ========================================
    // Items and Votes
    // ========================================

    pub async fn next_item(&self, session_id: &str) -> Result<NextItemResponse> {
        self.next_item_at(session_id, time::now(), &mut StdRng::from_entropy())
            .await
    }

    pub async fn next_item_at<R: Rng + Send>(
        &self,
        session_id: &str,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> Result<NextItemResponse> {
        let session_id = uuid_utils::parse_field("session_id", session_id)?.to_string();
        let mut tx = self.begin_write().await?;

        let session = lifecycle::touch(&mut tx, &self.config, &session_id, now).await?;
        if session.status == SessionStatus::Abandoned {
            // Keep the abandonment even though the request is refused
            tx.commit().await?;
            return Err(Self::abandoned(&session));
        }

        let response = selector::next(&mut tx, &self.config, &session, now, rng).await?;
        tx.commit().await?;

        Ok(response)
    }

    pub async fn cast_vote(&self, request: &CastVoteRequest) -> Result<CastVoteResponse> {
        self.cast_vote_at(request, time::now()).await
    }

    /// Record a vote and complete the session if it covered the last item
    ///
    /// The activity refresh commits even when the vote itself is a conflict.
    pub async fn cast_vote_at(
        &self,
        request: &CastVoteRequest,
        now: DateTime<Utc>,
    ) -> Result<CastVoteResponse> {
        let ballot = Ballot::parse(request, self.config.mode)?;
        let mut tx = self.begin_write().await?;

        let session = lifecycle::touch(&mut tx, &self.config, &ballot.session_id, now).await?;
        if session.status == SessionStatus::Abandoned {
            tx.commit().await?;
            return Err(Self::abandoned(&session));
        }

        let status = match recorder::record(&mut tx, &self.config, &session, &ballot, now).await {
            Ok(status) => status,
            Err(e @ Error::Conflict(_)) => {
                tx.commit().await?;
                return Err(e);
            }
            Err(e) => return Err(e),
        };

        let (votes_cast, total) = self.progress(&mut tx, &session).await?;
        if votes_cast >= total {
            lifecycle::complete(&mut tx, &session.id, now).await?;
        }
        tx.commit().await?;

        Ok(CastVoteResponse {
            ok: true,
            status,
            votes_cast,
            total,
        })
    }

    /// Start a transaction holding the write lock from `BEGIN`
    ///
    /// A deferred transaction that reads first cannot become a writer under
    /// WAL once another connection has committed; `busy_timeout` only applies
    /// while waiting at `BEGIN`.
    async fn begin_write(&self) -> Result<Transaction<'static, Sqlite>> {
        Ok(self.db.begin_with("BEGIN IMMEDIATE").await?)
    }

    /// Refusal for operations that would continue an abandoned session
    fn abandoned(session: &SessionRow) -> Error {
        Error::InvalidState(format!("session {} was abandoned", session.id))
    }

    async fn progress(
        &self,
        conn: &mut SqliteConnection,
        session: &SessionRow,
    ) -> Result<(i64, i64)> {
        let votes = scope::votes_cast(conn, self.config.mode, &session.id).await?;
        let total = scope::total_items(conn, self.config.mode, session.chunk_id.as_deref()).await?;
        Ok((votes, total))
    }

    // ========================================
    // Reporting
    // ========================================

    pub async fn admin_summary(&self) -> Result<AdminSummaryResponse> {
        let mut conn = self.db.acquire().await?;

        Ok(AdminSummaryResponse {
            mode: self.config.mode,
            completion_goal: self.config.completion_goal,
            chunks: aggregator::chunk_summaries(&mut conn, &self.config).await?,
            catalog: catalog::catalog_counts(&mut conn).await?,
            sessions: aggregator::session_counts(&mut conn).await?,
        })
    }

    pub async fn public_results(&self) -> Result<GlobalResultsResponse> {
        let mut conn = self.db.acquire().await?;

        Ok(GlobalResultsResponse {
            mode: self.config.mode,
            stats: aggregator::global_stats(&mut conn, &self.config).await?,
        })
    }

    pub async fn public_results_per_item(&self) -> Result<ItemResultsResponse> {
        let mut conn = self.db.acquire().await?;

        Ok(ItemResultsResponse {
            mode: self.config.mode,
            items: aggregator::per_item_stats(&mut conn, &self.config).await?,
        })
    }
}
