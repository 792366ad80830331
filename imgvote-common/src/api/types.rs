//! Shared API request/response types
//!
//! Wire shapes for the survey endpoints. Responses are plain serde structs so
//! the server can build them straight from query results.

use crate::types::{ModelName, SessionStatus, VotingMode};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ========================================
// Error Types
// ========================================

/// Error body returned by every failing endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Machine-readable error kind
    pub error: String,

    /// Human readable detail
    pub message: String,
}

// ========================================
// Session Types
// ========================================

/// POST /session/start response
#[derive(Debug, Clone, Serialize)]
pub struct CreateSessionResponse {
    pub user_session_id: String,
    /// `None` for a session over the unpartitioned catalog
    pub chunk_id: Option<String>,
}

/// GET /session/:id/status response
#[derive(Debug, Clone, Serialize)]
pub struct SessionStatusResponse {
    pub session_id: String,
    pub status: SessionStatus,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub chunk_id: Option<String>,
    pub votes_cast: i64,
    pub total_items: i64,
}

// ========================================
// Item Types
// ========================================

/// GET /items/next query parameters
#[derive(Debug, Clone, Deserialize)]
pub struct NextItemQuery {
    pub session_id: String,
}

/// One image as shown to the participant
#[derive(Debug, Clone, Serialize)]
pub struct ImageView {
    pub image_id: String,
    pub url: String,
    pub model: ModelName,
    /// Display slot; for pairs 0 is left and 1 is right
    pub position: usize,
}

/// Item body of a next-item response
#[derive(Debug, Clone, Serialize)]
pub struct ItemPayload {
    pub item_id: String,
    pub kind: VotingMode,
    pub prompt_id: String,
    pub prompt_text: String,
    pub images: Vec<ImageView>,
}

/// GET /items/next response
///
/// `item` is flattened into the top level and absent when `done` is true.
#[derive(Debug, Clone, Serialize)]
pub struct NextItemResponse {
    pub done: bool,
    #[serde(flatten)]
    pub item: Option<ItemPayload>,
    /// Items in scope this session has already voted on
    pub index: i64,
    pub total: i64,
    pub remaining: i64,
}

// ========================================
// Vote Types
// ========================================

/// POST /votes request body
///
/// Enumeration fields arrive as strings and are validated by the recorder so
/// that unknown values surface as invalid input rather than a body rejection.
#[derive(Debug, Clone, Deserialize)]
pub struct CastVoteRequest {
    pub session_id: String,
    /// Pair id in pair mode, prompt id in prompt mode
    pub item_id: String,
    pub winner_model: String,
    /// Required in pair mode, ignored in prompt mode
    pub left_model: Option<String>,
    pub reaction_time_ms: Option<i64>,
}

/// Whether a vote inserted a new row or revised an existing one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteDisposition {
    Created,
    Updated,
}

/// POST /votes response
#[derive(Debug, Clone, Serialize)]
pub struct CastVoteResponse {
    pub ok: bool,
    pub status: VoteDisposition,
    pub votes_cast: i64,
    pub total: i64,
}

// ========================================
// Result Types
// ========================================

/// Wins for a single model within a vote set
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelWins {
    pub model: ModelName,
    pub display_name: String,
    pub wins: i64,
    /// wins / decisive_votes * 100, or 0 when there are no decisive votes
    pub win_percentage: f64,
}

/// Win statistics over a set of votes
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WinStats {
    pub total_votes: i64,
    pub tie_votes: i64,
    pub decisive_votes: i64,
    pub models: Vec<ModelWins>,
}

/// Win statistics for one item
#[derive(Debug, Clone, Serialize)]
pub struct ItemResults {
    pub item_id: String,
    pub prompt_id: String,
    pub prompt_text: String,
    #[serde(flatten)]
    pub stats: WinStats,
}

/// GET /results/items response
#[derive(Debug, Clone, Serialize)]
pub struct ItemResultsResponse {
    pub mode: VotingMode,
    pub items: Vec<ItemResults>,
}

/// GET /results response
#[derive(Debug, Clone, Serialize)]
pub struct GlobalResultsResponse {
    pub mode: VotingMode,
    #[serde(flatten)]
    pub stats: WinStats,
}

// ========================================
// Admin Types
// ========================================

/// Per-chunk coverage
#[derive(Debug, Clone, Serialize)]
pub struct ChunkSummary {
    pub chunk_id: String,
    pub item_count: i64,
    pub completed_sessions: i64,
    pub active_sessions: i64,
    pub abandoned_sessions: i64,
    pub total_sessions: i64,
    pub total_votes: i64,
    pub meets_goal: bool,
}

/// Session counts by status
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SessionCounts {
    pub active: i64,
    pub completed: i64,
    pub abandoned: i64,
    pub total: i64,
}

/// Catalog size
#[derive(Debug, Clone, Default, Serialize)]
pub struct CatalogCounts {
    pub prompts: i64,
    pub images: i64,
    pub pairs: i64,
}

/// GET /admin/summary response
#[derive(Debug, Clone, Serialize)]
pub struct AdminSummaryResponse {
    pub mode: VotingMode,
    pub completion_goal: i64,
    pub chunks: Vec<ChunkSummary>,
    pub catalog: CatalogCounts,
    pub sessions: SessionCounts,
}
