//! Database models
//!
//! Rows are decoded by hand from `SqliteRow` so that enumeration columns go
//! through the same parsing as client input. Identifiers stay as the
//! hyphenated UUID text they are stored as.

use crate::types::{ModelName, SessionStatus};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

#[derive(Debug, Clone, Serialize)]
pub struct PromptRow {
    pub id: String,
    pub text: String,
    pub category: Option<String>,
}

impl PromptRow {
    pub fn from_row(row: &SqliteRow) -> Result<Self> {
        Ok(Self {
            id: row.try_get("id")?,
            text: row.try_get("text")?,
            category: row.try_get("category")?,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ImageRow {
    pub id: String,
    pub prompt_id: String,
    pub model: ModelName,
    pub url: String,
}

impl ImageRow {
    /// Decode an image row; an unknown model string is a catalog defect
    pub fn from_row(row: &SqliteRow) -> Result<Self> {
        let id: String = row.try_get("id")?;
        let model: String = row.try_get("model")?;
        let model = model.parse::<ModelName>().map_err(|_| {
            Error::InternalConsistency(format!("image {} has unknown model {}", id, model))
        })?;

        Ok(Self {
            id,
            prompt_id: row.try_get("prompt_id")?,
            model,
            url: row.try_get("url")?,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PairRow {
    pub id: String,
    pub prompt_id: String,
    pub image_a_id: String,
    pub image_b_id: String,
}

impl PairRow {
    pub fn from_row(row: &SqliteRow) -> Result<Self> {
        Ok(Self {
            id: row.try_get("id")?,
            prompt_id: row.try_get("prompt_id")?,
            image_a_id: row.try_get("image_a_id")?,
            image_b_id: row.try_get("image_b_id")?,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionRow {
    pub id: String,
    pub status: SessionStatus,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    /// `None` for a session over the unpartitioned catalog
    pub chunk_id: Option<String>,
}

/// Column list matching [`SessionRow::from_row`]
pub const SESSION_COLUMNS: &str = "id, status, created_at, last_activity, completed_at, chunk_id";

impl SessionRow {
    pub fn from_row(row: &SqliteRow) -> Result<Self> {
        let status: String = row.try_get("status")?;
        let created_at: DateTime<Utc> = row.try_get("created_at")?;
        let last_activity: Option<DateTime<Utc>> = row.try_get("last_activity")?;

        Ok(Self {
            id: row.try_get("id")?,
            status: status.parse()?,
            created_at,
            // Rows that predate activity tracking fall back to creation time
            last_activity: last_activity.unwrap_or(created_at),
            completed_at: row.try_get("completed_at")?,
            chunk_id: row.try_get("chunk_id")?,
        })
    }

    pub fn is_active(&self) -> bool {
        !self.status.is_terminal()
    }
}
