//! Catalog queries: prompts, candidate images and legacy pairs
//!
//! The catalog is read-only on the request path. The insert functions exist
//! for data ingestion and test fixtures.
//!
//! Every function takes a `&mut SqliteConnection` so callers can run it
//! inside their own transaction (`&mut *tx`) or on a pooled connection.

use crate::api::types::CatalogCounts;
use crate::config::SurveyConfig;
use crate::db::models::{ImageRow, PairRow, PromptRow};
use crate::types::{ModelName, VotingMode};
use crate::{uuid_utils, Error, Result};
use sqlx::SqliteConnection;
use tracing::error;

// ========================================
// Ingestion
// ========================================

pub async fn insert_prompt(
    conn: &mut SqliteConnection,
    text: &str,
    category: Option<&str>,
) -> Result<String> {
    let id = uuid_utils::generate().to_string();
    sqlx::query("INSERT INTO prompts (id, text, category) VALUES (?, ?, ?)")
        .bind(&id)
        .bind(text)
        .bind(category)
        .execute(&mut *conn)
        .await?;
    Ok(id)
}

pub async fn insert_image(
    conn: &mut SqliteConnection,
    prompt_id: &str,
    model: ModelName,
    url: &str,
) -> Result<String> {
    let id = uuid_utils::generate().to_string();
    sqlx::query("INSERT INTO images (id, prompt_id, model, url) VALUES (?, ?, ?, ?)")
        .bind(&id)
        .bind(prompt_id)
        .bind(model.as_str())
        .bind(url)
        .execute(&mut *conn)
        .await?;
    Ok(id)
}

pub async fn insert_pair(
    conn: &mut SqliteConnection,
    prompt_id: &str,
    image_a_id: &str,
    image_b_id: &str,
) -> Result<String> {
    let id = uuid_utils::generate().to_string();
    sqlx::query("INSERT INTO pairs (id, prompt_id, image_a_id, image_b_id) VALUES (?, ?, ?, ?)")
        .bind(&id)
        .bind(prompt_id)
        .bind(image_a_id)
        .bind(image_b_id)
        .execute(&mut *conn)
        .await?;
    Ok(id)
}

// ========================================
// Lookups
// ========================================

pub async fn get_prompt(conn: &mut SqliteConnection, id: &str) -> Result<Option<PromptRow>> {
    let row = sqlx::query("SELECT id, text, category FROM prompts WHERE id = ?")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    row.as_ref().map(PromptRow::from_row).transpose()
}

pub async fn get_image(conn: &mut SqliteConnection, id: &str) -> Result<Option<ImageRow>> {
    let row = sqlx::query("SELECT id, prompt_id, model, url FROM images WHERE id = ?")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    row.as_ref().map(ImageRow::from_row).transpose()
}

pub async fn images_for_prompt(
    conn: &mut SqliteConnection,
    prompt_id: &str,
) -> Result<Vec<ImageRow>> {
    let rows = sqlx::query("SELECT id, prompt_id, model, url FROM images WHERE prompt_id = ? ORDER BY model")
        .bind(prompt_id)
        .fetch_all(&mut *conn)
        .await?;
    rows.iter().map(ImageRow::from_row).collect()
}

pub async fn get_pair(conn: &mut SqliteConnection, id: &str) -> Result<Option<PairRow>> {
    let row = sqlx::query("SELECT id, prompt_id, image_a_id, image_b_id FROM pairs WHERE id = ?")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    row.as_ref().map(PairRow::from_row).transpose()
}

/// Every item id of the given mode, in stable order
pub async fn all_item_ids(conn: &mut SqliteConnection, mode: VotingMode) -> Result<Vec<String>> {
    let sql = format!("SELECT id FROM {} ORDER BY id", mode.item_table());
    let ids: Vec<String> = sqlx::query_scalar(&sql).fetch_all(&mut *conn).await?;
    Ok(ids)
}

pub async fn item_count(conn: &mut SqliteConnection, mode: VotingMode) -> Result<i64> {
    let sql = format!("SELECT COUNT(*) FROM {}", mode.item_table());
    let count: i64 = sqlx::query_scalar(&sql).fetch_one(&mut *conn).await?;
    Ok(count)
}

pub async fn item_exists(conn: &mut SqliteConnection, mode: VotingMode, id: &str) -> Result<bool> {
    let sql = format!(
        "SELECT EXISTS(SELECT 1 FROM {} WHERE id = ?)",
        mode.item_table()
    );
    let exists: bool = sqlx::query_scalar(&sql)
        .bind(id)
        .fetch_one(&mut *conn)
        .await?;
    Ok(exists)
}

pub async fn catalog_counts(conn: &mut SqliteConnection) -> Result<CatalogCounts> {
    let (prompts, images, pairs): (i64, i64, i64) = sqlx::query_as(
        r#"
        SELECT
            (SELECT COUNT(*) FROM prompts),
            (SELECT COUNT(*) FROM images),
            (SELECT COUNT(*) FROM pairs)
        "#,
    )
    .fetch_one(&mut *conn)
    .await?;

    Ok(CatalogCounts {
        prompts,
        images,
        pairs,
    })
}

// ========================================
// Item Resolution
// ========================================

/// A unit of comparison, resolved to its prompt and complete image set
#[derive(Debug, Clone)]
pub enum Item {
    /// Legacy form: a prompt with exactly two images
    Pair {
        pair_id: String,
        prompt: PromptRow,
        image_a: ImageRow,
        image_b: ImageRow,
    },

    /// A prompt with one image per configured model
    MultiChoice {
        prompt: PromptRow,
        images: Vec<ImageRow>,
    },
}

impl Item {
    /// Identifier votes refer to (pair id or prompt id)
    pub fn id(&self) -> &str {
        match self {
            Item::Pair { pair_id, .. } => pair_id,
            Item::MultiChoice { prompt, .. } => &prompt.id,
        }
    }

    pub fn mode(&self) -> VotingMode {
        match self {
            Item::Pair { .. } => VotingMode::Pair,
            Item::MultiChoice { .. } => VotingMode::Prompt,
        }
    }

    pub fn prompt(&self) -> &PromptRow {
        match self {
            Item::Pair { prompt, .. } | Item::MultiChoice { prompt, .. } => prompt,
        }
    }

    /// Images in canonical order (a then b, or configured model order)
    pub fn resolve_images(&self) -> Vec<&ImageRow> {
        match self {
            Item::Pair {
                image_a, image_b, ..
            } => vec![image_a, image_b],
            Item::MultiChoice { images, .. } => images.iter().collect(),
        }
    }

    /// True when `model` produced one of this item's images
    pub fn shows_model(&self, model: ModelName) -> bool {
        self.resolve_images().iter().any(|image| image.model == model)
    }
}

/// Resolve an item id of the configured mode to a well-formed [`Item`]
///
/// An unknown id is `NotFound`. A known id whose rows are missing or whose
/// image set is incomplete is `InternalConsistency`.
pub async fn resolve_item(
    conn: &mut SqliteConnection,
    config: &SurveyConfig,
    item_id: &str,
) -> Result<Item> {
    let result = match config.mode {
        VotingMode::Pair => resolve_pair(conn, item_id).await,
        VotingMode::Prompt => resolve_multi_choice(conn, config, item_id).await,
    };

    if let Err(Error::InternalConsistency(msg)) = &result {
        error!("Catalog integrity defect: {}", msg);
    }
    result
}

async fn resolve_pair(conn: &mut SqliteConnection, pair_id: &str) -> Result<Item> {
    let pair = get_pair(conn, pair_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("pair {}", pair_id)))?;

    let prompt = get_prompt(conn, &pair.prompt_id).await?.ok_or_else(|| {
        Error::InternalConsistency(format!(
            "pair {} references missing prompt {}",
            pair.id, pair.prompt_id
        ))
    })?;

    let mut images = Vec::with_capacity(2);
    for image_id in [&pair.image_a_id, &pair.image_b_id] {
        let image = get_image(conn, image_id).await?.ok_or_else(|| {
            Error::InternalConsistency(format!(
                "pair {} references missing image {}",
                pair.id, image_id
            ))
        })?;
        if image.prompt_id != pair.prompt_id {
            return Err(Error::InternalConsistency(format!(
                "pair {} image {} belongs to another prompt",
                pair.id, image.id
            )));
        }
        images.push(image);
    }

    let image_b = images.pop();
    let image_a = images.pop();
    match (image_a, image_b) {
        (Some(image_a), Some(image_b)) if image_a.model != image_b.model => Ok(Item::Pair {
            pair_id: pair.id,
            prompt,
            image_a,
            image_b,
        }),
        _ => Err(Error::InternalConsistency(format!(
            "pair {} does not compare two distinct models",
            pair_id
        ))),
    }
}

async fn resolve_multi_choice(
    conn: &mut SqliteConnection,
    config: &SurveyConfig,
    prompt_id: &str,
) -> Result<Item> {
    let prompt = get_prompt(conn, prompt_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("prompt {}", prompt_id)))?;

    let mut images: Vec<ImageRow> = images_for_prompt(conn, prompt_id)
        .await?
        .into_iter()
        .filter(|image| config.is_participating(image.model))
        .collect();

    // (prompt, model) is unique in storage, so equal counts mean one per model
    let expected = config.expected_image_count();
    if images.len() != expected {
        return Err(Error::InternalConsistency(format!(
            "prompt {} has {} of {} configured model images",
            prompt_id,
            images.len(),
            expected
        )));
    }

    images.sort_by_key(|image| {
        config
            .models
            .iter()
            .position(|model| *model == image.model)
    });

    Ok(Item::MultiChoice { prompt, images })
}
