//! Next-item selection
//!
//! Picks uniformly among the unvoted items in the session's scope, then
//! randomizes presentation: a coin flip for the left/right side of a pair,
//! a uniform permutation for a multi-choice prompt.

use chrono::{DateTime, Utc};
use imgvote_common::api::types::{ImageView, ItemPayload, NextItemResponse};
use imgvote_common::config::SurveyConfig;
use imgvote_common::db::catalog::{self, Item};
use imgvote_common::db::{ImageRow, SessionRow};
use imgvote_common::Result;
use rand::seq::SliceRandom;
use rand::Rng;
use sqlx::SqliteConnection;
use std::collections::HashSet;
use tracing::debug;

use super::{lifecycle, scope};

/// Item ids in scope without a vote from this session, in scope order
pub async fn unvoted_item_ids(
    conn: &mut SqliteConnection,
    config: &SurveyConfig,
    session: &SessionRow,
) -> Result<(Vec<String>, i64)> {
    let in_scope = scope::item_ids(conn, config.mode, session.chunk_id.as_deref()).await?;
    let voted: HashSet<String> = scope::voted_item_ids(conn, config.mode, &session.id)
        .await?
        .into_iter()
        .collect();

    let total = in_scope.len() as i64;
    let unvoted = in_scope
        .into_iter()
        .filter(|id| !voted.contains(id))
        .collect();
    Ok((unvoted, total))
}

/// Produce the next item for `session`, or done when nothing is left
///
/// Running out of items completes the session.
pub async fn next<R: Rng + Send + ?Sized>(
    conn: &mut SqliteConnection,
    config: &SurveyConfig,
    session: &SessionRow,
    now: DateTime<Utc>,
    rng: &mut R,
) -> Result<NextItemResponse> {
    let (unvoted, total) = unvoted_item_ids(conn, config, session).await?;
    let remaining = unvoted.len() as i64;
    let index = total - remaining;

    let item_id = match unvoted.choose(rng) {
        Some(id) => id.clone(),
        None => {
            lifecycle::complete(conn, &session.id, now).await?;
            return Ok(NextItemResponse {
                done: true,
                item: None,
                index,
                total,
                remaining: 0,
            });
        }
    };

    let item = catalog::resolve_item(conn, config, &item_id).await?;
    debug!(
        "Session {} gets item {} ({} of {} left)",
        session.id, item_id, remaining, total
    );

    Ok(NextItemResponse {
        done: false,
        item: Some(present(&item, rng)),
        index,
        total,
        remaining,
    })
}

/// Lay out an item's images in randomized display order
pub fn present<R: Rng + ?Sized>(item: &Item, rng: &mut R) -> ItemPayload {
    let mut images: Vec<&ImageRow> = item.resolve_images();

    match item {
        Item::Pair { .. } => {
            if rng.gen_bool(0.5) {
                images.swap(0, 1);
            }
        }
        Item::MultiChoice { .. } => images.shuffle(rng),
    }

    let prompt = item.prompt();
    ItemPayload {
        item_id: item.id().to_string(),
        kind: item.mode(),
        prompt_id: prompt.id.clone(),
        prompt_text: prompt.text.clone(),
        images: images
            .into_iter()
            .enumerate()
            .map(|(position, image)| ImageView {
                image_id: image.id.clone(),
                url: image.url.clone(),
                model: image.model,
                position,
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use imgvote_common::db::{ImageRow, PromptRow};
    use imgvote_common::types::ModelName;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn image(id: &str, model: ModelName) -> ImageRow {
        ImageRow {
            id: id.to_string(),
            prompt_id: "p1".to_string(),
            model,
            url: format!("/img/{}.png", id),
        }
    }

    fn prompt() -> PromptRow {
        PromptRow {
            id: "p1".to_string(),
            text: "a harbor at night".to_string(),
            category: None,
        }
    }

    #[test]
    fn test_pair_presentation_uses_both_sides() {
        let item = Item::Pair {
            pair_id: "pair-1".to_string(),
            prompt: prompt(),
            image_a: image("a", ModelName::Gpt5),
            image_b: image("b", ModelName::Kolors),
        };

        let mut rng = StdRng::seed_from_u64(11);
        let mut left_a = 0;
        for _ in 0..200 {
            let payload = present(&item, &mut rng);
            assert_eq!(payload.images.len(), 2);
            assert_eq!(payload.images[0].position, 0);
            if payload.images[0].image_id == "a" {
                left_a += 1;
            }
        }
        assert!(left_a > 50 && left_a < 150, "left side biased: {}", left_a);
    }

    #[test]
    fn test_multi_choice_presentation_is_a_permutation() {
        let item = Item::MultiChoice {
            prompt: prompt(),
            images: ModelName::ALL
                .iter()
                .enumerate()
                .map(|(i, m)| image(&format!("i{}", i), *m))
                .collect(),
        };

        let mut rng = StdRng::seed_from_u64(12);
        let mut first_positions = HashSet::new();
        for _ in 0..50 {
            let payload = present(&item, &mut rng);
            let mut ids: Vec<_> = payload.images.iter().map(|i| i.image_id.clone()).collect();
            first_positions.insert(ids[0].clone());
            ids.sort();
            assert_eq!(ids, vec!["i0", "i1", "i2", "i3", "i4"]);
        }
        assert!(first_positions.len() > 1);
    }
}
