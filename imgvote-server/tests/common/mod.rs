//! Shared fixtures for imgvote-server integration tests

#![allow(dead_code)]

use imgvote_common::api::types::CastVoteRequest;
use imgvote_common::config::SurveyConfig;
use imgvote_common::db::{catalog, init_memory_database, partition};
use imgvote_common::types::{ModelName, VotingMode};
use imgvote_server::survey::Survey;
use rand::rngs::StdRng;
use rand::SeedableRng;
use sqlx::SqlitePool;
use std::sync::Arc;

pub fn prompt_config() -> SurveyConfig {
    SurveyConfig {
        mode: VotingMode::Prompt,
        models: vec![ModelName::Gpt5, ModelName::Gemini25, ModelName::Kolors],
        admin_secret: Some("test-secret".to_string()),
        ..SurveyConfig::default()
    }
}

pub fn pair_config() -> SurveyConfig {
    SurveyConfig {
        mode: VotingMode::Pair,
        models: vec![ModelName::Gpt5, ModelName::Flux1Dev],
        admin_secret: Some("test-secret".to_string()),
        ..SurveyConfig::default()
    }
}

pub async fn memory_pool() -> SqlitePool {
    init_memory_database().await.expect("in-memory database")
}

pub fn survey(pool: &SqlitePool, config: SurveyConfig) -> Survey {
    Survey::new(pool.clone(), Arc::new(config))
}

/// Insert `count` prompts, each with one image per configured model
pub async fn seed_prompts(pool: &SqlitePool, config: &SurveyConfig, count: usize) -> Vec<String> {
    let mut conn = pool.acquire().await.unwrap();
    let mut ids = Vec::new();
    for i in 0..count {
        let prompt_id = catalog::insert_prompt(&mut conn, &format!("prompt {}", i), None)
            .await
            .unwrap();
        for model in &config.models {
            catalog::insert_image(
                &mut conn,
                &prompt_id,
                *model,
                &format!("/images/{}/{}.png", i, model),
            )
            .await
            .unwrap();
        }
        ids.push(prompt_id);
    }
    ids
}

/// Insert `count` pairs comparing the first two configured models
pub async fn seed_pairs(pool: &SqlitePool, config: &SurveyConfig, count: usize) -> Vec<String> {
    let mut conn = pool.acquire().await.unwrap();
    let mut ids = Vec::new();
    for i in 0..count {
        let prompt_id = catalog::insert_prompt(&mut conn, &format!("pair prompt {}", i), None)
            .await
            .unwrap();
        let a = catalog::insert_image(&mut conn, &prompt_id, config.models[0], &format!("/a/{}.png", i))
            .await
            .unwrap();
        let b = catalog::insert_image(&mut conn, &prompt_id, config.models[1], &format!("/b/{}.png", i))
            .await
            .unwrap();
        ids.push(catalog::insert_pair(&mut conn, &prompt_id, &a, &b).await.unwrap());
    }
    ids
}

/// Partition the catalog into `chunks` chunks; returns (chunk id, item ids)
pub async fn build_chunks(
    pool: &SqlitePool,
    mode: VotingMode,
    chunks: usize,
) -> Vec<(String, Vec<String>)> {
    let mut conn = pool.acquire().await.unwrap();
    let ids = catalog::all_item_ids(&mut conn, mode).await.unwrap();
    let groups = partition::split_into_chunks(ids, chunks, &mut StdRng::seed_from_u64(99));
    let chunk_ids = partition::write_partition(&mut conn, mode, &groups)
        .await
        .unwrap();
    chunk_ids.into_iter().zip(groups).collect()
}

pub fn vote_request(
    session_id: &str,
    item_id: &str,
    winner: &str,
    left_model: Option<&str>,
) -> CastVoteRequest {
    CastVoteRequest {
        session_id: session_id.to_string(),
        item_id: item_id.to_string(),
        winner_model: winner.to_string(),
        left_model: left_model.map(str::to_string),
        reaction_time_ms: Some(850),
    }
}
