//! Concurrent survey traffic against an on-disk WAL database
//!
//! Every request runs in its own read-then-write transaction on a pooled
//! connection; parallel callers must queue on the write lock, not fail.

mod common;

use common::*;
use imgvote_common::db::init_database;
use imgvote_common::types::VotingMode;
use tempfile::TempDir;

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_parallel_sessions_and_votes_all_succeed() {
    let temp_dir = TempDir::new().unwrap();
    let pool = init_database(&temp_dir.path().join("survey.db"))
        .await
        .expect("Should create database");

    let config = prompt_config();
    seed_prompts(&pool, &config, 40).await;
    build_chunks(&pool, VotingMode::Prompt, 4).await;
    let survey = survey(&pool, config);

    let creates: Vec<_> = (0..40)
        .map(|_| {
            let survey = survey.clone();
            tokio::spawn(async move { survey.create_session().await })
        })
        .collect();

    let mut session_ids = Vec::new();
    for handle in creates {
        let created = handle.await.unwrap().expect("create_session should not fail");
        assert!(created.chunk_id.is_some());
        session_ids.push(created.user_session_id);
    }

    let votes: Vec<_> = session_ids
        .iter()
        .cloned()
        .map(|session_id| {
            let survey = survey.clone();
            tokio::spawn(async move {
                let next = survey.next_item(&session_id).await?;
                let item = next.item.expect("fresh session has items");
                survey
                    .cast_vote(&vote_request(&session_id, &item.item_id, "gpt5", None))
                    .await
            })
        })
        .collect();

    for handle in votes {
        let response = handle.await.unwrap().expect("next_item + cast_vote should not fail");
        assert_eq!(response.votes_cast, 1);
    }

    let results = survey.public_results().await.unwrap();
    assert_eq!(results.stats.total_votes, 40);

    let summary = survey.admin_summary().await.unwrap();
    assert_eq!(summary.sessions.total, 40);
    assert_eq!(summary.sessions.active, 40);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_parallel_status_queries_on_one_session() {
    let temp_dir = TempDir::new().unwrap();
    let pool = init_database(&temp_dir.path().join("survey.db"))
        .await
        .expect("Should create database");

    let config = prompt_config();
    seed_prompts(&pool, &config, 4).await;
    build_chunks(&pool, VotingMode::Prompt, 1).await;
    let survey = survey(&pool, config);
    let session_id = survey.create_session().await.unwrap().user_session_id;

    let handles: Vec<_> = (0..20)
        .map(|_| {
            let survey = survey.clone();
            let session_id = session_id.clone();
            tokio::spawn(async move { survey.session_status(&session_id).await })
        })
        .collect();

    for handle in handles {
        let status = handle.await.unwrap().expect("session_status should not fail");
        assert_eq!(status.total_items, 4);
    }
}
