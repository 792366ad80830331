//! Integration tests for imgvote-server HTTP endpoints
//!
//! Tests cover:
//! - End-to-end participant flows in both voting modes
//! - Error mapping of bad ids, unknown sessions and duplicate votes
//! - Admin secret enforcement on the summary endpoint
//! - Health endpoint (no auth required)

mod common;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use common::*;
use imgvote_common::config::SurveyConfig;
use imgvote_common::types::VotingMode;
use imgvote_server::{build_router, AppState};
use serde_json::{json, Value};
use sqlx::SqlitePool;
use tower::util::ServiceExt; // for `oneshot` method

fn setup_app(pool: &SqlitePool, config: SurveyConfig) -> Router {
    build_router(AppState::new(pool.clone(), config))
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Send a request and return status plus parsed JSON body
async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Should read body");
    let json = serde_json::from_slice(&bytes).expect("Should parse JSON");
    (status, json)
}

async fn start_session(app: &Router) -> (String, Option<String>) {
    let (status, body) = send(app, post_json("/session/start", json!({}))).await;
    assert_eq!(status, StatusCode::OK, "start failed: {}", body);
    (
        body["user_session_id"].as_str().unwrap().to_string(),
        body["chunk_id"].as_str().map(str::to_string),
    )
}

// =============================================================================
// Health Endpoint
// =============================================================================

#[tokio::test]
async fn test_health_endpoint_no_auth_required() {
    let pool = memory_pool().await;
    let app = setup_app(&pool, prompt_config());

    let (status, body) = send(&app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "imgvote-server");
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn test_buildinfo_endpoint() {
    let pool = memory_pool().await;
    let app = setup_app(&pool, prompt_config());

    let (status, body) = send(&app, get("/buildinfo")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["git_hash"].is_string());
    assert!(body["build_profile"].is_string());
}

// =============================================================================
// Participant Flows
// =============================================================================

#[tokio::test]
async fn test_pair_flow_never_repeats_voted_item() {
    let pool = memory_pool().await;
    let config = pair_config();
    seed_pairs(&pool, &config, 3).await;
    let chunks = build_chunks(&pool, VotingMode::Pair, 1).await;
    let app = setup_app(&pool, config);

    let (session_id, chunk_id) = start_session(&app).await;
    assert_eq!(chunk_id.as_deref(), Some(chunks[0].0.as_str()));

    let (status, next) = send(&app, get(&format!("/items/next?session_id={}", session_id))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(next["done"], false);
    assert_eq!(next["kind"], "pair");
    assert_eq!(next["index"], 0);
    assert_eq!(next["total"], 3);

    let images = next["images"].as_array().unwrap();
    assert_eq!(images.len(), 2);
    assert_eq!(images[0]["position"], 0);
    let first_item = next["item_id"].as_str().unwrap().to_string();
    let left = images[0]["model"].as_str().unwrap().to_string();

    // Vote for whatever was on the left
    let (status, vote) = send(
        &app,
        post_json(
            "/votes",
            json!({
                "session_id": session_id,
                "item_id": first_item,
                "winner_model": left,
                "left_model": left,
                "reaction_time_ms": 1400
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "vote failed: {}", vote);
    assert_eq!(vote["status"], "created");
    assert_eq!(vote["votes_cast"], 1);

    for _ in 0..10 {
        let (_, next) = send(&app, get(&format!("/items/next?session_id={}", session_id))).await;
        assert_ne!(next["item_id"], first_item.as_str());
        assert_eq!(next["index"], 1);
    }

    // Same pair again is a conflict
    let (status, body) = send(
        &app,
        post_json(
            "/votes",
            json!({
                "session_id": session_id,
                "item_id": first_item,
                "winner_model": "tie",
                "left_model": left
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "conflict");
}

#[tokio::test]
async fn test_two_item_chunk_completes_session() {
    let pool = memory_pool().await;
    let config = prompt_config();
    seed_prompts(&pool, &config, 4).await;
    build_chunks(&pool, VotingMode::Prompt, 2).await;
    let app = setup_app(&pool, config);

    let (session_id, _) = start_session(&app).await;

    for _ in 0..2 {
        let (_, next) = send(&app, get(&format!("/items/next?session_id={}", session_id))).await;
        assert_eq!(next["done"], false);
        assert_eq!(next["images"].as_array().unwrap().len(), 3);
        let (status, _) = send(
            &app,
            post_json(
                "/votes",
                json!({
                    "session_id": session_id,
                    "item_id": next["item_id"],
                    "winner_model": "gemini25"
                }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, done) = send(&app, get(&format!("/items/next?session_id={}", session_id))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(done["done"], true);
    assert_eq!(done["total"], 2);
    assert_eq!(done["index"], 2);
    assert_eq!(done["remaining"], 0);
    assert!(done.get("item_id").is_none());

    let (status, session) = send(&app, get(&format!("/session/{}/status", session_id))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(session["status"], "completed");
    assert_eq!(session["votes_cast"], 2);
    assert_eq!(session["total_items"], 2);
    assert!(session["completed_at"].is_string());
}

#[tokio::test]
async fn test_prompt_vote_revision_reports_update() {
    let pool = memory_pool().await;
    let config = prompt_config();
    let prompts = seed_prompts(&pool, &config, 2).await;
    build_chunks(&pool, VotingMode::Prompt, 1).await;
    let app = setup_app(&pool, config);

    let (session_id, _) = start_session(&app).await;

    let (_, first) = send(
        &app,
        post_json(
            "/votes",
            json!({"session_id": session_id, "item_id": prompts[0], "winner_model": "gpt5"}),
        ),
    )
    .await;
    assert_eq!(first["status"], "created");

    let (status, second) = send(
        &app,
        post_json(
            "/votes",
            json!({"session_id": session_id, "item_id": prompts[0], "winner_model": "kolors"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["status"], "updated");

    let winner: String = sqlx::query_scalar(
        "SELECT winner_model FROM prompt_votes WHERE session_id = ? AND prompt_id = ?",
    )
    .bind(&session_id)
    .bind(&prompts[0])
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(winner, "kolors");

    // Public results see only the latest answer
    let (status, results) = send(&app, get("/results")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(results["total_votes"], 1);
    let kolors = results["models"]
        .as_array()
        .unwrap()
        .iter()
        .find(|m| m["model"] == "kolors")
        .unwrap();
    assert_eq!(kolors["wins"], 1);
    assert_eq!(kolors["win_percentage"], 100.0);

    let (status, items) = send(&app, get("/results/items")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(items["items"].as_array().unwrap().len(), 2);
}

// =============================================================================
// Error Mapping
// =============================================================================

#[tokio::test]
async fn test_bad_and_unknown_session_ids() {
    let pool = memory_pool().await;
    let config = prompt_config();
    seed_prompts(&pool, &config, 1).await;
    build_chunks(&pool, VotingMode::Prompt, 1).await;
    let app = setup_app(&pool, config);

    let (status, body) = send(&app, get("/items/next?session_id=not-a-uuid")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_input");

    let (status, body) = send(&app, get("/items/next")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_input");

    let unknown = "8d9ab3f2-1d7e-4c1b-9e44-2a6f3c8b7d10";
    let (status, body) = send(&app, get(&format!("/session/{}/status", unknown))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");
}

#[tokio::test]
async fn test_malformed_vote_body_is_bad_request() {
    let pool = memory_pool().await;
    let app = setup_app(&pool, prompt_config());

    let (status, body) = send(&app, post_json("/votes", json!({"session_id": 42}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_input");
}

#[tokio::test]
async fn test_start_without_chunks_is_server_error() {
    let pool = memory_pool().await;
    let app = setup_app(&pool, prompt_config());

    let (status, body) = send(&app, post_json("/session/start", json!({}))).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "configuration");
}

// =============================================================================
// Admin Authentication
// =============================================================================

fn admin_request(secret: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri("/admin/summary");
    if let Some(secret) = secret {
        builder = builder.header("X-Admin-Secret", secret);
    }
    builder.body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_admin_summary_requires_matching_secret() {
    let pool = memory_pool().await;
    let config = prompt_config();
    seed_prompts(&pool, &config, 4).await;
    build_chunks(&pool, VotingMode::Prompt, 2).await;
    let app = setup_app(&pool, config);
    start_session(&app).await;

    let (status, body) = send(&app, admin_request(None)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "forbidden");

    let (status, _) = send(&app, admin_request(Some("wrong"))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(&app, admin_request(Some("test-secret"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["mode"], "prompt");
    assert_eq!(body["completion_goal"], 10);
    assert_eq!(body["chunks"].as_array().unwrap().len(), 2);
    assert_eq!(body["catalog"]["prompts"], 4);
    assert_eq!(body["catalog"]["images"], 12);
    assert_eq!(body["sessions"]["active"], 1);
    assert_eq!(body["sessions"]["total"], 1);
}

#[tokio::test]
async fn test_admin_summary_fails_closed_without_secret() {
    let pool = memory_pool().await;
    let config = SurveyConfig {
        admin_secret: None,
        ..prompt_config()
    };
    let app = setup_app(&pool, config);

    let (status, body) = send(&app, admin_request(Some("anything"))).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "configuration");
}
