//! Item and vote endpoints

use axum::{
    extract::{rejection::JsonRejection, rejection::QueryRejection, Query, State},
    Json,
};
use imgvote_common::api::types::{CastVoteRequest, CastVoteResponse, NextItemQuery, NextItemResponse};

use super::error::ApiResult;
use crate::AppState;

/// GET /items/next?session_id=
pub async fn next_item(
    State(state): State<AppState>,
    query: Result<Query<NextItemQuery>, QueryRejection>,
) -> ApiResult<NextItemResponse> {
    let Query(query) = query?;
    Ok(Json(state.survey.next_item(&query.session_id).await?))
}

/// POST /votes
///
/// Body rejections surface as `invalid_input` like any other bad field.
pub async fn cast_vote(
    State(state): State<AppState>,
    body: Result<Json<CastVoteRequest>, JsonRejection>,
) -> ApiResult<CastVoteResponse> {
    let Json(request) = body?;
    Ok(Json(state.survey.cast_vote(&request).await?))
}
