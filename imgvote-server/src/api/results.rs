//! Reporting endpoints
//!
//! `/results` and `/results/items` are public; `/admin/summary` sits behind
//! the admin secret middleware.

use axum::{extract::State, Json};
use imgvote_common::api::types::{AdminSummaryResponse, GlobalResultsResponse, ItemResultsResponse};

use super::error::ApiResult;
use crate::AppState;

/// GET /results
pub async fn global_results(State(state): State<AppState>) -> ApiResult<GlobalResultsResponse> {
    Ok(Json(state.survey.public_results().await?))
}

/// GET /results/items
pub async fn item_results(State(state): State<AppState>) -> ApiResult<ItemResultsResponse> {
    Ok(Json(state.survey.public_results_per_item().await?))
}

/// GET /admin/summary
pub async fn admin_summary(State(state): State<AppState>) -> ApiResult<AdminSummaryResponse> {
    Ok(Json(state.survey.admin_summary().await?))
}
