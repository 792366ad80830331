//! Session endpoints

use axum::{
    extract::{Path, State},
    Json,
};
use imgvote_common::api::types::{CreateSessionResponse, SessionStatusResponse};

use super::error::ApiResult;
use crate::AppState;

/// POST /session/start
pub async fn start_session(State(state): State<AppState>) -> ApiResult<CreateSessionResponse> {
    Ok(Json(state.survey.create_session().await?))
}

/// GET /session/:id/status
pub async fn session_status(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<SessionStatusResponse> {
    Ok(Json(state.survey.session_status(&session_id).await?))
}
