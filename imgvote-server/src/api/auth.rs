//! Admin authentication middleware
//!
//! Thin wrapper over [`imgvote_common::api::validate_admin_secret`]: reads the
//! `X-Admin-Secret` header and compares it with the configured secret.

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use imgvote_common::api::{validate_admin_secret, AdminAuthError, ErrorResponse, ADMIN_SECRET_HEADER};
use tracing::{error, warn};

use crate::AppState;

/// Admin secret middleware
///
/// Fails closed: with no secret configured every request is a 500.
/// A missing or wrong header is a 403.
pub async fn admin_auth_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AdminRejection> {
    let provided = request
        .headers()
        .get(ADMIN_SECRET_HEADER)
        .and_then(|value| value.to_str().ok());

    validate_admin_secret(state.survey.config().admin_secret.as_deref(), provided)
        .map_err(AdminRejection)?;

    Ok(next.run(request).await)
}

/// Rejected admin request
#[derive(Debug)]
pub struct AdminRejection(pub AdminAuthError);

impl IntoResponse for AdminRejection {
    fn into_response(self) -> Response {
        let (status, kind) = match self.0 {
            AdminAuthError::NotConfigured => {
                error!("Admin request refused: no admin secret configured");
                (StatusCode::INTERNAL_SERVER_ERROR, "configuration")
            }
            AdminAuthError::MissingSecret | AdminAuthError::Mismatch => {
                warn!("Admin request refused: {}", self.0);
                (StatusCode::FORBIDDEN, "forbidden")
            }
        };

        let body = Json(ErrorResponse {
            error: kind.to_string(),
            message: self.0.to_string(),
        });

        (status, body).into_response()
    }
}
