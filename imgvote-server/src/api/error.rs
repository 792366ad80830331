//! HTTP mapping of survey errors
//!
//! Every failure body is `{"error": <kind>, "message": <detail>}`.

use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use imgvote_common::api::ErrorResponse;
use imgvote_common::Error;
use tracing::error;

/// Handler error wrapping [`imgvote_common::Error`]
#[derive(Debug)]
pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        ApiError(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError(Error::InvalidInput(rejection.body_text()))
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError(Error::InvalidInput(rejection.body_text()))
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            Error::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Conflict(_) | Error::InvalidState(_) => StatusCode::CONFLICT,
            Error::InternalConsistency(_)
            | Error::Config(_)
            | Error::Database(_)
            | Error::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("Request failed: {}", self.0);
        }

        let body = Json(ErrorResponse {
            error: self.0.kind().to_string(),
            message: self.0.to_string(),
        });

        (status, body).into_response()
    }
}

pub type ApiResult<T> = Result<Json<T>, ApiError>;
