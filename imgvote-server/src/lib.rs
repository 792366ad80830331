//! imgvote-server library - blind image comparison survey
//!
//! The survey core lives in [`survey`]; [`api`] is the thin HTTP layer over it.

use axum::http::{header, HeaderName, HeaderValue, Method};
use axum::Router;
use imgvote_common::api::ADMIN_SECRET_HEADER;
use imgvote_common::config::SurveyConfig;
use sqlx::SqlitePool;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::warn;

pub mod api;
pub mod survey;

use survey::Survey;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub survey: Survey,
}

impl AppState {
    pub fn new(db: SqlitePool, config: SurveyConfig) -> Self {
        Self {
            survey: Survey::new(db, Arc::new(config)),
        }
    }
}

/// Build application router
///
/// `/admin/summary` requires the admin secret; all other routes are public.
pub fn build_router(state: AppState) -> Router {
    use axum::middleware;
    use axum::routing::{get, post};

    let protected = Router::new()
        .route("/admin/summary", get(api::admin_summary))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            api::admin_auth_middleware,
        ));

    let public = Router::new()
        .route("/session/start", post(api::start_session))
        .route("/session/:id/status", get(api::session_status))
        .route("/items/next", get(api::next_item))
        .route("/votes", post(api::cast_vote))
        .route("/results", get(api::global_results))
        .route("/results/items", get(api::item_results))
        .merge(api::health_routes());

    let cors = cors_layer(&state.survey.config().allowed_origins);

    let router = Router::new()
        .merge(protected)
        .merge(public)
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    match cors {
        Some(cors) => router.layer(cors),
        None => router,
    }
}

/// CORS for the configured origins, or `None` when none are configured
fn cors_layer(origins: &[String]) -> Option<CorsLayer> {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    if origins.is_empty() {
        return None;
    }

    Some(
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([Method::GET, Method::POST])
            .allow_headers([
                header::CONTENT_TYPE,
                HeaderName::from_static(ADMIN_SECRET_HEADER),
            ]),
    )
}
