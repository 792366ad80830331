//! HTTP API handlers for imgvote-server

pub mod auth;
pub mod error;
pub mod health;
pub mod items;
pub mod results;
pub mod sessions;

pub use auth::admin_auth_middleware;
pub use error::{ApiError, ApiResult};
pub use health::health_routes;
pub use items::{cast_vote, next_item};
pub use results::{admin_summary, global_results, item_results};
pub use sessions::{session_status, start_session};
