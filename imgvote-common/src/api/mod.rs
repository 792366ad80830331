//! API module for shared HTTP API functionality
//!
//! # Design Principle
//!
//! This module contains ONLY:
//! - Pure functions (no HTTP framework dependencies)
//! - Shared request/response types
//!
//! The server crate wraps these with Axum handlers and middleware.

pub mod auth;
pub mod types;

pub use auth::{validate_admin_secret, AdminAuthError, ADMIN_SECRET_HEADER};
pub use types::ErrorResponse;
