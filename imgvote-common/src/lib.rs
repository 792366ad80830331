//! # imgvote Common Library
//!
//! Shared code for the imgvote survey crates including:
//! - Error taxonomy and domain enumerations
//! - Survey configuration loading
//! - Database bootstrap, catalog queries and the chunk partition
//! - API request/response types and admin-secret validation
//! - Utility functions

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod time;
pub mod types;
pub mod uuid_utils;

pub use error::{Error, Result};
