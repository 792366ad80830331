//! Admin endpoint authentication via a static shared secret
//!
//! The admin summary requires a header whose value matches the secret held
//! in server configuration. The check fails closed: with no secret
//! configured, every request is refused as a server-side configuration
//! error rather than let through.
//!
//! This module contains ONLY pure functions. The Axum middleware that reads
//! the header lives in the server crate.

use sha2::{Digest, Sha256};

/// Header carrying the admin secret
pub const ADMIN_SECRET_HEADER: &str = "x-admin-secret";

/// Admin authentication failures
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminAuthError {
    /// Server has no admin secret configured
    NotConfigured,

    /// Header absent from the request
    MissingSecret,

    /// Header present but does not match
    Mismatch,
}

impl std::fmt::Display for AdminAuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AdminAuthError::NotConfigured => write!(f, "Admin secret is not configured"),
            AdminAuthError::MissingSecret => write!(f, "Missing admin secret header"),
            AdminAuthError::Mismatch => write!(f, "Admin secret mismatch"),
        }
    }
}

impl std::error::Error for AdminAuthError {}

/// Validate a provided admin secret against the configured one
///
/// Both values are hashed before comparison so the comparison time does not
/// depend on how long a matching prefix is.
pub fn validate_admin_secret(
    configured: Option<&str>,
    provided: Option<&str>,
) -> Result<(), AdminAuthError> {
    let configured = match configured {
        Some(secret) if !secret.is_empty() => secret,
        _ => return Err(AdminAuthError::NotConfigured),
    };

    let provided = provided.ok_or(AdminAuthError::MissingSecret)?;

    if digest(configured) == digest(provided) {
        Ok(())
    } else {
        Err(AdminAuthError::Mismatch)
    }
}

fn digest(value: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(value.as_bytes());
    hasher.finalize().into()
}
