//! UUID utilities

use crate::Error;
use uuid::Uuid;

/// Generate a new UUIDv4
pub fn generate() -> Uuid {
    Uuid::new_v4()
}

/// Parse UUID from string
pub fn parse(s: &str) -> Result<Uuid, uuid::Error> {
    Uuid::parse_str(s)
}

/// Parse a client-supplied identifier, naming the field on failure
pub fn parse_field(field: &str, s: &str) -> crate::Result<Uuid> {
    parse(s).map_err(|e| Error::InvalidInput(format!("Invalid {} UUID format: {}", field, e)))
}
