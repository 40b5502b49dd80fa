//! UUID utilities

use crate::{Error, Result};
use uuid::Uuid;

/// Generate a new UUIDv4
pub fn generate() -> Uuid {
    Uuid::new_v4()
}

/// Parse UUID from string
pub fn parse(s: &str) -> std::result::Result<Uuid, uuid::Error> {
    Uuid::parse_str(s)
}

/// Parse a UUID stored in a TEXT column
///
/// A malformed id in the database is an internal error, not bad input.
pub fn parse_column(column: &str, value: &str) -> Result<Uuid> {
    Uuid::parse_str(value).map_err(|e| {
        Error::Internal(format!(
            "Invalid UUID in column {}: {} ({})",
            column, value, e
        ))
    })
}

/// Parse an optional UUID column
pub fn parse_optional_column(column: &str, value: Option<String>) -> Result<Option<Uuid>> {
    value.map(|v| parse_column(column, &v)).transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_column_roundtrip() {
        let id = generate();
        assert_eq!(parse_column("id", &id.to_string()).unwrap(), id);
    }

    #[test]
    fn test_parse_column_rejects_garbage() {
        let err = parse_column("id", "not-a-uuid").unwrap_err();
        assert!(matches!(err, Error::Internal(_)));
    }

    #[test]
    fn test_parse_optional_column_none() {
        assert_eq!(parse_optional_column("parent", None).unwrap(), None);
    }
}
