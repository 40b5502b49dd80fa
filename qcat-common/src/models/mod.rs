//! Domain models
//!
//! Read shapes (`Algorithm`, `Implementation`, ...) are what the service
//! returns; `*Input` shapes are what create/update accept. Wire names are
//! camelCase. Inheritance hierarchies of the catalog are tagged enums with a
//! discriminator column in the database.

pub mod algorithm;
pub mod classification;
pub mod discussion;
pub mod implementation;
pub mod package;
pub mod platform;
pub mod property;
pub mod relation;

pub use algorithm::*;
pub use classification::*;
pub use discussion::*;
pub use implementation::*;
pub use package::*;
pub use platform::*;
pub use property::*;
pub use relation::*;

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Body of a link request referencing an existing entity by id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityReference {
    pub id: Uuid,
}

/// Reject missing or whitespace-only required text
pub(crate) fn require_non_blank(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::InvalidInput(format!("{} must not be blank", field)));
    }
    Ok(())
}

/// Trim optional text, turning blank strings into None
pub(crate) fn normalize_optional(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Parse an enum stored as TEXT, naming the column on failure
pub(crate) fn parse_stored<T>(column: &str, value: &str) -> Result<T>
where
    T: std::str::FromStr<Err = Error>,
{
    value
        .parse()
        .map_err(|e| Error::Internal(format!("Invalid value in column {}: {}", column, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_non_blank() {
        assert!(require_non_blank("name", "alg1").is_ok());
        assert!(matches!(
            require_non_blank("name", "  "),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_normalize_optional() {
        assert_eq!(normalize_optional(&Some("  x ".to_string())), Some("x".to_string()));
        assert_eq!(normalize_optional(&Some("   ".to_string())), None);
        assert_eq!(normalize_optional(&None), None);
    }
}
