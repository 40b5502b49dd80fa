//! Typed compute-resource properties
//!
//! A property is a string-encoded value checked against the datatype of its
//! type descriptor, owned by exactly one algorithm, implementation or
//! compute resource.

use super::{normalize_optional, require_non_blank};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Datatype a property value must parse as
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Datatype {
    Integer,
    Float,
    String,
    Boolean,
}

impl Datatype {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Integer => "INTEGER",
            Self::Float => "FLOAT",
            Self::String => "STRING",
            Self::Boolean => "BOOLEAN",
        }
    }

    /// Check that `value` is a valid literal of this datatype
    pub fn validate_value(&self, value: &str) -> Result<()> {
        let trimmed = value.trim();
        let valid = match self {
            Self::Integer => trimmed.parse::<i64>().is_ok(),
            Self::Float => trimmed.parse::<f64>().is_ok_and(f64::is_finite),
            Self::String => true,
            Self::Boolean => {
                trimmed.eq_ignore_ascii_case("true") || trimmed.eq_ignore_ascii_case("false")
            }
        };
        if valid {
            Ok(())
        } else {
            Err(Error::InvalidInput(format!(
                "Value \"{}\" is not a valid {}",
                value,
                self.as_str()
            )))
        }
    }
}

impl fmt::Display for Datatype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Datatype {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "INTEGER" => Ok(Self::Integer),
            "FLOAT" => Ok(Self::Float),
            "STRING" => Ok(Self::String),
            "BOOLEAN" => Ok(Self::Boolean),
            other => Err(Error::InvalidInput(format!("Unknown datatype: {}", other))),
        }
    }
}

/// Descriptor of a property: name plus expected datatype
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComputeResourcePropertyType {
    pub id: Uuid,
    pub name: String,
    pub datatype: Datatype,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComputeResourcePropertyTypeInput {
    pub name: String,
    pub datatype: Datatype,
    #[serde(default)]
    pub description: Option<String>,
}

impl ComputeResourcePropertyTypeInput {
    pub fn validate(&self) -> Result<()> {
        require_non_blank("name", &self.name)
    }

    pub fn description(&self) -> Option<String> {
        normalize_optional(&self.description)
    }
}

/// The single entity a property belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PropertyOwner {
    Algorithm(Uuid),
    Implementation(Uuid),
    ComputeResource(Uuid),
}

impl PropertyOwner {
    pub fn id(&self) -> Uuid {
        match self {
            Self::Algorithm(id) | Self::Implementation(id) | Self::ComputeResource(id) => *id,
        }
    }

    /// Foreign-key column holding the owner id
    pub fn column(&self) -> &'static str {
        match self {
            Self::Algorithm(_) => "algorithm_id",
            Self::Implementation(_) => "implementation_id",
            Self::ComputeResource(_) => "compute_resource_id",
        }
    }

    /// Rebuild the owner from the three nullable owner columns
    pub fn from_columns(
        algorithm_id: Option<Uuid>,
        implementation_id: Option<Uuid>,
        compute_resource_id: Option<Uuid>,
    ) -> Result<Self> {
        match (algorithm_id, implementation_id, compute_resource_id) {
            (Some(id), None, None) => Ok(Self::Algorithm(id)),
            (None, Some(id), None) => Ok(Self::Implementation(id)),
            (None, None, Some(id)) => Ok(Self::ComputeResource(id)),
            _ => Err(Error::Internal(
                "Property row must have exactly one owner".to_string(),
            )),
        }
    }
}

/// Property value attached to its owner
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComputeResourceProperty {
    pub id: Uuid,
    pub value: String,
    pub type_id: Uuid,
    pub owner: PropertyOwner,
}

/// Create/update payload; the owner comes from the request path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComputeResourcePropertyInput {
    pub value: String,
    pub type_id: Uuid,
}
