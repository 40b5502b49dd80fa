//! Implementation aggregate

use super::{normalize_optional, require_non_blank};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Classic vs. quantum implementation discriminator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ImplementationKind {
    Classic,
    Quantum,
}

impl ImplementationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Classic => "CLASSIC",
            Self::Quantum => "QUANTUM",
        }
    }
}

impl fmt::Display for ImplementationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ImplementationKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "CLASSIC" => Ok(Self::Classic),
            "QUANTUM" => Ok(Self::Quantum),
            other => Err(Error::InvalidInput(format!("Unknown implementation kind: {}", other))),
        }
    }
}

/// Persisted implementation of an algorithm
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Implementation {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub contributors: Option<String>,
    pub assumptions: Option<String>,
    pub parameter: Option<String>,
    pub dependencies: Option<String>,
    pub link: Option<String>,
    pub version: Option<String>,
    pub license: Option<String>,
    pub technology: Option<String>,
    pub problem_statement: Option<String>,
    pub input_format: Option<String>,
    pub output_format: Option<String>,
    pub implemented_algorithm_id: Uuid,
    pub kind: ImplementationKind,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Create/update payload for an implementation
///
/// The implemented algorithm comes from the request path. When `kind` is
/// omitted it follows the algorithm's specialization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImplementationInput {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub contributors: Option<String>,
    #[serde(default)]
    pub assumptions: Option<String>,
    #[serde(default)]
    pub parameter: Option<String>,
    #[serde(default)]
    pub dependencies: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub license: Option<String>,
    #[serde(default)]
    pub technology: Option<String>,
    #[serde(default)]
    pub problem_statement: Option<String>,
    #[serde(default)]
    pub input_format: Option<String>,
    #[serde(default)]
    pub output_format: Option<String>,
    #[serde(default)]
    pub kind: Option<ImplementationKind>,
}

impl ImplementationInput {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        require_non_blank("name", &self.name)
    }

    pub fn normalized(&self) -> Self {
        Self {
            name: self.name.trim().to_string(),
            description: normalize_optional(&self.description),
            contributors: normalize_optional(&self.contributors),
            assumptions: normalize_optional(&self.assumptions),
            parameter: normalize_optional(&self.parameter),
            dependencies: normalize_optional(&self.dependencies),
            link: normalize_optional(&self.link),
            version: normalize_optional(&self.version),
            license: normalize_optional(&self.license),
            technology: normalize_optional(&self.technology),
            problem_statement: normalize_optional(&self.problem_statement),
            input_format: normalize_optional(&self.input_format),
            output_format: normalize_optional(&self.output_format),
            kind: self.kind,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_roundtrip_through_text() {
        for kind in [ImplementationKind::Classic, ImplementationKind::Quantum] {
            assert_eq!(kind.as_str().parse::<ImplementationKind>().unwrap(), kind);
        }
        assert!("HYBRID".parse::<ImplementationKind>().is_err());
    }

    #[test]
    fn test_input_defaults() {
        let input: ImplementationInput = serde_json::from_str(r#"{"name":"impl1"}"#).unwrap();
        assert_eq!(input.kind, None);
        assert!(input.validate().is_ok());
    }
}
