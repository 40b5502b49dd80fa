//! Algorithm-to-algorithm and algorithm-to-pattern relations

use super::{normalize_optional, require_non_blank};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kind of relation between two algorithms (e.g. "is subroutine of")
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlgoRelationType {
    pub id: Uuid,
    pub name: String,
    pub inverse_type_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlgoRelationTypeInput {
    pub name: String,
    #[serde(default)]
    pub inverse_type_name: Option<String>,
}

impl AlgoRelationTypeInput {
    pub fn validate(&self) -> Result<()> {
        require_non_blank("name", &self.name)
    }
}

/// Directed relation between two algorithms
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlgorithmRelation {
    pub id: Uuid,
    pub source_algorithm_id: Uuid,
    pub target_algorithm_id: Uuid,
    pub algo_relation_type_id: Uuid,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlgorithmRelationInput {
    pub source_algorithm_id: Uuid,
    pub target_algorithm_id: Uuid,
    pub algo_relation_type_id: Uuid,
    #[serde(default)]
    pub description: Option<String>,
}

impl AlgorithmRelationInput {
    /// The relation must involve the algorithm it is filed under
    pub fn validate_for(&self, algorithm_id: Uuid) -> Result<()> {
        if self.source_algorithm_id != algorithm_id && self.target_algorithm_id != algorithm_id {
            return Err(Error::InvalidInput(format!(
                "Relation must have algorithm {} as source or target",
                algorithm_id
            )));
        }
        Ok(())
    }

    pub fn description(&self) -> Option<String> {
        normalize_optional(&self.description)
    }
}

/// Kind of relation between an algorithm and a pattern
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatternRelationType {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatternRelationTypeInput {
    pub name: String,
}

impl PatternRelationTypeInput {
    pub fn validate(&self) -> Result<()> {
        require_non_blank("name", &self.name)
    }
}

/// Link from an algorithm to an external pattern, identified by URI
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatternRelation {
    pub id: Uuid,
    pub algorithm_id: Uuid,
    pub pattern: String,
    pub pattern_relation_type_id: Uuid,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatternRelationInput {
    pub pattern: String,
    pub pattern_relation_type_id: Uuid,
    #[serde(default)]
    pub description: Option<String>,
}

impl PatternRelationInput {
    pub fn validate(&self) -> Result<()> {
        if !is_absolute_uri(self.pattern.trim()) {
            return Err(Error::InvalidInput(format!(
                "pattern must be an absolute URI: {}",
                self.pattern
            )));
        }
        Ok(())
    }

    pub fn description(&self) -> Option<String> {
        normalize_optional(&self.description)
    }
}

/// `scheme:rest` with an RFC 3986 scheme and no whitespace
fn is_absolute_uri(value: &str) -> bool {
    let Some((scheme, rest)) = value.split_once(':') else {
        return false;
    };
    let mut chars = scheme.chars();
    let scheme_ok = chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    scheme_ok && !rest.is_empty() && !value.chars().any(char::is_whitespace)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absolute_uri() {
        assert!(is_absolute_uri("https://patterns.example.org/quantum/oracle"));
        assert!(is_absolute_uri("urn:pattern:uniform-superposition"));
        assert!(!is_absolute_uri("oracle"));
        assert!(!is_absolute_uri("1http://x"));
        assert!(!is_absolute_uri("http://has space"));
        assert!(!is_absolute_uri("http:"));
    }

    #[test]
    fn test_relation_must_involve_algorithm() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let input = AlgorithmRelationInput {
            source_algorithm_id: a,
            target_algorithm_id: b,
            algo_relation_type_id: Uuid::new_v4(),
            description: None,
        };
        assert!(input.validate_for(a).is_ok());
        assert!(input.validate_for(b).is_ok());
        assert!(input.validate_for(Uuid::new_v4()).is_err());
    }
}
