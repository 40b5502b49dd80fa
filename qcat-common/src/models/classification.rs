//! Classification and reference entities: tags, problem types, application
//! areas, learning methods and publications

use super::{normalize_optional, require_non_blank};
use crate::Result;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Tag, identified by its value (natural key)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tag {
    pub value: String,
    #[serde(default)]
    pub category: Option<String>,
}

impl Tag {
    pub fn new(value: impl Into<String>, category: Option<&str>) -> Self {
        Self {
            value: value.into(),
            category: category.map(str::to_string),
        }
    }

    pub fn validate(&self) -> Result<()> {
        require_non_blank("value", &self.value)
    }

    pub fn normalized(&self) -> Self {
        Self {
            value: self.value.trim().to_string(),
            category: normalize_optional(&self.category),
        }
    }
}

/// Problem type; parent references form a tree (never a cycle)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProblemType {
    pub id: Uuid,
    pub name: String,
    pub parent_problem_type_id: Option<Uuid>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProblemTypeInput {
    pub name: String,
    #[serde(default)]
    pub parent_problem_type_id: Option<Uuid>,
}

impl ProblemTypeInput {
    pub fn new(name: impl Into<String>, parent: Option<Uuid>) -> Self {
        Self {
            name: name.into(),
            parent_problem_type_id: parent,
        }
    }

    pub fn validate(&self) -> Result<()> {
        require_non_blank("name", &self.name)
    }
}

/// Id + name lookup row (application areas, learning methods)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NamedEntity {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NamedEntityInput {
    pub name: String,
}

impl NamedEntityInput {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn validate(&self) -> Result<()> {
        require_non_blank("name", &self.name)
    }
}

pub type ApplicationArea = NamedEntity;
pub type LearningMethod = NamedEntity;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Publication {
    pub id: Uuid,
    pub title: String,
    pub doi: Option<String>,
    pub url: Option<String>,
    pub authors: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicationInput {
    pub title: String,
    #[serde(default)]
    pub doi: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub authors: Vec<String>,
}

impl PublicationInput {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        require_non_blank("title", &self.title)
    }

    /// Trimmed copy; blank author entries are dropped
    pub fn normalized(&self) -> Self {
        Self {
            title: self.title.trim().to_string(),
            doi: normalize_optional(&self.doi),
            url: normalize_optional(&self.url),
            authors: self
                .authors
                .iter()
                .map(|a| a.trim())
                .filter(|a| !a.is_empty())
                .map(str::to_string)
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_normalized() {
        let tag = Tag::new("  optimization ", Some(" "));
        let normalized = tag.normalized();
        assert_eq!(normalized.value, "optimization");
        assert_eq!(normalized.category, None);
    }

    #[test]
    fn test_publication_authors_cleaned() {
        let input = PublicationInput {
            title: "Quantum supremacy".to_string(),
            authors: vec![" Arute ".to_string(), "".to_string(), "Arya".to_string()],
            ..Default::default()
        };
        assert_eq!(input.normalized().authors, vec!["Arute", "Arya"]);
    }
}
