//! Discussion topics and their comments

use super::{normalize_optional, require_non_blank};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Topic status; either value may be set at any time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TopicStatus {
    #[default]
    Open,
    Closed,
}

impl TopicStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "OPEN",
            Self::Closed => "CLOSED",
        }
    }
}

impl fmt::Display for TopicStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TopicStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "OPEN" => Ok(Self::Open),
            "CLOSED" => Ok(Self::Closed),
            other => Err(Error::InvalidInput(format!("Unknown topic status: {}", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscussionTopic {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub status: TopicStatus,
    pub date: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscussionTopicInput {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: TopicStatus,
    /// Defaults to the time of creation
    #[serde(default)]
    pub date: Option<DateTime<Utc>>,
}

impl DiscussionTopicInput {
    pub fn new(title: impl Into<String>, status: TopicStatus) -> Self {
        Self {
            title: title.into(),
            description: None,
            status,
            date: None,
        }
    }

    pub fn validate(&self) -> Result<()> {
        require_non_blank("title", &self.title)
    }

    pub fn description(&self) -> Option<String> {
        normalize_optional(&self.description)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscussionComment {
    pub id: Uuid,
    pub topic_id: Uuid,
    pub text: String,
    pub date: DateTime<Utc>,
    pub reply_to_id: Option<Uuid>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscussionCommentInput {
    pub text: String,
    #[serde(default)]
    pub date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub reply_to_id: Option<Uuid>,
}

impl DiscussionCommentInput {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            date: None,
            reply_to_id: None,
        }
    }

    pub fn replying_to(mut self, comment_id: Uuid) -> Self {
        self.reply_to_id = Some(comment_id);
        self
    }

    pub fn validate(&self) -> Result<()> {
        require_non_blank("text", &self.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_defaults_to_open() {
        let input: DiscussionTopicInput = serde_json::from_str(r#"{"title":"Noise"}"#).unwrap();
        assert_eq!(input.status, TopicStatus::Open);
        assert!(input.date.is_none());
    }

    #[test]
    fn test_status_text_roundtrip() {
        assert_eq!("CLOSED".parse::<TopicStatus>().unwrap(), TopicStatus::Closed);
        assert!("ARCHIVED".parse::<TopicStatus>().is_err());
    }

    #[test]
    fn test_blank_comment_rejected() {
        assert!(DiscussionCommentInput::new(" ").validate().is_err());
    }
}
