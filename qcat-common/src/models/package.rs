//! Implementation packages and TOSCA applications
//!
//! Only metadata is stored; artifact bytes live in external storage and are
//! referenced by URL.

use super::{normalize_optional, require_non_blank};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Packaging variant, discriminated by `packageType`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "packageType", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PackageKind {
    #[serde(rename_all = "camelCase")]
    File {
        file_name: String,
        #[serde(default)]
        mime_type: Option<String>,
        #[serde(default)]
        file_url: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    Tosca { tosca_application_id: Uuid },
    #[serde(rename_all = "camelCase")]
    Function { endpoint: String },
}

impl PackageKind {
    /// Discriminator stored in `implementation_packages.package_type`
    pub fn package_type(&self) -> &'static str {
        match self {
            Self::File { .. } => "FILE",
            Self::Tosca { .. } => "TOSCA",
            Self::Function { .. } => "FUNCTION",
        }
    }

    pub fn tosca_application_id(&self) -> Option<Uuid> {
        match self {
            Self::Tosca {
                tosca_application_id,
            } => Some(*tosca_application_id),
            _ => None,
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            Self::File { file_name, .. } => require_non_blank("fileName", file_name),
            Self::Tosca { .. } => Ok(()),
            Self::Function { endpoint } => require_non_blank("endpoint", endpoint),
        }
    }

    /// Rebuild the variant from its stored columns
    pub fn from_columns(
        package_type: &str,
        file_name: Option<String>,
        mime_type: Option<String>,
        file_url: Option<String>,
        tosca_application_id: Option<Uuid>,
        endpoint: Option<String>,
    ) -> Result<Self> {
        let missing = |column: &str| {
            Error::Internal(format!("{} package stored without {}", package_type, column))
        };
        match package_type {
            "FILE" => Ok(Self::File {
                file_name: file_name.ok_or_else(|| missing("file_name"))?,
                mime_type,
                file_url,
            }),
            "TOSCA" => Ok(Self::Tosca {
                tosca_application_id: tosca_application_id
                    .ok_or_else(|| missing("tosca_application_id"))?,
            }),
            "FUNCTION" => Ok(Self::Function {
                endpoint: endpoint.ok_or_else(|| missing("endpoint"))?,
            }),
            other => Err(Error::Internal(format!("Invalid package_type stored: {}", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImplementationPackage {
    pub id: Uuid,
    pub implementation_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    #[serde(flatten)]
    pub package: PackageKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImplementationPackageInput {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(flatten)]
    pub package: PackageKind,
}

impl ImplementationPackageInput {
    pub fn validate(&self) -> Result<()> {
        require_non_blank("name", &self.name)?;
        self.package.validate()
    }

    pub fn description(&self) -> Option<String> {
        normalize_optional(&self.description)
    }
}

/// Deployable application described by a TOSCA service template
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToscaApplication {
    pub id: Uuid,
    pub name: String,
    pub tosca_id: Option<String>,
    pub tosca_namespace: Option<String>,
    pub tosca_name: Option<String>,
    pub wine_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToscaApplicationInput {
    pub name: String,
    #[serde(default)]
    pub tosca_id: Option<String>,
    #[serde(default)]
    pub tosca_namespace: Option<String>,
    #[serde(default)]
    pub tosca_name: Option<String>,
    #[serde(default)]
    pub wine_url: Option<String>,
}

impl ToscaApplicationInput {
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
            tosca_id: normalize_optional(&self.tosca_id),
            tosca_namespace: normalize_optional(&self.tosca_namespace),
            tosca_name: normalize_optional(&self.tosca_name),
            wine_url: normalize_optional(&self.wine_url),
        }
    }
}
