//! Software platforms, cloud services and compute resources

use super::{normalize_optional, require_non_blank, QuantumComputationModel};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SoftwarePlatform {
    pub id: Uuid,
    pub name: String,
    pub link: Option<String>,
    pub license: Option<String>,
    pub version: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SoftwarePlatformInput {
    pub name: String,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub license: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
}

impl SoftwarePlatformInput {
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
            link: normalize_optional(&self.link),
            license: normalize_optional(&self.license),
            version: normalize_optional(&self.version),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloudService {
    pub id: Uuid,
    pub name: String,
    pub provider: Option<String>,
    pub url: Option<String>,
    pub description: Option<String>,
    pub cost_model: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloudServiceInput {
    pub name: String,
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub cost_model: Option<String>,
}

impl CloudServiceInput {
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
            provider: normalize_optional(&self.provider),
            url: normalize_optional(&self.url),
            description: normalize_optional(&self.description),
            cost_model: normalize_optional(&self.cost_model),
        }
    }
}

/// Physical QPU or simulator backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ComputeResourceKind {
    #[default]
    Qpu,
    Simulator,
}

impl ComputeResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Qpu => "QPU",
            Self::Simulator => "SIMULATOR",
        }
    }
}

impl fmt::Display for ComputeResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ComputeResourceKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "QPU" => Ok(Self::Qpu),
            "SIMULATOR" => Ok(Self::Simulator),
            other => Err(Error::InvalidInput(format!("Unknown compute resource kind: {}", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComputeResource {
    pub id: Uuid,
    pub name: String,
    pub vendor: Option<String>,
    pub technology: Option<String>,
    pub quantum_computation_model: Option<QuantumComputationModel>,
    pub kind: ComputeResourceKind,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComputeResourceInput {
    pub name: String,
    #[serde(default)]
    pub vendor: Option<String>,
    #[serde(default)]
    pub technology: Option<String>,
    #[serde(default)]
    pub quantum_computation_model: Option<QuantumComputationModel>,
    #[serde(default)]
    pub kind: ComputeResourceKind,
}

impl ComputeResourceInput {
    pub fn new(name: impl Into<String>, kind: ComputeResourceKind) -> Self {
        Self {
            name: name.into(),
            kind,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        require_non_blank("name", &self.name)
    }

    pub fn normalized(&self) -> Self {
        Self {
            name: self.name.trim().to_string(),
            vendor: normalize_optional(&self.vendor),
            technology: normalize_optional(&self.technology),
            quantum_computation_model: self.quantum_computation_model,
            kind: self.kind,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compute_resource_kind_defaults_to_qpu() {
        let input: ComputeResourceInput = serde_json::from_str(r#"{"name":"ibmq_lima"}"#).unwrap();
        assert_eq!(input.kind, ComputeResourceKind::Qpu);

        let input: ComputeResourceInput =
            serde_json::from_str(r#"{"name":"qasm_simulator","kind":"SIMULATOR"}"#).unwrap();
        assert_eq!(input.kind, ComputeResourceKind::Simulator);
    }

    #[test]
    fn test_normalized_trims_fields() {
        let input = CloudServiceInput {
            name: " IBM Quantum ".to_string(),
            provider: Some("  ".to_string()),
            ..Default::default()
        };
        let normalized = input.normalized();
        assert_eq!(normalized.name, "IBM Quantum");
        assert_eq!(normalized.provider, None);
    }
}
