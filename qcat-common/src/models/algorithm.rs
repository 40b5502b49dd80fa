//! Algorithm aggregate root

use super::{normalize_optional, require_non_blank};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Quantum computation paradigm of a quantum algorithm or device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuantumComputationModel {
    GateBased,
    MeasurementBased,
    QuantumAnnealing,
}

impl QuantumComputationModel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GateBased => "GATE_BASED",
            Self::MeasurementBased => "MEASUREMENT_BASED",
            Self::QuantumAnnealing => "QUANTUM_ANNEALING",
        }
    }
}

impl fmt::Display for QuantumComputationModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QuantumComputationModel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "GATE_BASED" => Ok(Self::GateBased),
            "MEASUREMENT_BASED" => Ok(Self::MeasurementBased),
            "QUANTUM_ANNEALING" => Ok(Self::QuantumAnnealing),
            other => Err(Error::InvalidInput(format!(
                "Unknown quantum computation model: {}",
                other
            ))),
        }
    }
}

/// Fields only quantum (and hybrid) algorithms carry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuantumAlgorithmDetails {
    #[serde(default)]
    pub nisq_ready: bool,
    pub quantum_computation_model: QuantumComputationModel,
    #[serde(default)]
    pub speed_up: Option<String>,
}

/// Algorithm specialization, discriminated by `computationModel`
///
/// `CLASSIC` maps to a classic algorithm; `QUANTUM` and `HYBRID` are both
/// quantum algorithms and carry [`QuantumAlgorithmDetails`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "computationModel", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlgorithmKind {
    Classic,
    Quantum(QuantumAlgorithmDetails),
    Hybrid(QuantumAlgorithmDetails),
}

impl AlgorithmKind {
    /// Discriminator value stored in `algorithms.computation_model`
    pub fn computation_model(&self) -> &'static str {
        match self {
            Self::Classic => "CLASSIC",
            Self::Quantum(_) => "QUANTUM",
            Self::Hybrid(_) => "HYBRID",
        }
    }

    pub fn is_quantum(&self) -> bool {
        !matches!(self, Self::Classic)
    }

    pub fn quantum_details(&self) -> Option<&QuantumAlgorithmDetails> {
        match self {
            Self::Classic => None,
            Self::Quantum(details) | Self::Hybrid(details) => Some(details),
        }
    }

    /// Rebuild the specialization from its stored columns
    pub fn from_columns(
        computation_model: &str,
        nisq_ready: Option<bool>,
        quantum_computation_model: Option<String>,
        speed_up: Option<String>,
    ) -> Result<Self> {
        let details = || -> Result<QuantumAlgorithmDetails> {
            let model = quantum_computation_model.as_deref().ok_or_else(|| {
                Error::Internal(format!(
                    "{} algorithm stored without quantum_computation_model",
                    computation_model
                ))
            })?;
            Ok(QuantumAlgorithmDetails {
                nisq_ready: nisq_ready.unwrap_or(false),
                quantum_computation_model: super::parse_stored("quantum_computation_model", model)?,
                speed_up: speed_up.clone(),
            })
        };

        match computation_model {
            "CLASSIC" => Ok(Self::Classic),
            "QUANTUM" => Ok(Self::Quantum(details()?)),
            "HYBRID" => Ok(Self::Hybrid(details()?)),
            other => Err(Error::Internal(format!(
                "Invalid computation_model stored: {}",
                other
            ))),
        }
    }
}

/// Persisted algorithm
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Algorithm {
    pub id: Uuid,
    pub name: String,
    pub acronym: Option<String>,
    pub intent: Option<String>,
    pub problem: Option<String>,
    pub input_format: Option<String>,
    pub algo_parameter: Option<String>,
    pub output_format: Option<String>,
    pub solution: Option<String>,
    pub assumptions: Option<String>,
    #[serde(flatten)]
    pub kind: AlgorithmKind,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Create/update payload for an algorithm
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlgorithmInput {
    pub name: String,
    #[serde(default)]
    pub acronym: Option<String>,
    #[serde(default)]
    pub intent: Option<String>,
    #[serde(default)]
    pub problem: Option<String>,
    #[serde(default)]
    pub input_format: Option<String>,
    #[serde(default)]
    pub algo_parameter: Option<String>,
    #[serde(default)]
    pub output_format: Option<String>,
    #[serde(default)]
    pub solution: Option<String>,
    #[serde(default)]
    pub assumptions: Option<String>,
    #[serde(flatten)]
    pub kind: AlgorithmKind,
}

impl AlgorithmInput {
    /// Minimal input: a name and a specialization
    pub fn new(name: impl Into<String>, kind: AlgorithmKind) -> Self {
        Self {
            name: name.into(),
            acronym: None,
            intent: None,
            problem: None,
            input_format: None,
            algo_parameter: None,
            output_format: None,
            solution: None,
            assumptions: None,
            kind,
        }
    }

    pub fn validate(&self) -> Result<()> {
        require_non_blank("name", &self.name)
    }

    /// Trimmed copy with blank optional fields cleared
    pub fn normalized(&self) -> Self {
        let kind = match &self.kind {
            AlgorithmKind::Classic => AlgorithmKind::Classic,
            AlgorithmKind::Quantum(d) => AlgorithmKind::Quantum(QuantumAlgorithmDetails {
                speed_up: normalize_optional(&d.speed_up),
                ..d.clone()
            }),
            AlgorithmKind::Hybrid(d) => AlgorithmKind::Hybrid(QuantumAlgorithmDetails {
                speed_up: normalize_optional(&d.speed_up),
                ..d.clone()
            }),
        };
        Self {
            name: self.name.trim().to_string(),
            acronym: normalize_optional(&self.acronym),
            intent: normalize_optional(&self.intent),
            problem: normalize_optional(&self.problem),
            input_format: normalize_optional(&self.input_format),
            algo_parameter: normalize_optional(&self.algo_parameter),
            output_format: normalize_optional(&self.output_format),
            solution: normalize_optional(&self.solution),
            assumptions: normalize_optional(&self.assumptions),
            kind,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_classic_algorithm_input_from_json() {
        let input: AlgorithmInput = serde_json::from_value(json!({
            "name": "alg1",
            "computationModel": "CLASSIC"
        }))
        .unwrap();
        assert_eq!(input.kind, AlgorithmKind::Classic);
        assert!(input.validate().is_ok());
    }

    #[test]
    fn test_quantum_algorithm_input_from_json() {
        let input: AlgorithmInput = serde_json::from_value(json!({
            "name": "Shor",
            "computationModel": "QUANTUM",
            "nisqReady": true,
            "quantumComputationModel": "GATE_BASED",
            "speedUp": "exponential"
        }))
        .unwrap();
        let details = input.kind.quantum_details().unwrap();
        assert!(details.nisq_ready);
        assert_eq!(details.quantum_computation_model, QuantumComputationModel::GateBased);
        assert_eq!(input.kind.computation_model(), "QUANTUM");
    }

    #[test]
    fn test_quantum_algorithm_requires_model() {
        let result: std::result::Result<AlgorithmInput, _> = serde_json::from_value(json!({
            "name": "QAOA",
            "computationModel": "HYBRID"
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_blank_name_rejected() {
        let input = AlgorithmInput::new("   ", AlgorithmKind::Classic);
        assert!(matches!(input.validate(), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_kind_from_columns() {
        let kind = AlgorithmKind::from_columns(
            "HYBRID",
            Some(true),
            Some("QUANTUM_ANNEALING".to_string()),
            None,
        )
        .unwrap();
        assert!(kind.is_quantum());
        assert_eq!(kind.computation_model(), "HYBRID");

        assert!(AlgorithmKind::from_columns("QUANTUM", None, None, None).is_err());
        assert_eq!(
            AlgorithmKind::from_columns("CLASSIC", None, None, None).unwrap(),
            AlgorithmKind::Classic
        );
    }

    #[test]
    fn test_algorithm_serializes_flat_discriminator() {
        let now = Utc::now();
        let alg = Algorithm {
            id: Uuid::new_v4(),
            name: "Grover".to_string(),
            acronym: None,
            intent: None,
            problem: None,
            input_format: None,
            algo_parameter: None,
            output_format: None,
            solution: None,
            assumptions: None,
            kind: AlgorithmKind::Quantum(QuantumAlgorithmDetails {
                nisq_ready: false,
                quantum_computation_model: QuantumComputationModel::GateBased,
                speed_up: Some("quadratic".to_string()),
            }),
            created_at: now,
            updated_at: now,
        };
        let value = serde_json::to_value(&alg).unwrap();
        assert_eq!(value["computationModel"], "QUANTUM");
        assert_eq!(value["quantumComputationModel"], "GATE_BASED");
        assert_eq!(value["speedUp"], "quadratic");
    }
}
