use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum MarkowitzError {
    #[error("Validation error: {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("Dimension mismatch in {context}: expected {expected}, got {actual}")]
    Dimension {
        context: String,
        expected: usize,
        actual: usize,
    },

    #[error("Singular covariance: {0}")]
    SingularCovariance(String),

    #[error("Infeasible target return {target}: {reason}")]
    InfeasibleTarget { target: Decimal, reason: String },

    #[error("Degenerate tangency at risk-free rate {risk_free_rate}: {reason}")]
    DegenerateTangency {
        risk_free_rate: Decimal,
        reason: String,
    },

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

/// Failure category, detached from the message so it can be reported
/// alongside partial results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    Dimension,
    SingularCovariance,
    InfeasibleTarget,
    DegenerateTangency,
    Serialization,
}

impl MarkowitzError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            MarkowitzError::Validation { .. } => ErrorKind::Validation,
            MarkowitzError::Dimension { .. } => ErrorKind::Dimension,
            MarkowitzError::SingularCovariance(_) => ErrorKind::SingularCovariance,
            MarkowitzError::InfeasibleTarget { .. } => ErrorKind::InfeasibleTarget,
            MarkowitzError::DegenerateTangency { .. } => ErrorKind::DegenerateTangency,
            MarkowitzError::SerializationError(_) => ErrorKind::Serialization,
        }
    }
}

impl From<serde_json::Error> for MarkowitzError {
    fn from(e: serde_json::Error) -> Self {
        MarkowitzError::SerializationError(e.to_string())
    }
}
