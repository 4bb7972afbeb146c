use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

use crate::config::SolverConfig;
use crate::error::MarkowitzError;
use crate::linalg::{self, ScaledInverse};
use crate::types::Matrix;
use crate::MarkowitzResult;

/// Serializable description of an asset universe, as supplied by callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetUniverseInput {
    /// Asset identifiers (defaults to "Asset 1".."Asset N").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_names: Option<Vec<String>>,
    /// Expected return per asset.
    pub expected_returns: Vec<Decimal>,
    /// N x N covariance matrix, same ordering as `expected_returns`.
    pub covariance_matrix: Vec<Vec<Decimal>>,
    /// Numerical tolerances.
    #[serde(default)]
    pub config: SolverConfig,
}

/// Expected returns and covariance for N assets, validated once at
/// construction and immutable thereafter.
///
/// The covariance inverse is computed on first use and shared by every
/// solver call against this universe.
#[derive(Debug, Clone)]
pub struct AssetUniverse {
    names: Vec<String>,
    returns: Vec<Decimal>,
    covariance: Matrix,
    config: SolverConfig,
    inverse: OnceLock<MarkowitzResult<ScaledInverse>>,
}

impl AssetUniverse {
    /// Build a universe with default tolerances.
    pub fn new(returns: Vec<Decimal>, covariance: Matrix) -> MarkowitzResult<Self> {
        Self::with_config(returns, covariance, SolverConfig::default())
    }

    pub fn with_config(
        returns: Vec<Decimal>,
        covariance: Matrix,
        config: SolverConfig,
    ) -> MarkowitzResult<Self> {
        validate(&returns, &covariance, &config)?;
        let names = (1..=returns.len()).map(|i| format!("Asset {}", i)).collect();
        Ok(Self {
            names,
            returns,
            covariance,
            config,
            inverse: OnceLock::new(),
        })
    }

    /// Attach asset names; their count must match the dimension.
    pub fn with_names(mut self, names: Vec<String>) -> MarkowitzResult<Self> {
        if names.len() != self.dimension() {
            return Err(MarkowitzError::Validation {
                field: "asset_names".into(),
                reason: format!(
                    "Expected {} names but got {}",
                    self.dimension(),
                    names.len()
                ),
            });
        }
        self.names = names;
        Ok(self)
    }

    pub fn dimension(&self) -> usize {
        self.returns.len()
    }

    pub fn returns(&self) -> &[Decimal] {
        &self.returns
    }

    pub fn covariance(&self) -> &[Vec<Decimal>] {
        &self.covariance
    }

    pub fn asset_names(&self) -> &[String] {
        &self.names
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Covariance inverse at unit scale, computed once and cached (failures
    /// included). Fails unless the covariance is positive definite.
    pub fn inverse(&self) -> MarkowitzResult<&ScaledInverse> {
        self.inverse
            .get_or_init(|| {
                tracing::debug!(n = self.dimension(), "inverting covariance matrix");
                linalg::covariance_inverse(&self.covariance, self.config.singularity_tolerance)
            })
            .as_ref()
            .map_err(Clone::clone)
    }

    /// Largest and smallest single-asset expected return.
    pub fn return_bounds(&self) -> (Decimal, Decimal) {
        let lo = self.returns.iter().copied().fold(Decimal::MAX, Decimal::min);
        let hi = self.returns.iter().copied().fold(Decimal::MIN, Decimal::max);
        (lo, hi)
    }
}

impl TryFrom<AssetUniverseInput> for AssetUniverse {
    type Error = MarkowitzError;

    fn try_from(input: AssetUniverseInput) -> MarkowitzResult<Self> {
        let universe = AssetUniverse::with_config(
            input.expected_returns,
            input.covariance_matrix,
            input.config,
        )?;
        match input.asset_names {
            Some(names) => universe.with_names(names),
            None => Ok(universe),
        }
    }
}

impl TryFrom<&AssetUniverseInput> for AssetUniverse {
    type Error = MarkowitzError;

    fn try_from(input: &AssetUniverseInput) -> MarkowitzResult<Self> {
        AssetUniverse::try_from(input.clone())
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

#[allow(clippy::needless_range_loop)]
fn validate(returns: &[Decimal], cov: &[Vec<Decimal>], config: &SolverConfig) -> MarkowitzResult<()> {
    let n = returns.len();
    if n == 0 {
        return Err(MarkowitzError::Validation {
            field: "expected_returns".into(),
            reason: "At least one asset required".into(),
        });
    }
    if cov.len() != n {
        return Err(MarkowitzError::Validation {
            field: "covariance_matrix".into(),
            reason: format!("Expected {}x{} matrix but got {} rows", n, n, cov.len()),
        });
    }
    for (i, row) in cov.iter().enumerate() {
        if row.len() != n {
            return Err(MarkowitzError::Validation {
                field: "covariance_matrix".into(),
                reason: format!("Row {} has {} columns, expected {}", i, row.len(), n),
            });
        }
    }
    for i in 0..n {
        if cov[i][i] < Decimal::ZERO {
            return Err(MarkowitzError::Validation {
                field: "covariance_matrix".into(),
                reason: format!("Negative variance on diagonal [{},{}]={}", i, i, cov[i][i]),
            });
        }
        for j in (i + 1)..n {
            if (cov[i][j] - cov[j][i]).abs() > config.symmetry_tolerance {
                return Err(MarkowitzError::Validation {
                    field: "covariance_matrix".into(),
                    reason: format!(
                        "Not symmetric: [{},{}]={} != [{},{}]={}",
                        i, j, cov[i][j], j, i, cov[j][i]
                    ),
                });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn two_asset_cov() -> Matrix {
        vec![vec![dec!(0.04), dec!(0.0)], vec![dec!(0.0), dec!(0.09)]]
    }

    #[test]
    fn test_valid_universe() {
        let u = AssetUniverse::new(vec![dec!(0.05), dec!(0.15)], two_asset_cov()).unwrap();
        assert_eq!(u.dimension(), 2);
        assert_eq!(u.asset_names(), &["Asset 1".to_string(), "Asset 2".to_string()]);
        assert_eq!(u.return_bounds(), (dec!(0.05), dec!(0.15)));
    }

    #[test]
    fn test_empty_universe_rejected() {
        let err = AssetUniverse::new(vec![], vec![]).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Validation);
    }

    #[test]
    fn test_dimension_mismatch_rejected() {
        let err = AssetUniverse::new(vec![dec!(0.05)], two_asset_cov()).unwrap_err();
        assert!(matches!(err, MarkowitzError::Validation { .. }));
    }

    #[test]
    fn test_ragged_rows_rejected() {
        let cov = vec![vec![dec!(0.04), dec!(0.0)], vec![dec!(0.09)]];
        assert!(AssetUniverse::new(vec![dec!(0.05), dec!(0.15)], cov).is_err());
    }

    #[test]
    fn test_asymmetric_rejected() {
        let cov = vec![vec![dec!(0.04), dec!(0.01)], vec![dec!(0.011), dec!(0.09)]];
        let err = AssetUniverse::new(vec![dec!(0.05), dec!(0.15)], cov).unwrap_err();
        assert!(err.to_string().contains("Not symmetric"));
    }

    #[test]
    fn test_asymmetry_within_tolerance_accepted() {
        let cov = vec![
            vec![dec!(0.04), dec!(0.01)],
            vec![dec!(0.0100000000005), dec!(0.09)],
        ];
        assert!(AssetUniverse::new(vec![dec!(0.05), dec!(0.15)], cov).is_ok());
    }

    #[test]
    fn test_negative_variance_rejected() {
        let cov = vec![vec![dec!(-0.04), dec!(0.0)], vec![dec!(0.0), dec!(0.09)]];
        let err = AssetUniverse::new(vec![dec!(0.05), dec!(0.15)], cov).unwrap_err();
        assert!(err.to_string().contains("Negative variance"));
    }

    #[test]
    fn test_names_must_match_dimension() {
        let u = AssetUniverse::new(vec![dec!(0.05), dec!(0.15)], two_asset_cov()).unwrap();
        assert!(u.clone().with_names(vec!["A".into()]).is_err());
        let named = u.with_names(vec!["A".into(), "B".into()]).unwrap();
        assert_eq!(named.asset_names()[1], "B");
    }

    #[test]
    fn test_singular_inverse_is_cached_error() {
        let cov = vec![vec![dec!(0.04), dec!(0.02)], vec![dec!(0.02), dec!(0.01)]];
        let u = AssetUniverse::new(vec![dec!(0.1), dec!(0.1)], cov).unwrap();
        assert!(matches!(u.inverse(), Err(MarkowitzError::SingularCovariance(_))));
        assert!(u.inverse().is_err());
    }

    #[test]
    fn test_from_json_input() {
        let json = r#"{
            "asset_names": ["Bonds", "Equity"],
            "expected_returns": ["0.05", "0.15"],
            "covariance_matrix": [["0.04", "0"], ["0", "0.09"]]
        }"#;
        let input: AssetUniverseInput = serde_json::from_str(json).unwrap();
        assert_eq!(input.config, SolverConfig::default());
        let u = AssetUniverse::try_from(input).unwrap();
        assert_eq!(u.asset_names()[0], "Bonds");
        let inv = u.inverse().unwrap();
        assert_eq!(inv.scale, dec!(0.09));
        assert!((inv.inverse[0][0] / inv.scale - dec!(25)).abs() < dec!(0.000000001));
    }

    #[test]
    fn test_indefinite_covariance_fails_on_first_solve() {
        // Passes validation (symmetric, non-negative diagonal) but has a
        // negative eigenvalue; the failure appears once the inverse is needed.
        let cov = vec![vec![dec!(0.01), dec!(0.02)], vec![dec!(0.02), dec!(0.01)]];
        let u = AssetUniverse::new(vec![dec!(0.05), dec!(0.15)], cov).unwrap();
        let err = u.inverse().unwrap_err();
        assert!(matches!(err, MarkowitzError::SingularCovariance(_)));
        assert!(err.to_string().contains("not positive definite"));
    }
}
