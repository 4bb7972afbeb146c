use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::MarkowitzError;
use crate::linalg::{max_abs_entry, quadratic_form, sqrt_decimal, vec_dot};
use crate::universe::AssetUniverse;
use crate::MarkowitzResult;

/// A weighting over the assets of a universe.
///
/// Weights are expected to sum to 1 and may be negative (short positions).
/// Return and risk are always derived from the universe, never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Portfolio {
    pub weights: Vec<Decimal>,
}

impl Portfolio {
    pub fn new(weights: Vec<Decimal>) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> &[Decimal] {
        &self.weights
    }

    pub fn total_weight(&self) -> Decimal {
        self.weights.iter().sum()
    }

    pub fn expected_return(&self, universe: &AssetUniverse) -> MarkowitzResult<Decimal> {
        expected_return(&self.weights, universe)
    }

    pub fn variance(&self, universe: &AssetUniverse) -> MarkowitzResult<Decimal> {
        variance(&self.weights, universe)
    }

    pub fn standard_deviation(&self, universe: &AssetUniverse) -> MarkowitzResult<Decimal> {
        standard_deviation(&self.weights, universe)
    }

    pub fn sharpe_ratio(
        &self,
        universe: &AssetUniverse,
        risk_free_rate: Decimal,
    ) -> MarkowitzResult<Decimal> {
        let ret = self.expected_return(universe)?;
        let risk = self.standard_deviation(universe)?;
        Ok(sharpe_ratio(ret, risk_free_rate, risk))
    }
}

/// Portfolio expected return: sum_i w_i * mu_i.
pub fn expected_return(weights: &[Decimal], universe: &AssetUniverse) -> MarkowitzResult<Decimal> {
    check_dimension(weights, universe)?;
    vec_dot(weights, universe.returns())
}

/// Portfolio variance: w' * Sigma * w. Weights are not normalized.
pub fn variance(weights: &[Decimal], universe: &AssetUniverse) -> MarkowitzResult<Decimal> {
    check_dimension(weights, universe)?;
    quadratic_form(universe.covariance(), weights)
}

/// Portfolio standard deviation: sqrt(w' * Sigma * w).
///
/// A variance below zero by more than rounding (relative to the covariance
/// scale and the gross exposure) fails with `SingularCovariance`.
pub fn standard_deviation(weights: &[Decimal], universe: &AssetUniverse) -> MarkowitzResult<Decimal> {
    let var = variance(weights, universe)?;
    let gross: Decimal = weights.iter().map(|w| w.abs()).sum();
    let residue = universe
        .config()
        .singularity_tolerance
        .checked_mul(max_abs_entry(universe.covariance()))
        .and_then(|t| t.checked_mul(gross))
        .and_then(|t| t.checked_mul(gross))
        .unwrap_or(Decimal::MAX);
    sqrt_decimal(var, residue)
}

/// Sharpe ratio with division-by-zero guard.
pub fn sharpe_ratio(ret: Decimal, risk_free_rate: Decimal, risk: Decimal) -> Decimal {
    if risk.is_zero() {
        Decimal::ZERO
    } else {
        (ret - risk_free_rate) / risk
    }
}

fn check_dimension(weights: &[Decimal], universe: &AssetUniverse) -> MarkowitzResult<()> {
    if weights.len() != universe.dimension() {
        return Err(MarkowitzError::Dimension {
            context: "portfolio weights".into(),
            expected: universe.dimension(),
            actual: weights.len(),
        });
    }
    Ok(())
}
