use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Numerical tolerances shared by validation and every solver.
///
/// Fictional and real covariance matrices differ by orders of magnitude in
/// scale, so the singularity threshold is relative: a pivot or a frontier
/// determinant counts as zero when it is below `singularity_tolerance`
/// times the magnitude it is compared against.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Maximum absolute difference between `cov[i][j]` and `cov[j][i]`.
    pub symmetry_tolerance: Decimal,
    /// Relative threshold for singular matrices and a vanishing Δ.
    pub singularity_tolerance: Decimal,
    /// Weights above `-weight_tolerance` count as non-negative.
    pub weight_tolerance: Decimal,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            symmetry_tolerance: dec!(0.000000001),
            singularity_tolerance: dec!(0.000000001),
            weight_tolerance: dec!(0.000000000001),
        }
    }
}
