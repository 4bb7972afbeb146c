use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

use crate::active_set::pin_negative_weights;
use crate::error::MarkowitzError;
use crate::linalg::{
    covariance_inverse, mat_vec_multiply, overflow, submatrix, subvector, vec_dot, ScaledInverse,
};
use crate::portfolio::Portfolio;
use crate::universe::AssetUniverse;
use crate::MarkowitzResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Constraints applied on top of the budget (sum of weights = 1).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintSet {
    /// Short positions allowed; closed-form solution.
    #[default]
    Unconstrained,
    /// No short sales; active-set reduction of the closed form.
    LongOnly,
}

/// Two-fund basis of the frontier.
///
/// With `g = C^-1 1` and `h = C^-1 mu`: `A = 1'g`, `B = 1'h`, `D = mu'h`
/// and `delta = AD - B^2`. Every frontier portfolio is
/// `w(r) = ((D - Br) g + (Ar - B) h) / delta`.
///
/// The coefficients are those of `C / scale`. Weights and the
/// minimum-variance return are unchanged by the rescaling; variances are
/// multiplied back by `scale`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrontierCoefficients {
    pub a: Decimal,
    pub b: Decimal,
    pub d: Decimal,
    pub delta: Decimal,
    pub scale: Decimal,
    #[serde(skip)]
    inv_ones: Vec<Decimal>,
    #[serde(skip)]
    inv_returns: Vec<Decimal>,
}

impl FrontierCoefficients {
    pub fn from_inverse(inverse: &ScaledInverse, returns: &[Decimal]) -> MarkowitzResult<Self> {
        let ones = vec![Decimal::ONE; returns.len()];
        let inv_ones = mat_vec_multiply(&inverse.inverse, &ones)?;
        let inv_returns = mat_vec_multiply(&inverse.inverse, returns)?;
        let a = vec_dot(&ones, &inv_ones)?;
        let b = vec_dot(&ones, &inv_returns)?;
        let d = vec_dot(returns, &inv_returns)?;
        let delta = a
            .checked_mul(d)
            .zip(b.checked_mul(b))
            .and_then(|(ad, bb)| ad.checked_sub(bb))
            .ok_or_else(|| overflow("frontier determinant"))?;
        Ok(Self {
            a,
            b,
            d,
            delta,
            scale: inverse.scale,
            inv_ones,
            inv_returns,
        })
    }

    /// (C / scale)^-1 1
    pub fn inv_ones(&self) -> &[Decimal] {
        &self.inv_ones
    }

    /// (C / scale)^-1 mu
    pub fn inv_returns(&self) -> &[Decimal] {
        &self.inv_returns
    }

    /// Delta is within `tolerance` of zero relative to A*D. Cauchy-Schwarz
    /// gives AD >= B^2 for a positive definite C, so a negative delta is
    /// degenerate as well.
    pub fn is_degenerate(&self, tolerance: Decimal) -> bool {
        match self.a.checked_mul(self.d) {
            Some(ad) => self.delta <= tolerance * ad.abs(),
            None => false,
        }
    }

    pub fn ensure_frontier(&self, tolerance: Decimal) -> MarkowitzResult<()> {
        if self.is_degenerate(tolerance) {
            return Err(MarkowitzError::SingularCovariance(format!(
                "frontier determinant AD - B^2 = {} (A = {}, B = {}, D = {}); \
                 the two fund portfolios coincide in return space",
                self.delta, self.a, self.b, self.d
            )));
        }
        Ok(())
    }

    fn ensure_positive_a(&self) -> MarkowitzResult<()> {
        if self.a <= Decimal::ZERO {
            return Err(MarkowitzError::SingularCovariance(format!(
                "covariance is not positive definite: 1'C^-1 1 = {}",
                self.a
            )));
        }
        Ok(())
    }

    /// Return of the global minimum-variance portfolio, B/A.
    pub fn min_variance_return(&self) -> MarkowitzResult<Decimal> {
        self.ensure_positive_a()?;
        self.b
            .checked_div(self.a)
            .ok_or_else(|| overflow("minimum-variance return"))
    }

    /// Global minimum-variance weights, C^-1 1 / A.
    pub fn min_variance_weights(&self) -> MarkowitzResult<Vec<Decimal>> {
        self.ensure_positive_a()?;
        self.inv_ones
            .iter()
            .map(|g| {
                g.checked_div(self.a)
                    .ok_or_else(|| overflow("minimum-variance weights"))
            })
            .collect()
    }

    /// Minimum-variance weights for target return `r`. Callers check
    /// degeneracy first; an exactly zero delta still reports an error.
    pub fn weights_for_target(&self, r: Decimal) -> MarkowitzResult<Vec<Decimal>> {
        let lambda = self
            .b
            .checked_mul(r)
            .and_then(|br| self.d.checked_sub(br))
            .ok_or_else(|| overflow("frontier weights"))?;
        let gamma = self
            .a
            .checked_mul(r)
            .and_then(|ar| ar.checked_sub(self.b))
            .ok_or_else(|| overflow("frontier weights"))?;
        self.inv_ones
            .iter()
            .zip(self.inv_returns.iter())
            .map(|(g, h)| {
                lambda
                    .checked_mul(*g)
                    .zip(gamma.checked_mul(*h))
                    .and_then(|(x, y)| x.checked_add(y))
                    .ok_or_else(|| overflow("frontier weights"))?
                    .checked_div(self.delta)
                    .ok_or_else(|| singular_delta(self.delta))
            })
            .collect()
    }

    /// Variance of the frontier portfolio at return `r`:
    /// scale * (A r^2 - 2 B r + D) / delta.
    pub fn frontier_variance(&self, r: Decimal) -> MarkowitzResult<Decimal> {
        let quadratic = self
            .a
            .checked_mul(r)
            .zip(self.b.checked_mul(Decimal::TWO))
            .and_then(|(ar, two_b)| ar.checked_sub(two_b))
            .and_then(|x| x.checked_mul(r))
            .and_then(|x| x.checked_add(self.d))
            .ok_or_else(|| overflow("frontier variance"))?;
        quadratic
            .checked_div(self.delta)
            .ok_or_else(|| singular_delta(self.delta))?
            .checked_mul(self.scale)
            .ok_or_else(|| overflow("frontier variance"))
    }
}

fn singular_delta(delta: Decimal) -> MarkowitzError {
    MarkowitzError::SingularCovariance(format!("cannot divide by frontier determinant {}", delta))
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Frontier coefficients of the full universe, from the cached inverse.
pub fn frontier_coefficients(universe: &AssetUniverse) -> MarkowitzResult<FrontierCoefficients> {
    let inverse = universe.inverse()?;
    FrontierCoefficients::from_inverse(inverse, universe.returns())
}

/// Global minimum-variance portfolio.
///
/// Unconstrained: w = C^-1 1 / A, with return B/A.
/// Long-only: active-set reduction of the same formula.
pub fn minimum_variance_portfolio(
    universe: &AssetUniverse,
    constraints: ConstraintSet,
) -> MarkowitzResult<Portfolio> {
    let weights = match constraints {
        ConstraintSet::Unconstrained => frontier_coefficients(universe)?.min_variance_weights()?,
        ConstraintSet::LongOnly => pin_negative_weights(
            universe.dimension(),
            universe.config().weight_tolerance,
            |free| reduced_coefficients(universe, free)?.min_variance_weights(),
            || {
                MarkowitzError::SingularCovariance(
                    "no long-only minimum-variance portfolio exists".into(),
                )
            },
        )?,
    };
    Ok(Portfolio::new(weights))
}

/// Minimum-variance portfolio achieving `target_return`.
///
/// Unconstrained: closed-form two-fund solution, failing with
/// `SingularCovariance` when delta vanishes. Long-only: active-set reduction,
/// failing with `InfeasibleTarget` when no non-negative weighting reaches
/// the target.
pub fn portfolio_for_target_return(
    universe: &AssetUniverse,
    target_return: Decimal,
    constraints: ConstraintSet,
) -> MarkowitzResult<Portfolio> {
    match constraints {
        ConstraintSet::Unconstrained => {
            let coeffs = frontier_coefficients(universe)?;
            coeffs.ensure_frontier(universe.config().singularity_tolerance)?;
            Ok(Portfolio::new(coeffs.weights_for_target(target_return)?))
        }
        ConstraintSet::LongOnly => long_only_target(universe, target_return),
    }
}

// ---------------------------------------------------------------------------
// Long-only target return
// ---------------------------------------------------------------------------

fn long_only_target(universe: &AssetUniverse, target: Decimal) -> MarkowitzResult<Portfolio> {
    let tol = universe.config().weight_tolerance;
    let (lo, hi) = universe.return_bounds();
    if target < lo - tol || target > hi + tol {
        return Err(MarkowitzError::InfeasibleTarget {
            target,
            reason: format!(
                "outside the range of single-asset returns [{}, {}]",
                lo, hi
            ),
        });
    }

    let weights = pin_negative_weights(
        universe.dimension(),
        tol,
        |free| reduced_target_weights(universe, free, target),
        || MarkowitzError::InfeasibleTarget {
            target,
            reason: "every asset was pinned to zero".into(),
        },
    )?;
    Ok(Portfolio::new(weights))
}

fn reduced_target_weights(
    universe: &AssetUniverse,
    free: &[usize],
    target: Decimal,
) -> MarkowitzResult<Vec<Decimal>> {
    let coeffs = reduced_coefficients(universe, free)?;
    if !coeffs.is_degenerate(universe.config().singularity_tolerance) {
        return coeffs.weights_for_target(target);
    }

    // A degenerate reduced system means every free asset has the same
    // return: the target is met by any budget-feasible mix, or by none.
    let tol = universe.config().weight_tolerance;
    let free_returns = subvector(universe.returns(), free);
    if free_returns.iter().all(|r| (*r - target).abs() <= tol) {
        coeffs.min_variance_weights()
    } else {
        Err(MarkowitzError::InfeasibleTarget {
            target,
            reason: format!(
                "remaining assets {:?} share a return different from the target",
                free
            ),
        })
    }
}

// ---------------------------------------------------------------------------
// Reduced systems
// ---------------------------------------------------------------------------

/// Covariance inverse restricted to `free`. The full set reuses the cached
/// inverse; proper subsets invert their own submatrix.
pub(crate) fn reduced_inverse<'a>(
    universe: &'a AssetUniverse,
    free: &[usize],
) -> MarkowitzResult<Cow<'a, ScaledInverse>> {
    if free.len() == universe.dimension() {
        return Ok(Cow::Borrowed(universe.inverse()?));
    }
    let sub = submatrix(universe.covariance(), free);
    Ok(Cow::Owned(covariance_inverse(
        &sub,
        universe.config().singularity_tolerance,
    )?))
}

pub(crate) fn reduced_coefficients(
    universe: &AssetUniverse,
    free: &[usize],
) -> MarkowitzResult<FrontierCoefficients> {
    let inverse = reduced_inverse(universe, free)?;
    let returns = subvector(universe.returns(), free);
    FrontierCoefficients::from_inverse(&inverse, &returns)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
