use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::active_set::pin_negative_weights;
use crate::error::MarkowitzError;
use crate::linalg::{mat_vec_multiply, overflow, subvector, vec_dot};
use crate::portfolio::{sharpe_ratio, Portfolio};
use crate::solver::{frontier_coefficients, reduced_inverse, ConstraintSet};
use crate::universe::AssetUniverse;
use crate::MarkowitzResult;

/// Maximum Sharpe ratio portfolio for a given risk-free rate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TangencyPortfolio {
    pub portfolio: Portfolio,
    pub risk_free_rate: Decimal,
    pub expected_return: Decimal,
    pub standard_deviation: Decimal,
    /// (expected_return - risk_free_rate) / standard_deviation
    pub sharpe_ratio: Decimal,
}

/// Find the tangency portfolio.
///
/// Unconstrained: w = C^-1 (mu - rf 1) / 1'C^-1 (mu - rf 1). The
/// denominator equals B - rf A, so it vanishes when `risk_free_rate` sits at
/// the minimum-variance return.
///
/// Long-only: minimize y'Cy subject to (mu - rf 1)'y = 1 and y >= 0 by
/// active-set reduction, then rescale w = y / sum(y).
pub fn tangency_portfolio(
    universe: &AssetUniverse,
    risk_free_rate: Decimal,
    constraints: ConstraintSet,
) -> MarkowitzResult<TangencyPortfolio> {
    let weights = match constraints {
        ConstraintSet::Unconstrained => unconstrained_weights(universe, risk_free_rate)?,
        ConstraintSet::LongOnly => long_only_weights(universe, risk_free_rate)?,
    };

    let portfolio = Portfolio::new(weights);
    let expected_return = portfolio.expected_return(universe)?;
    let standard_deviation = portfolio.standard_deviation(universe)?;
    Ok(TangencyPortfolio {
        portfolio,
        risk_free_rate,
        expected_return,
        standard_deviation,
        sharpe_ratio: sharpe_ratio(expected_return, risk_free_rate, standard_deviation),
    })
}

fn unconstrained_weights(universe: &AssetUniverse, rf: Decimal) -> MarkowitzResult<Vec<Decimal>> {
    let tol = universe.config().singularity_tolerance;
    let coeffs = frontier_coefficients(universe)?;
    coeffs.ensure_frontier(tol)?;

    let rf_a = rf
        .checked_mul(coeffs.a)
        .ok_or_else(|| degenerate(rf, "overflow scaling the risk-free rate"))?;
    let denom = coeffs.b - rf_a;
    let scale = coeffs.b.abs() + rf_a.abs();
    if denom.abs() <= tol * scale {
        return Err(MarkowitzError::DegenerateTangency {
            risk_free_rate: rf,
            reason: format!(
                "risk-free rate coincides with the minimum-variance return {}",
                coeffs.min_variance_return()?
            ),
        });
    }

    coeffs
        .inv_returns()
        .iter()
        .zip(coeffs.inv_ones())
        .map(|(h, g)| {
            rf.checked_mul(*g)
                .and_then(|rg| h.checked_sub(rg))
                .and_then(|excess| excess.checked_div(denom))
                .ok_or_else(|| degenerate(rf, "overflow normalizing tangency weights"))
        })
        .collect()
}

fn long_only_weights(universe: &AssetUniverse, rf: Decimal) -> MarkowitzResult<Vec<Decimal>> {
    let tol = universe.config().weight_tolerance;
    let excess: Vec<Decimal> = universe.returns().iter().map(|r| *r - rf).collect();
    if excess.iter().all(|e| *e <= tol) {
        return Err(degenerate(rf, "no asset earns more than the risk-free rate"));
    }

    let y = pin_negative_weights(
        universe.dimension(),
        tol,
        |free| {
            let inverse = reduced_inverse(universe, free)?;
            let e = subvector(&excess, free);
            let inv_e = mat_vec_multiply(&inverse.inverse, &e)?;
            let q = vec_dot(&e, &inv_e)?;
            if q <= Decimal::ZERO {
                return Err(degenerate(
                    rf,
                    "remaining assets carry no excess return over the risk-free rate",
                ));
            }
            inv_e
                .iter()
                .map(|v| v.checked_div(q).ok_or_else(|| overflow("long-only tangency weights")))
                .collect()
        },
        || degenerate(rf, "every asset was pinned to zero"),
    )?;

    let total: Decimal = y.iter().sum();
    if total <= Decimal::ZERO {
        return Err(degenerate(rf, "long-only tangency weights do not sum to a positive total"));
    }
    y.iter()
        .map(|v| v.checked_div(total).ok_or_else(|| overflow("long-only tangency weights")))
        .collect()
}

fn degenerate(rf: Decimal, reason: &str) -> MarkowitzError {
    MarkowitzError::DegenerateTangency {
        risk_free_rate: rf,
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::{minimum_variance_portfolio, portfolio_for_target_return};
    use rust_decimal_macros::dec;

    fn eps() -> Decimal {
        dec!(0.000001)
    }

    fn two_asset() -> AssetUniverse {
        AssetUniverse::new(
            vec![dec!(0.05), dec!(0.15)],
            vec![vec![dec!(0.04), dec!(0.0)], vec![dec!(0.0), dec!(0.09)]],
        )
        .unwrap()
    }

    fn three_asset() -> AssetUniverse {
        let v1 = dec!(0.15);
        let v2 = dec!(0.20);
        let v3 = dec!(0.25);
        let c12 = dec!(0.3) * v1 * v2;
        let c13 = dec!(0.1) * v1 * v3;
        let c23 = dec!(0.5) * v2 * v3;
        AssetUniverse::new(
            vec![dec!(0.10), dec!(0.04), dec!(0.07)],
            vec![
                vec![v1 * v1, c12, c13],
                vec![c12, v2 * v2, c23],
                vec![c13, c23, v3 * v3],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_two_asset_closed_form() {
        // Zero correlation: w proportional to (mu_i - rf) / sigma_i^2
        // = [0.75, 1.4444..] -> [0.341772, 0.658228]
        let t = tangency_portfolio(&two_asset(), dec!(0.02), ConstraintSet::Unconstrained).unwrap();
        let w = t.portfolio.weights();
        assert!((w[0] - dec!(0.3417722)).abs() < eps(), "w0 = {}", w[0]);
        assert!((w[1] - dec!(0.6582278)).abs() < eps(), "w1 = {}", w[1]);
        assert!((t.portfolio.total_weight() - Decimal::ONE).abs() < eps());
    }

    #[test]
    fn test_sharpe_dominates_frontier() {
        let u = three_asset();
        let rf = dec!(0.02);
        let t = tangency_portfolio(&u, rf, ConstraintSet::Unconstrained).unwrap();
        for i in 0..=20 {
            let target = dec!(0.03) + Decimal::from(i) * dec!(0.005);
            let p = portfolio_for_target_return(&u, target, ConstraintSet::Unconstrained).unwrap();
            let s = p.sharpe_ratio(&u, rf).unwrap();
            assert!(
                t.sharpe_ratio >= s - eps(),
                "tangency Sharpe {} below frontier Sharpe {} at {}",
                t.sharpe_ratio,
                s,
                target
            );
        }
    }

    #[test]
    fn test_tangency_beats_min_variance_sharpe() {
        let u = three_asset();
        let rf = dec!(0.02);
        let t = tangency_portfolio(&u, rf, ConstraintSet::Unconstrained).unwrap();
        let mv = minimum_variance_portfolio(&u, ConstraintSet::Unconstrained).unwrap();
        assert!(t.sharpe_ratio >= mv.sharpe_ratio(&u, rf).unwrap());
        assert!(t.standard_deviation >= mv.standard_deviation(&u).unwrap());
    }

    #[test]
    fn test_rf_at_min_variance_return_is_degenerate() {
        let u = two_asset();
        let coeffs = frontier_coefficients(&u).unwrap();
        let rf = coeffs.min_variance_return().unwrap();
        let err = tangency_portfolio(&u, rf, ConstraintSet::Unconstrained).unwrap_err();
        assert!(matches!(err, MarkowitzError::DegenerateTangency { .. }), "{}", err);
    }

    #[test]
    fn test_singular_universe_reported_as_singular() {
        let u = AssetUniverse::new(
            vec![dec!(0.10), dec!(0.10)],
            vec![vec![dec!(0.04), dec!(0.02)], vec![dec!(0.02), dec!(0.01)]],
        )
        .unwrap();
        let err = tangency_portfolio(&u, dec!(0.02), ConstraintSet::Unconstrained).unwrap_err();
        assert!(matches!(err, MarkowitzError::SingularCovariance(_)));
    }

    #[test]
    fn test_long_only_tangency() {
        let u = three_asset();
        let rf = dec!(0.02);
        let free = tangency_portfolio(&u, rf, ConstraintSet::Unconstrained).unwrap();
        let long = tangency_portfolio(&u, rf, ConstraintSet::LongOnly).unwrap();
        assert!(long.portfolio.weights().iter().all(|w| *w >= Decimal::ZERO));
        assert!((long.portfolio.total_weight() - Decimal::ONE).abs() < eps());
        assert!(long.sharpe_ratio <= free.sharpe_ratio + eps());
    }

    #[test]
    fn test_long_only_rf_above_all_returns() {
        let err = tangency_portfolio(&three_asset(), dec!(0.2), ConstraintSet::LongOnly).unwrap_err();
        assert!(err.to_string().contains("no asset earns more"));
    }
}
