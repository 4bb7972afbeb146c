//! Active-set reduction for long-only problems.
//!
//! Starting from every asset free, the reduced equality-constrained problem
//! is solved analytically; the most negative weight is pinned to zero and
//! removed from the free set, and the reduced problem is solved again. The
//! free set is an explicit value threaded through the loop, so each reduced
//! solve only sees the indices it is handed.

use rust_decimal::Decimal;

use crate::error::MarkowitzError;
use crate::linalg::scatter;
use crate::MarkowitzResult;

/// Run the pinning loop over `n` assets.
///
/// `solve` receives the current free indices and returns one weight per
/// free index. Weights above `-tolerance` are accepted (tiny negatives are
/// clamped to zero). When every asset has been pinned, the error produced
/// by `exhausted` is returned.
pub fn pin_negative_weights<F, E>(
    n: usize,
    tolerance: Decimal,
    mut solve: F,
    exhausted: E,
) -> MarkowitzResult<Vec<Decimal>>
where
    F: FnMut(&[usize]) -> MarkowitzResult<Vec<Decimal>>,
    E: FnOnce() -> MarkowitzError,
{
    let mut free: Vec<usize> = (0..n).collect();

    while !free.is_empty() {
        let reduced = solve(&free)?;

        let most_negative = reduced
            .iter()
            .enumerate()
            .filter(|(_, w)| **w < -tolerance)
            .min_by(|a, b| a.1.cmp(b.1))
            .map(|(pos, _)| pos);

        match most_negative {
            None => {
                let clamped: Vec<Decimal> =
                    reduced.iter().map(|w| (*w).max(Decimal::ZERO)).collect();
                return Ok(scatter(n, &free, &clamped));
            }
            Some(pos) => {
                tracing::debug!(
                    asset = free[pos],
                    weight = %reduced[pos],
                    remaining = free.len() - 1,
                    "pinning negative weight to zero"
                );
                free.remove(pos);
            }
        }
    }

    Err(exhausted())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn exhausted() -> MarkowitzError {
        MarkowitzError::InfeasibleTarget {
            target: Decimal::ZERO,
            reason: "exhausted".into(),
        }
    }

    #[test]
    fn test_accepts_first_solution_when_non_negative() {
        let mut calls = 0;
        let w = pin_negative_weights(
            3,
            dec!(0.000001),
            |free| {
                calls += 1;
                Ok(vec![dec!(0.2), dec!(0.3), dec!(0.5)][..free.len()].to_vec())
            },
            exhausted,
        )
        .unwrap();
        assert_eq!(calls, 1);
        assert_eq!(w, vec![dec!(0.2), dec!(0.3), dec!(0.5)]);
    }

    #[test]
    fn test_pins_most_negative_first() {
        let mut seen: Vec<Vec<usize>> = Vec::new();
        let w = pin_negative_weights(
            3,
            dec!(0.000001),
            |free| {
                seen.push(free.to_vec());
                Ok(match free.len() {
                    3 => vec![dec!(1.5), dec!(-0.1), dec!(-0.4)],
                    2 => vec![dec!(1.2), dec!(-0.2)],
                    _ => vec![Decimal::ONE],
                })
            },
            exhausted,
        )
        .unwrap();
        assert_eq!(seen, vec![vec![0, 1, 2], vec![0, 1], vec![0]]);
        assert_eq!(w, vec![Decimal::ONE, Decimal::ZERO, Decimal::ZERO]);
    }

    #[test]
    fn test_clamps_rounding_residue() {
        let w = pin_negative_weights(
            2,
            dec!(0.000001),
            |_| Ok(vec![dec!(1.0000000001), dec!(-0.0000000001)]),
            exhausted,
        )
        .unwrap();
        assert_eq!(w[1], Decimal::ZERO);
    }

    #[test]
    fn test_exhausted_free_set() {
        let err = pin_negative_weights(
            2,
            dec!(0.000001),
            |free| Ok(vec![dec!(-1); free.len()]),
            exhausted,
        )
        .unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::InfeasibleTarget);
    }

    #[test]
    fn test_solver_error_propagates() {
        let err = pin_negative_weights(
            2,
            dec!(0.000001),
            |_| Err(MarkowitzError::SingularCovariance("boom".into())),
            exhausted,
        )
        .unwrap_err();
        assert_eq!(err, MarkowitzError::SingularCovariance("boom".into()));
    }
}
