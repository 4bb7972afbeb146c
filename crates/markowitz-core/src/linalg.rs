use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;

use crate::error::MarkowitzError;
use crate::types::Matrix;
use crate::MarkowitzResult;

/// Overflow in a data-dependent product, reported as an unusable covariance.
pub(crate) fn overflow(context: &str) -> MarkowitzError {
    MarkowitzError::SingularCovariance(format!("arithmetic overflow in {}", context))
}

/// Dot product.
pub fn vec_dot(a: &[Decimal], b: &[Decimal]) -> MarkowitzResult<Decimal> {
    a.iter().zip(b.iter()).try_fold(Decimal::ZERO, |acc, (x, y)| {
        x.checked_mul(*y)
            .and_then(|p| acc.checked_add(p))
            .ok_or_else(|| overflow("dot product"))
    })
}

/// Matrix-vector multiplication.
pub fn mat_vec_multiply(mat: &[Vec<Decimal>], v: &[Decimal]) -> MarkowitzResult<Vec<Decimal>> {
    mat.iter().map(|row| vec_dot(row, v)).collect()
}

/// Quadratic form v' * M * v.
pub fn quadratic_form(mat: &[Vec<Decimal>], v: &[Decimal]) -> MarkowitzResult<Decimal> {
    vec_dot(v, &mat_vec_multiply(mat, v)?)
}

/// Largest absolute entry, used as the scale of a matrix.
pub fn max_abs_entry(mat: &[Vec<Decimal>]) -> Decimal {
    mat.iter()
        .flat_map(|row| row.iter())
        .map(|v| v.abs())
        .fold(Decimal::ZERO, Decimal::max)
}

/// Square root of a variance.
///
/// Negative values no further than `residue` below zero are rounding noise
/// and clamp to zero. Anything more negative comes from a covariance that
/// is not positive semi-definite.
pub fn sqrt_decimal(val: Decimal, residue: Decimal) -> MarkowitzResult<Decimal> {
    if val < -residue {
        return Err(MarkowitzError::SingularCovariance(format!(
            "negative variance {}; covariance is not positive semi-definite",
            val
        )));
    }
    if val <= Decimal::ZERO {
        return Ok(Decimal::ZERO);
    }
    Ok(val.sqrt().unwrap_or(Decimal::ZERO))
}

/// Rows and columns of `mat` selected by `indices`, in that order.
pub fn submatrix(mat: &[Vec<Decimal>], indices: &[usize]) -> Matrix {
    indices
        .iter()
        .map(|&i| indices.iter().map(|&j| mat[i][j]).collect())
        .collect()
}

/// Entries of `v` selected by `indices`.
pub fn subvector(v: &[Decimal], indices: &[usize]) -> Vec<Decimal> {
    indices.iter().map(|&i| v[i]).collect()
}

/// Expand `values` (one per entry of `indices`) into a length-`n` vector,
/// zero everywhere else.
pub fn scatter(n: usize, indices: &[usize], values: &[Decimal]) -> Vec<Decimal> {
    let mut out = vec![Decimal::ZERO; n];
    for (&i, &v) in indices.iter().zip(values.iter()) {
        out[i] = v;
    }
    out
}

/// Inverse of a covariance matrix taken at unit scale.
///
/// `inverse` inverts `C / scale`, where `scale` is the largest absolute
/// entry of `C`, so `C^-1 = inverse / scale`. Quantities built from the
/// scaled inverse stay within `Decimal` range for covariances of any
/// magnitude.
#[derive(Debug, Clone, PartialEq)]
pub struct ScaledInverse {
    pub scale: Decimal,
    pub inverse: Matrix,
}

/// Invert a covariance matrix, rejecting it unless it is positive definite.
pub fn covariance_inverse(cov: &[Vec<Decimal>], tolerance: Decimal) -> MarkowitzResult<ScaledInverse> {
    let scale = max_abs_entry(cov);
    if scale.is_zero() {
        return Err(MarkowitzError::SingularCovariance(
            "matrix has no non-zero entries".into(),
        ));
    }
    let unit: Matrix = cov
        .iter()
        .map(|row| {
            row.iter()
                .map(|v| v.checked_div(scale).ok_or_else(|| overflow("covariance scaling")))
                .collect()
        })
        .collect::<MarkowitzResult<_>>()?;
    ensure_positive_definite(&unit, tolerance)?;
    Ok(ScaledInverse {
        scale,
        inverse: mat_inverse(&unit, tolerance)?,
    })
}

/// Symmetric elimination without pivoting (the D of an LDL' factorization).
///
/// Every pivot of a positive definite matrix is positive; a pivot at or
/// below `tolerance * max|m_ij|` means the matrix is singular or indefinite.
#[allow(clippy::needless_range_loop)]
pub fn ensure_positive_definite(mat: &[Vec<Decimal>], tolerance: Decimal) -> MarkowitzResult<()> {
    let n = mat.len();
    let threshold = tolerance * max_abs_entry(mat);
    let mut work: Matrix = mat.to_vec();

    for k in 0..n {
        let pivot = work[k][k];
        if pivot <= threshold {
            return Err(MarkowitzError::SingularCovariance(format!(
                "covariance is not positive definite: pivot {} at asset {} is at most {}",
                pivot, k, threshold
            )));
        }
        for i in (k + 1)..n {
            let factor = work[i][k]
                .checked_div(pivot)
                .ok_or_else(|| overflow("positive definiteness check"))?;
            if factor.is_zero() {
                continue;
            }
            for j in (k + 1)..n {
                work[i][j] = factor
                    .checked_mul(work[k][j])
                    .and_then(|p| work[i][j].checked_sub(p))
                    .ok_or_else(|| overflow("positive definiteness check"))?;
            }
        }
    }
    Ok(())
}

/// Matrix inverse via Gauss-Jordan with partial pivoting.
///
/// A pivot whose magnitude is at most `tolerance * max|m_ij|` is treated as
/// zero and the matrix is reported singular.
#[allow(clippy::needless_range_loop)]
pub fn mat_inverse(mat: &[Vec<Decimal>], tolerance: Decimal) -> MarkowitzResult<Matrix> {
    let n = mat.len();
    if n == 0 {
        return Ok(Vec::new());
    }

    let scale = max_abs_entry(mat);
    if scale.is_zero() {
        return Err(MarkowitzError::SingularCovariance(
            "matrix has no non-zero entries".into(),
        ));
    }
    let threshold = tolerance * scale;

    let mut aug: Matrix = Vec::with_capacity(n);
    for i in 0..n {
        let mut row = Vec::with_capacity(2 * n);
        row.extend_from_slice(&mat[i]);
        for j in 0..n {
            row.push(if i == j { Decimal::ONE } else { Decimal::ZERO });
        }
        aug.push(row);
    }

    for col in 0..n {
        // Partial pivoting
        let mut max_row = col;
        let mut max_val = aug[col][col].abs();
        for row in (col + 1)..n {
            let val = aug[row][col].abs();
            if val > max_val {
                max_val = val;
                max_row = row;
            }
        }

        if max_val <= threshold {
            return Err(MarkowitzError::SingularCovariance(format!(
                "pivot {} in column {} is below threshold {}",
                max_val, col, threshold
            )));
        }

        if max_row != col {
            aug.swap(col, max_row);
        }

        let pivot = aug[col][col];
        for cell in aug[col].iter_mut() {
            *cell = cell
                .checked_div(pivot)
                .ok_or_else(|| overflow("pivot row scaling"))?;
        }

        let pivot_row = aug[col].clone();
        for row in 0..n {
            if row == col {
                continue;
            }
            let factor = aug[row][col];
            if factor.is_zero() {
                continue;
            }
            for (cell, &pv) in aug[row].iter_mut().zip(pivot_row.iter()) {
                *cell = factor
                    .checked_mul(pv)
                    .and_then(|p| cell.checked_sub(p))
                    .ok_or_else(|| overflow("row elimination"))?;
            }
        }
    }

    Ok(aug.iter().map(|row| row[n..].to_vec()).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn tol() -> Decimal {
        dec!(0.000000001)
    }

    fn assert_identity(m: &[Vec<Decimal>], eps: Decimal) {
        for (i, row) in m.iter().enumerate() {
            for (j, v) in row.iter().enumerate() {
                let expected = if i == j { Decimal::ONE } else { Decimal::ZERO };
                assert!(
                    (*v - expected).abs() < eps,
                    "entry [{},{}] = {}, expected {}",
                    i,
                    j,
                    v,
                    expected
                );
            }
        }
    }

    #[test]
    fn test_inverse_diagonal() {
        let m = vec![vec![dec!(0.04), dec!(0)], vec![dec!(0), dec!(0.09)]];
        let inv = mat_inverse(&m, tol()).unwrap();
        assert_eq!(inv[0][0], dec!(25));
        assert!((inv[1][1] - dec!(11.111111111)).abs() < dec!(0.000001));
        assert_eq!(inv[0][1], Decimal::ZERO);
    }

    #[test]
    fn test_inverse_times_matrix_is_identity() {
        let m = vec![
            vec![dec!(0.0225), dec!(0.009), dec!(0.00375)],
            vec![dec!(0.009), dec!(0.04), dec!(0.025)],
            vec![dec!(0.00375), dec!(0.025), dec!(0.0625)],
        ];
        let inv = mat_inverse(&m, tol()).unwrap();
        let product: Matrix = m
            .iter()
            .map(|row| {
                (0..3)
                    .map(|j| {
                        let col: Vec<Decimal> = inv.iter().map(|r| r[j]).collect();
                        vec_dot(row, &col).unwrap()
                    })
                    .collect()
            })
            .collect();
        assert_identity(&product, dec!(0.0000000001));
    }

    #[test]
    fn test_singular_rows_rejected() {
        let m = vec![vec![dec!(0.04), dec!(0.02)], vec![dec!(0.02), dec!(0.01)]];
        let err = mat_inverse(&m, tol()).unwrap_err();
        assert!(matches!(err, MarkowitzError::SingularCovariance(_)));
    }

    #[test]
    fn test_zero_matrix_rejected() {
        let m = vec![vec![Decimal::ZERO; 2]; 2];
        assert!(mat_inverse(&m, tol()).is_err());
    }

    #[test]
    fn test_threshold_scales_with_matrix() {
        // Entries around 1e-12 are well conditioned; an absolute threshold
        // of 1e-9 would misreport them as singular.
        let m = vec![
            vec![dec!(0.000000000002), dec!(0.0000000000005)],
            vec![dec!(0.0000000000005), dec!(0.000000000003)],
        ];
        assert!(mat_inverse(&m, tol()).is_ok());
    }

    #[test]
    fn test_submatrix_and_scatter() {
        let m = vec![
            vec![dec!(1), dec!(2), dec!(3)],
            vec![dec!(4), dec!(5), dec!(6)],
            vec![dec!(7), dec!(8), dec!(9)],
        ];
        let sub = submatrix(&m, &[0, 2]);
        assert_eq!(sub, vec![vec![dec!(1), dec!(3)], vec![dec!(7), dec!(9)]]);
        assert_eq!(subvector(&[dec!(1), dec!(2), dec!(3)], &[2]), vec![dec!(3)]);
        assert_eq!(
            scatter(3, &[0, 2], &[dec!(0.4), dec!(0.6)]),
            vec![dec!(0.4), Decimal::ZERO, dec!(0.6)]
        );
    }

    #[test]
    fn test_sqrt_clamps_only_rounding_residue() {
        let residue = dec!(0.000000001);
        assert_eq!(sqrt_decimal(dec!(-0.0000000001), residue).unwrap(), Decimal::ZERO);
        assert!((sqrt_decimal(dec!(0.04), residue).unwrap() - dec!(0.2)).abs() < dec!(0.0000000001));
        let err = sqrt_decimal(dec!(-0.03), residue).unwrap_err();
        assert!(matches!(err, MarkowitzError::SingularCovariance(_)));
    }

    #[test]
    fn test_indefinite_covariance_rejected() {
        // Symmetric with a non-negative diagonal, but eigenvalues 0.03 and -0.01
        let m = vec![vec![dec!(0.01), dec!(0.02)], vec![dec!(0.02), dec!(0.01)]];
        assert!(mat_inverse(&m, tol()).is_ok());
        let err = covariance_inverse(&m, tol()).unwrap_err();
        assert!(err.to_string().contains("not positive definite"), "{}", err);
    }

    #[test]
    fn test_covariance_inverse_is_scale_free() {
        let m = vec![
            vec![dec!(0.000000000001), dec!(0.000000000000999999999)],
            vec![dec!(0.000000000000999999999), dec!(0.000000000001)],
        ];
        let inv = covariance_inverse(&m, tol()).unwrap();
        assert_eq!(inv.scale, dec!(0.000000000001));
        // (C / scale) * inverse is the identity
        let unit: Matrix = m
            .iter()
            .map(|row| row.iter().map(|v| *v / inv.scale).collect())
            .collect();
        let product: Matrix = unit
            .iter()
            .map(|row| {
                (0..2)
                    .map(|j| {
                        let col: Vec<Decimal> = inv.inverse.iter().map(|r| r[j]).collect();
                        vec_dot(row, &col).unwrap()
                    })
                    .collect()
            })
            .collect();
        assert_identity(&product, dec!(0.000000001));
    }

    #[test]
    fn test_overflow_is_an_error() {
        let big = Decimal::MAX;
        let err = vec_dot(&[big, big], &[dec!(2), dec!(2)]).unwrap_err();
        assert!(err.to_string().contains("overflow"));
    }
}
