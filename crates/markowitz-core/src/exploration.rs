//! Brute-force exploration of the risk/return plane: two-asset mixture
//! scans and the convex hull of a point cloud.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::MarkowitzError;
use crate::portfolio::{expected_return, standard_deviation};
use crate::universe::AssetUniverse;
use crate::MarkowitzResult;

/// Upper bound on the mixtures a single scan may evaluate.
pub const MAX_MIXTURE_POINTS: u64 = 1_000_000;

/// One evaluated weighting, positioned in the (risk, return) plane.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MixturePoint {
    pub standard_deviation: Decimal,
    pub expected_return: Decimal,
    pub weights: Vec<Decimal>,
}

impl MixturePoint {
    pub fn evaluate(universe: &AssetUniverse, weights: Vec<Decimal>) -> MarkowitzResult<Self> {
        Ok(Self {
            standard_deviation: standard_deviation(&weights, universe)?,
            expected_return: expected_return(&weights, universe)?,
            weights,
        })
    }
}

/// Mix assets `i` and `j` in steps of `resolution`: `w_i = x`,
/// `w_j = 1 - x` for `x = 0, resolution, ... <= 1`; every other asset
/// gets zero weight.
pub fn scan_two_assets(
    universe: &AssetUniverse,
    i: usize,
    j: usize,
    resolution: Decimal,
) -> MarkowitzResult<Vec<MixturePoint>> {
    let n = universe.dimension();
    if i >= n || j >= n || i == j {
        return Err(MarkowitzError::Validation {
            field: "asset_pair".into(),
            reason: format!("Invalid pair ({}, {}) for {} assets", i, j, n),
        });
    }
    check_resolution(resolution, 1)?;

    let mut points = Vec::new();
    let mut k: u64 = 0;
    loop {
        let x = resolution * Decimal::from(k);
        if x > Decimal::ONE {
            break;
        }
        let mut weights = vec![Decimal::ZERO; n];
        weights[i] = x;
        weights[j] = Decimal::ONE - x;
        points.push(MixturePoint::evaluate(universe, weights)?);
        k += 1;
    }
    Ok(points)
}

/// Concatenated two-asset scans of every pair `i < j`.
pub fn scan_asset_pairs(
    universe: &AssetUniverse,
    resolution: Decimal,
) -> MarkowitzResult<Vec<MixturePoint>> {
    let n = universe.dimension();
    let pairs = (n * n.saturating_sub(1) / 2) as u64;
    check_resolution(resolution, pairs)?;
    let mut points = Vec::new();
    for i in 0..n.saturating_sub(1) {
        for j in (i + 1)..n {
            points.extend(scan_two_assets(universe, i, j, resolution)?);
        }
    }
    Ok(points)
}

/// `resolution` must lie in (0, 1] and keep `pairs` scans of
/// `floor(1 / resolution) + 1` mixtures each within `MAX_MIXTURE_POINTS`.
fn check_resolution(resolution: Decimal, pairs: u64) -> MarkowitzResult<()> {
    if resolution <= Decimal::ZERO || resolution > Decimal::ONE {
        return Err(MarkowitzError::Validation {
            field: "resolution".into(),
            reason: format!("Must be in (0, 1], got {}", resolution),
        });
    }
    let per_pair = (Decimal::ONE / resolution).floor() + Decimal::ONE;
    let limit = Decimal::from(MAX_MIXTURE_POINTS);
    let total = per_pair.checked_mul(Decimal::from(pairs));
    if total.map_or(true, |t| t > limit) {
        return Err(MarkowitzError::Validation {
            field: "resolution".into(),
            reason: format!(
                "{} mixtures per pair over {} pairs exceeds the limit of {}",
                per_pair, pairs, MAX_MIXTURE_POINTS
            ),
        });
    }
    Ok(())
}

/// Convex hull of the cloud in the (standard deviation, return) plane,
/// counter-clockwise from the lowest-risk point (Andrew's monotone chain).
/// Coincident points are collapsed.
pub fn convex_hull(points: &[MixturePoint]) -> Vec<MixturePoint> {
    let mut sorted: Vec<&MixturePoint> = points.iter().collect();
    sorted.sort_by(|a, b| {
        a.standard_deviation
            .cmp(&b.standard_deviation)
            .then(a.expected_return.cmp(&b.expected_return))
    });
    sorted.dedup_by(|a, b| {
        a.standard_deviation == b.standard_deviation && a.expected_return == b.expected_return
    });

    if sorted.len() < 3 {
        return sorted.into_iter().cloned().collect();
    }

    let mut lower: Vec<&MixturePoint> = Vec::new();
    for p in &sorted {
        while lower.len() >= 2
            && cross(lower[lower.len() - 2], lower[lower.len() - 1], p) <= Decimal::ZERO
        {
            lower.pop();
        }
        lower.push(p);
    }

    let mut upper: Vec<&MixturePoint> = Vec::new();
    for p in sorted.iter().rev() {
        while upper.len() >= 2
            && cross(upper[upper.len() - 2], upper[upper.len() - 1], p) <= Decimal::ZERO
        {
            upper.pop();
        }
        upper.push(p);
    }

    lower.pop();
    upper.pop();
    lower.into_iter().chain(upper).cloned().collect()
}

/// Z-component of (a - o) x (b - o).
fn cross(o: &MixturePoint, a: &MixturePoint, b: &MixturePoint) -> Decimal {
    (a.standard_deviation - o.standard_deviation) * (b.expected_return - o.expected_return)
        - (a.expected_return - o.expected_return) * (b.standard_deviation - o.standard_deviation)
}

/// Lowest-risk point whose return exceeds `min_return`.
pub fn lowest_risk_above(points: &[MixturePoint], min_return: Decimal) -> Option<&MixturePoint> {
    points
        .iter()
        .filter(|p| p.expected_return > min_return)
        .min_by(|a, b| {
            a.standard_deviation
                .cmp(&b.standard_deviation)
                .then(a.expected_return.cmp(&b.expected_return))
        })
}

/// Lowest-risk point of the cloud.
pub fn lowest_risk(points: &[MixturePoint]) -> Option<&MixturePoint> {
    points.iter().min_by(|a, b| a.standard_deviation.cmp(&b.standard_deviation))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn two_asset() -> AssetUniverse {
        AssetUniverse::new(
            vec![dec!(0.05), dec!(0.15)],
            vec![vec![dec!(0.04), dec!(0.0)], vec![dec!(0.0), dec!(0.09)]],
        )
        .unwrap()
    }

    fn point(sd: Decimal, ret: Decimal) -> MixturePoint {
        MixturePoint {
            standard_deviation: sd,
            expected_return: ret,
            weights: vec![],
        }
    }

    #[test]
    fn test_two_asset_scan_endpoints() {
        let u = two_asset();
        let pts = scan_two_assets(&u, 0, 1, dec!(0.01)).unwrap();
        assert_eq!(pts.len(), 101);
        assert_eq!(pts[0].weights, vec![Decimal::ZERO, Decimal::ONE]);
        assert_eq!(pts[0].expected_return, dec!(0.15));
        assert_eq!(pts[100].weights, vec![Decimal::ONE, Decimal::ZERO]);
        assert_eq!(pts[100].expected_return, dec!(0.05));
    }

    #[test]
    fn test_scan_lowest_risk_near_min_variance() {
        // Continuous optimum sits at w0 = 0.6923
        let u = two_asset();
        let pts = scan_two_assets(&u, 0, 1, dec!(0.01)).unwrap();
        let best = lowest_risk(&pts).unwrap();
        assert_eq!(best.weights[0], dec!(0.69));
    }

    #[test]
    fn test_pair_scan_covers_all_pairs() {
        let u = AssetUniverse::new(
            vec![dec!(0.05), dec!(0.10), dec!(0.15)],
            vec![
                vec![dec!(0.01), dec!(0), dec!(0)],
                vec![dec!(0), dec!(0.04), dec!(0)],
                vec![dec!(0), dec!(0), dec!(0.09)],
            ],
        )
        .unwrap();
        let pts = scan_asset_pairs(&u, dec!(0.25)).unwrap();
        assert_eq!(pts.len(), 3 * 5);
    }

    #[test]
    fn test_single_asset_has_no_pairs() {
        let u = AssetUniverse::new(vec![dec!(0.05)], vec![vec![dec!(0.01)]]).unwrap();
        assert!(scan_asset_pairs(&u, dec!(0.1)).unwrap().is_empty());
    }

    #[test]
    fn test_invalid_pair_and_resolution() {
        let u = two_asset();
        assert!(scan_two_assets(&u, 0, 0, dec!(0.1)).is_err());
        assert!(scan_two_assets(&u, 0, 2, dec!(0.1)).is_err());
        assert!(scan_two_assets(&u, 0, 1, Decimal::ZERO).is_err());
        assert!(scan_two_assets(&u, 0, 1, dec!(1.5)).is_err());
    }

    #[test]
    fn test_resolution_too_fine_is_rejected_up_front() {
        let u = two_asset();
        // 1e9 mixtures would be evaluated and held in memory
        let err = scan_two_assets(&u, 0, 1, dec!(0.000000001)).unwrap_err();
        assert!(matches!(err, MarkowitzError::Validation { .. }));
        assert!(err.to_string().contains("exceeds the limit"));

        // One million and one mixtures for a single pair is just over
        assert!(scan_asset_pairs(&u, dec!(0.000001)).is_err());
        assert_eq!(scan_two_assets(&u, 0, 1, dec!(0.0001)).unwrap().len(), 10_001);
    }

    #[test]
    fn test_hull_drops_interior_points() {
        let pts = vec![
            point(dec!(0), dec!(0)),
            point(dec!(1), dec!(0)),
            point(dec!(1), dec!(1)),
            point(dec!(0), dec!(1)),
            point(dec!(0.5), dec!(0.5)),
            point(dec!(0.5), dec!(0.5)),
        ];
        let hull = convex_hull(&pts);
        assert_eq!(hull.len(), 4);
        assert!(!hull.iter().any(|p| p.standard_deviation == dec!(0.5)));
        assert_eq!(hull[0].standard_deviation, dec!(0));
        assert_eq!(hull[0].expected_return, dec!(0));
    }

    #[test]
    fn test_hull_of_tiny_cloud() {
        let pts = vec![point(dec!(1), dec!(1)), point(dec!(1), dec!(1))];
        assert_eq!(convex_hull(&pts).len(), 1);
    }

    #[test]
    fn test_lowest_risk_above_threshold() {
        let pts = vec![
            point(dec!(0.10), dec!(0.04)),
            point(dec!(0.12), dec!(0.07)),
            point(dec!(0.20), dec!(0.09)),
        ];
        let p = lowest_risk_above(&pts, dec!(0.06)).unwrap();
        assert_eq!(p.standard_deviation, dec!(0.12));
        assert!(lowest_risk_above(&pts, dec!(0.2)).is_none());
    }
}
