use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::{ErrorKind, MarkowitzError};
use crate::portfolio::{sharpe_ratio, Portfolio};
use crate::solver::{minimum_variance_portfolio, portfolio_for_target_return, ConstraintSet};
use crate::tangency::tangency_portfolio;
use crate::universe::AssetUniverse;
use crate::MarkowitzResult;

/// Upper bound on the number of targets a range may expand to.
pub const MAX_SCAN_POINTS: usize = 100_000;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Origin of a frontier point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PointKind {
    MinVariance,
    Tangency,
    Scan,
}

/// A single solved point on the frontier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrontierPoint {
    pub kind: PointKind,
    pub target_return: Decimal,
    pub achieved_return: Decimal,
    pub standard_deviation: Decimal,
    /// Present when the scan was given a risk-free rate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sharpe_ratio: Option<Decimal>,
    pub weights: Vec<Decimal>,
}

/// Frontier points ordered by increasing target return.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FrontierProfile {
    pub points: Vec<FrontierPoint>,
}

impl FrontierProfile {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FrontierPoint> {
        self.points.iter()
    }

    pub fn of_kind(&self, kind: PointKind) -> impl Iterator<Item = &FrontierPoint> {
        self.points.iter().filter(move |p| p.kind == kind)
    }

    pub fn scan_points(&self) -> impl Iterator<Item = &FrontierPoint> {
        self.of_kind(PointKind::Scan)
    }

    pub fn min_variance(&self) -> Option<&FrontierPoint> {
        self.of_kind(PointKind::MinVariance).next()
    }

    pub fn tangency(&self) -> Option<&FrontierPoint> {
        self.of_kind(PointKind::Tangency).next()
    }
}

/// A point the scan skipped, with the reason.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanDiagnostic {
    pub kind: PointKind,
    /// Requested return; absent for the minimum-variance and tangency points.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_return: Option<Decimal>,
    pub error: ErrorKind,
    pub message: String,
}

impl ScanDiagnostic {
    fn new(kind: PointKind, target_return: Option<Decimal>, err: &MarkowitzError) -> Self {
        Self {
            kind,
            target_return,
            error: err.kind(),
            message: err.to_string(),
        }
    }
}

/// A (possibly partial) frontier plus the points that could not be solved.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FrontierScan {
    pub profile: FrontierProfile,
    pub diagnostics: Vec<ScanDiagnostic>,
}

/// Sequence of target returns to scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ScanRange {
    /// `min, min + step, ...` up to and including `max`.
    Step {
        min: Decimal,
        max: Decimal,
        step: Decimal,
    },
    /// `count` evenly spaced targets including both endpoints.
    Count { min: Decimal, max: Decimal, count: u32 },
}

impl ScanRange {
    /// Evenly spaced range from the minimum-variance return to the best
    /// single-asset return. Falls back to the lowest single-asset return
    /// when the minimum-variance portfolio cannot be solved.
    pub fn spanning(universe: &AssetUniverse, count: u32, constraints: ConstraintSet) -> Self {
        let (lo, hi) = universe.return_bounds();
        let min = minimum_variance_portfolio(universe, constraints)
            .and_then(|p| p.expected_return(universe))
            .unwrap_or(lo);
        if hi <= min {
            return ScanRange::Count {
                min,
                max: min,
                count: 1,
            };
        }
        ScanRange::Count {
            min,
            max: hi,
            count,
        }
    }

    pub fn targets(&self) -> MarkowitzResult<Vec<Decimal>> {
        match *self {
            ScanRange::Step { min, max, step } => {
                check_bounds(min, max)?;
                if step <= Decimal::ZERO {
                    return Err(invalid_range(format!("step must be positive, got {}", step)));
                }
                let slack = step * dec!(0.000000001);
                let mut targets = Vec::new();
                let mut t = min;
                while t <= max + slack {
                    if targets.len() == MAX_SCAN_POINTS {
                        return Err(invalid_range(format!(
                            "expands to more than {} targets",
                            MAX_SCAN_POINTS
                        )));
                    }
                    targets.push(t.min(max));
                    t = min + step * Decimal::from(targets.len() as u64);
                }
                Ok(targets)
            }
            ScanRange::Count { min, max, count } => {
                check_bounds(min, max)?;
                let count = count as usize;
                if count == 0 {
                    return Err(invalid_range("count must be at least 1".into()));
                }
                if count > MAX_SCAN_POINTS {
                    return Err(invalid_range(format!(
                        "count {} exceeds {}",
                        count, MAX_SCAN_POINTS
                    )));
                }
                if count == 1 {
                    return Ok(vec![min]);
                }
                let step = (max - min) / Decimal::from(count as u64 - 1);
                Ok((0..count)
                    .map(|i| {
                        if i == count - 1 {
                            max
                        } else {
                            min + step * Decimal::from(i as u64)
                        }
                    })
                    .collect())
            }
        }
    }
}

fn check_bounds(min: Decimal, max: Decimal) -> MarkowitzResult<()> {
    if min > max {
        return Err(invalid_range(format!("min {} exceeds max {}", min, max)));
    }
    Ok(())
}

fn invalid_range(reason: String) -> MarkowitzError {
    MarkowitzError::Validation {
        field: "scan".into(),
        reason,
    }
}

// ---------------------------------------------------------------------------
// Scanning
// ---------------------------------------------------------------------------

/// Solve the frontier at each target return.
///
/// The minimum-variance point is always attempted and the tangency point
/// when `risk_free_rate` is given. A point that cannot be solved is left
/// out of the profile and reported in `diagnostics`; the scan itself never
/// fails.
pub fn scan_frontier(
    universe: &AssetUniverse,
    targets: &[Decimal],
    risk_free_rate: Option<Decimal>,
    constraints: ConstraintSet,
) -> FrontierScan {
    let mut scan = FrontierScan::default();

    match minimum_variance_portfolio(universe, constraints)
        .and_then(|p| solved_point(universe, PointKind::MinVariance, None, p, risk_free_rate))
    {
        Ok(point) => scan.profile.points.push(point),
        Err(e) => skip(&mut scan, PointKind::MinVariance, None, &e),
    }

    if let Some(rf) = risk_free_rate {
        match tangency_portfolio(universe, rf, constraints).and_then(|t| {
            solved_point(universe, PointKind::Tangency, None, t.portfolio, risk_free_rate)
        }) {
            Ok(point) => scan.profile.points.push(point),
            Err(e) => skip(&mut scan, PointKind::Tangency, None, &e),
        }
    }

    for &target in targets {
        match portfolio_for_target_return(universe, target, constraints).and_then(|p| {
            solved_point(universe, PointKind::Scan, Some(target), p, risk_free_rate)
        }) {
            Ok(point) => scan.profile.points.push(point),
            Err(e) => skip(&mut scan, PointKind::Scan, Some(target), &e),
        }
    }

    scan.profile
        .points
        .sort_by(|a, b| a.target_return.cmp(&b.target_return));

    tracing::debug!(
        solved = scan.profile.len(),
        skipped = scan.diagnostics.len(),
        "frontier scan complete"
    );
    scan
}

fn solved_point(
    universe: &AssetUniverse,
    kind: PointKind,
    target: Option<Decimal>,
    portfolio: Portfolio,
    risk_free_rate: Option<Decimal>,
) -> MarkowitzResult<FrontierPoint> {
    let achieved_return = portfolio.expected_return(universe)?;
    let standard_deviation = portfolio.standard_deviation(universe)?;
    Ok(FrontierPoint {
        kind,
        target_return: target.unwrap_or(achieved_return),
        achieved_return,
        standard_deviation,
        sharpe_ratio: risk_free_rate.map(|rf| sharpe_ratio(achieved_return, rf, standard_deviation)),
        weights: portfolio.weights,
    })
}

fn skip(scan: &mut FrontierScan, kind: PointKind, target: Option<Decimal>, err: &MarkowitzError) {
    tracing::warn!(?kind, target = ?target, "skipping frontier point: {}", err);
    scan.diagnostics.push(ScanDiagnostic::new(kind, target, err));
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
