use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::exploration::{
    convex_hull, lowest_risk, lowest_risk_above, scan_asset_pairs, MixturePoint,
};
use crate::linalg::{mat_vec_multiply, overflow};
use crate::portfolio::{sharpe_ratio, Portfolio};
use crate::scanner::{scan_frontier, FrontierProfile, ScanDiagnostic, ScanRange};
use crate::solver::{
    frontier_coefficients, minimum_variance_portfolio, portfolio_for_target_return,
    ConstraintSet, FrontierCoefficients,
};
use crate::tangency::tangency_portfolio;
use crate::types::{with_metadata, ComputationOutput};
use crate::universe::{AssetUniverse, AssetUniverseInput};
use crate::MarkowitzResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MinVarianceInput {
    pub universe: AssetUniverseInput,
    #[serde(default)]
    pub constraints: ConstraintSet,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetReturnInput {
    pub universe: AssetUniverseInput,
    pub target_return: Decimal,
    #[serde(default)]
    pub constraints: ConstraintSet,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TangencyInput {
    pub universe: AssetUniverseInput,
    pub risk_free_rate: Decimal,
    #[serde(default)]
    pub constraints: ConstraintSet,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrontierInput {
    pub universe: AssetUniverseInput,
    /// Explicit target returns; defaults to `frontier_points` evenly spaced
    /// targets from the minimum-variance return to the best asset.
    #[serde(default)]
    pub scan: Option<ScanRange>,
    /// Number of frontier points when `scan` is absent (default 20).
    #[serde(default)]
    pub frontier_points: Option<u32>,
    /// Adds the tangency point and Sharpe ratios.
    #[serde(default)]
    pub risk_free_rate: Option<Decimal>,
    #[serde(default)]
    pub constraints: ConstraintSet,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairScanInput {
    pub universe: AssetUniverseInput,
    /// Weight increment of each two-asset mix (default 0.01).
    #[serde(default = "default_resolution")]
    pub resolution: Decimal,
    /// Report the lowest-risk mix earning more than this.
    #[serde(default)]
    pub min_return: Option<Decimal>,
    #[serde(default)]
    pub include_points: bool,
}

fn default_resolution() -> Decimal {
    Decimal::new(1, 2)
}

/// A single asset weight with risk/return contribution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetWeight {
    pub name: String,
    pub weight: Decimal,
    /// Weight times expected return.
    pub contribution_to_return: Decimal,
    /// Marginal risk contribution times weight; sums to the portfolio
    /// standard deviation.
    pub contribution_to_risk: Decimal,
}

/// One solved portfolio with its named weights and risk/return figures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioSummary {
    pub weights: Vec<AssetWeight>,
    pub expected_return: Decimal,
    pub variance: Decimal,
    pub standard_deviation: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sharpe_ratio: Option<Decimal>,
}

impl PortfolioSummary {
    pub fn from_portfolio(
        universe: &AssetUniverse,
        portfolio: &Portfolio,
        risk_free_rate: Option<Decimal>,
    ) -> MarkowitzResult<Self> {
        let expected_return = portfolio.expected_return(universe)?;
        let variance = portfolio.variance(universe)?;
        let standard_deviation = portfolio.standard_deviation(universe)?;

        let sigma_w = mat_vec_multiply(universe.covariance(), portfolio.weights())?;
        let weights = universe
            .asset_names()
            .iter()
            .zip(portfolio.weights())
            .zip(universe.returns().iter().zip(&sigma_w))
            .map(|((name, w), (mu, sw))| -> MarkowitzResult<AssetWeight> {
                // w_i * (C w)_i / sigma; these sum to sigma
                let contribution_to_risk = if standard_deviation.is_zero() {
                    Decimal::ZERO
                } else {
                    (*w * *sw)
                        .checked_div(standard_deviation)
                        .ok_or_else(|| overflow("risk contributions"))?
                };
                Ok(AssetWeight {
                    name: name.clone(),
                    weight: *w,
                    contribution_to_return: *w * *mu,
                    contribution_to_risk,
                })
            })
            .collect::<MarkowitzResult<_>>()?;

        Ok(Self {
            weights,
            expected_return,
            variance,
            standard_deviation,
            sharpe_ratio: risk_free_rate
                .map(|rf| sharpe_ratio(expected_return, rf, standard_deviation)),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TangencySummary {
    pub portfolio: PortfolioSummary,
    pub risk_free_rate: Decimal,
    pub sharpe_ratio: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrontierOutput {
    pub asset_names: Vec<String>,
    /// Two-fund coefficients of the full universe, when invertible.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coefficients: Option<FrontierCoefficients>,
    pub profile: FrontierProfile,
    pub diagnostics: Vec<ScanDiagnostic>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairScanOutput {
    pub asset_names: Vec<String>,
    pub points_evaluated: usize,
    pub lowest_risk: Option<MixturePoint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lowest_risk_above_min_return: Option<MixturePoint>,
    pub hull: Vec<MixturePoint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub points: Option<Vec<MixturePoint>>,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Global minimum-variance portfolio.
pub fn analyze_minimum_variance(
    input: &MinVarianceInput,
) -> MarkowitzResult<ComputationOutput<PortfolioSummary>> {
    let start = Instant::now();
    let universe = AssetUniverse::try_from(&input.universe)?;

    let portfolio = minimum_variance_portfolio(&universe, input.constraints)?;
    let summary = PortfolioSummary::from_portfolio(&universe, &portfolio, None)?;
    let warnings = short_position_warnings(&summary);

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        &methodology(input.constraints, "Global minimum-variance portfolio"),
        &serde_json::json!({
            "n_assets": universe.dimension(),
            "constraints": input.constraints,
        }),
        warnings,
        elapsed,
        summary,
    ))
}

/// Minimum-variance portfolio achieving a target return.
pub fn analyze_target_return(
    input: &TargetReturnInput,
) -> MarkowitzResult<ComputationOutput<PortfolioSummary>> {
    let start = Instant::now();
    let universe = AssetUniverse::try_from(&input.universe)?;

    let portfolio = portfolio_for_target_return(&universe, input.target_return, input.constraints)?;
    let summary = PortfolioSummary::from_portfolio(&universe, &portfolio, None)?;
    let mut warnings = short_position_warnings(&summary);
    if let Ok(mv_return) = minimum_variance_portfolio(&universe, input.constraints)
        .and_then(|p| p.expected_return(&universe))
    {
        if input.target_return < mv_return {
            warnings.push(format!(
                "Target return {} is below the minimum-variance return {:.6}; \
                 the portfolio lies on the inefficient branch",
                input.target_return, mv_return
            ));
        }
    }

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        &methodology(input.constraints, "Minimum-variance portfolio for a target return"),
        &serde_json::json!({
            "n_assets": universe.dimension(),
            "target_return": input.target_return.to_string(),
            "constraints": input.constraints,
        }),
        warnings,
        elapsed,
        summary,
    ))
}

/// Maximum Sharpe ratio portfolio.
pub fn analyze_tangency(
    input: &TangencyInput,
) -> MarkowitzResult<ComputationOutput<TangencySummary>> {
    let start = Instant::now();
    let universe = AssetUniverse::try_from(&input.universe)?;
    let rf = input.risk_free_rate;

    let tangency = tangency_portfolio(&universe, rf, input.constraints)?;
    let portfolio = PortfolioSummary::from_portfolio(&universe, &tangency.portfolio, Some(rf))?;
    let mut warnings = short_position_warnings(&portfolio);
    if let Ok(mv_return) = minimum_variance_portfolio(&universe, input.constraints)
        .and_then(|p| p.expected_return(&universe))
    {
        if rf >= mv_return {
            warnings.push(format!(
                "Risk-free rate {} is at or above the minimum-variance return {:.6}; \
                 the tangency point lies on the inefficient branch",
                rf, mv_return
            ));
        }
    }

    let output = TangencySummary {
        portfolio,
        risk_free_rate: rf,
        sharpe_ratio: tangency.sharpe_ratio,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        &methodology(input.constraints, "Tangency (maximum Sharpe ratio) portfolio"),
        &serde_json::json!({
            "n_assets": universe.dimension(),
            "risk_free_rate": rf.to_string(),
            "constraints": input.constraints,
        }),
        warnings,
        elapsed,
        output,
    ))
}

/// Efficient frontier scan. Points that cannot be solved are reported as
/// diagnostics and warnings; only an invalid universe or range fails.
pub fn analyze_frontier(
    input: &FrontierInput,
) -> MarkowitzResult<ComputationOutput<FrontierOutput>> {
    let start = Instant::now();
    let universe = AssetUniverse::try_from(&input.universe)?;

    let num_points = input.frontier_points.unwrap_or(20);
    let range = match &input.scan {
        Some(r) => r.clone(),
        None => ScanRange::spanning(&universe, num_points, input.constraints),
    };
    let targets = range.targets()?;

    let scan = scan_frontier(&universe, &targets, input.risk_free_rate, input.constraints);
    let warnings: Vec<String> = scan
        .diagnostics
        .iter()
        .map(|d| match d.target_return {
            Some(t) => format!("Skipped target {}: {}", t, d.message),
            None => format!("Skipped {:?} point: {}", d.kind, d.message),
        })
        .collect();

    let output = FrontierOutput {
        asset_names: universe.asset_names().to_vec(),
        coefficients: frontier_coefficients(&universe).ok(),
        profile: scan.profile,
        diagnostics: scan.diagnostics,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        &methodology(input.constraints, "Markowitz efficient frontier scan"),
        &serde_json::json!({
            "n_assets": universe.dimension(),
            "scan": range,
            "targets": targets.len(),
            "risk_free_rate": input.risk_free_rate.map(|r| r.to_string()),
            "constraints": input.constraints,
        }),
        warnings,
        elapsed,
        output,
    ))
}

/// Brute-force two-asset mixture scan over every asset pair.
pub fn analyze_asset_pairs(
    input: &PairScanInput,
) -> MarkowitzResult<ComputationOutput<PairScanOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();
    let universe = AssetUniverse::try_from(&input.universe)?;

    let points = scan_asset_pairs(&universe, input.resolution)?;
    if points.is_empty() {
        warnings.push("Fewer than two assets: no pairs to scan".into());
    }

    let lowest_risk_above_min_return = match input.min_return {
        Some(threshold) => {
            let found = lowest_risk_above(&points, threshold).cloned();
            if found.is_none() {
                warnings.push(format!("No two-asset mix earns more than {}", threshold));
            }
            found
        }
        None => None,
    };

    let output = PairScanOutput {
        asset_names: universe.asset_names().to_vec(),
        points_evaluated: points.len(),
        lowest_risk: lowest_risk(&points).cloned(),
        lowest_risk_above_min_return,
        hull: convex_hull(&points),
        points: if input.include_points { Some(points) } else { None },
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Two-asset mixture scan over all asset pairs",
        &serde_json::json!({
            "n_assets": universe.dimension(),
            "resolution": input.resolution.to_string(),
            "min_return": input.min_return.map(|r| r.to_string()),
        }),
        warnings,
        elapsed,
        output,
    ))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Methodology label; the solution method depends on the constraint set.
fn methodology(constraints: ConstraintSet, base: &str) -> String {
    match constraints {
        ConstraintSet::Unconstrained => format!("{} (closed-form Lagrangian)", base),
        ConstraintSet::LongOnly => format!("{} (long-only active set)", base),
    }
}

fn short_position_warnings(summary: &PortfolioSummary) -> Vec<String> {
    summary
        .weights
        .iter()
        .filter(|aw| aw.weight < Decimal::ZERO)
        .map(|aw| format!("Short position: {} has weight {:.4}", aw.name, aw.weight))
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
