use rand::rngs::StdRng;
use rand::Rng;
use rand::SeedableRng;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::MarkowitzError;
use crate::exploration::{convex_hull, lowest_risk, MixturePoint};
use crate::solver::{minimum_variance_portfolio, ConstraintSet};
use crate::types::{with_metadata, ComputationOutput};
use crate::universe::{AssetUniverse, AssetUniverseInput};
use crate::MarkowitzResult;

/// Upper bound on `samples`.
pub const MAX_SAMPLES: u32 = 1_000_000;

/// Raw weights are drawn uniformly from `1..=RAW_WEIGHT_RANGE` and then
/// normalized, so every asset is held.
const RAW_WEIGHT_RANGE: u32 = 1_000_000;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Random long-only portfolio cloud request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonteCarloInput {
    pub universe: AssetUniverseInput,
    /// Number of random portfolios (default 10,000).
    #[serde(default = "default_samples")]
    pub samples: u32,
    /// Optional seed for reproducibility.
    pub seed: Option<u64>,
    /// Return every sampled point, not just the hull.
    #[serde(default)]
    pub include_cloud: bool,
}

fn default_samples() -> u32 {
    10_000
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonteCarloOutput {
    pub samples: u32,
    /// Lowest-risk sampled portfolio.
    pub min_variance_sample: MixturePoint,
    /// Standard deviation of the analytic long-only minimum-variance
    /// portfolio, when it can be solved.
    pub analytic_min_standard_deviation: Option<Decimal>,
    /// Convex hull of the cloud in the (risk, return) plane.
    pub hull: Vec<MixturePoint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cloud: Option<Vec<MixturePoint>>,
}

// ---------------------------------------------------------------------------
// Sampling
// ---------------------------------------------------------------------------

/// Uniform raw weights normalized to sum to one.
pub fn random_weights<R: Rng>(n: usize, rng: &mut R) -> Vec<Decimal> {
    let raw: Vec<Decimal> = (0..n)
        .map(|_| Decimal::from(rng.gen_range(1..=RAW_WEIGHT_RANGE)))
        .collect();
    let total: Decimal = raw.iter().sum();
    raw.iter().map(|w| *w / total).collect()
}

/// Evaluate `samples` random long-only portfolios.
pub fn sample_portfolios<R: Rng>(
    universe: &AssetUniverse,
    samples: u32,
    rng: &mut R,
) -> MarkowitzResult<Vec<MixturePoint>> {
    let n = universe.dimension();
    (0..samples)
        .map(|_| MixturePoint::evaluate(universe, random_weights(n, rng)))
        .collect()
}

/// Sample a random portfolio cloud and compare its lowest-risk point with
/// the analytic long-only minimum-variance portfolio.
pub fn analyze_monte_carlo(
    input: &MonteCarloInput,
) -> MarkowitzResult<ComputationOutput<MonteCarloOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    if input.samples == 0 || input.samples > MAX_SAMPLES {
        return Err(MarkowitzError::Validation {
            field: "samples".into(),
            reason: format!("Must be between 1 and {}, got {}", MAX_SAMPLES, input.samples),
        });
    }
    let universe = AssetUniverse::try_from(&input.universe)?;

    let mut rng = match input.seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    };
    let cloud = sample_portfolios(&universe, input.samples, &mut rng)?;

    let min_variance_sample = lowest_risk(&cloud)
        .cloned()
        .ok_or_else(|| MarkowitzError::Validation {
            field: "samples".into(),
            reason: "no portfolios were sampled".into(),
        })?;

    let analytic_min_standard_deviation =
        match minimum_variance_portfolio(&universe, ConstraintSet::LongOnly)
            .and_then(|p| p.standard_deviation(&universe))
        {
            Ok(sd) => Some(sd),
            Err(e) => {
                warnings.push(format!("Analytic minimum-variance portfolio unavailable: {}", e));
                None
            }
        };

    let hull = convex_hull(&cloud);
    let output = MonteCarloOutput {
        samples: input.samples,
        min_variance_sample,
        analytic_min_standard_deviation,
        hull,
        cloud: if input.include_cloud { Some(cloud) } else { None },
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Monte Carlo long-only portfolio cloud (uniform raw weights, normalized)",
        &serde_json::json!({
            "n_assets": universe.dimension(),
            "samples": input.samples,
            "seed": input.seed,
        }),
        warnings,
        elapsed,
        output,
    ))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
