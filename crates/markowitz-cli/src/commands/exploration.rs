use clap::Args;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::Value;

use markowitz_core::analysis::{self, PairScanInput};
use markowitz_core::monte_carlo::{self, MonteCarloInput};

use super::SourceArgs;
use crate::input;

/// Arguments for the two-asset mixture scan
#[derive(Args)]
pub struct PairsArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Weight increment of each mix
    #[arg(long, default_value = "0.01")]
    pub resolution: Decimal,

    /// Report the lowest-risk mix earning more than this return
    #[arg(long, allow_hyphen_values = true)]
    pub min_return: Option<Decimal>,

    /// Include every evaluated mix in the output
    #[arg(long)]
    pub all_points: bool,
}

/// Arguments for the random portfolio cloud
#[derive(Args)]
pub struct MonteCarloArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Number of random portfolios
    #[arg(long, default_value = "10000")]
    pub samples: u32,

    /// Seed for reproducible clouds
    #[arg(long)]
    pub seed: Option<u64>,

    /// Include every sampled portfolio in the output
    #[arg(long)]
    pub cloud: bool,
}

pub fn run_pairs(args: PairsArgs) -> Result<Value, Box<dyn std::error::Error>> {
    if args.resolution < dec!(0.0001) {
        tracing::warn!(resolution = %args.resolution, "fine resolution; the scan may be slow");
    }
    let request: PairScanInput = input::load_request(
        args.source.path(),
        || {
            Some(PairScanInput {
                universe: args.source.universe()?,
                resolution: args.resolution,
                min_return: args.min_return,
                include_points: args.all_points,
            })
        },
        "a pair scan",
    )?;
    let result = analysis::analyze_asset_pairs(&request)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_monte_carlo(args: MonteCarloArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let request: MonteCarloInput = input::load_request(
        args.source.path(),
        || {
            Some(MonteCarloInput {
                universe: args.source.universe()?,
                samples: args.samples,
                seed: args.seed,
                include_cloud: args.cloud,
            })
        },
        "a Monte Carlo cloud",
    )?;
    let result = monte_carlo::analyze_monte_carlo(&request)?;
    Ok(serde_json::to_value(result)?)
}
