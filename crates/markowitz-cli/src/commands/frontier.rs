use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use markowitz_core::analysis::{
    self, FrontierInput, MinVarianceInput, TangencyInput, TargetReturnInput,
};
use markowitz_core::ScanRange;

use super::{constraint_set, SourceArgs};
use crate::input;

/// Arguments for a frontier scan
#[derive(Args)]
pub struct FrontierArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Forbid short positions
    #[arg(long)]
    pub long_only: bool,

    /// Risk-free rate; adds the tangency point and Sharpe ratios
    #[arg(long, allow_hyphen_values = true)]
    pub risk_free_rate: Option<Decimal>,

    /// Number of evenly spaced targets (default 20)
    #[arg(long)]
    pub points: Option<u32>,

    /// Lowest target return (requires --max)
    #[arg(long, allow_hyphen_values = true, requires = "max")]
    pub min: Option<Decimal>,

    /// Highest target return (requires --min)
    #[arg(long, allow_hyphen_values = true, requires = "min")]
    pub max: Option<Decimal>,

    /// Spacing between targets; overrides --points
    #[arg(long, requires = "min")]
    pub step: Option<Decimal>,
}

/// Arguments for the global minimum-variance portfolio
#[derive(Args)]
pub struct MinVarianceArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Forbid short positions
    #[arg(long)]
    pub long_only: bool,
}

/// Arguments for a target-return portfolio
#[derive(Args)]
pub struct TargetReturnArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Forbid short positions
    #[arg(long)]
    pub long_only: bool,

    /// Required expected return (e.g. 0.05 for 5%)
    #[arg(long, allow_hyphen_values = true)]
    pub target: Option<Decimal>,
}

/// Arguments for the tangency portfolio
#[derive(Args)]
pub struct TangencyArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Forbid short positions
    #[arg(long)]
    pub long_only: bool,

    /// Risk-free rate
    #[arg(long, default_value = "0.005", allow_hyphen_values = true)]
    pub risk_free_rate: Decimal,
}

fn scan_range(args: &FrontierArgs) -> Option<ScanRange> {
    let (min, max) = (args.min?, args.max?);
    Some(match args.step {
        Some(step) => ScanRange::Step { min, max, step },
        None => ScanRange::Count {
            min,
            max,
            count: args.points.unwrap_or(20),
        },
    })
}

pub fn run_frontier(args: FrontierArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let request: FrontierInput = input::load_request(
        args.source.path(),
        || {
            Some(FrontierInput {
                universe: args.source.universe()?,
                scan: scan_range(&args),
                frontier_points: args.points,
                risk_free_rate: args.risk_free_rate,
                constraints: constraint_set(args.long_only),
            })
        },
        "a frontier scan",
    )?;
    let result = analysis::analyze_frontier(&request)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_min_variance(args: MinVarianceArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let request: MinVarianceInput = input::load_request(
        args.source.path(),
        || {
            Some(MinVarianceInput {
                universe: args.source.universe()?,
                constraints: constraint_set(args.long_only),
            })
        },
        "the minimum-variance portfolio",
    )?;
    let result = analysis::analyze_minimum_variance(&request)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_target_return(args: TargetReturnArgs) -> Result<Value, Box<dyn std::error::Error>> {
    if args.source.dataset.is_some() && args.target.is_none() {
        return Err("--target is required with --dataset".into());
    }
    let request: TargetReturnInput = input::load_request(
        args.source.path(),
        || {
            Some(TargetReturnInput {
                universe: args.source.universe()?,
                target_return: args.target?,
                constraints: constraint_set(args.long_only),
            })
        },
        "a target-return portfolio",
    )?;
    let result = analysis::analyze_target_return(&request)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_tangency(args: TangencyArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let request: TangencyInput = input::load_request(
        args.source.path(),
        || {
            Some(TangencyInput {
                universe: args.source.universe()?,
                risk_free_rate: args.risk_free_rate,
                constraints: constraint_set(args.long_only),
            })
        },
        "the tangency portfolio",
    )?;
    let result = analysis::analyze_tangency(&request)?;
    Ok(serde_json::to_value(result)?)
}
