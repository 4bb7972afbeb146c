mod commands;
mod datasets;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use commands::exploration::{MonteCarloArgs, PairsArgs};
use commands::frontier::{FrontierArgs, MinVarianceArgs, TangencyArgs, TargetReturnArgs};

/// Markowitz mean-variance efficient frontier analysis
#[derive(Parser)]
#[command(
    name = "mpt",
    version,
    about = "Markowitz mean-variance efficient frontier analysis",
    long_about = "A CLI for modern portfolio theory calculations with decimal precision. \
                  Solves minimum-variance, target-return and tangency portfolios, scans \
                  the efficient frontier, and explores two-asset mixes and random \
                  portfolio clouds. Asset universes come from a JSON file, stdin, or a \
                  built-in fictional dataset."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Log solver steps to stderr (overrides RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan the efficient frontier between two target returns
    Frontier(FrontierArgs),
    /// Global minimum-variance portfolio
    MinVariance(MinVarianceArgs),
    /// Minimum-variance portfolio for a target return
    TargetReturn(TargetReturnArgs),
    /// Tangency (maximum Sharpe ratio) portfolio
    Tangency(TangencyArgs),
    /// Brute-force two-asset mixture scan over every asset pair
    Pairs(PairsArgs),
    /// Random long-only portfolio cloud
    MonteCarlo(MonteCarloArgs),
    /// List the built-in datasets
    Datasets,
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Frontier(args) => commands::frontier::run_frontier(args),
        Commands::MinVariance(args) => commands::frontier::run_min_variance(args),
        Commands::TargetReturn(args) => commands::frontier::run_target_return(args),
        Commands::Tangency(args) => commands::frontier::run_tangency(args),
        Commands::Pairs(args) => commands::exploration::run_pairs(args),
        Commands::MonteCarlo(args) => commands::exploration::run_monte_carlo(args),
        Commands::Datasets => Ok(datasets::list()),
        Commands::Version => {
            println!("mpt {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
