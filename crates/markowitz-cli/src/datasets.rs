use clap::ValueEnum;
use markowitz_core::AssetUniverseInput;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::{json, Value};

/// Fictional markets with precomputed annualized means and covariances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Dataset {
    /// Two tech stocks
    TwoAsset,
    /// Two stocks, government bonds and real estate
    FourAsset,
}

const NAMES: [&str; 4] = ["NuAS", "Pear", "G-Bonds", "Real estate"];

fn returns() -> [Decimal; 4] {
    [
        dec!(0.10204757724052252),
        dec!(0.03957275033911392),
        dec!(0.008934883393222211),
        dec!(0.0003564179320007629),
    ]
}

fn covariance() -> [[Decimal; 4]; 4] {
    [
        [
            dec!(0.06002926772602703),
            dec!(-0.007491729312474529),
            dec!(0.00001888402363401547),
            dec!(-0.0012368707201008756),
        ],
        [
            dec!(-0.007491729312474529),
            dec!(0.013362098369322896),
            dec!(-0.001971944177696391),
            dec!(0.0015079157964697652),
        ],
        [
            dec!(0.00001888402363401547),
            dec!(-0.001971944177696391),
            dec!(0.001616609155735905),
            dec!(0.000020071961060040745),
        ],
        [
            dec!(-0.0012368707201008756),
            dec!(0.0015079157964697652),
            dec!(0.000020071961060040745),
            dec!(0.0010356316875594284),
        ],
    ]
}

impl Dataset {
    fn size(self) -> usize {
        match self {
            Dataset::TwoAsset => 2,
            Dataset::FourAsset => 4,
        }
    }

    /// The two-asset market is the leading block of the four-asset one.
    pub fn universe(self) -> AssetUniverseInput {
        let n = self.size();
        let cov = covariance();
        AssetUniverseInput {
            asset_names: Some(NAMES[..n].iter().map(|s| s.to_string()).collect()),
            expected_returns: returns()[..n].to_vec(),
            covariance_matrix: cov[..n].iter().map(|row| row[..n].to_vec()).collect(),
            config: Default::default(),
        }
    }
}

/// Summary of every built-in dataset.
pub fn list() -> Value {
    let datasets: Vec<Value> = Dataset::value_variants()
        .iter()
        .map(|d| {
            let u = d.universe();
            json!({
                "name": d.to_possible_value().map(|v| v.get_name().to_string()),
                "asset_names": u.asset_names,
                "expected_returns": u.expected_returns,
            })
        })
        .collect();
    json!({ "datasets": datasets })
}
