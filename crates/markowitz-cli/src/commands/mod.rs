pub mod exploration;
pub mod frontier;

use clap::Args;
use markowitz_core::{AssetUniverseInput, ConstraintSet};

use crate::datasets::Dataset;

/// Where the asset universe comes from.
#[derive(Args)]
pub struct SourceArgs {
    /// Path to a JSON request file
    #[arg(long, conflicts_with = "dataset")]
    pub input: Option<String>,

    /// Built-in fictional dataset
    #[arg(long, value_enum)]
    pub dataset: Option<Dataset>,
}

impl SourceArgs {
    pub fn path(&self) -> Option<&str> {
        self.input.as_deref()
    }

    pub fn universe(&self) -> Option<AssetUniverseInput> {
        self.dataset.map(Dataset::universe)
    }
}

pub fn constraint_set(long_only: bool) -> ConstraintSet {
    if long_only {
        ConstraintSet::LongOnly
    } else {
        ConstraintSet::Unconstrained
    }
}
