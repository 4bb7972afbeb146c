pub mod active_set;
pub mod analysis;
pub mod config;
pub mod error;
pub mod exploration;
pub mod linalg;
pub mod portfolio;
pub mod scanner;
pub mod solver;
pub mod tangency;
pub mod types;
pub mod universe;

#[cfg(feature = "monte_carlo")]
pub mod monte_carlo;

pub use config::SolverConfig;
pub use error::{ErrorKind, MarkowitzError};
pub use portfolio::Portfolio;
pub use scanner::{FrontierPoint, FrontierProfile, FrontierScan, PointKind, ScanRange};
pub use solver::{ConstraintSet, FrontierCoefficients};
pub use tangency::TangencyPortfolio;
pub use types::*;
pub use universe::{AssetUniverse, AssetUniverseInput};

/// Standard result type for all markowitz operations
pub type MarkowitzResult<T> = Result<T, MarkowitzError>;
