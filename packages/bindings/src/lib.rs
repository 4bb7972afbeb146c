use markowitz_core::{ComputationOutput, MarkowitzResult};
use napi::Result as NapiResult;
use napi_derive::napi;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

/// Parse the request, run the analysis, serialize the envelope.
fn run_json<I, O, F>(input_json: &str, analyze: F) -> NapiResult<String>
where
    I: DeserializeOwned,
    O: Serialize,
    F: FnOnce(&I) -> MarkowitzResult<ComputationOutput<O>>,
{
    let input: I = serde_json::from_str(input_json).map_err(to_napi_error)?;
    let output = analyze(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Single portfolios
// ---------------------------------------------------------------------------

#[napi]
pub fn minimum_variance(input_json: String) -> NapiResult<String> {
    run_json(&input_json, markowitz_core::analysis::analyze_minimum_variance)
}

#[napi]
pub fn target_return_portfolio(input_json: String) -> NapiResult<String> {
    run_json(&input_json, markowitz_core::analysis::analyze_target_return)
}

#[napi]
pub fn tangency_portfolio(input_json: String) -> NapiResult<String> {
    run_json(&input_json, markowitz_core::analysis::analyze_tangency)
}

// ---------------------------------------------------------------------------
// Frontier and exploration
// ---------------------------------------------------------------------------

#[napi]
pub fn efficient_frontier(input_json: String) -> NapiResult<String> {
    run_json(&input_json, markowitz_core::analysis::analyze_frontier)
}

#[napi]
pub fn asset_pair_scan(input_json: String) -> NapiResult<String> {
    run_json(&input_json, markowitz_core::analysis::analyze_asset_pairs)
}

#[napi]
pub fn monte_carlo_cloud(input_json: String) -> NapiResult<String> {
    run_json(&input_json, markowitz_core::monte_carlo::analyze_monte_carlo)
}
