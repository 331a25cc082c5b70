use napi::Result as NapiResult;
use napi_derive::napi;

use project_appraisal_core::capital_budgeting::{appraisal, metrics, payback, schedule};
use project_appraisal_core::reporting::{extraction, snapshot};

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

// ---------------------------------------------------------------------------
// Capital budgeting
// ---------------------------------------------------------------------------

#[napi]
pub fn appraise_project(input_json: String) -> NapiResult<String> {
    let input: appraisal::AppraisalInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = appraisal::appraise_project(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn build_cash_flow_schedule(input_json: String) -> NapiResult<String> {
    let input: schedule::ProjectParameters =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = schedule::calculate_schedule(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn net_present_value(input_json: String) -> NapiResult<String> {
    let input: metrics::NpvInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = metrics::calculate_npv(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn internal_rate_of_return(input_json: String) -> NapiResult<String> {
    let input: metrics::IrrInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = metrics::calculate_irr(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn payback_periods(input_json: String) -> NapiResult<String> {
    let input: payback::PaybackInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = payback::calculate_payback(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Reporting
// ---------------------------------------------------------------------------

#[napi]
pub fn evaluation_snapshot(input_json: String) -> NapiResult<String> {
    let input: appraisal::AppraisalInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = snapshot::evaluation_snapshot(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn normalize_extracted_parameters(input_json: String) -> NapiResult<String> {
    let input: extraction::ExtractedParameters =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = extraction::normalize_extracted(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}
