use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::time_value::{self, BisectionConfig, IrrOutcome};
use crate::types::{with_metadata, ComputationOutput, Money, Rate};
use crate::AppraisalResult;

// ---------------------------------------------------------------------------
// NPV
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NpvInput {
    /// Discount rate per period
    pub rate: Rate,
    /// Cash flows starting at period 0
    pub cash_flows: Vec<Money>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NpvOutput {
    pub npv: Money,
    /// Undiscounted sum, i.e. NPV at 0%
    pub undiscounted_total: Money,
    pub periods: usize,
}

pub fn calculate_npv(input: &NpvInput) -> AppraisalResult<ComputationOutput<NpvOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let npv = time_value::npv(input.rate, &input.cash_flows)?;
    let undiscounted_total: Money = input.cash_flows.iter().sum();

    if input.cash_flows.is_empty() {
        warnings.push("No cash flows supplied; NPV is zero".into());
    }

    let output = NpvOutput {
        npv,
        undiscounted_total,
        periods: input.cash_flows.len(),
    };

    let elapsed = start.elapsed().as_micros() as u64;

    Ok(with_metadata(
        "NPV: sum of CF_t / (1 + r)^t, period 0 undiscounted",
        input,
        warnings,
        elapsed,
        output,
    ))
}

// ---------------------------------------------------------------------------
// IRR
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IrrInput {
    /// Cash flows starting at period 0
    pub cash_flows: Vec<Money>,
    #[serde(default)]
    pub solver: BisectionConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IrrOutput {
    /// IRR, or the sentinel 0 / -1 for degenerate series
    pub irr: Rate,
    pub outcome: IrrOutcome,
    /// NPV evaluated at the reported IRR
    pub npv_at_irr: Money,
}

pub fn calculate_irr(input: &IrrInput) -> AppraisalResult<ComputationOutput<IrrOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let outcome = time_value::solve_irr(&input.cash_flows, &input.solver)?;
    push_irr_warnings(&outcome, &mut warnings);

    let irr = outcome.value();
    let npv_at_irr = if outcome.is_converged() {
        time_value::npv(irr, &input.cash_flows)?
    } else {
        time_value::npv(input.solver.lower, &input.cash_flows)?
    };

    let output = IrrOutput {
        irr,
        outcome,
        npv_at_irr,
    };

    let elapsed = start.elapsed().as_micros() as u64;

    Ok(with_metadata(
        "IRR via bisection over an expanding bracket",
        input,
        warnings,
        elapsed,
        output,
    ))
}

pub(crate) fn push_irr_warnings(outcome: &IrrOutcome, warnings: &mut Vec<String>) {
    match outcome {
        IrrOutcome::NoInitialOutflow => warnings.push(
            "No outflow at period 0; IRR is not meaningful and is reported as 0".into(),
        ),
        IrrOutcome::NeverBreaksEven => warnings.push(
            "Undiscounted cash flows do not cover the investment; IRR is reported as -1".into(),
        ),
        IrrOutcome::Converged { .. } => {}
    }
}
