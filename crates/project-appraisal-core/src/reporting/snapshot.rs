use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Instant;

use crate::capital_budgeting::appraisal::{
    appraise_project, AppraisalInput, ProjectAppraisal, ProjectMetrics,
};
use crate::capital_budgeting::schedule::{CashFlowPeriod, ProjectParameters};
use crate::time_value::IrrOutcome;
use crate::types::{with_metadata, ComputationOutput};
use crate::AppraisalResult;

/// One headline figure, already formatted for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryIndicator {
    pub name: String,
    pub value: String,
}

/// Read-only view of an appraisal handed to the narrative service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationSnapshot {
    pub parameters: ProjectParameters,
    pub metrics: ProjectMetrics,
    pub schedule: Vec<CashFlowPeriod>,
    pub indicators: Vec<SummaryIndicator>,
}

/// A service that writes a textual evaluation of a snapshot.
pub trait NarrativeService {
    type Error: fmt::Display;

    fn evaluate(&mut self, snapshot: &EvaluationSnapshot) -> Result<String, Self::Error>;
}

/// NPV, IRR, PP and DPP as display strings.
pub fn summary_indicators(metrics: &ProjectMetrics) -> Vec<SummaryIndicator> {
    let irr = match metrics.irr_outcome {
        IrrOutcome::Converged { rate } => format!("{}%", (rate * dec!(100)).round_dp(2)),
        IrrOutcome::NoInitialOutflow => "n/a (no initial outflow)".to_string(),
        IrrOutcome::NeverBreaksEven => "n/a (does not break even at 0%)".to_string(),
    };

    vec![
        SummaryIndicator {
            name: "NPV".into(),
            value: metrics.npv.round_dp(2).to_string(),
        },
        SummaryIndicator {
            name: "IRR".into(),
            value: irr,
        },
        SummaryIndicator {
            name: "Payback Period".into(),
            value: metrics.payback_period.to_string(),
        },
        SummaryIndicator {
            name: "Discounted Payback Period".into(),
            value: metrics.discounted_payback_period.to_string(),
        },
    ]
}

pub fn build_snapshot(
    parameters: &ProjectParameters,
    appraisal: &ProjectAppraisal,
) -> EvaluationSnapshot {
    EvaluationSnapshot {
        parameters: parameters.clone(),
        metrics: appraisal.metrics,
        schedule: appraisal.schedule.clone(),
        indicators: summary_indicators(&appraisal.metrics),
    }
}

/// Appraise the project and package the result for the narrative service.
pub fn evaluation_snapshot(
    input: &AppraisalInput,
) -> AppraisalResult<ComputationOutput<EvaluationSnapshot>> {
    let start = Instant::now();

    let appraisal = appraise_project(input)?;
    let snapshot = build_snapshot(&input.parameters, &appraisal.result);

    let elapsed = start.elapsed().as_micros() as u64;

    Ok(with_metadata(
        "Evaluation snapshot: parameters, metrics, schedule and summary indicators",
        input,
        appraisal.warnings,
        elapsed,
        snapshot,
    ))
}
