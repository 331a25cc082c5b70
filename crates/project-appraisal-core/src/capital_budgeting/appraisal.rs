use log::debug;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use super::metrics::push_irr_warnings;
use super::payback::{payback_periods, Payback};
use super::schedule::{
    build_schedule, collect_parameter_warnings, net_cash_flows, CashFlowPeriod, ProjectParameters,
};
use crate::time_value::{self, BisectionConfig, IrrOutcome};
use crate::types::{with_metadata, ComputationOutput, Money, Rate};
use crate::AppraisalResult;

/// Parameters plus solver settings for a full appraisal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppraisalInput {
    pub parameters: ProjectParameters,
    #[serde(default)]
    pub solver: BisectionConfig,
}

impl From<ProjectParameters> for AppraisalInput {
    fn from(parameters: ProjectParameters) -> Self {
        Self {
            parameters,
            solver: BisectionConfig::default(),
        }
    }
}

/// The four capital-budgeting indicators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectMetrics {
    /// NPV of the net cash flows at WACC
    pub npv: Money,
    /// IRR, or the sentinel 0 / -1 described by `irr_outcome`
    pub irr: Rate,
    pub irr_outcome: IrrOutcome,
    pub payback_period: Payback,
    pub discounted_payback_period: Payback,
}

/// Schedule and metrics from one appraisal run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectAppraisal {
    pub schedule: Vec<CashFlowPeriod>,
    pub metrics: ProjectMetrics,
}

/// Build the schedule and derive NPV, IRR, payback and discounted payback.
///
/// Everything is recomputed from `input`; nothing is cached between calls.
pub fn appraise_project(
    input: &AppraisalInput,
) -> AppraisalResult<ComputationOutput<ProjectAppraisal>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();
    let params = &input.parameters;

    let schedule = build_schedule(params)?;
    collect_parameter_warnings(params, &mut warnings);

    let metrics = compute_metrics(params, &schedule, &input.solver)?;
    debug!(
        "Appraised {}-year project: NPV {}, IRR {}",
        params.project_life_years, metrics.npv, metrics.irr
    );

    if metrics.npv < Decimal::ZERO {
        warnings.push(format!(
            "NPV is negative ({}) at WACC {}; the project does not cover its cost of capital",
            metrics.npv.round_dp(2),
            params.wacc
        ));
    }
    push_irr_warnings(&metrics.irr_outcome, &mut warnings);
    if let IrrOutcome::Converged { rate } = metrics.irr_outcome {
        if rate < params.wacc {
            warnings.push(format!("IRR ({rate}) is below WACC ({})", params.wacc));
        }
    }
    if !metrics.payback_period.is_recovered() {
        warnings.push(format!(
            "Investment is not recovered within the {}-year project life",
            params.project_life_years
        ));
    } else if !metrics.discounted_payback_period.is_recovered() {
        warnings.push(
            "Investment is not recovered on a discounted basis within the project life".into(),
        );
    }

    let elapsed = start.elapsed().as_micros() as u64;

    Ok(with_metadata(
        "Flat-cash-flow capital budgeting: NPV, bisection IRR, payback and discounted payback",
        input,
        warnings,
        elapsed,
        ProjectAppraisal { schedule, metrics },
    ))
}

/// Metrics for an already built schedule.
pub fn compute_metrics(
    params: &ProjectParameters,
    schedule: &[CashFlowPeriod],
    solver: &BisectionConfig,
) -> AppraisalResult<ProjectMetrics> {
    let flows = net_cash_flows(schedule);

    let npv = time_value::npv(params.wacc, &flows)?;
    let irr_outcome = time_value::solve_irr(&flows, solver)?;

    let paybacks = payback_periods(params.initial_investment.abs(), &flows[1..], params.wacc)?;

    Ok(ProjectMetrics {
        npv,
        irr: irr_outcome.value(),
        irr_outcome,
        payback_period: paybacks.payback_period,
        discounted_payback_period: paybacks.discounted_payback_period,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sample_input() -> AppraisalInput {
        AppraisalInput::from(ProjectParameters {
            initial_investment: dec!(-500_000),
            project_life_years: 6,
            annual_revenue: dec!(450_000),
            annual_cost: dec!(250_000),
            wacc: dec!(0.09),
            tax_rate: dec!(0.25),
        })
    }

    #[test]
    fn test_profitable_project() {
        // OCF = (450k - 250k) * 0.75 = 150k for 6 years
        let output = appraise_project(&sample_input()).unwrap();
        let m = &output.result.metrics;

        // NPV = -500k + 150k * 4.485919 ≈ 172,887.8
        assert!(
            (m.npv - dec!(172_887.8)).abs() < dec!(1),
            "NPV: expected ~172,887.8, got {}",
            m.npv
        );
        assert!(m.irr > dec!(0.09) && m.irr < dec!(0.25), "IRR {}", m.irr);
        assert_eq!(
            m.payback_period.years().map(|y| y.round_dp(4)),
            Some(dec!(3.3333))
        );
        assert!(m.discounted_payback_period.is_recovered());
        assert!(output.warnings.is_empty(), "{:?}", output.warnings);
    }

    #[test]
    fn test_npv_matches_sum_of_discounted_cash_flows() {
        let output = appraise_project(&sample_input()).unwrap();
        let discounted: Money = output
            .result
            .schedule
            .iter()
            .map(|p| p.discounted_cash_flow)
            .sum();
        assert!((output.result.metrics.npv - discounted).abs() < dec!(0.000001));
    }

    #[test]
    fn test_no_initial_outflow() {
        let mut input = sample_input();
        input.parameters.initial_investment = Decimal::ZERO;
        let output = appraise_project(&input).unwrap();
        let m = &output.result.metrics;
        assert_eq!(m.irr_outcome, IrrOutcome::NoInitialOutflow);
        assert_eq!(m.irr, Decimal::ZERO);
        assert_eq!(
            m.payback_period,
            Payback::Recovered {
                years: Decimal::ZERO
            }
        );
    }

    #[test]
    fn test_invalid_parameters_propagate() {
        let mut input = sample_input();
        input.parameters.project_life_years = 0;
        assert!(appraise_project(&input).is_err());
    }

    #[test]
    fn test_appraisal_input_accepts_missing_solver() {
        let json = r#"{
            "parameters": {
                "initial_investment": "-1000",
                "project_life_years": 3,
                "annual_revenue": "900",
                "annual_cost": "400",
                "wacc": "0.1",
                "tax_rate": "0.2"
            }
        }"#;
        let input: AppraisalInput = serde_json::from_str(json).unwrap();
        assert_eq!(input.solver, BisectionConfig::default());
        assert_eq!(input.parameters.project_life_years, 3);
    }
}
