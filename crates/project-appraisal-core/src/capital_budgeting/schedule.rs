use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::AppraisalError;
use crate::time_value::per_period_factor;
use crate::types::{with_metadata, ComputationOutput, Money, Rate};
use crate::AppraisalResult;

/// Longest project life accepted by the schedule builder.
pub const MAX_PROJECT_LIFE_YEARS: u32 = 500;

// ---------------------------------------------------------------------------
// Input types
// ---------------------------------------------------------------------------

/// The six parameters that drive a business-plan appraisal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectParameters {
    /// Capital outlay at year 0 (negative for an outflow)
    pub initial_investment: Money,
    /// Number of operating years after the investment year
    pub project_life_years: u32,
    /// Revenue earned in every operating year
    pub annual_revenue: Money,
    /// Operating cost incurred in every operating year
    pub annual_cost: Money,
    /// Discount rate (weighted average cost of capital)
    pub wacc: Rate,
    /// Corporate tax rate applied to positive EBIT
    pub tax_rate: Rate,
}

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

/// One year of the cash-flow schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CashFlowPeriod {
    /// 0 = investment year
    pub year: u32,
    pub revenue: Money,
    pub operating_cost: Money,
    /// revenue - operating_cost
    pub ebit: Money,
    /// Zero when EBIT is not positive
    pub tax: Money,
    /// EBIT - tax (no depreciation or working-capital movements)
    pub operating_cash_flow: Money,
    pub investment: Money,
    pub net_cash_flow: Money,
    /// 1 / (1 + wacc)^year
    pub discount_factor: Decimal,
    pub discounted_cash_flow: Money,
}

/// Schedule wrapped for the standard output envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleOutput {
    pub periods: Vec<CashFlowPeriod>,
    pub total_net_cash_flow: Money,
    pub total_discounted_cash_flow: Money,
}

// ---------------------------------------------------------------------------
// Core computation
// ---------------------------------------------------------------------------

/// Build the year-by-year schedule for years 0..=project_life_years.
///
/// Revenue, cost, EBIT, tax and operating cash flow are computed once and
/// repeated for every operating year.
pub fn build_schedule(params: &ProjectParameters) -> AppraisalResult<Vec<CashFlowPeriod>> {
    validate_parameters(params)?;

    let ebit = params
        .annual_revenue
        .checked_sub(params.annual_cost)
        .ok_or_else(|| AppraisalError::ArithmeticOverflow {
            context: "EBIT (annual revenue - annual cost)".into(),
        })?;
    let tax = if ebit > Decimal::ZERO {
        ebit * params.tax_rate
    } else {
        Decimal::ZERO
    };
    let ocf = ebit - tax;

    let mut periods = Vec::with_capacity(params.project_life_years as usize + 1);

    periods.push(CashFlowPeriod {
        year: 0,
        revenue: Decimal::ZERO,
        operating_cost: Decimal::ZERO,
        ebit: Decimal::ZERO,
        tax: Decimal::ZERO,
        operating_cash_flow: Decimal::ZERO,
        investment: params.initial_investment,
        net_cash_flow: params.initial_investment,
        discount_factor: Decimal::ONE,
        discounted_cash_flow: params.initial_investment,
    });

    let per_period = per_period_factor(params.wacc)?;
    let mut factor = Decimal::ONE;

    for year in 1..=params.project_life_years {
        factor = factor
            .checked_mul(per_period)
            .ok_or_else(|| AppraisalError::ArithmeticOverflow {
                context: format!("discount factor in year {year}"),
            })?;
        let discounted = ocf
            .checked_mul(factor)
            .ok_or_else(|| AppraisalError::ArithmeticOverflow {
                context: format!("discounted cash flow in year {year}"),
            })?;

        periods.push(CashFlowPeriod {
            year,
            revenue: params.annual_revenue,
            operating_cost: params.annual_cost,
            ebit,
            tax,
            operating_cash_flow: ocf,
            investment: Decimal::ZERO,
            net_cash_flow: ocf,
            discount_factor: factor,
            discounted_cash_flow: discounted,
        });
    }

    Ok(periods)
}

/// Net cash flow of every period, in year order.
pub fn net_cash_flows(schedule: &[CashFlowPeriod]) -> Vec<Money> {
    schedule.iter().map(|p| p.net_cash_flow).collect()
}

/// Build the schedule and wrap it with totals and metadata.
pub fn calculate_schedule(
    params: &ProjectParameters,
) -> AppraisalResult<ComputationOutput<ScheduleOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let periods = build_schedule(params)?;
    collect_parameter_warnings(params, &mut warnings);

    let total_net_cash_flow = checked_total(periods.iter().map(|p| p.net_cash_flow), "net")?;
    let total_discounted_cash_flow =
        checked_total(periods.iter().map(|p| p.discounted_cash_flow), "discounted")?;

    let output = ScheduleOutput {
        periods,
        total_net_cash_flow,
        total_discounted_cash_flow,
    };

    let elapsed = start.elapsed().as_micros() as u64;

    Ok(with_metadata(
        "Flat annual cash-flow schedule (EBIT - tax, no depreciation)",
        params,
        warnings,
        elapsed,
        output,
    ))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn checked_total(mut values: impl Iterator<Item = Money>, label: &str) -> AppraisalResult<Money> {
    values.try_fold(Decimal::ZERO, |acc, v| {
        acc.checked_add(v)
            .ok_or_else(|| AppraisalError::ArithmeticOverflow {
                context: format!("total {label} cash flow"),
            })
    })
}

pub fn validate_parameters(params: &ProjectParameters) -> AppraisalResult<()> {
    if params.project_life_years < 1 {
        return Err(AppraisalError::InvalidInput {
            field: "project_life_years".into(),
            reason: "Project life must be at least 1 year".into(),
        });
    }
    if params.project_life_years > MAX_PROJECT_LIFE_YEARS {
        return Err(AppraisalError::InvalidInput {
            field: "project_life_years".into(),
            reason: format!("Project life cannot exceed {MAX_PROJECT_LIFE_YEARS} years"),
        });
    }
    if params.wacc <= dec!(-1) {
        return Err(AppraisalError::InvalidInput {
            field: "wacc".into(),
            reason: "Discount rate must be greater than -100%".into(),
        });
    }
    if params.tax_rate < Decimal::ZERO || params.tax_rate > Decimal::ONE {
        return Err(AppraisalError::InvalidInput {
            field: "tax_rate".into(),
            reason: "Tax rate must be between 0 and 1".into(),
        });
    }
    Ok(())
}

/// Reasonableness checks shared by the schedule and appraisal outputs.
pub(crate) fn collect_parameter_warnings(params: &ProjectParameters, warnings: &mut Vec<String>) {
    if params.initial_investment > Decimal::ZERO {
        warnings.push(format!(
            "Initial investment ({}) is positive; outflows are expected as negative values",
            params.initial_investment
        ));
    }
    if params.annual_revenue <= params.annual_cost {
        warnings.push(format!(
            "Annual cost ({}) is not below annual revenue ({}); EBIT is not positive and no tax is charged",
            params.annual_cost, params.annual_revenue
        ));
    }
    if params.wacc > dec!(0.30) {
        warnings.push(format!(
            "WACC of {} exceeds 30%; verify that it is a decimal rate, not a percentage",
            params.wacc
        ));
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sample_params() -> ProjectParameters {
        ProjectParameters {
            initial_investment: dec!(-1_000_000),
            project_life_years: 5,
            annual_revenue: dec!(800_000),
            annual_cost: dec!(500_000),
            wacc: dec!(0.10),
            tax_rate: dec!(0.20),
        }
    }

    #[test]
    fn test_schedule_has_one_period_per_year_plus_investment_year() {
        for life in [1u32, 2, 5, 30] {
            let params = ProjectParameters {
                project_life_years: life,
                ..sample_params()
            };
            let schedule = build_schedule(&params).unwrap();
            assert_eq!(schedule.len(), life as usize + 1);
            for (i, period) in schedule.iter().enumerate() {
                assert_eq!(period.year, i as u32);
            }
        }
    }

    #[test]
    fn test_year_zero_carries_only_the_investment() {
        let schedule = build_schedule(&sample_params()).unwrap();
        let p0 = &schedule[0];
        assert_eq!(p0.revenue, Decimal::ZERO);
        assert_eq!(p0.operating_cost, Decimal::ZERO);
        assert_eq!(p0.ebit, Decimal::ZERO);
        assert_eq!(p0.tax, Decimal::ZERO);
        assert_eq!(p0.operating_cash_flow, Decimal::ZERO);
        assert_eq!(p0.net_cash_flow, dec!(-1_000_000));
        assert_eq!(p0.discount_factor, Decimal::ONE);
        assert_eq!(p0.discounted_cash_flow, dec!(-1_000_000));
    }

    #[test]
    fn test_operating_years_are_flat() {
        let schedule = build_schedule(&sample_params()).unwrap();
        for period in &schedule[1..] {
            assert_eq!(period.ebit, dec!(300_000));
            assert_eq!(period.tax, dec!(60_000));
            assert_eq!(period.operating_cash_flow, dec!(240_000));
            assert_eq!(period.net_cash_flow, dec!(240_000));
            assert_eq!(period.investment, Decimal::ZERO);
        }
    }

    #[test]
    fn test_discount_factors_decline() {
        let schedule = build_schedule(&sample_params()).unwrap();
        // Year 1: 1 / 1.1 = 0.909090...
        assert!((schedule[1].discount_factor - dec!(0.909091)).abs() < dec!(0.000001));
        for pair in schedule.windows(2) {
            assert!(pair[1].discount_factor < pair[0].discount_factor);
        }
    }

    #[test]
    fn test_loss_making_project_pays_no_tax() {
        let params = ProjectParameters {
            annual_revenue: dec!(400_000),
            annual_cost: dec!(500_000),
            ..sample_params()
        };
        let schedule = build_schedule(&params).unwrap();
        assert_eq!(schedule[1].ebit, dec!(-100_000));
        assert_eq!(schedule[1].tax, Decimal::ZERO);
        assert_eq!(schedule[1].operating_cash_flow, dec!(-100_000));
    }

    #[test]
    fn test_zero_life_is_rejected() {
        let params = ProjectParameters {
            project_life_years: 0,
            ..sample_params()
        };
        match build_schedule(&params) {
            Err(AppraisalError::InvalidInput { field, .. }) => {
                assert_eq!(field, "project_life_years");
            }
            other => panic!("Expected InvalidInput, got {other:?}"),
        }
    }

    #[test]
    fn test_tax_rate_out_of_range_is_rejected() {
        let params = ProjectParameters {
            tax_rate: dec!(1.2),
            ..sample_params()
        };
        assert!(build_schedule(&params).is_err());
    }

    #[test]
    fn test_wacc_of_minus_one_is_rejected() {
        let params = ProjectParameters {
            wacc: dec!(-1),
            ..sample_params()
        };
        assert!(build_schedule(&params).is_err());
    }

    #[test]
    fn test_calculate_schedule_totals() {
        let output = calculate_schedule(&sample_params()).unwrap();
        assert_eq!(output.result.total_net_cash_flow, dec!(200_000));
        // Sum of discounted flows equals NPV at 10% (≈ -90,211.18)
        assert!(
            (output.result.total_discounted_cash_flow - dec!(-90_211.18)).abs() < dec!(0.01),
            "Discounted total: {}",
            output.result.total_discounted_cash_flow
        );
        assert!(output.warnings.is_empty());
    }

    #[test]
    fn test_positive_investment_warns() {
        let params = ProjectParameters {
            initial_investment: dec!(1_000_000),
            ..sample_params()
        };
        let output = calculate_schedule(&params).unwrap();
        assert!(output
            .warnings
            .iter()
            .any(|w| w.contains("Initial investment")));
    }

    #[test]
    fn test_discounted_total_overflow_is_an_error() {
        // 1 / (1 - 0.9) = 10 per year, so year 28 discounts 7.5 to 7.5e28
        let params = ProjectParameters {
            initial_investment: dec!(-1),
            project_life_years: 28,
            annual_revenue: dec!(7.5),
            annual_cost: Decimal::ZERO,
            wacc: dec!(-0.9),
            tax_rate: Decimal::ZERO,
        };
        match calculate_schedule(&params) {
            Err(AppraisalError::ArithmeticOverflow { context }) => {
                assert!(context.contains("total"), "context: {context}");
            }
            other => panic!("Expected ArithmeticOverflow, got {other:?}"),
        }
    }

    #[test]
    fn test_ebit_overflow_is_an_error() {
        let params = ProjectParameters {
            annual_revenue: dec!(70_000_000_000_000_000_000_000_000_000),
            annual_cost: dec!(-70_000_000_000_000_000_000_000_000_000),
            ..sample_params()
        };
        assert!(matches!(
            build_schedule(&params),
            Err(AppraisalError::ArithmeticOverflow { .. })
        ));
    }

    #[test]
    fn test_running_factor_matches_discount_factor() {
        let params = ProjectParameters {
            project_life_years: 40,
            ..sample_params()
        };
        let schedule = build_schedule(&params).unwrap();
        for period in &schedule {
            let expected = crate::time_value::discount_factor(params.wacc, period.year).unwrap();
            assert_eq!(period.discount_factor, expected);
        }
    }
}
