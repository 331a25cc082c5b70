use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Instant;

use crate::error::AppraisalError;
use crate::time_value::per_period_factor;
use crate::types::{with_metadata, ComputationOutput, Money, Rate, Years};
use crate::AppraisalResult;

/// Time needed to recover the initial investment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Payback {
    /// Cumulative cash flow turns non-negative after `years` (fractional)
    Recovered { years: Years },
    /// Cumulative cash flow stays negative for the whole project life
    NotRecovered,
}

impl Payback {
    pub fn years(&self) -> Option<Years> {
        match self {
            Payback::Recovered { years } => Some(*years),
            Payback::NotRecovered => None,
        }
    }

    pub fn is_recovered(&self) -> bool {
        matches!(self, Payback::Recovered { .. })
    }
}

impl fmt::Display for Payback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Payback::Recovered { years } => write!(f, "{} years", years.round_dp(2)),
            Payback::NotRecovered => write!(f, "not recovered within project life"),
        }
    }
}

/// Input for a standalone payback calculation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaybackInput {
    /// Amount to recover; the sign is ignored
    pub initial_investment: Money,
    /// Net cash flows for years 1..N
    pub operating_cash_flows: Vec<Money>,
    /// Discount rate for the discounted payback
    pub wacc: Rate,
}

/// Undiscounted and discounted payback for one cash-flow series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaybackPeriods {
    pub payback_period: Payback,
    pub discounted_payback_period: Payback,
}

/// Running cumulative that records the first zero crossing.
struct CrossingTracker {
    cumulative: Money,
    recorded: Option<Years>,
}

impl CrossingTracker {
    fn new(magnitude: Money) -> Self {
        Self {
            cumulative: -magnitude,
            recorded: None,
        }
    }

    /// `flow` is the cash flow of operating year `year` (1-based).
    fn observe(&mut self, year: u32, flow: Money) -> AppraisalResult<()> {
        if self.recorded.is_some() {
            return Ok(());
        }
        let next = self
            .cumulative
            .checked_add(flow)
            .ok_or_else(|| AppraisalError::ArithmeticOverflow {
                context: format!("cumulative payback cash flow in year {year}"),
            })?;
        if next >= Decimal::ZERO {
            // cumulative < 0 here, so flow > 0 and the fraction is at most 1
            let fraction = self.cumulative.abs() / flow;
            self.recorded = Some(Decimal::from(year - 1) + fraction);
        } else {
            self.cumulative = next;
        }
        Ok(())
    }

    fn finish(self) -> Payback {
        match self.recorded {
            Some(years) => Payback::Recovered { years },
            None => Payback::NotRecovered,
        }
    }
}

/// Payback and discounted payback with fractional-year interpolation inside
/// the crossing year.
///
/// `operating_cash_flows[0]` is year 1. A zero investment is recovered at
/// year 0.
pub fn payback_periods(
    initial_investment_magnitude: Money,
    operating_cash_flows: &[Money],
    wacc: Rate,
) -> AppraisalResult<PaybackPeriods> {
    if initial_investment_magnitude < Decimal::ZERO {
        return Err(AppraisalError::InvalidInput {
            field: "initial_investment_magnitude".into(),
            reason: "Investment magnitude cannot be negative".into(),
        });
    }
    if wacc <= dec!(-1) {
        return Err(AppraisalError::InvalidInput {
            field: "wacc".into(),
            reason: "Discount rate must be greater than -100%".into(),
        });
    }

    if initial_investment_magnitude.is_zero() {
        let immediate = Payback::Recovered {
            years: Decimal::ZERO,
        };
        return Ok(PaybackPeriods {
            payback_period: immediate,
            discounted_payback_period: immediate,
        });
    }

    let mut simple = CrossingTracker::new(initial_investment_magnitude);
    let mut discounted = CrossingTracker::new(initial_investment_magnitude);

    let per_period = per_period_factor(wacc)?;
    let mut factor = Decimal::ONE;

    for (i, flow) in operating_cash_flows.iter().enumerate() {
        let year = i as u32 + 1;
        simple.observe(year, *flow)?;

        factor = factor
            .checked_mul(per_period)
            .ok_or_else(|| AppraisalError::ArithmeticOverflow {
                context: format!("discount factor in year {year}"),
            })?;
        let discounted_flow =
            flow.checked_mul(factor)
                .ok_or_else(|| AppraisalError::ArithmeticOverflow {
                    context: format!("discounted payback flow in year {year}"),
                })?;
        discounted.observe(year, discounted_flow)?;
    }

    Ok(PaybackPeriods {
        payback_period: simple.finish(),
        discounted_payback_period: discounted.finish(),
    })
}

/// Payback calculation wrapped with warnings and metadata.
pub fn calculate_payback(input: &PaybackInput) -> AppraisalResult<ComputationOutput<PaybackPeriods>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let output = payback_periods(
        input.initial_investment.abs(),
        &input.operating_cash_flows,
        input.wacc,
    )?;

    if !output.payback_period.is_recovered() {
        warnings.push(format!(
            "Investment is not recovered within {} operating years",
            input.operating_cash_flows.len()
        ));
    } else if !output.discounted_payback_period.is_recovered() {
        warnings.push(format!(
            "Investment is not recovered on a discounted basis at {}",
            input.wacc
        ));
    }

    let elapsed = start.elapsed().as_micros() as u64;

    Ok(with_metadata(
        "Payback and discounted payback with in-year interpolation",
        input,
        warnings,
        elapsed,
        output,
    ))
}
