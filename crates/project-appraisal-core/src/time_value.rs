use log::{debug, warn};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::AppraisalError;
use crate::types::{Money, Rate};
use crate::AppraisalResult;

const DEFAULT_IRR_TOLERANCE: Decimal = dec!(0.0001);
const DEFAULT_IRR_ITERATIONS: u32 = 100;
const DEFAULT_BRACKET_EXPANSIONS: u32 = 16;

/// Search settings for the bisection IRR solver.
///
/// The bracket starts at `[lower, upper]`. While NPV is still positive at
/// `upper` the bracket is shifted up and the upper bound doubled, at most
/// `max_expansions` times.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BisectionConfig {
    /// Lowest rate searched; also the rate used for the break-even test
    pub lower: Rate,
    /// Initial upper bound of the bracket
    pub upper: Rate,
    /// Absolute NPV below which a midpoint is accepted as the IRR
    pub tolerance: Decimal,
    /// Bisection steps before giving up and returning the lower bound
    pub max_iterations: u32,
    /// Upper-bound doublings allowed when the bracket holds no sign change
    pub max_expansions: u32,
}

impl Default for BisectionConfig {
    fn default() -> Self {
        Self {
            lower: Decimal::ZERO,
            upper: Decimal::ONE,
            tolerance: DEFAULT_IRR_TOLERANCE,
            max_iterations: DEFAULT_IRR_ITERATIONS,
            max_expansions: DEFAULT_BRACKET_EXPANSIONS,
        }
    }
}

impl BisectionConfig {
    pub fn validate(&self) -> AppraisalResult<()> {
        if self.lower <= dec!(-1) {
            return Err(AppraisalError::InvalidInput {
                field: "solver.lower".into(),
                reason: "Lower bound must be greater than -100%".into(),
            });
        }
        if self.upper <= self.lower {
            return Err(AppraisalError::InvalidInput {
                field: "solver.upper".into(),
                reason: format!(
                    "Upper bound ({}) must exceed lower bound ({})",
                    self.upper, self.lower
                ),
            });
        }
        if self.tolerance <= Decimal::ZERO {
            return Err(AppraisalError::InvalidInput {
                field: "solver.tolerance".into(),
                reason: "Tolerance must be positive".into(),
            });
        }
        if self.max_iterations == 0 {
            return Err(AppraisalError::InvalidInput {
                field: "solver.max_iterations".into(),
                reason: "At least one iteration is required".into(),
            });
        }
        Ok(())
    }
}

/// Result of an IRR search, including the degenerate cash-flow shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum IrrOutcome {
    /// A rate where NPV is within tolerance of zero (or the last lower bound)
    Converged { rate: Rate },
    /// Empty series or no outflow at period 0
    NoInitialOutflow,
    /// NPV is already negative at the lowest searched rate
    NeverBreaksEven,
}

impl IrrOutcome {
    /// Numeric IRR with sentinels: 0 for no initial outflow, -1 when the
    /// project never breaks even.
    pub fn value(&self) -> Rate {
        match self {
            IrrOutcome::Converged { rate } => *rate,
            IrrOutcome::NoInitialOutflow => Decimal::ZERO,
            IrrOutcome::NeverBreaksEven => dec!(-1),
        }
    }

    pub fn is_converged(&self) -> bool {
        matches!(self, IrrOutcome::Converged { .. })
    }
}

/// Discount factor 1 / (1 + rate)^period.
pub fn discount_factor(rate: Rate, period: u32) -> AppraisalResult<Decimal> {
    let per_period = per_period_factor(rate)?;
    let mut factor = Decimal::ONE;
    for _ in 0..period {
        factor = factor
            .checked_mul(per_period)
            .ok_or_else(|| AppraisalError::ArithmeticOverflow {
                context: format!("discount factor at period {period} (rate {rate})"),
            })?;
    }
    Ok(factor)
}

/// Net Present Value of a series of cash flows
pub fn npv(rate: Rate, cash_flows: &[Money]) -> AppraisalResult<Money> {
    let per_period = per_period_factor(rate)?;

    let mut result = Decimal::ZERO;
    let mut factor = Decimal::ONE;

    for (t, cf) in cash_flows.iter().enumerate() {
        if t > 0 {
            factor = factor
                .checked_mul(per_period)
                .ok_or_else(|| AppraisalError::ArithmeticOverflow {
                    context: format!("NPV discount factor at period {t}"),
                })?;
        }
        let pv = cf
            .checked_mul(factor)
            .ok_or_else(|| AppraisalError::ArithmeticOverflow {
                context: format!("NPV present value at period {t}"),
            })?;
        result = result
            .checked_add(pv)
            .ok_or_else(|| AppraisalError::ArithmeticOverflow {
                context: "NPV accumulation".into(),
            })?;
    }

    Ok(result)
}

/// Internal Rate of Return by bisection with the default search settings.
///
/// Returns 0 when there is no initial outflow and -1 when the project does
/// not break even at a 0% rate.
pub fn irr(cash_flows: &[Money]) -> AppraisalResult<Rate> {
    solve_irr(cash_flows, &BisectionConfig::default()).map(|outcome| outcome.value())
}

/// Internal Rate of Return by bisection over an expanding bracket.
///
/// Only one root is searched for; series with several sign changes may
/// report any of their roots.
pub fn solve_irr(cash_flows: &[Money], config: &BisectionConfig) -> AppraisalResult<IrrOutcome> {
    config.validate()?;

    match cash_flows.first() {
        Some(first) if *first < Decimal::ZERO => {}
        _ => return Ok(IrrOutcome::NoInitialOutflow),
    }

    let mut low = config.lower;
    let npv_low = npv(low, cash_flows)?;
    if npv_low < Decimal::ZERO {
        return Ok(IrrOutcome::NeverBreaksEven);
    }
    if npv_low.abs() < config.tolerance {
        return Ok(IrrOutcome::Converged { rate: low });
    }

    let mut high = config.upper;
    let mut npv_high = npv(high, cash_flows)?;
    let mut expansions = 0;

    // No sign change yet: NPV is still positive at `high`, so it becomes the
    // new lower bound.
    while npv_high > Decimal::ZERO {
        if expansions >= config.max_expansions {
            return Err(AppraisalError::ConvergenceFailure {
                function: "IRR bracket expansion".into(),
                iterations: expansions,
                last_delta: npv_high,
            });
        }
        low = high;
        high = if high > Decimal::ZERO {
            high.checked_mul(Decimal::TWO)
                .ok_or_else(|| AppraisalError::ArithmeticOverflow {
                    context: "IRR bracket expansion".into(),
                })?
        } else {
            Decimal::ONE
        };
        expansions += 1;
        npv_high = npv(high, cash_flows)?;
        debug!("IRR bracket expanded to [{low}, {high}] (NPV at upper bound: {npv_high})");
    }

    for i in 0..config.max_iterations {
        let mid = (low + high) / Decimal::TWO;
        let value = npv(mid, cash_flows)?;

        if value.abs() < config.tolerance {
            debug!("IRR converged to {mid} after {} iterations", i + 1);
            return Ok(IrrOutcome::Converged { rate: mid });
        }

        if value > Decimal::ZERO {
            low = mid;
        } else {
            high = mid;
        }
    }

    warn!(
        "IRR bisection reached {} iterations without NPV tolerance {}; returning lower bound {low}",
        config.max_iterations, config.tolerance
    );
    Ok(IrrOutcome::Converged { rate: low })
}

/// One-period discount factor 1 / (1 + rate).
pub(crate) fn per_period_factor(rate: Rate) -> AppraisalResult<Decimal> {
    if rate <= dec!(-1) {
        return Err(AppraisalError::InvalidInput {
            field: "rate".into(),
            reason: "Discount rate must be greater than -100%".into(),
        });
    }
    Decimal::ONE
        .checked_div(Decimal::ONE + rate)
        .ok_or_else(|| AppraisalError::ArithmeticOverflow {
            context: format!("per-period discount factor (rate {rate})"),
        })
}
