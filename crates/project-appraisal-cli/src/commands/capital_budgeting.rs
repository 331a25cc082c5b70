use clap::Args;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::Value;

use project_appraisal_core::capital_budgeting::appraisal::{self, AppraisalInput};
use project_appraisal_core::capital_budgeting::metrics::{self, IrrInput, NpvInput};
use project_appraisal_core::capital_budgeting::payback::{self, PaybackInput};
use project_appraisal_core::capital_budgeting::schedule::{self, ProjectParameters};
use project_appraisal_core::time_value::BisectionConfig;

use crate::input;

/// The six project parameters, shared by every command that appraises a plan
#[derive(Args)]
pub struct ParameterArgs {
    /// Path to a JSON or YAML input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Capital outlay at year 0, negative for an outflow (e.g. -1000000)
    #[arg(long, allow_hyphen_values = true)]
    pub initial_investment: Option<Decimal>,

    /// Project life in operating years
    #[arg(long, alias = "years")]
    pub project_life_years: Option<u32>,

    /// Revenue in every operating year
    #[arg(long, allow_hyphen_values = true)]
    pub annual_revenue: Option<Decimal>,

    /// Operating cost in every operating year
    #[arg(long, allow_hyphen_values = true)]
    pub annual_cost: Option<Decimal>,

    /// Discount rate (e.g. 0.10 for 10%)
    #[arg(long, alias = "discount-rate")]
    pub wacc: Option<Decimal>,

    /// Corporate tax rate (e.g. 0.20 for 20%); defaults to 0
    #[arg(long)]
    pub tax_rate: Option<Decimal>,
}

/// Arguments for a full appraisal
#[derive(Args)]
pub struct AppraiseArgs {
    #[command(flatten)]
    pub params: ParameterArgs,
}

/// Arguments for the cash-flow schedule
#[derive(Args)]
pub struct ScheduleArgs {
    #[command(flatten)]
    pub params: ParameterArgs,
}

/// Arguments for NPV
#[derive(Args)]
pub struct NpvArgs {
    /// Path to a JSON or YAML input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Discount rate per period
    #[arg(long, allow_hyphen_values = true)]
    pub rate: Option<Decimal>,

    /// Cash flows from period 0 (comma-separated, e.g. "-1000,300,400,500")
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    pub cash_flows: Option<Vec<Decimal>>,
}

/// Arguments for IRR
#[derive(Args)]
pub struct IrrArgs {
    /// Path to a JSON or YAML input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Cash flows from period 0 (comma-separated, e.g. "-1000,400,400,400")
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    pub cash_flows: Option<Vec<Decimal>>,

    /// Lower bound of the search bracket
    #[arg(long, allow_hyphen_values = true)]
    pub lower: Option<Decimal>,

    /// Initial upper bound of the search bracket
    #[arg(long)]
    pub upper: Option<Decimal>,

    /// NPV tolerance for convergence
    #[arg(long)]
    pub tolerance: Option<Decimal>,

    /// Maximum bisection iterations
    #[arg(long)]
    pub max_iterations: Option<u32>,

    /// Maximum upper-bound doublings
    #[arg(long)]
    pub max_expansions: Option<u32>,
}

/// Arguments for payback periods
#[derive(Args)]
#[command(allow_hyphen_values = true)]
pub struct PaybackArgs {
    /// Path to a JSON or YAML input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Initial investment (sign ignored)
    #[arg(long)]
    pub initial_investment: Option<Decimal>,

    /// Operating cash flows for years 1..N (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub cash_flows: Option<Vec<Decimal>>,

    /// Discount rate for the discounted payback
    #[arg(long)]
    pub wacc: Option<Decimal>,
}

/// Accepts either `{"parameters": {...}, "solver": {...}}` or a bare
/// parameter object.
fn appraisal_input_from_value(value: Value) -> Result<AppraisalInput, Box<dyn std::error::Error>> {
    if value.get("parameters").is_some() {
        Ok(serde_json::from_value(value)?)
    } else {
        let params: ProjectParameters = serde_json::from_value(value)?;
        Ok(AppraisalInput::from(params))
    }
}

pub(crate) fn resolve_appraisal_input(
    args: ParameterArgs,
) -> Result<AppraisalInput, Box<dyn std::error::Error>> {
    if let Some(ref path) = args.input {
        appraisal_input_from_value(input::file::read_input_value(path)?)
    } else if let Some(data) = input::stdin::read_stdin()? {
        appraisal_input_from_value(data)
    } else {
        Ok(AppraisalInput::from(ProjectParameters {
            initial_investment: args
                .initial_investment
                .ok_or("--initial-investment is required (or provide --input)")?,
            project_life_years: args
                .project_life_years
                .ok_or("--project-life-years is required (or provide --input)")?,
            annual_revenue: args
                .annual_revenue
                .ok_or("--annual-revenue is required (or provide --input)")?,
            annual_cost: args
                .annual_cost
                .ok_or("--annual-cost is required (or provide --input)")?,
            wacc: args.wacc.ok_or("--wacc is required (or provide --input)")?,
            tax_rate: args.tax_rate.unwrap_or(dec!(0)),
        }))
    }
}

pub fn run_appraise(args: AppraiseArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let appraisal_input = resolve_appraisal_input(args.params)?;
    let result = appraisal::appraise_project(&appraisal_input)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_schedule(args: ScheduleArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let appraisal_input = resolve_appraisal_input(args.params)?;
    let result = schedule::calculate_schedule(&appraisal_input.parameters)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_npv(args: NpvArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let npv_input: NpvInput = if let Some(ref path) = args.input {
        input::file::read_input(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        serde_json::from_value(data)?
    } else {
        NpvInput {
            rate: args.rate.ok_or("--rate is required (or provide --input)")?,
            cash_flows: args
                .cash_flows
                .ok_or("--cash-flows is required (or provide --input)")?,
        }
    };

    let result = metrics::calculate_npv(&npv_input)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_irr(args: IrrArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let irr_input: IrrInput = if let Some(ref path) = args.input {
        input::file::read_input(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        serde_json::from_value(data)?
    } else {
        let defaults = BisectionConfig::default();
        IrrInput {
            cash_flows: args
                .cash_flows
                .ok_or("--cash-flows is required (or provide --input)")?,
            solver: BisectionConfig {
                lower: args.lower.unwrap_or(defaults.lower),
                upper: args.upper.unwrap_or(defaults.upper),
                tolerance: args.tolerance.unwrap_or(defaults.tolerance),
                max_iterations: args.max_iterations.unwrap_or(defaults.max_iterations),
                max_expansions: args.max_expansions.unwrap_or(defaults.max_expansions),
            },
        }
    };

    let result = metrics::calculate_irr(&irr_input)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_payback(args: PaybackArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let payback_input: PaybackInput = if let Some(ref path) = args.input {
        input::file::read_input(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        serde_json::from_value(data)?
    } else {
        PaybackInput {
            initial_investment: args
                .initial_investment
                .ok_or("--initial-investment is required (or provide --input)")?,
            operating_cash_flows: args
                .cash_flows
                .ok_or("--cash-flows is required (or provide --input)")?,
            wacc: args.wacc.unwrap_or(Decimal::ZERO),
        }
    };

    let result = payback::calculate_payback(&payback_input)?;
    Ok(serde_json::to_value(result)?)
}
