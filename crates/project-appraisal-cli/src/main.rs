mod commands;
mod input;
mod output;

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use log::LevelFilter;
use std::process;

use commands::capital_budgeting::{AppraiseArgs, IrrArgs, NpvArgs, PaybackArgs, ScheduleArgs};
use commands::reporting::{NormalizeArgs, SnapshotArgs};

/// Business-plan appraisal: cash-flow schedules, NPV, IRR and payback
#[derive(Parser)]
#[command(
    name = "appraise",
    version,
    about = "Business-plan appraisal: cash-flow schedules, NPV, IRR and payback",
    long_about = "A CLI for appraising a business plan from six parameters \
                  (initial investment, project life, annual revenue, annual cost, \
                  WACC, tax rate) with decimal precision. Builds the year-by-year \
                  cash-flow schedule and computes NPV, IRR, payback and discounted payback."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Increase log verbosity (-v debug, -vv trace); RUST_LOG overrides
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Full appraisal: schedule plus NPV, IRR, payback and discounted payback
    Appraise(AppraiseArgs),
    /// Build the year-by-year cash-flow schedule
    Schedule(ScheduleArgs),
    /// Net present value of a cash-flow series
    Npv(NpvArgs),
    /// Internal rate of return by bisection
    Irr(IrrArgs),
    /// Payback and discounted payback periods
    Payback(PaybackArgs),
    /// Evaluation snapshot for a narrative report
    Snapshot(SnapshotArgs),
    /// Normalise an extraction-service record into validated parameters
    Normalize(NormalizeArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Appraise(args) => commands::capital_budgeting::run_appraise(args),
        Commands::Schedule(args) => commands::capital_budgeting::run_schedule(args),
        Commands::Npv(args) => commands::capital_budgeting::run_npv(args),
        Commands::Irr(args) => commands::capital_budgeting::run_irr(args),
        Commands::Payback(args) => commands::capital_budgeting::run_payback(args),
        Commands::Snapshot(args) => commands::reporting::run_snapshot(args),
        Commands::Normalize(args) => commands::reporting::run_normalize(args),
        Commands::Version => {
            println!("appraise {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            log::debug!("command failed: {e:?}");
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
