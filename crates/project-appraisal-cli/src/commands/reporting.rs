use clap::Args;
use serde_json::Value;

use project_appraisal_core::reporting::extraction::{self, ExtractedParameters};
use project_appraisal_core::reporting::snapshot;

use crate::commands::capital_budgeting::{resolve_appraisal_input, ParameterArgs};
use crate::input;

/// Arguments for the evaluation snapshot
#[derive(Args)]
pub struct SnapshotArgs {
    #[command(flatten)]
    pub params: ParameterArgs,
}

/// Arguments for normalising an extraction record
#[derive(Args)]
pub struct NormalizeArgs {
    /// Path to the extraction record (JSON or YAML); read from stdin if omitted
    #[arg(long)]
    pub input: Option<String>,
}

pub fn run_snapshot(args: SnapshotArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let appraisal_input = resolve_appraisal_input(args.params)?;
    let result = snapshot::evaluation_snapshot(&appraisal_input)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_normalize(args: NormalizeArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let record: ExtractedParameters = if let Some(ref path) = args.input {
        input::file::read_input(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        serde_json::from_value(data)?
    } else {
        return Err("an extraction record is required (provide --input or pipe it on stdin)".into());
    };

    let result = extraction::normalize_extracted(&record)?;
    Ok(serde_json::to_value(result)?)
}
