use std::process::ExitCode;

use gridtick_core::{AcquisitionConfig, FetchResult, GenerationSummary};
use serde::Serialize;

use crate::cli::FetchArgs;
use crate::error::CliError;

use super::{build_orchestrator, build_request, print_json};

#[derive(Debug, Serialize)]
struct FetchOutput<'a> {
    #[serde(flatten)]
    result: &'a FetchResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<GenerationSummary>,
}

/// Exit code 3 signals at least one Missing source.
pub async fn run(args: &FetchArgs, config: AcquisitionConfig) -> Result<ExitCode, CliError> {
    let request = build_request(&args.sources, args.deadline_ms)?;
    let orchestrator = build_orchestrator(config)?;

    let result = orchestrator.fetch(&request).await?;
    let output = FetchOutput {
        result: &result,
        summary: args.summary.then(|| GenerationSummary::from_result(&result)),
    };
    print_json(&output, args.pretty)?;

    if result.missing().is_empty() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::from(3))
    }
}
