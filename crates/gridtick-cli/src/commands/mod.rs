mod fetch;
mod policies;
mod watch;

use std::io::Write;
use std::process::ExitCode;
use std::time::Duration;

use gridtick_core::{AcquisitionConfig, EnergySource, FetchOrchestrator, FetchRequest};
use serde::Serialize;

use crate::cli::{Cli, Command};
use crate::error::CliError;

pub async fn run(cli: &Cli) -> Result<ExitCode, CliError> {
    let config = load_config(cli)?;

    match &cli.command {
        Command::Fetch(args) => fetch::run(args, config).await,
        Command::Watch(args) => watch::run(args, config).await,
        Command::Policies(args) => policies::run(args, &config),
    }
}

/// File settings (if any) with environment variables layered on top.
fn load_config(cli: &Cli) -> Result<AcquisitionConfig, CliError> {
    let config = match &cli.config {
        Some(path) => AcquisitionConfig::from_json_file(path)?.with_env_overrides(),
        None => AcquisitionConfig::from_env(),
    };
    Ok(config)
}

fn build_orchestrator(config: AcquisitionConfig) -> Result<FetchOrchestrator, CliError> {
    if config.api_key.is_none() {
        return Err(CliError::MissingApiKey);
    }
    Ok(FetchOrchestrator::builder().with_config(config).build()?)
}

fn build_request(
    sources: &[EnergySource],
    deadline_ms: Option<u64>,
) -> Result<FetchRequest, CliError> {
    let request = FetchRequest::new(sources.iter().copied())?;
    Ok(match deadline_ms {
        Some(deadline_ms) => request.with_deadline(Duration::from_millis(deadline_ms)),
        None => request,
    })
}

fn print_json<T: Serialize>(value: &T, pretty: bool) -> Result<(), CliError> {
    let mut stdout = std::io::stdout().lock();
    if pretty {
        serde_json::to_writer_pretty(&mut stdout, value)?;
    } else {
        serde_json::to_writer(&mut stdout, value)?;
    }
    writeln!(stdout)?;
    stdout.flush()?;
    Ok(())
}
