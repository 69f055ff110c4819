use std::process::ExitCode;
use std::time::Duration;

use gridtick_core::{AcquisitionConfig, EnergySource, FetchResult, HealthRecord};
use serde::Serialize;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use crate::cli::WatchArgs;
use crate::error::CliError;

use super::{build_orchestrator, build_request, print_json};

#[derive(Debug, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
enum WatchEvent<'a> {
    Batch { round: u64, result: &'a FetchResult },
    Health { record: &'a HealthRecord },
}

/// Runs until `--rounds` batches were printed or Ctrl-C is received.
pub async fn run(args: &WatchArgs, config: AcquisitionConfig) -> Result<ExitCode, CliError> {
    let sources = if args.sources.is_empty() {
        EnergySource::FUELS.to_vec()
    } else {
        args.sources.clone()
    };
    let request = build_request(&sources, args.deadline_ms)?;
    let orchestrator = build_orchestrator(config)?;

    let subscription = orchestrator.subscribe_health(|record| {
        if let Err(error) = print_json(&WatchEvent::Health { record: &record }, false) {
            warn!(action = "health", outcome = "print_failed", error = %error, "could not print health event");
        }
    });

    let mut ticker = tokio::time::interval(Duration::from_secs(args.interval_secs.max(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut round = 0;

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = tokio::signal::ctrl_c() => {
                info!(action = "fetch", outcome = "interrupted", rounds = round, "watch interrupted");
                break;
            }
        }

        round += 1;
        let purged = orchestrator.purge_expired().await;
        let result = orchestrator.fetch(&request).await?;
        print_json(&WatchEvent::Batch { round, result: &result }, false)?;
        info!(
            action = "fetch",
            outcome = "batch",
            round,
            purged,
            missing = result.missing().len(),
            "watch batch complete"
        );

        if args.rounds.is_some_and(|rounds| round >= rounds) {
            break;
        }
    }

    subscription.abort();
    Ok(ExitCode::SUCCESS)
}
