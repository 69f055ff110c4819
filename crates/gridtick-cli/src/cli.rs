//! CLI argument definitions for gridtick.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `fetch` | Fetch one batch of readings and print it as JSON |
//! | `watch` | Refresh periodically, printing each batch and health change as NDJSON |
//! | `policies` | Print the effective per-source policy table |
//!
//! # Global Options
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `--config` | none | JSON config file layered under the environment |
//! | `--log-level` | `warn` | Log filter when `RUST_LOG` is unset |
//! | `--log-format` | `text` | Log format on stderr (text, json) |
//!
//! # Examples
//!
//! ```bash
//! GRIDTICK_EIA_API_KEY=... gridtick fetch solar wind coal --pretty --summary
//! gridtick watch --interval-secs 300 --rounds 12
//! gridtick policies --config gridtick.json
//! ```

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use gridtick_core::EnergySource;

/// Resilient electricity-generation data acquisition
#[derive(Debug, Parser)]
#[command(
    name = "gridtick",
    author,
    version,
    about = "Resilient electricity-generation data acquisition",
    long_about = "gridtick fetches hourly generation data per energy source with caching, \
bounded retries, last-known-good fallback and per-source health tracking.\n\
\n\
The EIA api key is read from GRIDTICK_EIA_API_KEY (or ENERGY_API_KEY)."
)]
pub struct Cli {
    /// JSON configuration file; environment variables override it.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log filter used when RUST_LOG is unset.
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: String,

    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fetch one batch of readings.
    Fetch(FetchArgs),
    /// Periodically refresh readings.
    Watch(WatchArgs),
    /// Print the effective policy table.
    Policies(PoliciesArgs),
}

#[derive(Debug, Args)]
pub struct FetchArgs {
    /// Sources to fetch (solar, wind, coal, natural_gas, ai_analysis).
    #[arg(required = true, value_parser = parse_source)]
    pub sources: Vec<EnergySource>,

    /// Overall deadline for the batch in milliseconds.
    #[arg(long)]
    pub deadline_ms: Option<u64>,

    #[arg(long, default_value_t = false)]
    pub pretty: bool,

    /// Append the hourly generation summary.
    #[arg(long, default_value_t = false)]
    pub summary: bool,
}

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Sources to watch; defaults to every fuel source.
    #[arg(value_parser = parse_source)]
    pub sources: Vec<EnergySource>,

    #[arg(long, default_value_t = 300)]
    pub interval_secs: u64,

    /// Stop after this many batches.
    #[arg(long)]
    pub rounds: Option<u64>,

    /// Overall deadline per batch in milliseconds.
    #[arg(long)]
    pub deadline_ms: Option<u64>,
}

#[derive(Debug, Args)]
pub struct PoliciesArgs {
    #[arg(long, default_value_t = false)]
    pub pretty: bool,
}

fn parse_source(raw: &str) -> Result<EnergySource, String> {
    raw.parse().map_err(|error: gridtick_core::ValidationError| error.to_string())
}
