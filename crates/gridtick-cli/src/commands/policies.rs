use std::process::ExitCode;

use gridtick_core::{AcquisitionConfig, PolicyTable};
use serde::Serialize;

use crate::cli::PoliciesArgs;
use crate::error::CliError;

use super::print_json;

#[derive(Debug, Serialize)]
struct PolicyReport<'a> {
    policies: &'a PolicyTable,
    cache_capacity: usize,
    fallback_ttl_ms: u64,
    down_threshold: u32,
    api_key_configured: bool,
}

impl<'a> PolicyReport<'a> {
    fn from_config(config: &'a AcquisitionConfig) -> Self {
        Self {
            policies: &config.policies,
            cache_capacity: config.cache_capacity,
            fallback_ttl_ms: gridtick_core::domain::duration_ms::as_millis(config.fallback_ttl),
            down_threshold: config.down_threshold,
            api_key_configured: config.api_key.is_some(),
        }
    }
}

pub fn run(args: &PoliciesArgs, config: &AcquisitionConfig) -> Result<ExitCode, CliError> {
    print_json(&PolicyReport::from_config(config), args.pretty)?;
    Ok(ExitCode::SUCCESS)
}
