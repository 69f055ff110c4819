use tracing_subscriber::{fmt, EnvFilter};

use crate::cli::LogFormat;
use crate::error::CliError;

/// Installs the global subscriber on stderr; stdout carries only data.
///
/// `RUST_LOG` takes precedence over `default_level`.
pub fn init(default_level: &str, format: LogFormat) -> Result<(), CliError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .map_err(|error| CliError::Logging(error.to_string()))?;

    let builder = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    let installed = match format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    installed.map_err(|error| CliError::Logging(error.to_string()))
}
