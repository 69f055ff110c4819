use thiserror::Error;

/// CLI-level error categories mapped to exit codes.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Validation(#[from] gridtick_core::ValidationError),

    #[error(transparent)]
    Core(#[from] gridtick_core::CoreError),

    #[error("no EIA api key configured; set GRIDTICK_EIA_API_KEY or ENERGY_API_KEY")]
    MissingApiKey,

    #[error("logging setup failed: {0}")]
    Logging(String),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Validation(_) => 2,
            Self::Core(_) => 2,
            Self::MissingApiKey => 2,
            Self::Logging(_) => 1,
            Self::Serialization(_) => 4,
            Self::Io(_) => 10,
        }
    }
}
