use brokerflow_core::{ConfigError, CoreError};
use thiserror::Error;

/// CLI-level error categories mapped to exit codes.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("command error: {0}")]
    Command(String),

    #[error("strict mode failed: skipped={skipped_count}")]
    StrictModeViolation { skipped_count: usize },

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Core(error) if error.is_input_error() => 2,
            Self::Config(_) | Self::Command(_) => 2,
            Self::StrictModeViolation { .. } => 5,
            Self::Core(_) | Self::Serialization(_) | Self::Io(_) => 10,
        }
    }
}
