use std::path::PathBuf;

use thiserror::Error;

/// Validation errors for domain values exposed by `brokerflow-core`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("invalid calendar date {year:04}-{month:02}-{day:02}")]
    InvalidCalendarDate { year: i32, month: u8, day: u8 },
}

/// Errors raised while loading a [`crate::FlowConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config '{}': {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("config must name at least one institutional broker")]
    EmptyInstitutionalSet,
}

/// Errors raised while walking the snapshot directory tree.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("base directory not found: {}", path.display())]
    MissingBaseDir { path: PathBuf },

    #[error("not a directory: {}", path.display())]
    NotADirectory { path: PathBuf },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Top-level error type for core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Discovery(#[from] DiscoveryError),
}

impl CoreError {
    /// Whether the error was caused by caller input rather than a runtime failure.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Self::Config(_)
                | Self::Discovery(DiscoveryError::MissingBaseDir { .. })
                | Self::Discovery(DiscoveryError::NotADirectory { .. })
        )
    }
}
