//! Error types for keyward-cli

use keyward_core::{ConfigError, Error as CoreError, ManifestError};

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

/// Errors that can occur in CLI operations
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Error from keyward-core
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Standard I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON rendering error
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// Interactive prompt error
    #[error("Interactive prompt error: {0}")]
    Dialoguer(#[from] dialoguer::Error),

    /// User-facing error with a message
    #[error("{message}")]
    User { message: String },

    /// The command already reported its outcome; only the exit code is left
    #[error("exit status {code}")]
    Exit { code: i32 },
}

impl CliError {
    /// Create a new user error with the given message
    pub fn user(message: impl Into<String>) -> Self {
        Self::User {
            message: message.into(),
        }
    }

    /// Process exit code: 2 for mistakes the user can fix, 1 for operational failures
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Exit { code } => *code,
            Self::User { .. } => 2,
            Self::Core(
                CoreError::Policy(_)
                | CoreError::KeyExists { .. }
                | CoreError::KeyNotFound { .. }
                | CoreError::InvalidRequest { .. }
                | CoreError::Config(_),
            ) => 2,
            Self::Core(_) | Self::Io(_) | Self::Json(_) | Self::Dialoguer(_) => 1,
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        Self::Core(e.into())
    }
}

impl From<ManifestError> for CliError {
    fn from(e: ManifestError) -> Self {
        Self::Core(e.into())
    }
}
