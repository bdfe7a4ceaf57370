//! Error types for scribe-core

use thiserror::Error;

/// Result type alias using scribe-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in scribe-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Record or object does not exist, or is hidden from the caller
    #[error("Not found: {0}")]
    NotFound(String),

    /// Caller is not the owner of the record or object
    #[error("Access denied: {0}")]
    AccessDenied(String),

    /// Bad file type/size or empty required field
    #[error("{0}")]
    Validation(String),

    /// Network or remote service failure
    #[error("Request failed: {0}")]
    Transport(String),

    /// Some files of a batch failed while others succeeded
    #[error("{} of {} files failed: {}", failed.len(), failed.len() + succeeded, failed.join(", "))]
    PartialBatchFailure {
        /// Display names of the files that failed.
        failed: Vec<String>,
        /// Number of files that went through.
        succeeded: usize,
    },

    /// Object name already taken in storage
    #[error("Already exists: {0}")]
    Conflict(String),

    /// Operation not allowed in the current editing state
    #[error("Cannot {action} while the note is {state}")]
    InvalidTransition {
        action: &'static str,
        state: &'static str,
    },

    /// Missing or malformed client configuration
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Signed-in session could not be read from or written to its store
    #[error("Credential storage error: {0}")]
    Credentials(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Coarse error category surfaced to user interfaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    AccessDenied,
    Validation,
    Transport,
    PartialBatchFailure,
    Conflict,
    Internal,
}

impl Error {
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::AccessDenied(_) => ErrorKind::AccessDenied,
            Self::Validation(_) => ErrorKind::Validation,
            Self::Transport(_) => ErrorKind::Transport,
            Self::PartialBatchFailure { .. } => ErrorKind::PartialBatchFailure,
            Self::Conflict(_) => ErrorKind::Conflict,
            Self::InvalidTransition { .. }
            | Self::Configuration(_)
            | Self::Credentials(_)
            | Self::Io(_)
            | Self::Serialization(_) => ErrorKind::Internal,
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(error: reqwest::Error) -> Self {
        Self::Transport(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_batch_failure_names_failed_files() {
        let error = Error::PartialBatchFailure {
            failed: vec!["slides.pptx".to_string(), "clip.mp4".to_string()],
            succeeded: 3,
        };
        assert_eq!(
            error.to_string(),
            "2 of 5 files failed: slides.pptx, clip.mp4"
        );
        assert_eq!(error.kind(), ErrorKind::PartialBatchFailure);
    }

    #[test]
    fn invalid_transition_is_internal() {
        let error = Error::InvalidTransition {
            action: "save",
            state: "deleted",
        };
        assert_eq!(error.to_string(), "Cannot save while the note is deleted");
        assert_eq!(error.kind(), ErrorKind::Internal);
    }
}
