use linkshard_core::{CodecError, StorageError};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, EngineError>;

#[derive(Debug, Clone, Error)]
pub enum EngineError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("malformed short code: {0}")]
    MalformedCode(String),
    #[error("invalid selector: {0:?}")]
    InvalidSelector(char),
    #[error("no unique short code found after {attempts} attempts")]
    CodeSpaceExhausted { attempts: usize },
    #[error("short code not found: {0}")]
    NotFound(String),
    #[error("short code has expired: {0}")]
    Expired(String),
    #[error("no partitions available")]
    NoPartitionsAvailable,
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),
}

impl EngineError {
    /// Whether the caller may retry the whole operation.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::CodeSpaceExhausted { .. } | Self::StorageUnavailable(_)
        )
    }
}

impl From<CodecError> for EngineError {
    fn from(value: CodecError) -> Self {
        match value {
            CodecError::MalformedCode(message) => Self::MalformedCode(message),
            CodecError::InvalidSelector(c) => Self::InvalidSelector(c),
        }
    }
}

impl From<StorageError> for EngineError {
    fn from(value: StorageError) -> Self {
        match value {
            StorageError::NoPartitionsAvailable => Self::NoPartitionsAvailable,
            other => Self::StorageUnavailable(other.to_string()),
        }
    }
}
