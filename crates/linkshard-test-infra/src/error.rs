use thiserror::Error;

#[derive(Debug, Error)]
pub enum TestInfraError {
    #[error("container error: {0}")]
    Container(#[from] testcontainers::TestcontainersError),
    /// Partition databases exist only for the selector alphabet `[0-9a-z]`.
    #[error("no partition database for selector {0:?}")]
    InvalidSelector(char),
}

pub type Result<T> = std::result::Result<T, TestInfraError>;
