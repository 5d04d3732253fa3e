// wright-core/src/error.rs

use crate::domain::error::DomainError;
use crate::infrastructure::error::InfrastructureError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WrightError {
    // --- DOMAIN ERRORS (config rules, generation, diff) ---
    #[error(transparent)]
    Domain(#[from] DomainError),

    // --- INFRASTRUCTURE ERRORS (IO, parsing, remote queries) ---
    #[error(transparent)]
    Infrastructure(#[from] InfrastructureError),

    // --- GENERIC / APPLICATION ERRORS ---
    #[error("Internal Error: {0}")]
    InternalError(String),

    #[error("Unsafe path traversal detected: {0}")]
    UnsafePath(String),
}

impl WrightError {
    /// True for failures a caller may retry with its own backoff policy.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            WrightError::Infrastructure(InfrastructureError::RemoteQuery { .. })
        )
    }
}

// Manual implementation to avoid duplicate enum variant but keep ergonomics
impl From<std::io::Error> for WrightError {
    fn from(err: std::io::Error) -> Self {
        WrightError::Infrastructure(InfrastructureError::Io(err))
    }
}
