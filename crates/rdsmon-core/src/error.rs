//! Errors returned by inventory and log providers.

use thiserror::Error;

/// Result type alias for provider calls.
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Errors a provider call can fail with.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProviderError {
    /// The queried resource (log group, stream) does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The provider rejected the call because of rate limiting.
    #[error("throttled: {0}")]
    Throttled(String),

    #[error("request failed: {0}")]
    Request(String),
}

impl ProviderError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ProviderError::NotFound(_))
    }
}
