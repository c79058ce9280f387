use scoring_core::ScoringError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl ProviderError {
    /// Attribute the failure to a named provider slot.
    pub fn for_provider(self, provider: &str) -> ScoringError {
        ScoringError::provider(provider, self.to_string())
    }
}

pub type ProviderResult<T> = Result<T, ProviderError>;
