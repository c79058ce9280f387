use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScoringError {
    /// Malformed request shape. Surfaced to the caller as a client error.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A sub-score or evidence provider failed. The whole request fails with it.
    #[error("Provider error ({provider}): {message}")]
    Provider { provider: String, message: String },
}

impl ScoringError {
    pub fn validation(message: impl Into<String>) -> Self {
        ScoringError::Validation(message.into())
    }

    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        ScoringError::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// True when the caller sent something we could not accept.
    pub fn is_client_error(&self) -> bool {
        matches!(self, ScoringError::Validation(_))
    }
}
