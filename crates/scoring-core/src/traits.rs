use async_trait::async_trait;
use std::sync::Arc;

use crate::{ScoreRequest, ScoringError};

/// Source of one of the five 0..1 sub-scores
#[async_trait]
pub trait SubScoreProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn score(&self, request: &ScoreRequest) -> Result<f64, ScoringError>;
}

/// Source of one free-text evidence blurb for a symbol
#[async_trait]
pub trait EvidenceProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn fetch(&self, symbol: &str) -> Result<String, ScoringError>;
}

/// The five sub-score slots, in composite-weight order.
#[derive(Clone)]
pub struct ScoreProviders {
    pub behavior: Arc<dyn SubScoreProvider>,
    pub structure: Arc<dyn SubScoreProvider>,
    pub institutional: Arc<dyn SubScoreProvider>,
    pub sentiment: Arc<dyn SubScoreProvider>,
    pub execution_validity: Arc<dyn SubScoreProvider>,
}

impl ScoreProviders {
    /// Same provider behind every slot.
    pub fn uniform(provider: Arc<dyn SubScoreProvider>) -> Self {
        Self {
            behavior: provider.clone(),
            structure: provider.clone(),
            institutional: provider.clone(),
            sentiment: provider.clone(),
            execution_validity: provider,
        }
    }
}

/// The three evidence feeds.
#[derive(Clone)]
pub struct EvidenceProviders {
    pub news: Arc<dyn EvidenceProvider>,
    pub social: Arc<dyn EvidenceProvider>,
    pub gamma: Arc<dyn EvidenceProvider>,
}
