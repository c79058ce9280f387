use async_trait::async_trait;
use scoring_core::{EvidenceProvider, ScoreRequest, ScoringError, SubScoreProvider};

pub const NEUTRAL_SCORE: f64 = 0.5;

/// Sub-score provider that always answers the same value.
#[derive(Debug, Clone)]
pub struct NeutralScore {
    name: String,
    score: f64,
}

impl NeutralScore {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_score(name, NEUTRAL_SCORE)
    }

    pub fn with_score(name: impl Into<String>, score: f64) -> Self {
        Self {
            name: name.into(),
            score,
        }
    }
}

#[async_trait]
impl SubScoreProvider for NeutralScore {
    fn name(&self) -> &str {
        &self.name
    }

    async fn score(&self, _request: &ScoreRequest) -> Result<f64, ScoringError> {
        Ok(self.score)
    }
}

/// Evidence feed with a fixed text.
#[derive(Debug, Clone)]
pub struct StaticEvidence {
    name: String,
    text: String,
}

impl StaticEvidence {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
        }
    }

    /// "no <feed> source configured"
    pub fn unconfigured(name: impl Into<String>) -> Self {
        let name = name.into();
        let text = format!("no {} source configured", name);
        Self { name, text }
    }
}

#[async_trait]
impl EvidenceProvider for StaticEvidence {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self, _symbol: &str) -> Result<String, ScoringError> {
        Ok(self.text.clone())
    }
}
