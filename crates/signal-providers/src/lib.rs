pub mod error;
pub mod http;
pub mod neutral;

pub use error::{ProviderError, ProviderResult};
pub use http::{HttpEvidenceProvider, HttpScoreProvider, SignalServiceClient};
pub use neutral::{NeutralScore, StaticEvidence, NEUTRAL_SCORE};

use scoring_core::{EvidenceProvider, EvidenceProviders, ScoreProviders, SubScoreProvider};
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_TIMEOUT_SECS: u64 = 5;

/// Where sub-scores and evidence come from.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// Remote signal service. When unset, neutral scores and static evidence are used.
    pub service_url: Option<String>,
    pub timeout: Duration,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            service_url: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl ProviderConfig {
    /// `SIGNAL_SERVICE_URL` and `SIGNAL_SERVICE_TIMEOUT_SECS`.
    pub fn from_env() -> ProviderResult<Self> {
        let service_url = std::env::var("SIGNAL_SERVICE_URL")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        let timeout_secs = match std::env::var("SIGNAL_SERVICE_TIMEOUT_SECS") {
            Ok(raw) => raw.trim().parse::<u64>().map_err(|e| {
                ProviderError::InvalidConfig(format!("SIGNAL_SERVICE_TIMEOUT_SECS={}: {}", raw, e))
            })?,
            Err(_) => DEFAULT_TIMEOUT_SECS,
        };

        Ok(Self {
            service_url,
            timeout: Duration::from_secs(timeout_secs),
        })
    }
}

/// Build the five sub-score providers and three evidence feeds from config.
pub fn build_providers(
    config: &ProviderConfig,
) -> ProviderResult<(ScoreProviders, EvidenceProviders)> {
    match &config.service_url {
        Some(url) => {
            tracing::info!("Using remote signal service at {}", url);
            let client = SignalServiceClient::new(url.clone(), config.timeout)?;
            let scorer = |name: &str| -> Arc<dyn SubScoreProvider> {
                Arc::new(HttpScoreProvider::new(name, client.clone()))
            };
            let feed = |name: &str| -> Arc<dyn EvidenceProvider> {
                Arc::new(HttpEvidenceProvider::new(name, client.clone()))
            };
            Ok(assemble(scorer, feed))
        }
        None => {
            tracing::warn!(
                "SIGNAL_SERVICE_URL not set, sub-scores default to {}",
                NEUTRAL_SCORE
            );
            let scorer =
                |name: &str| -> Arc<dyn SubScoreProvider> { Arc::new(NeutralScore::new(name)) };
            let feed = |name: &str| -> Arc<dyn EvidenceProvider> {
                Arc::new(StaticEvidence::unconfigured(name))
            };
            Ok(assemble(scorer, feed))
        }
    }
}

fn assemble(
    scorer: impl Fn(&str) -> Arc<dyn SubScoreProvider>,
    feed: impl Fn(&str) -> Arc<dyn EvidenceProvider>,
) -> (ScoreProviders, EvidenceProviders) {
    let scorers = ScoreProviders {
        behavior: scorer("behavior"),
        structure: scorer("structure"),
        institutional: scorer("institutional"),
        sentiment: scorer("sentiment"),
        execution_validity: scorer("execution_validity"),
    };
    let feeds = EvidenceProviders {
        news: feed("news"),
        social: feed("social"),
        gamma: feed("gamma"),
    };
    (scorers, feeds)
}
