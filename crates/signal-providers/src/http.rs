use async_trait::async_trait;
use scoring_core::{EvidenceProvider, ScoreRequest, ScoringError, SubScoreProvider};
use serde::Deserialize;
use std::time::Duration;

use crate::error::{ProviderError, ProviderResult};

#[derive(Debug, Clone, Deserialize)]
struct ScoreReply {
    score: f64,
}

#[derive(Debug, Clone, Deserialize)]
struct EvidenceReply {
    text: String,
}

/// Client for a remote signal service exposing
/// `POST /score/{name}` and `GET /evidence/{name}?symbol=...`.
#[derive(Clone)]
pub struct SignalServiceClient {
    client: reqwest::Client,
    base_url: String,
}

impl SignalServiceClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> ProviderResult<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        let base_url = base_url.into().trim_end_matches('/').to_string();

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn score(&self, name: &str, request: &ScoreRequest) -> ProviderResult<f64> {
        let response = self
            .client
            .post(format!("{}/score/{}", self.base_url, name))
            .json(request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ProviderError::ServiceUnavailable(format!(
                "Status: {}",
                response.status()
            )));
        }

        let reply = response
            .json::<ScoreReply>()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

        if !reply.score.is_finite() {
            return Err(ProviderError::InvalidResponse(format!(
                "non-finite score {}",
                reply.score
            )));
        }

        Ok(reply.score)
    }

    pub async fn evidence(&self, name: &str, symbol: &str) -> ProviderResult<String> {
        let response = self
            .client
            .get(format!("{}/evidence/{}", self.base_url, name))
            .query(&[("symbol", symbol)])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ProviderError::ServiceUnavailable(format!(
                "Status: {}",
                response.status()
            )));
        }

        let reply = response
            .json::<EvidenceReply>()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

        Ok(reply.text)
    }
}

/// Sub-score fetched from the remote signal service.
#[derive(Clone)]
pub struct HttpScoreProvider {
    name: String,
    client: SignalServiceClient,
}

impl HttpScoreProvider {
    pub fn new(name: impl Into<String>, client: SignalServiceClient) -> Self {
        Self {
            name: name.into(),
            client,
        }
    }
}

#[async_trait]
impl SubScoreProvider for HttpScoreProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn score(&self, request: &ScoreRequest) -> Result<f64, ScoringError> {
        self.client
            .score(&self.name, request)
            .await
            .map_err(|e| e.for_provider(&self.name))
    }
}

/// Evidence text fetched from the remote signal service.
#[derive(Clone)]
pub struct HttpEvidenceProvider {
    name: String,
    client: SignalServiceClient,
}

impl HttpEvidenceProvider {
    pub fn new(name: impl Into<String>, client: SignalServiceClient) -> Self {
        Self {
            name: name.into(),
            client,
        }
    }
}

#[async_trait]
impl EvidenceProvider for HttpEvidenceProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self, symbol: &str) -> Result<String, ScoringError> {
        self.client
            .evidence(&self.name, symbol)
            .await
            .map_err(|e| e.for_provider(&self.name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> SignalServiceClient {
        SignalServiceClient::new(server.uri(), Duration::from_secs(2)).unwrap()
    }

    #[tokio::test]
    async fn test_score_posts_request_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/score/behavior"))
            .and(body_partial_json(json!({"symbol": "SPY"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"score": 0.72})))
            .mount(&server)
            .await;

        let provider = HttpScoreProvider::new("behavior", client(&server));
        let score = provider.score(&ScoreRequest::new("t", "SPY")).await.unwrap();
        assert_eq!(score, 0.72);
    }

    #[tokio::test]
    async fn test_score_server_error_is_provider_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/score/structure"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let provider = HttpScoreProvider::new("structure", client(&server));
        let err = provider.score(&ScoreRequest::new("t", "SPY")).await.unwrap_err();
        match err {
            ScoringError::Provider { provider, message } => {
                assert_eq!(provider, "structure");
                assert!(message.contains("503"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_score_malformed_body_is_provider_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/score/sentiment"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"value": "high"})))
            .mount(&server)
            .await;

        let provider = HttpScoreProvider::new("sentiment", client(&server));
        assert!(provider.score(&ScoreRequest::new("t", "SPY")).await.is_err());
    }

    #[tokio::test]
    async fn test_evidence_fetch() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/evidence/news"))
            .and(query_param("symbol", "TSLA"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"text": "Deliveries beat estimates"})),
            )
            .mount(&server)
            .await;

        let feed = HttpEvidenceProvider::new("news", client(&server));
        assert_eq!(feed.fetch("TSLA").await.unwrap(), "Deliveries beat estimates");
    }

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let client =
            SignalServiceClient::new("http://localhost:9000/", Duration::from_secs(1)).unwrap();
        assert_eq!(client.base_url(), "http://localhost:9000");
    }
}
