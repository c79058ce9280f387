use scoring_core::{
    round_to, Evidence, EvidenceProvider, EvidenceProviders, ScoreProviders, ScoreRequest,
    ScoreResponse, ScoringError, SubScoreProvider, SubScores,
};

pub mod audit;
pub mod composite;
pub mod grade;
pub mod hypothesis;
pub mod penalties;

pub use audit::{AuditDocument, AuditError, AuditLogger};
pub use composite::{composite_score, weighted_sum};
pub use grade::grade_from_composite;
pub use hypothesis::{build_hypothesis, directional_bias, DirectionalBias};
pub use penalties::{cap_penalties, compute_penalties, PenaltyEngine, PenaltyRule, PENALTY_CAP};

/// Event name used for scoring audit records.
pub const SCORE_EVENT: &str = "score";

const OUTPUT_DECIMALS: i32 = 3;

/// Runs one scoring request end to end: hypothesis, sub-scores, penalties,
/// composite, grade, evidence, audit.
///
/// Provider failures are not recovered; the request fails as a whole.
pub struct ScoreOrchestrator {
    scorers: ScoreProviders,
    feeds: EvidenceProviders,
    penalty_engine: PenaltyEngine,
    audit: AuditLogger,
}

impl ScoreOrchestrator {
    pub fn new(scorers: ScoreProviders, feeds: EvidenceProviders, audit: AuditLogger) -> Self {
        Self {
            scorers,
            feeds,
            penalty_engine: PenaltyEngine::default(),
            audit,
        }
    }

    /// Replace the standard penalty catalog.
    pub fn with_penalty_engine(mut self, engine: PenaltyEngine) -> Self {
        self.penalty_engine = engine;
        self
    }

    /// Validate a raw payload, then score it.
    pub async fn handle(&self, payload: serde_json::Value) -> Result<ScoreResponse, ScoringError> {
        let request = ScoreRequest::from_value(payload)?;
        self.score(&request).await
    }

    pub async fn score(&self, request: &ScoreRequest) -> Result<ScoreResponse, ScoringError> {
        let hypothesis = build_hypothesis(request);

        let scores = self.sub_scores(request).await?;
        let penalties = self.penalty_engine.evaluate(request);

        let composite = composite_score(&scores, &penalties);
        let grade = grade_from_composite(composite);

        let evidence = self.evidence(&request.symbol).await?;

        let response = ScoreResponse {
            hypothesis,
            scores: scores.rounded(OUTPUT_DECIMALS),
            penalties: penalties.rounded_within(OUTPUT_DECIMALS, PENALTY_CAP),
            composite: round_to(composite, OUTPUT_DECIMALS),
            grade,
            evidence,
        };

        tracing::info!(
            "Scored {}: composite {:.3} grade {} ({} penalties)",
            request.symbol,
            response.composite,
            response.grade,
            response.penalties.len()
        );

        let record = AuditDocument::new()
            .field("request", request)
            .field("response", &response);
        self.audit.record(SCORE_EVENT, &record);

        Ok(response)
    }

    /// All five sub-scores, fetched concurrently. The first failure wins.
    async fn sub_scores(&self, request: &ScoreRequest) -> Result<SubScores, ScoringError> {
        let scorers = &self.scorers;
        let (behavior, structure, institutional, sentiment, execution_validity) = tokio::try_join!(
            finite_score(scorers.behavior.as_ref(), request),
            finite_score(scorers.structure.as_ref(), request),
            finite_score(scorers.institutional.as_ref(), request),
            finite_score(scorers.sentiment.as_ref(), request),
            finite_score(scorers.execution_validity.as_ref(), request),
        )?;

        Ok(SubScores {
            behavior,
            structure,
            institutional,
            sentiment,
            execution_validity,
        })
    }

    async fn evidence(&self, symbol: &str) -> Result<Evidence, ScoringError> {
        let (news_summary, social_summary, gamma_note) = tokio::try_join!(
            self.feeds.news.fetch(symbol),
            self.feeds.social.fetch(symbol),
            self.feeds.gamma.fetch(symbol),
        )?;

        Ok(Evidence {
            news_summary,
            social_summary,
            gamma_note,
        })
    }
}

/// NaN or infinite scores count as a provider failure.
async fn finite_score(
    provider: &dyn SubScoreProvider,
    request: &ScoreRequest,
) -> Result<f64, ScoringError> {
    let score = provider.score(request).await?;
    if score.is_finite() {
        Ok(score)
    } else {
        Err(ScoringError::provider(
            provider.name(),
            format!("non-finite score {}", score),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use scoring_core::{ContextMap, Grade};
    use serde_json::{json, Value};
    use std::sync::Arc;
    use std::time::Duration;

    struct FixedScore(f64);

    #[async_trait]
    impl SubScoreProvider for FixedScore {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn score(&self, _request: &ScoreRequest) -> Result<f64, ScoringError> {
            Ok(self.0)
        }
    }

    struct FailingScore;

    #[async_trait]
    impl SubScoreProvider for FailingScore {
        fn name(&self) -> &str {
            "institutional"
        }

        async fn score(&self, _request: &ScoreRequest) -> Result<f64, ScoringError> {
            Err(ScoringError::provider("institutional", "upstream timed out"))
        }
    }

    struct Echo(&'static str);

    #[async_trait]
    impl EvidenceProvider for Echo {
        fn name(&self) -> &str {
            self.0
        }

        async fn fetch(&self, symbol: &str) -> Result<String, ScoringError> {
            Ok(format!("{} for {}", self.0, symbol))
        }
    }

    fn feeds() -> EvidenceProviders {
        EvidenceProviders {
            news: Arc::new(Echo("news")),
            social: Arc::new(Echo("social")),
            gamma: Arc::new(Echo("gamma")),
        }
    }

    fn orchestrator(score: f64, audit: AuditLogger) -> ScoreOrchestrator {
        let scorers = ScoreProviders::uniform(Arc::new(FixedScore(score)));
        ScoreOrchestrator::new(scorers, feeds(), audit)
    }

    fn spy_request() -> ScoreRequest {
        let mut req = ScoreRequest::new("2025-01-02T14:31:00Z", "SPY");
        req.price_context = ContextMap::new()
            .with("last", 105.0)
            .with("vwap", 100.0)
            .with("or_high", 103.0);
        req.structure = ContextMap::new().with("breakout_state", "above_premarket_high");
        req
    }

    async fn wait_for_files(dir: &std::path::Path) -> Vec<std::path::PathBuf> {
        for _ in 0..100 {
            if let Ok(entries) = std::fs::read_dir(dir) {
                let files: Vec<_> = entries
                    .filter_map(|e| e.ok())
                    .map(|e| e.path())
                    .filter(|p| p.extension().map(|ext| ext == "json").unwrap_or(false))
                    .collect();
                if !files.is_empty() {
                    return files;
                }
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        Vec::new()
    }

    #[tokio::test]
    async fn test_perfect_scores_with_low_volume() {
        let mut req = spy_request();
        req.technicals = ContextMap::new().with("avg_volume_10", 50000);

        let response = orchestrator(1.0, AuditLogger::disabled())
            .score(&req)
            .await
            .unwrap();

        assert_eq!(response.composite, 0.7);
        assert_eq!(response.grade, Grade::B);
        assert_eq!(response.penalties.get("low_volume"), Some(0.3));
        assert_eq!(response.scores, SubScores::uniform(1.0));
        assert_eq!(
            response.hypothesis,
            "SPY trading above VWAP; breakout state: above_premarket_high — call-side favored."
        );
        assert_eq!(response.evidence.news_summary, "news for SPY");
        assert_eq!(response.evidence.gamma_note, "gamma for SPY");
    }

    #[tokio::test]
    async fn test_outputs_are_rounded_and_bounded() {
        let mut req = spy_request();
        req.risk_context = ContextMap::new()
            .with("earnings_within_72h", true)
            .with("thin_option_chain", true);
        req.technicals = ContextMap::new().with("avg_volume", 10);

        let response = orchestrator(0.123456, AuditLogger::disabled())
            .score(&req)
            .await
            .unwrap();

        assert_eq!(response.scores.behavior, 0.123);
        assert_eq!(response.composite, 0.0);
        assert_eq!(response.grade, Grade::D);
        assert!(response.penalties.total() <= PENALTY_CAP + 1e-9);
        assert!(response.penalties.iter().all(|(_, v)| v >= 0.0));
    }

    #[tokio::test]
    async fn test_provider_failure_fails_the_request() {
        let mut scorers = ScoreProviders::uniform(Arc::new(FixedScore(0.9)));
        scorers.institutional = Arc::new(FailingScore);
        let orchestrator = ScoreOrchestrator::new(scorers, feeds(), AuditLogger::disabled());

        let err = orchestrator.score(&spy_request()).await.unwrap_err();
        assert!(matches!(err, ScoringError::Provider { .. }));
        assert!(!err.is_client_error());
    }

    #[tokio::test]
    async fn test_non_finite_sub_score_fails_the_request() {
        let mut scorers = ScoreProviders::uniform(Arc::new(FixedScore(0.9)));
        scorers.sentiment = Arc::new(FixedScore(f64::NAN));
        let orchestrator = ScoreOrchestrator::new(scorers, feeds(), AuditLogger::disabled());

        let err = orchestrator.score(&spy_request()).await.unwrap_err();
        assert!(matches!(err, ScoringError::Provider { .. }));
        assert!(err.to_string().contains("non-finite"));

        let mut scorers = ScoreProviders::uniform(Arc::new(FixedScore(0.9)));
        scorers.execution_validity = Arc::new(FixedScore(f64::INFINITY));
        let orchestrator = ScoreOrchestrator::new(scorers, feeds(), AuditLogger::disabled());
        assert!(orchestrator.score(&spy_request()).await.is_err());
    }

    #[tokio::test]
    async fn test_custom_penalty_rule_is_applied_and_capped() {
        fn trading_halted(req: &ScoreRequest) -> bool {
            req.risk_context.is_truthy("halted")
        }

        let engine = PenaltyEngine::default().with_rule(PenaltyRule {
            name: "halted",
            value: 0.5,
            applies: trading_halted,
        });
        let orchestrator = orchestrator(1.0, AuditLogger::disabled()).with_penalty_engine(engine);

        let mut req = spy_request();
        req.technicals = ContextMap::new().with("avg_volume_10", 50000);
        req.risk_context = ContextMap::new()
            .with("earnings_within_72h", true)
            .with("thin_option_chain", true)
            .with("halted", true);

        let response = orchestrator.score(&req).await.unwrap();
        let names: Vec<&str> = response.penalties.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["low_volume", "earnings_72h", "thin_chain", "halted"]);
        assert_eq!(response.penalties.get("low_volume"), Some(0.218));
        assert_eq!(response.penalties.get("halted"), Some(0.363));
        assert!(response.penalties.total() <= PENALTY_CAP);
        assert_eq!(response.composite, 0.2);
        assert_eq!(response.grade, Grade::D);

        req.risk_context = ContextMap::new().with("halted", true);
        let response = orchestrator.score(&req).await.unwrap();
        assert_eq!(response.penalties.get("low_volume"), Some(0.3));
        assert_eq!(response.penalties.get("halted"), Some(0.5));
        assert_eq!(response.composite, 0.2);
    }

    #[tokio::test]
    async fn test_handle_rejects_bad_payload_before_scoring() {
        let mut scorers = ScoreProviders::uniform(Arc::new(FixedScore(0.9)));
        scorers.behavior = Arc::new(FailingScore);
        let orchestrator = ScoreOrchestrator::new(scorers, feeds(), AuditLogger::disabled());

        let err = orchestrator.handle(json!({"symbol": "SPY"})).await.unwrap_err();
        assert!(err.is_client_error());
    }

    #[tokio::test]
    async fn test_audit_record_is_written() {
        let dir = tempfile::tempdir().unwrap();
        let response = orchestrator(0.8, AuditLogger::new(dir.path()))
            .handle(json!({
                "timestamp": "2025-01-02T14:31:00Z",
                "symbol": "QQQ",
                "price_context": {"last": 410.0, "vwap": 412.0, "desk": "alpha"}
            }))
            .await
            .unwrap();

        let files = wait_for_files(dir.path()).await;
        assert_eq!(files.len(), 1);

        let written: Value = serde_json::from_slice(&std::fs::read(&files[0]).unwrap()).unwrap();
        assert_eq!(written["request"]["symbol"], json!("QQQ"));
        assert_eq!(written["request"]["price_context"]["desk"], json!("alpha"));
        assert_eq!(written["response"]["grade"], json!(response.grade.as_str()));
        assert_eq!(written["response"]["composite"], json!(response.composite));
    }

    #[tokio::test]
    async fn test_unwritable_audit_dir_does_not_affect_response() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let broken = orchestrator(0.8, AuditLogger::new(file.path().join("logs")));
        let healthy = orchestrator(0.8, AuditLogger::disabled());

        let req = spy_request();
        let with_broken_log = broken.score(&req).await.unwrap();
        let reference = healthy.score(&req).await.unwrap();

        assert_eq!(with_broken_log, reference);
    }
}
