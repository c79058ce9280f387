use anyhow::Context;
use axum::{
    http::{HeaderName, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    Json, Router,
};
use scoring_core::ScoringError;
use scoring_engine::ScoreOrchestrator;
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

pub mod config;
pub mod request_id;
pub mod score_routes;


pub use config::ServerConfig;

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<ScoreOrchestrator>,
}

impl AppState {
    pub fn new(orchestrator: ScoreOrchestrator) -> Self {
        Self {
            orchestrator: Arc::new(orchestrator),
        }
    }

    /// Wire providers and the audit logger from configuration.
    pub fn from_config(config: &ServerConfig) -> anyhow::Result<Self> {
        let (scorers, feeds) = signal_providers::build_providers(&config.providers)
            .context("failed to build signal providers")?;

        let audit = config.audit_logger();
        match audit.dir() {
            Some(dir) => {
                if let Err(e) = std::fs::create_dir_all(dir) {
                    tracing::warn!("Audit log dir {} not usable yet: {}", dir.display(), e);
                }
                tracing::info!("Audit records go to {}", dir.display());
            }
            None => tracing::info!("Audit logging disabled"),
        }

        Ok(Self::new(ScoreOrchestrator::new(scorers, feeds, audit)))
    }
}

/// Error surfaced by a handler.
#[derive(Debug)]
pub enum AppError {
    /// Bad request shape (422).
    Validation(String),
    /// A provider or internal step failed (500).
    Internal(String),
}

impl From<ScoringError> for AppError {
    fn from(err: ScoringError) -> Self {
        match err {
            ScoringError::Validation(_) => AppError::Validation(err.to_string()),
            ScoringError::Provider { .. } => AppError::Internal(err.to_string()),
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::Validation(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg),
            AppError::Internal(msg) => {
                tracing::error!("Request failed: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        let body = Json(json!({
            "error": error_message,
            "status": status.as_u16()
        }));

        (status, body).into_response()
    }
}

/// Any origin, method and header, with credentials. Origins are mirrored
/// because a literal `*` cannot be combined with credentials.
pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
        .expose_headers([HeaderName::from_static(request_id::REQUEST_ID_HEADER)])
}

pub fn build_router(state: AppState) -> Router {
    score_routes::score_routes()
        .with_state(state)
        .layer(middleware::from_fn(request_id::request_id_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::extract::Request| {
                tracing::info_span!(
                    "http",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = tracing::field::Empty
                )
            }),
        )
        .layer(cors_layer())
}

pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let json_logging = std::env::var("RUST_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json_logging {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

pub async fn run_server() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = ServerConfig::from_env()?;
    let addr = config.socket_addr()?;
    let app = build_router(AppState::from_config(&config)?);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    tracing::info!("ODTE sidecar listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
