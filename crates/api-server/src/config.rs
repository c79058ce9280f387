use anyhow::{Context, Result};
use scoring_engine::AuditLogger;
use signal_providers::ProviderConfig;
use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8080;

/// Process configuration, read once at start-up.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Where audit records land.
    pub log_dir: PathBuf,
    pub audit_enabled: bool,
    pub providers: ProviderConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            log_dir: default_log_dir(),
            audit_enabled: true,
            providers: ProviderConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        let config = Self {
            host: env::var("HOST").unwrap_or_else(|_| DEFAULT_HOST.to_string()),
            port: match env::var("PORT") {
                Ok(raw) => raw
                    .trim()
                    .parse()
                    .with_context(|| format!("PORT must be a port number, got {:?}", raw))?,
                Err(_) => DEFAULT_PORT,
            },
            log_dir: env::var("LOG_DIR")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or_else(default_log_dir),
            audit_enabled: match env::var("AUDIT_ENABLED") {
                Ok(raw) => parse_flag(&raw)
                    .with_context(|| format!("AUDIT_ENABLED must be true/false, got {:?}", raw))?,
                Err(_) => true,
            },
            providers: ProviderConfig::from_env()?,
        };

        Ok(config)
    }

    pub fn socket_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("invalid listen address {}:{}", self.host, self.port))
    }

    pub fn audit_logger(&self) -> AuditLogger {
        if self.audit_enabled {
            AuditLogger::new(self.log_dir.clone())
        } else {
            AuditLogger::disabled()
        }
    }
}

/// `<system temp>/odte-sidecar/logs`
pub fn default_log_dir() -> PathBuf {
    env::temp_dir().join("odte-sidecar").join("logs")
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
