use chrono::Utc;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt::Debug;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuditError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// An audit record assembled field by field.
///
/// A field that does not serialize is stored as its debug text; the other
/// fields keep their JSON structure.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct AuditDocument(Map<String, Value>);

impl AuditDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field<T>(mut self, name: &str, value: &T) -> Self
    where
        T: Serialize + Debug + ?Sized,
    {
        self.0.insert(name.to_string(), to_document(value));
        self
    }
}

/// Best-effort audit trail: one pretty-printed JSON file per event, named
/// `<unix millis>_<event>.json`. The directory is created on demand.
///
/// Two events of the same type in the same millisecond share a file name and
/// the later write wins.
#[derive(Debug, Clone)]
pub struct AuditLogger {
    dir: Option<PathBuf>,
}

impl AuditLogger {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: Some(dir.into()),
        }
    }

    /// A logger that records nothing.
    pub fn disabled() -> Self {
        Self { dir: None }
    }

    pub fn dir(&self) -> Option<&Path> {
        self.dir.as_deref()
    }

    pub fn is_enabled(&self) -> bool {
        self.dir.is_some()
    }

    /// Fire-and-forget write on the current tokio runtime.
    ///
    /// Never fails and never waits for the disk; errors are logged at debug.
    pub fn record<T>(&self, event: &str, payload: &T)
    where
        T: Serialize + Debug + ?Sized,
    {
        if !self.is_enabled() {
            return;
        }

        let document = to_document(payload);
        let logger = self.clone();
        let event = event.to_string();

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(e) = logger.write_document(&event, &document).await {
                        tracing::debug!("Failed to write audit record ({}): {}", event, e);
                    }
                });
            }
            Err(_) => tracing::debug!("No runtime for audit record ({}), dropped", event),
        }
    }

    /// Write one event and wait for it. Returns the file written, or `None`
    /// when the logger is disabled.
    pub async fn write<T>(&self, event: &str, payload: &T) -> Result<Option<PathBuf>, AuditError>
    where
        T: Serialize + Debug + ?Sized,
    {
        self.write_document(event, &to_document(payload)).await
    }

    async fn write_document(
        &self,
        event: &str,
        document: &Value,
    ) -> Result<Option<PathBuf>, AuditError> {
        let dir = match &self.dir {
            Some(dir) => dir,
            None => return Ok(None),
        };

        let bytes = serde_json::to_vec_pretty(document)?;
        tokio::fs::create_dir_all(dir).await?;

        let name = format!("{}_{}.json", Utc::now().timestamp_millis(), event);
        let path = dir.join(&name);
        // Readers only ever see complete records.
        let partial = dir.join(format!(".{}.tmp", name));
        tokio::fs::write(&partial, bytes).await?;
        tokio::fs::rename(&partial, &path).await?;

        Ok(Some(path))
    }
}

/// Convert a payload to JSON, falling back to its debug text when it does not
/// serialize (non-string map keys, failing `Serialize` impls, ...).
fn to_document<T>(payload: &T) -> Value
where
    T: Serialize + Debug + ?Sized,
{
    serde_json::to_value(payload).unwrap_or_else(|_| Value::String(format!("{:?}", payload)))
}
