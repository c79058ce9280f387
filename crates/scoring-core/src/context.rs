use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Semi-structured mapping field of a score request.
///
/// Callers send loosely-typed objects (`price_context`, `structure`, ...) and are
/// free to add keys we don't know about. Unknown keys are preserved so they show
/// up in the audit record, and the well-known ones are read through the typed
/// accessors below.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContextMap(Map<String, Value>);

impl ContextMap {
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Builder-style insert, mostly handy in tests and fixtures.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Raw value for a key. An explicit JSON `null` reads as absent.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key).filter(|v| !v.is_null())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Numeric reading. Accepts JSON numbers and numeric strings ("125000", " 1.5 ").
    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(value_as_f64)
    }

    /// Flag reading with loose truthiness: absent, `false`, `0`, `""`, `[]`
    /// and `{}` are all false.
    pub fn is_truthy(&self, key: &str) -> bool {
        self.get(key).map(value_is_truthy).unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Map<String, Value>> for ContextMap {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl FromIterator<(String, Value)> for ContextMap {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

pub fn value_as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

pub fn value_is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

/// Human-facing rendering of a context value: strings without quotes,
/// everything else as compact JSON.
pub fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
