use serde::Serialize;
use serde_json::{Map, Value};

use crate::context::{value_is_truthy, ContextMap};
use crate::error::ScoringError;

pub const BREAKOUT_ABOVE_PREMARKET_HIGH: &str = "above_premarket_high";
pub const BREAKOUT_BELOW_PREMARKET_LOW: &str = "below_premarket_low";

/// Market context snapshot for one symbol, as sent by the trading front end.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreRequest {
    /// Caller-supplied, passed through untouched.
    pub timestamp: String,
    pub symbol: String,
    pub price_context: ContextMap,
    pub structure: ContextMap,
    pub technicals: ContextMap,
    pub session_time_ok: bool,
    pub risk_context: ContextMap,
}

impl ScoreRequest {
    pub fn new(timestamp: impl Into<String>, symbol: impl Into<String>) -> Self {
        Self {
            timestamp: timestamp.into(),
            symbol: symbol.into(),
            price_context: ContextMap::default(),
            structure: ContextMap::default(),
            technicals: ContextMap::default(),
            session_time_ok: true,
            risk_context: ContextMap::default(),
        }
    }

    /// Validate a raw JSON payload and apply defaults.
    ///
    /// Required: `timestamp` and `symbol` as strings (symbol non-blank).
    /// Mapping fields may be absent or `null` (empty map) but must be objects
    /// when given. Top-level keys we don't know are ignored.
    pub fn from_value(value: Value) -> Result<Self, ScoringError> {
        let mut obj = match value {
            Value::Object(obj) => obj,
            other => {
                return Err(ScoringError::validation(format!(
                    "request body must be an object, got {}",
                    json_type(&other)
                )))
            }
        };

        let timestamp = take_required_string(&mut obj, "timestamp")?;
        let symbol = take_required_string(&mut obj, "symbol")?;
        if symbol.trim().is_empty() {
            return Err(ScoringError::validation("symbol must not be empty"));
        }

        Ok(Self {
            timestamp,
            symbol,
            price_context: take_context(&mut obj, "price_context")?,
            structure: take_context(&mut obj, "structure")?,
            technicals: take_context(&mut obj, "technicals")?,
            session_time_ok: take_bool(&mut obj, "session_time_ok", true)?,
            risk_context: take_context(&mut obj, "risk_context")?,
        })
    }

    pub fn last_price(&self) -> Option<f64> {
        self.price_context.get_f64("last")
    }

    pub fn vwap(&self) -> Option<f64> {
        self.price_context.get_f64("vwap")
    }

    pub fn opening_range_high(&self) -> Option<f64> {
        self.price_context.get_f64("or_high")
    }

    pub fn opening_range_low(&self) -> Option<f64> {
        self.price_context.get_f64("or_low")
    }

    pub fn breakout_state(&self) -> Option<&Value> {
        self.structure.get("breakout_state")
    }

    pub fn breakout_is(&self, state: &str) -> bool {
        self.breakout_state().and_then(Value::as_str) == Some(state)
    }

    /// Average volume as sent: `avg_volume_10` unless it is missing or falsy
    /// (`0`, `""`), then `avg_volume`. The value is returned raw; parsing is up
    /// to the caller.
    pub fn average_volume(&self) -> Option<&Value> {
        self.technicals
            .get("avg_volume_10")
            .filter(|v| value_is_truthy(v))
            .or_else(|| self.technicals.get("avg_volume"))
    }

    pub fn earnings_within_72h(&self) -> bool {
        self.risk_context.is_truthy("earnings_within_72h")
    }

    pub fn thin_option_chain(&self) -> bool {
        self.risk_context.is_truthy("thin_option_chain")
    }
}

impl TryFrom<Value> for ScoreRequest {
    type Error = ScoringError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Self::from_value(value)
    }
}

fn take_required_string(
    obj: &mut Map<String, Value>,
    field: &str,
) -> Result<String, ScoringError> {
    match obj.remove(field) {
        Some(Value::String(s)) => Ok(s),
        None | Some(Value::Null) => {
            Err(ScoringError::validation(format!("{} is required", field)))
        }
        Some(other) => Err(ScoringError::validation(format!(
            "{} must be a string, got {}",
            field,
            json_type(&other)
        ))),
    }
}

fn take_context(obj: &mut Map<String, Value>, field: &str) -> Result<ContextMap, ScoringError> {
    match obj.remove(field) {
        None | Some(Value::Null) => Ok(ContextMap::default()),
        Some(Value::Object(map)) => Ok(ContextMap::from(map)),
        Some(other) => Err(ScoringError::validation(format!(
            "{} must be an object, got {}",
            field,
            json_type(&other)
        ))),
    }
}

/// Booleans are read leniently: 0/1 and the usual yes/no spellings are accepted.
fn take_bool(
    obj: &mut Map<String, Value>,
    field: &str,
    default: bool,
) -> Result<bool, ScoringError> {
    let parsed = match obj.remove(field) {
        None | Some(Value::Null) => return Ok(default),
        Some(Value::Bool(b)) => Some(b),
        Some(Value::Number(n)) => match n.as_i64() {
            Some(0) => Some(false),
            Some(1) => Some(true),
            _ => None,
        },
        Some(Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "t" | "yes" | "y" | "on" | "1" => Some(true),
            "false" | "f" | "no" | "n" | "off" | "0" => Some(false),
            _ => None,
        },
        Some(_) => None,
    };

    parsed.ok_or_else(|| ScoringError::validation(format!("{} must be a boolean", field)))
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_minimal_request_gets_defaults() {
        let req = ScoreRequest::from_value(json!({
            "timestamp": "2025-01-02T14:31:00Z",
            "symbol": "SPY"
        }))
        .unwrap();

        assert_eq!(req.symbol, "SPY");
        assert!(req.session_time_ok);
        assert!(req.price_context.is_empty());
        assert!(req.structure.is_empty());
        assert!(req.technicals.is_empty());
        assert!(req.risk_context.is_empty());
    }

    #[test]
    fn test_missing_symbol_is_rejected() {
        let err = ScoreRequest::from_value(json!({"timestamp": "t"})).unwrap_err();
        assert!(err.is_client_error());
        assert!(err.to_string().contains("symbol"));
    }

    #[test]
    fn test_non_string_timestamp_is_rejected() {
        let err = ScoreRequest::from_value(json!({"timestamp": 1700000000, "symbol": "SPY"}))
            .unwrap_err();
        assert!(matches!(err, ScoringError::Validation(_)));
    }

    #[test]
    fn test_blank_symbol_is_rejected() {
        let err = ScoreRequest::from_value(json!({"timestamp": "t", "symbol": "  "})).unwrap_err();
        assert!(err.is_client_error());
    }

    #[test]
    fn test_mapping_field_must_be_object() {
        let err = ScoreRequest::from_value(json!({
            "timestamp": "t",
            "symbol": "SPY",
            "price_context": [1, 2, 3]
        }))
        .unwrap_err();
        assert!(err.to_string().contains("price_context"));
    }

    #[test]
    fn test_non_object_body_is_rejected() {
        assert!(ScoreRequest::from_value(json!("SPY")).is_err());
    }

    #[test]
    fn test_extra_keys_are_kept() {
        let req = ScoreRequest::from_value(json!({
            "timestamp": "t",
            "symbol": "QQQ",
            "price_context": {"last": 410.5, "premarket_high": 409.0},
            "strategy_id": "ignored"
        }))
        .unwrap();

        assert_eq!(req.last_price(), Some(410.5));
        assert_eq!(req.price_context.get_f64("premarket_high"), Some(409.0));
    }

    #[test]
    fn test_session_flag_is_lenient() {
        let req = ScoreRequest::from_value(json!({
            "timestamp": "t",
            "symbol": "SPY",
            "session_time_ok": "false"
        }))
        .unwrap();
        assert!(!req.session_time_ok);

        let err = ScoreRequest::from_value(json!({
            "timestamp": "t",
            "symbol": "SPY",
            "session_time_ok": "maybe"
        }))
        .unwrap_err();
        assert!(err.is_client_error());
    }

    #[test]
    fn test_average_volume_prefers_ten_day() {
        let mut req = ScoreRequest::new("t", "SPY");
        req.technicals = ContextMap::new()
            .with("avg_volume_10", 50000)
            .with("avg_volume", 900000);
        assert_eq!(req.average_volume(), Some(&json!(50000)));

        req.technicals = ContextMap::new().with("avg_volume", 900000);
        assert_eq!(req.average_volume(), Some(&json!(900000)));

        req.technicals = ContextMap::new()
            .with("avg_volume_10", 0)
            .with("avg_volume", 900000);
        assert_eq!(req.average_volume(), Some(&json!(900000)));
    }
}
