//! FILENAME: core/insights-client/src/envelope.rs
//! Response envelope decoding.
//!
//! Endpoints wrap their payload as `{success, data, message}`, except that a
//! few name the payload after what it lists (`brands`, `skus`, `platforms`)
//! and some older ones return a bare array.

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ClientError, Result};

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ApiEnvelope {
    #[serde(default = "default_true")]
    pub success: bool,

    #[serde(default, alias = "brands", alias = "skus", alias = "platforms")]
    pub data: Option<Value>,

    #[serde(default)]
    pub message: Option<String>,
}

impl ApiEnvelope {
    pub fn ok(data: Value) -> Self {
        ApiEnvelope {
            success: true,
            data: Some(data),
            message: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        ApiEnvelope {
            success: false,
            data: None,
            message: Some(message.into()),
        }
    }

    /// Accepts both the wrapped form and a bare array.
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Array(_) => Ok(ApiEnvelope::ok(value)),
            Value::Object(_) => Ok(serde_json::from_value(value)?),
            other => Err(ClientError::UnexpectedShape(format!(
                "expected an object or array, got {}",
                kind_of(&other)
            ))),
        }
    }

    /// The payload, or the server's error message when `success` is false.
    pub fn into_data(self) -> Result<Value> {
        if !self.success {
            return Err(ClientError::Api(
                self.message.unwrap_or_else(|| "request failed".to_string()),
            ));
        }
        Ok(self.data.unwrap_or(Value::Array(Vec::new())))
    }

    /// The payload as a list of records. A null payload is an empty list.
    pub fn into_records(self) -> Result<Vec<Value>> {
        match self.into_data()? {
            Value::Array(records) => Ok(records),
            Value::Null => Ok(Vec::new()),
            other => Err(ClientError::UnexpectedShape(format!(
                "expected a list of records, got {}",
                kind_of(&other)
            ))),
        }
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

// ============================================================================
// FILTER OPTIONS
// ============================================================================

/// One entry of a filter dropdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterOption {
    pub label: String,
    pub value: String,
}

impl FilterOption {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        FilterOption {
            label: label.into(),
            value: value.into(),
        }
    }

    /// Reads a plain string or a `{label, value}` / `{name, value}` object.
    pub fn from_record(record: &Value) -> Option<FilterOption> {
        match record {
            Value::String(s) => non_blank(s).map(|s| FilterOption::new(s, s)),
            Value::Number(n) => {
                let text = n.to_string();
                Some(FilterOption::new(text.clone(), text))
            }
            Value::Object(map) => {
                let text = |key: &str| map.get(key).and_then(scalar_text);
                let value = text("value").or_else(|| text("id"));
                let label = text("label").or_else(|| text("name"));
                match (label, value) {
                    (Some(label), Some(value)) => Some(FilterOption::new(label, value)),
                    (Some(only), None) | (None, Some(only)) => Some(FilterOption::new(only.clone(), only)),
                    (None, None) => None,
                }
            }
            _ => None,
        }
    }

    /// Decodes a list of options, dropping blanks and repeated values.
    pub fn from_records(records: &[Value]) -> Vec<FilterOption> {
        let mut seen = FxHashSet::default();
        records
            .iter()
            .filter_map(FilterOption::from_record)
            .filter(|option| seen.insert(option.value.clone()))
            .collect()
    }
}

fn non_blank(s: &str) -> Option<&str> {
    let s = s.trim();
    (!s.is_empty()).then_some(s)
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => non_blank(s).map(str::to_string),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_envelope_aliases() {
        let envelope = ApiEnvelope::from_value(json!({"success": true, "brands": ["Acme"]})).unwrap();
        assert_eq!(envelope.into_records().unwrap(), vec![json!("Acme")]);

        let bare = ApiEnvelope::from_value(json!([{"brand": "Zed"}])).unwrap();
        assert_eq!(bare.into_records().unwrap().len(), 1);
    }

    #[test]
    fn test_unsuccessful_envelope_surfaces_message() {
        let envelope = ApiEnvelope::from_value(json!({"success": false, "message": "db down"})).unwrap();
        match envelope.into_records() {
            Err(ClientError::Api(message)) => assert_eq!(message, "db down"),
            other => panic!("expected API error, got {:?}", other),
        }
    }

    #[test]
    fn test_null_data_is_empty() {
        let envelope = ApiEnvelope::from_value(json!({"success": true, "data": null})).unwrap();
        assert!(envelope.into_records().unwrap().is_empty());
        assert!(ApiEnvelope::from_value(json!("oops")).is_err());
    }

    #[test]
    fn test_filter_options_accept_mixed_shapes() {
        let options = FilterOption::from_records(&[
            json!("Blinkit"),
            json!({"label": "Swiggy Instamart", "value": "instamart"}),
            json!({"name": "Zepto"}),
            json!(""),
            json!("Blinkit"),
            json!(null),
        ]);
        assert_eq!(
            options,
            vec![
                FilterOption::new("Blinkit", "Blinkit"),
                FilterOption::new("Swiggy Instamart", "instamart"),
                FilterOption::new("Zepto", "Zepto"),
            ]
        );
    }
}
