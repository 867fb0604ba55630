use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;

use crate::options::ValidationError;

/// A single named output produced by the provisioning tool after apply.
/// Opaque to the harness beyond string extraction and emptiness.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputValue {
    value: Value,
    sensitive: bool,
}

impl OutputValue {
    pub fn new(value: Value) -> Self {
        Self {
            value,
            sensitive: false,
        }
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn is_sensitive(&self) -> bool {
        self.sensitive
    }

    pub fn as_str(&self) -> Option<&str> {
        self.value.as_str()
    }

    /// Emptiness as the assertions in this harness define it: JSON null,
    /// an empty or whitespace-only string, or an empty array/object.
    pub fn is_empty(&self) -> bool {
        match &self.value {
            Value::Null => true,
            Value::String(text) => text.trim().is_empty(),
            Value::Array(items) => items.is_empty(),
            Value::Object(entries) => entries.is_empty(),
            Value::Bool(_) | Value::Number(_) => false,
        }
    }
}

#[derive(Deserialize)]
struct RawOutputEntry {
    value: Value,
    #[serde(default)]
    sensitive: bool,
}

/// Parse the whole-map form, `output -json`:
/// `{"name": {"value": ..., "type": ..., "sensitive": ...}, ...}`.
pub fn parse_output_map(json: &str) -> Result<BTreeMap<String, OutputValue>, ValidationError> {
    let entries: BTreeMap<String, RawOutputEntry> = serde_json::from_str(json)
        .map_err(|error| ValidationError::new(format!("malformed output map: {error}")))?;

    Ok(entries
        .into_iter()
        .map(|(name, entry)| {
            (
                name,
                OutputValue {
                    value: entry.value,
                    sensitive: entry.sensitive,
                },
            )
        })
        .collect())
}

/// Parse the single-output form, `output -json NAME`, which prints just the
/// value encoded as JSON.
pub fn parse_output_value(json: &str) -> Result<OutputValue, ValidationError> {
    let value: Value = serde_json::from_str(json.trim())
        .map_err(|error| ValidationError::new(format!("malformed output value: {error}")))?;
    Ok(OutputValue::new(value))
}
