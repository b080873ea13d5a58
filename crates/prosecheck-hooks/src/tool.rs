//! Payload a host hands to tool-execute-after hooks
//!
//! The payload is kept as the host sent it. Hooks read the few fields they
//! care about and write back only the output text, under whichever key the
//! host used for it.

use prosecheck_core::{CheckError, Result};
use serde_json::{json, Map, Value};

/// Keys a host may carry the output text under, in lookup order
const CONTENT_KEYS: [&str; 2] = ["content", "output"];

/// A completed tool call
#[derive(Debug, Clone, PartialEq)]
pub struct ToolExecution {
    payload: Map<String, Value>,
}

impl ToolExecution {
    /// A payload with `tool` and `output.content` set
    pub fn new(tool: &str, content: &str) -> Self {
        let mut payload = Map::new();
        payload.insert("tool".to_string(), json!(tool));
        payload.insert("output".to_string(), json!({ "content": content }));
        Self { payload }
    }

    /// Wrap a host payload; it must be a JSON object
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(payload) => Ok(Self { payload }),
            other => Err(CheckError::Other(format!(
                "tool payload must be a JSON object, got {}",
                kind_of(&other)
            ))),
        }
    }

    pub fn from_json(payload: &str) -> Result<Self> {
        Self::from_value(serde_json::from_str(payload)?)
    }

    pub fn truncated(mut self, truncated: bool) -> Self {
        if let Some(output) = self.output_mut() {
            let metadata = output
                .entry("metadata")
                .or_insert_with(|| Value::Object(Map::new()));
            if let Value::Object(metadata) = metadata {
                metadata.insert("truncated".to_string(), Value::Bool(truncated));
            }
        }
        self
    }

    /// Tool name, e.g. `read`; empty when the host sent none
    pub fn tool(&self) -> &str {
        self.payload
            .get("tool")
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    /// Only an explicit `metadata.truncated: true` counts
    pub fn is_truncated(&self) -> bool {
        self.output()
            .and_then(|output| output.get("metadata"))
            .and_then(|metadata| metadata.get("truncated"))
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    /// Key the host used for the output text
    pub fn content_key(&self) -> Option<&'static str> {
        let output = self.output()?;
        CONTENT_KEYS
            .into_iter()
            .find(|key| output.get(*key).is_some_and(Value::is_string))
    }

    pub fn content(&self) -> Option<&str> {
        let key = self.content_key()?;
        self.output()?.get(key).and_then(Value::as_str)
    }

    /// Replace the output text in place; false when there is none to replace
    pub fn set_content(&mut self, content: String) -> bool {
        let Some(key) = self.content_key() else {
            return false;
        };
        match self.output_mut() {
            Some(output) => {
                output.insert(key.to_string(), Value::String(content));
                true
            }
            None => false,
        }
    }

    /// Host field outside `tool` and `output`
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.payload.get(name)
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.payload)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.payload)?)
    }

    fn output(&self) -> Option<&Map<String, Value>> {
        self.payload.get("output").and_then(Value::as_object)
    }

    fn output_mut(&mut self) -> Option<&mut Map<String, Value>> {
        self.payload.get_mut("output").and_then(Value::as_object_mut)
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
