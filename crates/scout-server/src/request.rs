//! Incoming tool invocations.
//!
//! The host protocol delivers parsed tool calls with string/number/bool
//! parameters; a few structured parameters (breakpoints, expressions,
//! inputValues) arrive as JSON-encoded strings to keep the schema flat.

use serde_json::{Map, Value};

use crate::error::DebugError;

/// A parsed tool invocation.
#[derive(Debug, Clone)]
pub struct ToolRequest {
    /// The tool name, e.g. "debug_launch".
    pub name: String,
    /// The tool parameters.
    pub arguments: Map<String, Value>,
}

impl ToolRequest {
    /// Build a request.
    pub fn new(name: impl Into<String>, arguments: Map<String, Value>) -> Self {
        Self {
            name: name.into(),
            arguments,
        }
    }

    /// A required string parameter; `description` becomes the error hint.
    pub fn require_str(&self, key: &str, description: &str) -> Result<&str, DebugError> {
        self.opt_str(key)
            .ok_or_else(|| DebugError::missing_parameter(key, description))
    }

    /// An optional string parameter. Empty strings count as absent.
    pub fn opt_str(&self, key: &str) -> Option<&str> {
        self.arguments
            .get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }

    /// A required numeric parameter.
    pub fn require_i64(&self, key: &str, description: &str) -> Result<i64, DebugError> {
        self.opt_i64(key)
            .ok_or_else(|| DebugError::missing_parameter(key, description))
    }

    /// An optional numeric parameter (tolerates JSON floats).
    pub fn opt_i64(&self, key: &str) -> Option<i64> {
        let value = self.arguments.get(key)?;
        value.as_i64().or_else(|| value.as_f64().map(|f| f as i64))
    }

    /// An optional bool parameter with a default.
    pub fn bool_or(&self, key: &str, default: bool) -> bool {
        self.arguments
            .get(key)
            .and_then(Value::as_bool)
            .unwrap_or(default)
    }

    /// Parse a JSON-encoded string parameter into a typed value.
    pub fn json_str<T: serde::de::DeserializeOwned>(
        &self,
        key: &str,
        example: &str,
    ) -> Result<Option<T>, DebugError> {
        let Some(raw) = self.opt_str(key) else {
            return Ok(None);
        };
        serde_json::from_str(raw)
            .map(Some)
            .map_err(|e| DebugError::invalid_json(key, &e, example))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(args: Value) -> ToolRequest {
        ToolRequest::new("test_tool", args.as_object().unwrap().clone())
    }

    #[test]
    fn require_str_present_and_missing() {
        let req = request(json!({"sessionId": "abc", "empty": ""}));
        assert_eq!(req.require_str("sessionId", "hint").unwrap(), "abc");

        let err = req.require_str("missing", "provide it").unwrap_err();
        assert_eq!(err.hint, "provide it");

        // Empty strings are treated as absent.
        assert!(req.require_str("empty", "hint").is_err());
    }

    #[test]
    fn numeric_accessors_tolerate_floats() {
        let req = request(json!({"threadId": 3.0, "line": 42}));
        assert_eq!(req.opt_i64("threadId"), Some(3));
        assert_eq!(req.require_i64("line", "hint").unwrap(), 42);
        assert!(req.require_i64("missing", "hint").is_err());
    }

    #[test]
    fn bool_defaults() {
        let req = request(json!({"stopOnEntry": true}));
        assert!(req.bool_or("stopOnEntry", false));
        assert!(req.bool_or("expandVariables", true));
        assert!(!req.bool_or("terminateDebuggee", false));
    }

    #[test]
    fn json_str_parses_typed() {
        let req = request(json!({"expressions": "[\"x\", \"y\"]"}));
        let exprs: Vec<String> = req
            .json_str("expressions", "[\"x\"]")
            .unwrap()
            .unwrap();
        assert_eq!(exprs, vec!["x".to_string(), "y".to_string()]);
    }

    #[test]
    fn json_str_absent_is_none() {
        let req = request(json!({}));
        let parsed: Option<Vec<String>> = req.json_str("expressions", "[]").unwrap();
        assert!(parsed.is_none());
    }

    #[test]
    fn json_str_invalid_reports_example() {
        let req = request(json!({"breakpoints": "not json"}));
        let err = req
            .json_str::<Vec<i64>>("breakpoints", "[{\"line\": 10}]")
            .unwrap_err();
        assert!(err.hint.contains("[{\"line\": 10}]"));
    }
}
