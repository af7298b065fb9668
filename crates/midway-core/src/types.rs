// SPDX-FileCopyrightText: 2026 Midway Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types shared by discovery, the catalog, and the dispatcher.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::{Display, EnumString};

use crate::error::MidwayError;

/// Identifier reserved for the abstract base unit. Never visible in a registry.
pub const BASE_UID: &str = "base_middleware";

/// Description used when a unit does not declare one.
pub const DEFAULT_DESCRIPTION: &str = "No description provided.";

/// Per-instance configuration: a string-keyed JSON object.
pub type ConfigPayload = serde_json::Map<String, Value>;

/// Identity of a unit: stable identifier plus display name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UnitDescriptor {
    pub uid: String,
    pub name: String,
}

impl UnitDescriptor {
    pub fn new(uid: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            name: name.into(),
        }
    }

    /// Returns true if this descriptor holds the reserved base identifier.
    pub fn is_base(&self) -> bool {
        self.uid == BASE_UID
    }
}

/// Opaque processing context owned by the host pipeline.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProcessingContext(pub Value);

/// Opaque processing result handed back to the host pipeline.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProcessingResult(pub Value);

impl From<ProcessingContext> for ProcessingResult {
    fn from(context: ProcessingContext) -> Self {
        ProcessingResult(context.0)
    }
}

/// Log levels a unit may use through the `log` host function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "UPPERCASE")]
pub enum UnitLogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl UnitLogLevel {
    /// Maps the numeric level passed across the sandbox boundary.
    /// Unknown values are treated as `Info`.
    pub fn from_raw(level: i32) -> Self {
        match level {
            0 => UnitLogLevel::Trace,
            1 => UnitLogLevel::Debug,
            3 => UnitLogLevel::Warn,
            4 => UnitLogLevel::Error,
            _ => UnitLogLevel::Info,
        }
    }
}

/// Converts an arbitrary JSON value into a configuration payload.
///
/// `null` becomes the empty mapping; anything other than an object is rejected.
pub fn config_payload_from_value(value: Value) -> Result<ConfigPayload, MidwayError> {
    match value {
        Value::Null => Ok(ConfigPayload::new()),
        Value::Object(map) => Ok(map),
        other => Err(MidwayError::ConfigurationParse {
            message: format!("expected a JSON object, found {}", json_type_name(&other)),
            source: None,
        }),
    }
}

/// Parses the serialized configuration text coming from an editor surface.
///
/// Blank text is treated as the empty mapping.
pub fn parse_config_payload(text: &str) -> Result<ConfigPayload, MidwayError> {
    if text.trim().is_empty() {
        return Ok(ConfigPayload::new());
    }
    let value: Value =
        serde_json::from_str(text).map_err(|e| MidwayError::ConfigurationParse {
            message: format!("configuration is not valid JSON: {e}"),
            source: Some(Box::new(e)),
        })?;
    config_payload_from_value(value)
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn blank_config_text_is_empty_mapping() {
        assert!(parse_config_payload("").unwrap().is_empty());
        assert!(parse_config_payload("  \n").unwrap().is_empty());
        assert!(parse_config_payload("null").unwrap().is_empty());
    }

    #[test]
    fn config_text_object_parses() {
        let payload = parse_config_payload(r#"{"strength": 0.5, "steps": [1, 2]}"#).unwrap();
        assert_eq!(payload["strength"], serde_json::json!(0.5));
        assert_eq!(payload["steps"], serde_json::json!([1, 2]));
    }

    #[test]
    fn invalid_config_text_is_parse_error() {
        let err = parse_config_payload("{not json").unwrap_err();
        assert!(matches!(err, MidwayError::ConfigurationParse { .. }));
        assert!(err.to_string().contains("not valid JSON"));
    }

    #[test]
    fn non_object_config_is_parse_error() {
        let err = parse_config_payload("[1, 2, 3]").unwrap_err();
        assert!(err.to_string().contains("an array"));
    }

    #[test]
    fn base_descriptor_detection() {
        assert!(UnitDescriptor::new(BASE_UID, "Base Middleware").is_base());
        assert!(!UnitDescriptor::new("example_middleware", "Example").is_base());
    }

    #[test]
    fn unit_log_level_mapping() {
        assert_eq!(UnitLogLevel::from_raw(0), UnitLogLevel::Trace);
        assert_eq!(UnitLogLevel::from_raw(4), UnitLogLevel::Error);
        assert_eq!(UnitLogLevel::from_raw(99), UnitLogLevel::Info);
        assert_eq!(UnitLogLevel::Warn.to_string(), "WARN");
        assert_eq!(UnitLogLevel::from_str("DEBUG").unwrap(), UnitLogLevel::Debug);
    }

    #[test]
    fn processing_context_is_transparent_json() {
        let ctx = ProcessingContext(serde_json::json!({"prompt": "a cat"}));
        let json = serde_json::to_string(&ctx).unwrap();
        assert_eq!(json, r#"{"prompt":"a cat"}"#);
        let result: ProcessingResult = ctx.into();
        assert_eq!(result.0["prompt"], "a cat");
    }
}
