//! # JSON Serialization Module
//!
//! Request bodies are parsed with simd-json; responses are written with
//! serde_json, pretty-printed.

use crate::error::{Error, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

/// Parse JSON bytes to a typed value using simd-json
///
/// simd-json parses in place, so the buffer is clobbered.
///
/// # Errors
///
/// Returns `Error::Json` if parsing fails
pub fn parse_json_bytes<T: DeserializeOwned>(bytes: &mut [u8]) -> Result<T> {
    simd_json::from_slice(bytes).map_err(|e| Error::Json {
        message: format!("Parse error: {e}"),
    })
}

/// Parse a request body that must be a JSON object
///
/// # Errors
///
/// Returns `Error::Json` if the body is not valid JSON or its top level is
/// not an object.
pub fn parse_object(body: &[u8]) -> Result<Map<String, Value>> {
    let mut bytes = body.to_vec();
    match parse_json_bytes::<Value>(&mut bytes)? {
        Value::Object(map) => Ok(map),
        other => Err(Error::Json {
            message: format!("Expected a JSON object, found {}", kind(&other)),
        }),
    }
}

const fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Serialize a value to pretty-printed JSON string
///
/// # Errors
///
/// Returns `Error::Json` if the value cannot be serialized
pub fn to_json_pretty<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).map_err(|e| Error::Json {
        message: format!("Serialize error: {e}"),
    })
}
