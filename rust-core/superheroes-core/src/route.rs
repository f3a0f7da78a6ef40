//! # Route Metadata
//!
//! Parsing of route patterns with typed path parameters.
//!
//! A pattern such as `/heroes/{id:int}` is normalized to `/heroes/{id}` for
//! matchit, and the declared type is kept so the router can reject segments
//! that do not convert (`/heroes/abc` does not match an `int` parameter).

use crate::error::{Error, Result};
use crate::router::HandlerId;
use std::collections::HashMap;
use std::fmt;

/// Supported path parameter types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ParamType {
    /// String type (default) - no conversion
    #[default]
    String,
    /// Integer type - parses to i64
    Int,
}

impl ParamType {
    /// Parse type specifier from route pattern (e.g., "int" from "{id:int}")
    #[must_use]
    pub fn from_specifier(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "int" | "integer" | "i64" => Self::Int,
            _ => Self::String,
        }
    }

    /// Get the type name for error messages
    #[must_use]
    pub const fn type_name(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Int => "int",
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}

/// Converted parameter value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamValue {
    /// String value (no conversion performed)
    String(String),
    /// Integer value (i64)
    Int(i64),
}

impl ParamValue {
    /// Get as i64 if Int variant
    #[must_use]
    pub const fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            Self::String(_) => None,
        }
    }
}

/// Convert raw segment to a typed value
///
/// # Errors
///
/// Returns `Error::InvalidRoutePattern` if the segment does not parse as
/// the declared type.
pub fn convert_param(raw: &str, param_type: ParamType) -> Result<ParamValue> {
    match param_type {
        ParamType::String => Ok(ParamValue::String(raw.to_string())),
        ParamType::Int => raw
            .parse::<i64>()
            .map(ParamValue::Int)
            .map_err(|_| Error::InvalidRoutePattern {
                pattern: raw.to_string(),
                reason: format!("Cannot convert '{raw}' to {param_type}"),
            }),
    }
}

/// Route metadata containing handler and type information
#[derive(Debug, Clone)]
pub struct RouteInfo {
    /// Unique handler identifier
    pub handler_id: HandlerId,
    /// Registered path pattern (e.g., "/heroes/{id:int}")
    pub path_pattern: String,
    /// Normalized path for matchit (e.g., "/heroes/{id}")
    pub match_pattern: String,
    /// Parameter name to type mapping
    pub param_types: HashMap<String, ParamType>,
}

impl RouteInfo {
    /// Create a new `RouteInfo` from a path pattern
    #[must_use]
    pub fn new(handler_id: HandlerId, path: &str) -> Self {
        let (match_pattern, param_types) = parse_path_pattern(path);

        Self {
            handler_id,
            path_pattern: path.to_string(),
            match_pattern,
            param_types,
        }
    }

    /// Get the type for a parameter by name
    ///
    /// Returns `ParamType::String` if the parameter was declared untyped.
    #[must_use]
    pub fn get_param_type(&self, name: &str) -> ParamType {
        self.param_types.get(name).copied().unwrap_or_default()
    }
}

/// Parse a single segment, `Some((name, type))` for `{name}` / `{name:type}`
fn parse_param_segment(segment: &str) -> Option<(String, ParamType)> {
    let inner = segment.strip_prefix('{')?.strip_suffix('}')?;
    Some(match inner.split_once(':') {
        Some((name, type_spec)) => (name.to_string(), ParamType::from_specifier(type_spec)),
        None => (inner.to_string(), ParamType::String),
    })
}

fn parse_path_pattern(path: &str) -> (String, HashMap<String, ParamType>) {
    let mut param_types = HashMap::new();
    let mut normalized_parts = Vec::new();

    for segment in path.split('/').filter(|s| !s.is_empty()) {
        if let Some((name, param_type)) = parse_param_segment(segment) {
            normalized_parts.push(format!("{{{name}}}"));
            param_types.insert(name, param_type);
        } else {
            normalized_parts.push(segment.to_string());
        }
    }

    let normalized = format!("/{}", normalized_parts.join("/"));
    (normalized, param_types)
}
