//! # Validation Module
//!
//! Field-level checks applied before any write reaches the store.
//!
//! Every check returns a [`ValidationResult`] instead of panicking; handlers
//! branch on the result to pick the HTTP status. Request bodies arrive as a
//! JSON object map so that "key absent" and "key present but null" stay
//! distinguishable.

use crate::models::Strength;
use serde::Serialize;
use serde_json::{Map, Value};

/// Minimum number of characters in a power description
pub const MIN_DESCRIPTION_LEN: usize = 20;

/// Error code for categorizing validation failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidationCode {
    /// Required field is missing
    Required,
    /// Value is invalid type
    InvalidType,
    /// Value is too short
    TooShort,
    /// Value is not in allowed set
    InvalidChoice,
}

/// A single validation error for a specific field
#[derive(Debug, Clone, Serialize)]
pub struct FieldError {
    /// Field name (e.g., "description", "strength")
    pub field: String,
    /// Human-readable error message
    pub message: String,
    /// Machine-readable error code
    pub code: ValidationCode,
}

impl FieldError {
    /// Create a "required field" error
    pub fn required(field: impl Into<String>) -> Self {
        let field_str = field.into();
        Self {
            message: format!("{field_str} is required"),
            field: field_str,
            code: ValidationCode::Required,
        }
    }

    /// Create an "invalid type" error
    pub fn invalid_type(field: impl Into<String>, expected: &str) -> Self {
        let field_str = field.into();
        Self {
            message: format!("{field_str} must be {expected}"),
            field: field_str,
            code: ValidationCode::InvalidType,
        }
    }

    /// Create a "too short" error
    pub fn too_short(field: impl Into<String>, min: usize) -> Self {
        let field_str = field.into();
        Self {
            message: format!("{field_str} must be at least {min} characters"),
            field: field_str,
            code: ValidationCode::TooShort,
        }
    }

    /// Create an "invalid choice" error
    pub fn invalid_choice(field: impl Into<String>, allowed: &[&str]) -> Self {
        let field_str = field.into();
        Self {
            message: format!("{field_str} must be one of: {}", allowed.join(", ")),
            field: field_str,
            code: ValidationCode::InvalidChoice,
        }
    }
}

/// Collection of validation errors
///
/// Allows aggregating multiple field errors for a single request.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationErrors {
    /// List of field-level errors
    pub errors: Vec<FieldError>,
}

impl ValidationErrors {
    /// Create an empty error collection
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a collection holding a single error
    #[must_use]
    pub fn single(error: FieldError) -> Self {
        Self {
            errors: vec![error],
        }
    }

    /// Add a field error
    pub fn add(&mut self, error: FieldError) {
        self.errors.push(error);
    }

    /// Add a required field error
    pub fn add_required(&mut self, field: impl Into<String>) {
        self.add(FieldError::required(field));
    }

    /// Check if there are any errors
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Get the number of errors
    #[must_use]
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Names of the offending fields, in insertion order
    #[must_use]
    pub fn fields(&self) -> Vec<&str> {
        self.errors.iter().map(|e| e.field.as_str()).collect()
    }
}

/// Result type for validation operations
pub type ValidationResult<T> = std::result::Result<T, ValidationErrors>;

/// A power description that passed the length check
///
/// The store only accepts descriptions through this type, so an unchecked
/// string can never be written to `powers.description`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Description(String);

impl Description {
    /// Validate a raw description
    ///
    /// # Errors
    ///
    /// Returns a `TooShort` error when the text has fewer than
    /// [`MIN_DESCRIPTION_LEN`] characters.
    pub fn parse(raw: impl Into<String>) -> ValidationResult<Self> {
        let raw = raw.into();
        if raw.chars().count() < MIN_DESCRIPTION_LEN {
            return Err(ValidationErrors::single(FieldError::too_short(
                "description",
                MIN_DESCRIPTION_LEN,
            )));
        }
        Ok(Self(raw))
    }

    /// Borrow the validated text
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Truthiness of a JSON value
///
/// `null`, `false`, `0`, `""`, `[]` and `{}` are falsy.
#[must_use]
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

/// Check a `PATCH /powers/{id}` body
///
/// Returns `Ok(None)` when the body carries no `description` key, which
/// leaves the power untouched.
///
/// # Errors
///
/// Fails when `description` is present but null, not a string, empty or
/// shorter than [`MIN_DESCRIPTION_LEN`].
pub fn validate_power_patch(body: &Map<String, Value>) -> ValidationResult<Option<Description>> {
    match body.get("description") {
        None => Ok(None),
        Some(Value::String(s)) if s.is_empty() => {
            Err(ValidationErrors::single(FieldError::required("description")))
        }
        Some(Value::String(s)) => Description::parse(s.as_str()).map(Some),
        Some(Value::Null) => Err(ValidationErrors::single(FieldError::required("description"))),
        Some(_) => Err(ValidationErrors::single(FieldError::invalid_type(
            "description",
            "a string",
        ))),
    }
}

/// Presence check for the two foreign keys of a new hero power
///
/// Runs before any lookup; a falsy id such as `0` counts as missing.
///
/// # Errors
///
/// Lists every absent or falsy field.
pub fn require_references(body: &Map<String, Value>) -> ValidationResult<(&Value, &Value)> {
    let mut errors = ValidationErrors::new();
    let hero_id = body.get("hero_id").filter(|v| is_truthy(v));
    let power_id = body.get("power_id").filter(|v| is_truthy(v));

    if hero_id.is_none() {
        errors.add_required("hero_id");
    }
    if power_id.is_none() {
        errors.add_required("power_id");
    }

    match (hero_id, power_id) {
        (Some(h), Some(p)) => Ok((h, p)),
        _ => Err(errors),
    }
}

/// Largest float magnitude below which every integral `f64` is exact
const MAX_EXACT_FLOAT_ID: f64 = 9_007_199_254_740_992.0;

/// Resolve a present reference value to a row id
///
/// Mirrors how an `INTEGER PRIMARY KEY` compares against a bound value:
/// integers, integral floats (`1.0`), integer strings and `true` (as `1`)
/// resolve. Fractional numbers and everything else match no row.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn reference_id(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && f.abs() < MAX_EXACT_FLOAT_ID)
                .map(|f| f as i64)
        }),
        Value::String(s) => s.trim().parse().ok(),
        Value::Bool(true) => Some(1),
        _ => None,
    }
}

/// Check the `strength` of a new hero power
///
/// # Errors
///
/// Fails unless the value is exactly `"Strong"`, `"Weak"` or `"Average"`.
pub fn validate_strength(value: Option<&Value>) -> ValidationResult<Strength> {
    value
        .and_then(Value::as_str)
        .and_then(|s| s.parse::<Strength>().ok())
        .ok_or_else(|| {
            ValidationErrors::single(FieldError::invalid_choice("strength", &Strength::NAMES))
        })
}
