//! # Error Handling
//!
//! Centralized error types for the Superheroes core.
//! Uses `thiserror` for ergonomic error definitions.
//!
//! Two layers live here:
//!
//! - [`Error`] - infrastructure failures (binding, routing, database, config)
//! - [`ApiError`] - the request-level taxonomy handlers return, each variant
//!   mapping to one HTTP status and one JSON body shape

use crate::server::ApiResponse;
use crate::validation::ValidationErrors;
use thiserror::Error;
use tracing::error;

/// Result type alias for core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for the Superheroes runtime
#[derive(Error, Debug)]
pub enum Error {
    /// Server failed to bind to the specified address
    #[error("Failed to bind server to {address}: {source}")]
    BindError {
        /// The address we tried to bind to
        address: String,
        /// The underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// Router failed to match the requested path
    #[error("No route found for path: {path}")]
    RouteNotFound {
        /// The path that wasn't matched
        path: String,
    },

    /// Path exists but not for the requested method
    #[error("Method {method} not allowed for path: {path}")]
    MethodNotAllowed {
        /// The rejected method
        method: String,
        /// The matched path
        path: String,
    },

    /// Invalid route pattern provided
    #[error("Invalid route pattern: {pattern}: {reason}")]
    InvalidRoutePattern {
        /// The invalid pattern
        pattern: String,
        /// Reason for invalidity
        reason: String,
    },

    /// HTTP protocol error
    #[error("HTTP error: {0}")]
    Http(#[from] hyper::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {message}")]
    Json {
        /// Parser or serializer message
        message: String,
    },

    /// Database error
    #[error("Database error: {message}")]
    Database {
        /// Error message from database
        message: String,
    },

    /// Configuration value could not be used
    #[error("Invalid configuration for {key}: {reason}")]
    Config {
        /// Environment variable name
        key: String,
        /// Why the value was rejected
        reason: String,
    },

    /// Request payload too large
    #[error("Payload too large: limit={limit} bytes, received={actual} bytes")]
    PayloadTooLarge {
        /// Max allowed size
        limit: usize,
        /// Actual size
        actual: usize,
    },
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        Self::Database {
            message: err.to_string(),
        }
    }
}

/// Request-level failures produced by handlers
///
/// Every variant is recovered into a structured JSON response; none of them
/// escape as a fault to the client.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Looked-up entity does not exist
    #[error("{0}")]
    NotFound(&'static str),

    /// `hero_id` or `power_id` absent or falsy on a composite create
    #[error("Missing field(s)")]
    MissingFields,

    /// A referenced hero or power does not exist
    #[error("Invalid hero or power id.")]
    InvalidReference,

    /// A field value violates a domain invariant
    #[error("validation errors")]
    Validation(ValidationErrors),

    /// Request body is not a JSON object
    #[error("Invalid JSON body")]
    MalformedBody,

    /// Store or serialization failure
    #[error("Internal Server Error")]
    Internal(#[from] Error),
}

impl ApiError {
    /// HTTP status code for this error
    #[must_use]
    pub const fn status(&self) -> u16 {
        match self {
            Self::NotFound(_) | Self::InvalidReference => 404,
            Self::MissingFields | Self::Validation(_) | Self::MalformedBody => 400,
            Self::Internal(_) => 500,
        }
    }

    /// Render as a JSON response
    ///
    /// Validation failures use the `{"errors": [...]}` shape; everything
    /// else uses `{"error": "..."}`.
    #[must_use]
    pub fn into_response(self) -> ApiResponse {
        let status = self.status();
        let body = match &self {
            Self::Validation(errors) => {
                tracing::debug!(count = errors.len(), fields = ?errors.fields(), "Validation failed");
                serde_json::json!({ "errors": ["validation errors"] })
            }
            Self::Internal(source) => {
                error!(error = %source, "Request failed");
                serde_json::json!({ "error": self.to_string() })
            }
            _ => serde_json::json!({ "error": self.to_string() }),
        };
        ApiResponse::json_value(&body).with_status(status)
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        Self::Validation(errors)
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        Self::Internal(err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::FieldError;

    #[test]
    fn test_route_not_found_error() {
        let err = Error::RouteNotFound {
            path: "/unknown".to_string(),
        };
        assert!(err.to_string().contains("/unknown"));
    }

    #[test]
    fn test_bind_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::AddrInUse, "address in use");
        let err = Error::BindError {
            address: "0.0.0.0:5555".to_string(),
            source: io_err,
        };
        assert!(err.to_string().contains("0.0.0.0:5555"));
    }

    #[test]
    fn test_not_found_body() {
        let resp = ApiError::NotFound("Hero not found.").into_response();
        assert_eq!(resp.status, 404);
        let body: serde_json::Value = serde_json::from_str(&resp.body).unwrap();
        assert_eq!(body, serde_json::json!({"error": "Hero not found."}));
    }

    #[test]
    fn test_validation_body_shape() {
        let mut errors = ValidationErrors::new();
        errors.add(FieldError::too_short("description", 20));
        let resp = ApiError::from(errors).into_response();
        assert_eq!(resp.status, 400);
        let body: serde_json::Value = serde_json::from_str(&resp.body).unwrap();
        assert_eq!(body, serde_json::json!({"errors": ["validation errors"]}));
    }

    #[test]
    fn test_missing_and_invalid_reference() {
        let missing = ApiError::MissingFields.into_response();
        assert_eq!(missing.status, 400);
        assert!(missing.body.contains("Missing field(s)"));

        let invalid = ApiError::InvalidReference.into_response();
        assert_eq!(invalid.status, 404);
        assert!(invalid.body.contains("Invalid hero or power id."));
    }

    #[test]
    fn test_internal_hides_details() {
        let err = ApiError::from(Error::Database {
            message: "disk I/O error".to_string(),
        });
        let resp = err.into_response();
        assert_eq!(resp.status, 500);
        assert!(!resp.body.contains("disk"));
    }
}
