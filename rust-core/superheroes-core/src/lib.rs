//! # Superheroes Core
//!
//! Core library for the Superheroes API.
//! Serves heroes, powers and the hero/power links between them as JSON
//! over HTTP, backed by a SQLite store.
//!
//! ## Modules
//!
//! - `app` - Route table binding paths to handlers
//! - `config` - Environment-driven configuration
//! - `server` - HTTP server built on Hyper
//! - `router` - Routing using matchit (radix trie)
//! - `route` - Route metadata and path parameter types
//! - `request` - HTTP request wrapper
//! - `middleware` - Request/response middleware system
//! - `handlers` - One async function per endpoint
//! - `store` - SQLx SQLite persistence
//! - `models` - Hero, Power and HeroPower records
//! - `render` - Response shapes for each endpoint
//! - `json` - JSON parsing with simd-json
//! - `validation` - Field rules and structured validation errors
//! - `error` - Error types and their HTTP mapping

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod app;
pub mod config;
pub mod error;
pub mod handlers;
pub mod json;
pub mod middleware;
pub mod models;
pub mod render;
pub mod request;
pub mod route;
pub mod router;
pub mod server;
pub mod store;
pub mod validation;

pub use app::build_server;
pub use config::{Config, LogFormat};
pub use error::{ApiError, Error, Result};
pub use json::{parse_object, to_json_pretty};
pub use middleware::{LoggingMiddleware, Middleware, MiddlewareChain, TimingMiddleware};
pub use models::{Hero, HeroPower, NewHeroPower, Power, Strength};
pub use request::ApiRequest;
pub use route::{ParamType, ParamValue, RouteInfo};
pub use router::{Method, Router};
pub use server::{ApiResponse, Server, ServerConfig};
pub use store::Store;
pub use validation::{FieldError, ValidationCode, ValidationErrors, ValidationResult};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
