//! # Router
//!
//! Radix-trie based router using `matchit`, one trie per HTTP method.
//!
//! - Typed parameters (`/heroes/{id:int}`) act as constraints: a segment
//!   that does not convert is treated as no match
//! - A path that matches under a different method yields
//!   `Error::MethodNotAllowed` rather than `Error::RouteNotFound`

use crate::error::{Error, Result};
use crate::route::{convert_param, ParamValue, RouteInfo};
use matchit::Router as MatchitRouter;
use std::collections::HashMap;
use tracing::debug;

/// HTTP methods supported by the router
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// HTTP GET
    Get,
    /// HTTP POST
    Post,
    /// HTTP PUT
    Put,
    /// HTTP DELETE
    Delete,
    /// HTTP PATCH
    Patch,
    /// HTTP HEAD
    Head,
    /// HTTP OPTIONS
    Options,
}

impl Method {
    /// Every method, in the order used for `Allow` headers
    pub const ALL: [Self; 7] = [
        Self::Get,
        Self::Head,
        Self::Post,
        Self::Put,
        Self::Patch,
        Self::Delete,
        Self::Options,
    ];
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Get => write!(f, "GET"),
            Self::Post => write!(f, "POST"),
            Self::Put => write!(f, "PUT"),
            Self::Delete => write!(f, "DELETE"),
            Self::Patch => write!(f, "PATCH"),
            Self::Head => write!(f, "HEAD"),
            Self::Options => write!(f, "OPTIONS"),
        }
    }
}

impl TryFrom<&hyper::Method> for Method {
    type Error = Error;

    fn try_from(method: &hyper::Method) -> Result<Self> {
        match *method {
            hyper::Method::GET => Ok(Self::Get),
            hyper::Method::POST => Ok(Self::Post),
            hyper::Method::PUT => Ok(Self::Put),
            hyper::Method::DELETE => Ok(Self::Delete),
            hyper::Method::PATCH => Ok(Self::Patch),
            hyper::Method::HEAD => Ok(Self::Head),
            hyper::Method::OPTIONS => Ok(Self::Options),
            _ => Err(Error::MethodNotAllowed {
                method: method.to_string(),
                path: String::new(),
            }),
        }
    }
}

/// Route handler identifier
pub type HandlerId = usize;

/// Matched route with converted parameters
#[derive(Debug, Clone)]
pub struct Match {
    /// The handler ID for this route
    pub handler_id: HandlerId,
    /// Typed path parameters
    pub params: HashMap<String, ParamValue>,
}

/// Per-method storage for routes
#[derive(Clone)]
struct MethodRoutes {
    /// Matchit router for path matching
    router: MatchitRouter<HandlerId>,
    /// Route metadata indexed by handler ID
    routes: HashMap<HandlerId, RouteInfo>,
}

impl MethodRoutes {
    fn new() -> Self {
        Self {
            router: MatchitRouter::new(),
            routes: HashMap::new(),
        }
    }

    /// Match and convert; `None` when the path or a typed segment fails
    fn lookup(&self, path: &str) -> Option<Match> {
        let matched = self.router.at(path).ok()?;
        let handler_id = *matched.value;
        let route_info = self.routes.get(&handler_id)?;

        let mut params = HashMap::new();
        for (name, raw) in matched.params.iter() {
            let value = convert_param(raw, route_info.get_param_type(name)).ok()?;
            params.insert(name.to_string(), value);
        }

        Some(Match { handler_id, params })
    }
}

/// HTTP router using one radix trie per method
#[derive(Clone, Default)]
pub struct Router {
    /// Per-method routers for efficient matching
    method_routes: HashMap<Method, MethodRoutes>,
    /// Counter for generating handler IDs
    next_handler_id: HandlerId,
}

impl Router {
    /// Create a new empty router
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a route with the given method and path pattern
    ///
    /// Handler IDs are assigned sequentially from 0.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidRoutePattern` if the pattern is malformed or
    /// conflicts with an existing route
    pub fn add_route(&mut self, method: Method, path: &str) -> Result<HandlerId> {
        let handler_id = self.next_handler_id;
        let route_info = RouteInfo::new(handler_id, path);

        let method_routes = self
            .method_routes
            .entry(method)
            .or_insert_with(MethodRoutes::new);

        method_routes
            .router
            .insert(route_info.match_pattern.clone(), handler_id)
            .map_err(|e| Error::InvalidRoutePattern {
                pattern: path.to_string(),
                reason: e.to_string(),
            })?;

        debug!(method = %method, pattern = %route_info.path_pattern, handler_id, "Route registered");
        method_routes.routes.insert(handler_id, route_info);
        self.next_handler_id += 1;

        Ok(handler_id)
    }

    /// Match a request path against registered routes
    ///
    /// `HEAD` falls back to the `GET` route of the same path.
    ///
    /// # Errors
    ///
    /// Returns `Error::MethodNotAllowed` if the path is registered for
    /// another method only, `Error::RouteNotFound` otherwise
    pub fn match_route(&self, method: Method, path: &str) -> Result<Match> {
        if let Some(found) = self.lookup(method, path) {
            return Ok(found);
        }
        if method == Method::Head {
            if let Some(found) = self.lookup(Method::Get, path) {
                return Ok(found);
            }
        }

        if self.allowed_methods(path).is_empty() {
            Err(Error::RouteNotFound {
                path: path.to_string(),
            })
        } else {
            Err(Error::MethodNotAllowed {
                method: method.to_string(),
                path: path.to_string(),
            })
        }
    }

    /// Methods a path answers to, in [`Method::ALL`] order
    ///
    /// Empty for unknown paths. A `GET` route implies `HEAD`, and any known
    /// path answers `OPTIONS`.
    #[must_use]
    pub fn allowed_methods(&self, path: &str) -> Vec<Method> {
        let registered: Vec<Method> = Method::ALL
            .into_iter()
            .filter(|m| self.lookup(*m, path).is_some())
            .collect();
        if registered.is_empty() {
            return registered;
        }

        Method::ALL
            .into_iter()
            .filter(|m| {
                registered.contains(m)
                    || (*m == Method::Head && registered.contains(&Method::Get))
                    || *m == Method::Options
            })
            .collect()
    }

    fn lookup(&self, method: Method, path: &str) -> Option<Match> {
        self.method_routes
            .get(&method)
            .and_then(|routes| routes.lookup(path))
    }
}
