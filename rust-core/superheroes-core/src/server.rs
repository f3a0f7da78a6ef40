//! # HTTP Server
//!
//! HTTP/1 server built on Hyper and Tokio.
//! Implements graceful shutdown with signal handling.
//!
//! ## Key Features
//!
//! - One Tokio task per connection
//! - Graceful shutdown on Ctrl-C or SIGTERM: idle keep-alive connections
//!   close at once, in-flight requests get up to `shutdown_timeout`
//! - `HEAD` served by the `GET` route, `OPTIONS` answered from the route
//!   table with an `Allow` header
//! - Request body size limit
//! - Network-free [`Server::test_request`] for exercising routes in tests

use crate::error::{Error, Result};
use crate::json::to_json_pretty;
use crate::middleware::{Middleware, MiddlewareChain, MiddlewareResult};
use crate::request::ApiRequest;
use crate::router::{Method, Router};
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::{HeaderName, HeaderValue, CONTENT_TYPE};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use hyper_util::server::graceful::GracefulShutdown;
use serde::Serialize;
use std::collections::HashMap;
use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// HTTP Server configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Address to bind the server to
    pub address: SocketAddr,
    /// Enable keep-alive connections
    pub keep_alive: bool,
    /// Shutdown timeout for graceful shutdown (default: 30 seconds)
    pub shutdown_timeout: Duration,
    /// Max request body size in bytes
    pub max_body_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: ([127, 0, 0, 1], 5555).into(),
            keep_alive: true,
            shutdown_timeout: Duration::from_secs(30),
            max_body_size: 1024 * 1024,
        }
    }
}

/// HTTP response produced by handlers and middleware
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    /// HTTP status code
    pub status: u16,
    /// Response body
    pub body: String,
    /// Content type
    pub content_type: String,
    /// Response headers
    pub headers: HashMap<String, String>,
}

impl Default for ApiResponse {
    fn default() -> Self {
        Self {
            status: 200,
            body: String::new(),
            content_type: "application/json".to_string(),
            headers: HashMap::new(),
        }
    }
}

impl ApiResponse {
    /// Create a JSON response from an already encoded body
    #[must_use]
    pub fn json(body: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            ..Self::default()
        }
    }

    /// Serialize a value as a pretty-printed JSON response
    ///
    /// # Errors
    ///
    /// Returns `Error::Json` if serialization fails
    pub fn json_body<T: Serialize>(value: &T) -> Result<Self> {
        Ok(Self::json(to_json_pretty(value)?))
    }

    /// JSON response from a `serde_json::Value`
    #[must_use]
    pub fn json_value(value: &serde_json::Value) -> Self {
        // Serializing a Value cannot fail.
        Self::json(to_json_pretty(value).unwrap_or_default())
    }

    /// Create an HTML response
    #[must_use]
    pub fn html(body: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            content_type: "text/html; charset=utf-8".to_string(),
            ..Self::default()
        }
    }

    /// Set status code
    #[must_use]
    pub const fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    /// Set or override a header
    pub fn set_header(&mut self, key: &str, value: &str) {
        if key.eq_ignore_ascii_case("content-type") {
            self.content_type = value.to_string();
        } else {
            self.headers.insert(key.to_ascii_lowercase(), value.to_string());
        }
    }

    /// Parse the body back into JSON
    #[cfg(test)]
    pub(crate) fn json_value_body(&self) -> Result<serde_json::Value> {
        serde_json::from_str(&self.body).map_err(|e| Error::Json {
            message: e.to_string(),
        })
    }

    /// Convert to hyper Response
    fn into_hyper(self) -> Response<Full<Bytes>> {
        let mut response = Response::new(Full::new(Bytes::from(self.body)));
        *response.status_mut() =
            StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let headers = response.headers_mut();
        if let Ok(value) = HeaderValue::from_str(&self.content_type) {
            headers.insert(CONTENT_TYPE, value);
        }
        for (k, v) in &self.headers {
            if let (Ok(name), Ok(value)) = (
                HeaderName::from_bytes(k.as_bytes()),
                HeaderValue::from_str(v),
            ) {
                headers.insert(name, value);
            }
        }
        response
    }
}

fn error_response(status: u16, message: &str) -> ApiResponse {
    ApiResponse::json_value(&serde_json::json!({ "error": message })).with_status(status)
}

/// Boxed response future returned by handlers
pub type BoxFuture = Pin<Box<dyn Future<Output = ApiResponse> + Send>>;

/// Handler function type (async)
///
/// Handlers receive the routed request and must clone whatever they need
/// into the returned future.
pub type Handler = Arc<dyn Fn(&ApiRequest) -> BoxFuture + Send + Sync>;

/// HTTP server: router, handler table and middleware chain
pub struct Server {
    config: ServerConfig,
    router: Router,
    handlers: Vec<Handler>,
    middleware: MiddlewareChain,
}

impl Server {
    /// Create a new Server instance
    #[must_use]
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config,
            router: Router::new(),
            handlers: Vec::new(),
            middleware: MiddlewareChain::new(),
        }
    }

    /// Add a middleware to the chain
    pub fn add_middleware<M: Middleware + 'static>(&mut self, middleware: M) {
        self.middleware.add(middleware);
    }

    /// Add a route and its handler
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidRoutePattern` if the router rejects the path
    pub fn add_route(&mut self, method: Method, path: &str, handler: Handler) -> Result<()> {
        let handler_id = self.router.add_route(method, path)?;
        debug_assert_eq!(handler_id, self.handlers.len());
        self.handlers.push(handler);
        Ok(())
    }

    /// Start the server; stops on Ctrl-C or SIGTERM
    ///
    /// # Errors
    ///
    /// Returns `Error::BindError` if the address cannot be bound
    pub async fn serve(&self) -> Result<()> {
        self.serve_with_shutdown(shutdown_signal()).await
    }

    /// Start the server; stops when `signal` resolves
    ///
    /// In-flight connections get up to `shutdown_timeout` to finish.
    ///
    /// # Errors
    ///
    /// Returns `Error::BindError` if the address cannot be bound
    pub async fn serve_with_shutdown<F>(&self, signal: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let addr = self.config.address;
        let bind_error = |source| Error::BindError {
            address: addr.to_string(),
            source,
        };

        let socket = (if addr.is_ipv4() {
            tokio::net::TcpSocket::new_v4()
        } else {
            tokio::net::TcpSocket::new_v6()
        })
        .map_err(bind_error)?;
        socket.set_reuseaddr(true).map_err(bind_error)?;
        socket.bind(addr).map_err(bind_error)?;
        let listener = socket.listen(1024).map_err(bind_error)?;

        info!(
            routes = self.handlers.len(),
            middleware = self.middleware.len(),
            "Server listening on http://{}",
            addr
        );

        let router = Arc::new(self.router.clone());
        let handlers = Arc::new(self.handlers.clone());
        let middleware = Arc::new(self.middleware.clone());
        let graceful = GracefulShutdown::new();
        let max_body_size = self.config.max_body_size;
        let keep_alive = self.config.keep_alive;

        tokio::pin!(signal);

        loop {
            tokio::select! {
                accept_result = listener.accept() => {
                    let (stream, remote_addr) = match accept_result {
                        Ok(accepted) => accepted,
                        Err(e) => {
                            warn!("Failed to accept connection: {}", e);
                            continue;
                        }
                    };
                    let io = TokioIo::new(stream);

                    let router = router.clone();
                    let handlers = handlers.clone();
                    let middleware = middleware.clone();

                    let service = service_fn(move |req| {
                        let router = router.clone();
                        let handlers = handlers.clone();
                        let middleware = middleware.clone();
                        async move {
                            let method = req.method().clone();
                            let path = req.uri().path().to_string();
                            let version = req.version();

                            let response =
                                handle_request(req, &router, &handlers, &middleware, max_body_size)
                                    .await;

                            info!("    {} - \"{} {} {:?}\" {}",
                                remote_addr,
                                method,
                                path,
                                version,
                                response.status()
                            );
                            Ok::<_, hyper::Error>(response)
                        }
                    });

                    // Watched before the next accept, so a connection accepted
                    // just ahead of the signal is still drained.
                    let conn = http1::Builder::new()
                        .keep_alive(keep_alive)
                        .serve_connection(io, service);
                    let conn = graceful.watch(conn);

                    tokio::task::spawn(async move {
                        if let Err(err) = conn.await {
                            error!("Error serving connection: {:?}", err);
                        }
                    });
                }
                () = &mut signal => {
                    info!("Shutdown signal received, stopping server...");
                    break;
                }
            }
        }

        drop(listener);
        if tokio::time::timeout(self.config.shutdown_timeout, graceful.shutdown())
            .await
            .is_err()
        {
            warn!("Shutdown timeout elapsed with connections still open");
        } else {
            info!("All connections closed");
        }
        Ok(())
    }

    /// Execute a test request directly without network stack
    pub async fn test_request(
        &self,
        method: Method,
        path: &str,
        headers: HashMap<String, String>,
        body: Option<Bytes>,
    ) -> ApiResponse {
        if let Some(b) = body.as_ref() {
            if b.len() > self.config.max_body_size {
                return error_response(413, "Payload Too Large");
            }
        }
        let mut req = ApiRequest::new(method, path, headers, body);
        process_request(&mut req, &self.router, &self.handlers, &self.middleware).await
    }
}

/// Resolves on Ctrl-C, or on SIGTERM where the platform has it
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to install Ctrl-C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}

/// `Allow` header value for a path, e.g. `GET, HEAD, OPTIONS`
fn allow_header(router: &Router, path: &str) -> String {
    router
        .allowed_methods(path)
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Core request processing logic (network agnostic)
async fn process_request(
    req: &mut ApiRequest,
    router: &Router,
    handlers: &[Handler],
    middleware: &MiddlewareChain,
) -> ApiResponse {
    if req.header("x-request-id").is_none() {
        let request_id = generate_request_id();
        req.set_header("x-request-id", &request_id);
    }

    let mut response = match middleware.run_before(req) {
        MiddlewareResult::Respond(resp) => resp,
        MiddlewareResult::Continue => match router.match_route(req.method, &req.path) {
            Ok(matched) => {
                req.params = matched.params;
                match handlers.get(matched.handler_id) {
                    Some(handler) => handler(&*req).await,
                    None => {
                        error!(handler_id = matched.handler_id, "Route has no handler");
                        error_response(500, "Internal Server Error")
                    }
                }
            }
            Err(Error::MethodNotAllowed { .. }) => {
                let mut resp = if req.method == Method::Options {
                    ApiResponse::html("")
                } else {
                    error_response(405, "Method Not Allowed")
                };
                resp.set_header("allow", &allow_header(router, &req.path));
                resp
            }
            Err(_) => error_response(404, "Not Found"),
        },
    };

    if let Some(request_id) = req.header("x-request-id") {
        response.set_header("x-request-id", request_id);
    }
    middleware.run_after(req, &mut response);
    response
}

async fn handle_request(
    req: Request<hyper::body::Incoming>,
    router: &Router,
    handlers: &[Handler],
    middleware: &MiddlewareChain,
    max_body_size: usize,
) -> Response<Full<Bytes>> {
    let mut api_request = match ApiRequest::from_hyper_with_limit(req, max_body_size).await {
        Ok(r) => r,
        Err(Error::PayloadTooLarge { limit, actual }) => {
            warn!(limit, actual, "Rejected oversized body");
            return error_response(413, "Payload Too Large").into_hyper();
        }
        Err(Error::MethodNotAllowed { method, .. }) => {
            warn!(method = %method, "Unsupported HTTP method");
            return error_response(405, "Method Not Allowed").into_hyper();
        }
        Err(e) => {
            error!("Failed to parse request: {}", e);
            return error_response(400, "Bad Request").into_hyper();
        }
    };

    process_request(&mut api_request, router, handlers, middleware)
        .await
        .into_hyper()
}

static REQUEST_COUNTER: AtomicUsize = AtomicUsize::new(1);

fn generate_request_id() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    let counter = REQUEST_COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("{:x}-{:x}", now.as_nanos(), counter)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn echo_handler() -> Handler {
        Arc::new(|req: &ApiRequest| -> BoxFuture {
            let id = req.param_int("id");
            Box::pin(async move { ApiResponse::json(format!("{{\"id\": {}}}", id.unwrap_or(-1))) })
        })
    }

    #[test]
    fn test_api_response_json() {
        let resp = ApiResponse::json(r#"{"status": "ok"}"#);
        assert_eq!(resp.status, 200);
        assert_eq!(resp.content_type, "application/json");
    }

    #[test]
    fn test_api_response_html() {
        let resp = ApiResponse::html("<h1>Code challenge</h1>");
        assert!(resp.content_type.starts_with("text/html"));
    }

    #[test]
    fn test_api_response_with_status() {
        let resp = ApiResponse::html("Not Found").with_status(404);
        assert_eq!(resp.status, 404);
    }

    #[test]
    fn test_into_hyper_sets_headers() {
        let mut resp = ApiResponse::json("{}").with_status(201);
        resp.set_header("X-Request-Id", "abc");
        let hyper_resp = resp.into_hyper();
        assert_eq!(hyper_resp.status(), StatusCode::CREATED);
        assert_eq!(hyper_resp.headers()["content-type"], "application/json");
        assert_eq!(hyper_resp.headers()["x-request-id"], "abc");
    }

    #[test]
    fn test_server_config_default() {
        let config = ServerConfig::default();
        assert_eq!(config.address.port(), 5555);
        assert!(config.keep_alive);
    }

    #[tokio::test]
    async fn test_request_routes_to_handler() {
        let mut server = Server::new(ServerConfig::default());
        server
            .add_route(Method::Get, "/heroes/{id:int}", echo_handler())
            .unwrap();

        let resp = server
            .test_request(Method::Get, "/heroes/7", HashMap::new(), None)
            .await;
        assert_eq!(resp.status, 200);
        assert_eq!(resp.json_value_body().unwrap()["id"], 7);
        assert!(resp.headers.contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn test_request_not_found_and_method_not_allowed() {
        let mut server = Server::new(ServerConfig::default());
        server
            .add_route(Method::Get, "/heroes/{id:int}", echo_handler())
            .unwrap();

        let resp = server
            .test_request(Method::Get, "/villains", HashMap::new(), None)
            .await;
        assert_eq!(resp.status, 404);
        assert_eq!(resp.json_value_body().unwrap()["error"], "Not Found");

        let resp = server
            .test_request(Method::Delete, "/heroes/7", HashMap::new(), None)
            .await;
        assert_eq!(resp.status, 405);
    }

    #[tokio::test]
    async fn test_head_and_options_follow_route_table() {
        let mut server = Server::new(ServerConfig::default());
        server
            .add_route(Method::Get, "/heroes/{id:int}", echo_handler())
            .unwrap();

        let resp = server
            .test_request(Method::Head, "/heroes/7", HashMap::new(), None)
            .await;
        assert_eq!(resp.status, 200);

        let resp = server
            .test_request(Method::Options, "/heroes/7", HashMap::new(), None)
            .await;
        assert_eq!(resp.status, 200);
        assert!(resp.body.is_empty());
        assert_eq!(
            resp.headers.get("allow").map(String::as_str),
            Some("GET, HEAD, OPTIONS")
        );

        let resp = server
            .test_request(Method::Delete, "/heroes/7", HashMap::new(), None)
            .await;
        assert_eq!(resp.status, 405);
        assert_eq!(
            resp.headers.get("allow").map(String::as_str),
            Some("GET, HEAD, OPTIONS")
        );

        let resp = server
            .test_request(Method::Options, "/villains", HashMap::new(), None)
            .await;
        assert_eq!(resp.status, 404);
    }

    #[tokio::test]
    async fn test_request_propagates_request_id() {
        let mut server = Server::new(ServerConfig::default());
        server.add_route(Method::Get, "/", echo_handler()).unwrap();

        let mut headers = HashMap::new();
        headers.insert("x-request-id".to_string(), "req-42".to_string());
        let resp = server.test_request(Method::Get, "/", headers, None).await;
        assert_eq!(resp.headers.get("x-request-id").map(String::as_str), Some("req-42"));
    }

    #[tokio::test]
    async fn test_request_payload_too_large() {
        let config = ServerConfig {
            max_body_size: 4,
            ..ServerConfig::default()
        };
        let server = Server::new(config);
        let resp = server
            .test_request(
                Method::Post,
                "/hero_powers",
                HashMap::new(),
                Some(Bytes::from_static(b"{\"hero_id\": 1}")),
            )
            .await;
        assert_eq!(resp.status, 413);
    }

    fn free_local_addr() -> SocketAddr {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap()
    }

    async fn connect_with_retry(addr: SocketAddr) -> tokio::net::TcpStream {
        for _ in 0..100 {
            if let Ok(stream) = tokio::net::TcpStream::connect(addr).await {
                return stream;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("server never started listening on {addr}");
    }

    #[tokio::test]
    async fn test_shutdown_does_not_wait_for_idle_keep_alive() {
        use std::time::Instant;
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let config = ServerConfig {
            address: free_local_addr(),
            shutdown_timeout: Duration::from_secs(10),
            ..ServerConfig::default()
        };
        let addr = config.address;
        let mut server = Server::new(config);
        server
            .add_route(Method::Get, "/heroes/{id:int}", echo_handler())
            .unwrap();
        let server = Arc::new(server);

        let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
        let running = tokio::spawn({
            let server = server.clone();
            async move {
                server
                    .serve_with_shutdown(async move {
                        let _ = stop_rx.await;
                    })
                    .await
            }
        });

        let mut stream = connect_with_retry(addr).await;
        stream
            .write_all(b"GET /heroes/7 HTTP/1.1\r\nHost: localhost\r\n\r\n")
            .await
            .unwrap();

        let mut received = Vec::new();
        let mut buf = [0u8; 1024];
        while !received.ends_with(b"}") {
            let n = stream.read(&mut buf).await.unwrap();
            assert!(n > 0, "connection closed before the response arrived");
            received.extend_from_slice(&buf[..n]);
        }
        assert!(received.starts_with(b"HTTP/1.1 200 OK"));

        // Connection stays open and idle while the server stops.
        let started = Instant::now();
        stop_tx.send(()).unwrap();
        tokio::time::timeout(Duration::from_secs(5), running)
            .await
            .expect("server kept waiting on an idle connection")
            .unwrap()
            .unwrap();
        assert!(started.elapsed() < Duration::from_secs(5));

        assert!(matches!(stream.read(&mut buf).await, Ok(0) | Err(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_shutdown_signal_resolves_on_sigterm() {
        let signal = shutdown_signal();
        tokio::pin!(signal);

        // First poll installs the handlers.
        assert!(tokio::time::timeout(Duration::from_millis(50), &mut signal)
            .await
            .is_err());

        let status = std::process::Command::new("kill")
            .args(["-TERM", &std::process::id().to_string()])
            .status()
            .unwrap();
        assert!(status.success());

        assert!(tokio::time::timeout(Duration::from_secs(5), signal)
            .await
            .is_ok());
    }
}
