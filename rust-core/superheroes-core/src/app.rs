//! # Application
//!
//! Route table: binds each path and method to its handler in
//! [`crate::handlers`] and installs the default middleware.

use crate::error::{ApiError, Result};
use crate::handlers::{self, respond, HandlerResult};
use crate::middleware::{LoggingMiddleware, TimingMiddleware};
use crate::request::ApiRequest;
use crate::router::Method;
use crate::server::{BoxFuture, Handler, Server, ServerConfig};
use crate::store::Store;
use std::future::Future;
use std::sync::Arc;

/// Wrap an async store operation as a server [`Handler`]
fn route<F, Fut>(store: &Store, handler: F) -> Handler
where
    F: Fn(Store, ApiRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    let store = store.clone();
    Arc::new(move |req: &ApiRequest| -> BoxFuture {
        let fut = handler(store.clone(), req.clone());
        Box::pin(async move { respond(fut.await) })
    })
}

/// `{id}` path parameter; the router only matches integers there
fn path_id(req: &ApiRequest) -> std::result::Result<i64, ApiError> {
    req.param_int("id").ok_or(ApiError::NotFound("Not Found"))
}

/// Build the API server over `store`
///
/// # Errors
///
/// Returns `Error::InvalidRoutePattern` if a route cannot be registered
pub fn build_server(store: &Store, config: ServerConfig) -> Result<Server> {
    let mut server = Server::new(config);
    server.add_middleware(LoggingMiddleware::new());
    server.add_middleware(TimingMiddleware::new());

    server.add_route(
        Method::Get,
        "/",
        Arc::new(|_req: &ApiRequest| -> BoxFuture { Box::pin(async { handlers::index() }) }),
    )?;

    server.add_route(
        Method::Get,
        "/heroes",
        route(store, |store, _req| async move { handlers::list_heroes(&store).await }),
    )?;

    server.add_route(
        Method::Get,
        "/heroes/{id:int}",
        route(store, |store, req| async move {
            match path_id(&req) {
                Ok(id) => handlers::get_hero(&store, id).await,
                Err(e) => Err(e),
            }
        }),
    )?;

    server.add_route(
        Method::Get,
        "/powers",
        route(store, |store, _req| async move { handlers::list_powers(&store).await }),
    )?;

    server.add_route(
        Method::Get,
        "/powers/{id:int}",
        route(store, |store, req| async move {
            match path_id(&req) {
                Ok(id) => handlers::get_power(&store, id).await,
                Err(e) => Err(e),
            }
        }),
    )?;

    server.add_route(
        Method::Patch,
        "/powers/{id:int}",
        route(store, |store, req| async move {
            match path_id(&req) {
                Ok(id) => handlers::update_power(&store, id, req.body_bytes()).await,
                Err(e) => Err(e),
            }
        }),
    )?;

    server.add_route(
        Method::Post,
        "/hero_powers",
        route(store, |store, req| async move {
            handlers::create_hero_power(&store, req.body_bytes()).await
        }),
    )?;

    Ok(server)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyper::body::Bytes;
    use serde_json::{json, Value};
    use std::collections::HashMap;

    async fn seeded_server() -> Server {
        let store = Store::connect("sqlite::memory:", None).await.unwrap();
        store.create_schema().await.unwrap();
        store.seed().await.unwrap();
        build_server(&store, ServerConfig::default()).unwrap()
    }

    async fn call(server: &Server, method: Method, path: &str, body: Option<Value>) -> (u16, Value) {
        let mut headers = HashMap::new();
        headers.insert("content-type".to_string(), "application/json".to_string());
        let body = body.map(|v| Bytes::from(serde_json::to_vec(&v).unwrap()));
        let resp = server.test_request(method, path, headers, body).await;
        let value = resp.json_value_body().unwrap_or(Value::Null);
        (resp.status, value)
    }

    #[tokio::test]
    async fn test_index_html() {
        let server = seeded_server().await;
        let resp = server
            .test_request(Method::Get, "/", HashMap::new(), None)
            .await;
        assert_eq!(resp.status, 200);
        assert_eq!(resp.body, "<h1>Code challenge</h1>");
    }

    #[tokio::test]
    async fn test_get_heroes() {
        let server = seeded_server().await;
        let (status, body) = call(&server, Method::Get, "/heroes", None).await;
        assert_eq!(status, 200);
        let heroes = body.as_array().unwrap();
        assert_eq!(heroes.len(), 10);
        assert_eq!(
            heroes[0],
            json!({"id": 1, "name": "Kamala Khan", "super_name": "Ms. Marvel"})
        );
        assert!(heroes.iter().all(|h| h.get("hero_powers").is_none()));
    }

    #[tokio::test]
    async fn test_get_hero_detail_and_missing() {
        let server = seeded_server().await;
        let (status, body) = call(&server, Method::Get, "/heroes/1", None).await;
        assert_eq!(status, 200);
        assert_eq!(body["super_name"], "Ms. Marvel");
        assert!(body["hero_powers"].is_array());

        let (status, body) = call(&server, Method::Get, "/heroes/999", None).await;
        assert_eq!(status, 404);
        assert_eq!(body, json!({"error": "Hero not found."}));
    }

    #[tokio::test]
    async fn test_non_integer_id_is_route_not_found() {
        let server = seeded_server().await;
        let (status, body) = call(&server, Method::Get, "/heroes/abc", None).await;
        assert_eq!(status, 404);
        assert_eq!(body, json!({"error": "Not Found"}));
    }

    #[tokio::test]
    async fn test_get_powers() {
        let server = seeded_server().await;
        let (status, body) = call(&server, Method::Get, "/powers", None).await;
        assert_eq!(status, 200);
        let first = &body.as_array().unwrap()[0];
        assert_eq!(
            first,
            &json!({
                "id": 1,
                "name": "super strength",
                "description": "gives the wielder super-human strengths"
            })
        );

        let (status, body) = call(&server, Method::Get, "/powers/999", None).await;
        assert_eq!(status, 404);
        assert_eq!(body, json!({"error": "Power not found"}));
    }

    #[tokio::test]
    async fn test_patch_power_short_description_leaves_store_unchanged() {
        let server = seeded_server().await;
        let (_, before) = call(&server, Method::Get, "/powers/1", None).await;

        let (status, body) = call(
            &server,
            Method::Patch,
            "/powers/1",
            Some(json!({"description": "short"})),
        )
        .await;
        assert_eq!(status, 400);
        assert_eq!(body, json!({"errors": ["validation errors"]}));

        let (_, after) = call(&server, Method::Get, "/powers/1", None).await;
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn test_patch_power_success_and_missing() {
        let server = seeded_server().await;
        let (status, body) = call(
            &server,
            Method::Patch,
            "/powers/2",
            Some(json!({"description": "Valid Updated Description"})),
        )
        .await;
        assert_eq!(status, 200);
        assert_eq!(body["description"], "Valid Updated Description");

        let (status, body) = call(
            &server,
            Method::Patch,
            "/powers/999",
            Some(json!({"description": "Valid Updated Description"})),
        )
        .await;
        assert_eq!(status, 404);
        assert_eq!(body, json!({"error": "Power not found"}));
    }

    #[tokio::test]
    async fn test_post_hero_power_round_trip() {
        let server = seeded_server().await;
        let (status, created) = call(
            &server,
            Method::Post,
            "/hero_powers",
            Some(json!({"hero_id": 1, "power_id": 1, "strength": "Strong"})),
        )
        .await;
        assert_eq!(status, 200);
        assert_eq!(created["hero_id"], 1);
        assert_eq!(created["power_id"], 1);
        assert_eq!(created["strength"], "Strong");
        assert_eq!(
            created["hero"],
            json!({"id": 1, "name": "Kamala Khan", "super_name": "Ms. Marvel"})
        );
        assert_eq!(created["power"]["id"], 1);
        assert!(created["power"].get("hero_powers").is_none());

        let (_, hero) = call(&server, Method::Get, "/heroes/1", None).await;
        let embedded = hero["hero_powers"].as_array().unwrap();
        let found = embedded
            .iter()
            .find(|hp| hp["id"] == created["id"])
            .unwrap();
        assert_eq!(
            found,
            &json!({"id": created["id"], "hero_id": 1, "power_id": 1, "strength": "Strong"})
        );
    }

    #[tokio::test]
    async fn test_post_hero_power_accepts_integral_float_ids() {
        let server = seeded_server().await;
        let (status, created) = call(
            &server,
            Method::Post,
            "/hero_powers",
            Some(json!({"hero_id": 1.0, "power_id": "2", "strength": "Weak"})),
        )
        .await;
        assert_eq!(status, 200);
        assert_eq!(created["hero_id"], 1);
        assert_eq!(created["power_id"], 2);

        let (status, _) = call(
            &server,
            Method::Post,
            "/hero_powers",
            Some(json!({"hero_id": 1.5, "power_id": 1, "strength": "Weak"})),
        )
        .await;
        assert_eq!(status, 404);
    }

    #[tokio::test]
    async fn test_head_and_options_on_resources() {
        let server = seeded_server().await;
        let (status, _) = call(&server, Method::Head, "/heroes", None).await;
        assert_eq!(status, 200);

        let resp = server
            .test_request(Method::Options, "/powers/1", HashMap::new(), None)
            .await;
        assert_eq!(resp.status, 200);
        assert_eq!(
            resp.headers.get("allow").map(String::as_str),
            Some("GET, HEAD, PATCH, OPTIONS")
        );
    }

    #[tokio::test]
    async fn test_post_hero_power_error_order() {
        let server = seeded_server().await;

        let (status, body) = call(
            &server,
            Method::Post,
            "/hero_powers",
            Some(json!({"hero_id": 0, "power_id": 999, "strength": "bogus"})),
        )
        .await;
        assert_eq!(status, 400);
        assert_eq!(body, json!({"error": "Missing field(s)"}));

        let (status, body) = call(
            &server,
            Method::Post,
            "/hero_powers",
            Some(json!({"hero_id": 999, "power_id": 1, "strength": "bogus"})),
        )
        .await;
        assert_eq!(status, 404);
        assert_eq!(body, json!({"error": "Invalid hero or power id."}));

        let (status, body) = call(
            &server,
            Method::Post,
            "/hero_powers",
            Some(json!({"hero_id": 1, "power_id": 1, "strength": "bogus"})),
        )
        .await;
        assert_eq!(status, 400);
        assert_eq!(body, json!({"errors": ["validation errors"]}));
    }

    #[tokio::test]
    async fn test_unsupported_routes() {
        let server = seeded_server().await;
        let (status, _) = call(&server, Method::Delete, "/heroes/1", None).await;
        assert_eq!(status, 405);
        let (status, _) = call(&server, Method::Patch, "/heroes/1", None).await;
        assert_eq!(status, 405);
        let (status, _) = call(&server, Method::Get, "/hero_powers/1", None).await;
        assert_eq!(status, 404);
    }

    #[tokio::test]
    async fn test_responses_carry_request_metadata() {
        let server = seeded_server().await;
        let resp = server
            .test_request(Method::Get, "/heroes", HashMap::new(), None)
            .await;
        assert!(resp.headers.contains_key("x-request-id"));
        assert!(resp.headers.contains_key("x-response-time-ms"));
    }
}
