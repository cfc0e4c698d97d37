//! Asynchronous adapter built on axum.
//!
//! Requests are accepted on the tokio runtime and the gate dispatch is moved
//! onto the blocking thread pool, so a long-running blocking endpoint never
//! stalls the reactor. Busy rejections still come back immediately because
//! the gate never waits for its lock.
use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    extract::State,
    http::{Method, Response, Uri},
    routing::any,
};
use bytes::Bytes;
use eyre::{Result, WrapErr};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::{
    adapters::http_handler::{HttpHandler, render_error},
    core::Gate,
    ports::{HandlerError, HttpServer},
    utils::ShutdownToken,
};

pub struct AxumServer<C> {
    handler: HttpHandler<C>,
}

impl<C> AxumServer<C>
where
    C: Send + Sync + 'static,
{
    pub fn new(gate: Arc<Gate<C>>) -> Self {
        Self {
            handler: HttpHandler::new(gate),
        }
    }

    /// Router with a catch-all route; route matching is left to the gate.
    pub fn router(&self) -> Router {
        Router::new()
            .route("/", any(handle_request::<C>))
            .route("/{*path}", any(handle_request::<C>))
            .layer(TraceLayer::new_for_http())
            .with_state(self.handler.clone())
    }
}

async fn handle_request<C>(
    State(handler): State<HttpHandler<C>>,
    method: Method,
    uri: Uri,
    body: Bytes,
) -> Response<Body>
where
    C: Send + Sync + 'static,
{
    let path = uri.path().to_string();
    let response =
        match tokio::task::spawn_blocking(move || handler.handle(&method, &path, &body)).await {
            Ok(response) => response,
            Err(e) => {
                tracing::error!("Dispatch task failed: {}", e);
                render_error(&HandlerError::InternalError(e.to_string()))
            }
        };
    response.map(Body::new)
}

impl<C> HttpServer for AxumServer<C>
where
    C: Send + Sync + 'static,
{
    fn name(&self) -> &'static str {
        "axum"
    }

    async fn serve(&self, listener: TcpListener, mut shutdown: ShutdownToken) -> Result<()> {
        let app = self.router();
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let reason = shutdown.wait_for_shutdown().await;
                tracing::info!("axum server draining connections: {:?}", reason);
            })
            .await
            .wrap_err("axum server error")
    }
}

#[cfg(test)]
mod tests {
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use super::*;
    use crate::core::{
        ENDPOINT_KIND_HEADER, EndpointRegistry, Request as GateRequest, Response as GateResponse,
    };

    fn create_test_server() -> AxumServer<()> {
        let mut registry = EndpointRegistry::new();
        registry
            .handler("/", |_: &(), _: GateRequest| {
                Ok(GateResponse::ok(json!({"root": true})))
            })
            .unwrap()
            .handler("/nested/route", |_: &(), req: GateRequest| {
                Ok(GateResponse::new(201, Value::Object(req.into_payload())))
            })
            .unwrap();
        AxumServer::new(Arc::new(Gate::new(registry, ())))
    }

    fn post(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_root_route() {
        let app = create_test_server().router();
        let response = app.oneshot(post("/", "")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(serde_json::from_slice::<Value>(&bytes).unwrap(), json!({"root": true}));
    }

    #[tokio::test]
    async fn test_nested_route_passes_payload_through() {
        let app = create_test_server().router();
        let response = app
            .oneshot(post("/nested/route", r#"{"a": [1, 2]}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(response.headers().get(ENDPOINT_KIND_HEADER).unwrap(), "handler");
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(serde_json::from_slice::<Value>(&bytes).unwrap(), json!({"a": [1, 2]}));
    }

    #[tokio::test]
    async fn test_unknown_route_is_404() {
        let app = create_test_server().router();
        let response = app.oneshot(post("/nested", "{}")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_get_is_405() {
        let app = create_test_server().router();
        let request = Request::builder().uri("/").body(Body::empty()).unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }
}
