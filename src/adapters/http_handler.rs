use std::{sync::Arc, time::Instant};

use bytes::Bytes;
use http::{HeaderValue, Method, Response, StatusCode, header};
use http_body_util::Full;
use serde_json::{Value, json};
use uuid::Uuid;

use crate::{
    core::{ENDPOINT_KIND_HEADER, EndpointKind, Gate, Payload, WireResponse},
    ports::HandlerError,
    tracing_setup::create_request_span,
};

/// Transport-side glue shared by every adapter: turns (method, path, body)
/// into a gate dispatch and the result into an `http::Response`.
///
/// [`HttpHandler::handle`] blocks for as long as a blocking endpoint runs, so
/// adapters must call it from a thread that is allowed to block.
pub struct HttpHandler<C> {
    gate: Arc<Gate<C>>,
}

impl<C> HttpHandler<C>
where
    C: Send + Sync + 'static,
{
    pub fn new(gate: Arc<Gate<C>>) -> Self {
        Self { gate }
    }

    pub fn gate(&self) -> &Arc<Gate<C>> {
        &self.gate
    }

    /// Handle one wire request end to end
    pub fn handle(&self, method: &Method, path: &str, body: &[u8]) -> Response<Full<Bytes>> {
        let request_id = Uuid::new_v4().to_string();
        let span = create_request_span(method.as_str(), path, &request_id);
        let _entered = span.enter();
        let started = Instant::now();

        let response = match self.dispatch(method, path, body) {
            Ok(wire) => {
                if let Some(kind) = wire.kind {
                    span.record("endpoint.kind", kind.as_str());
                }
                render(&wire)
            }
            Err(err) => {
                tracing::debug!("Rejected before dispatch: {}", err);
                render_error(&err)
            }
        };

        span.record("http.status_code", response.status().as_u16());
        span.record("duration_ms", started.elapsed().as_millis() as u64);
        tracing::info!("Handled {} {} -> {}", method, path, response.status());
        response
    }

    fn dispatch(
        &self,
        method: &Method,
        path: &str,
        body: &[u8],
    ) -> Result<WireResponse, HandlerError> {
        if method != Method::POST {
            return Err(HandlerError::MethodNotAllowed(method.clone()));
        }
        let payload = parse_payload(body)?;
        Ok(self.gate.dispatch(path, payload))
    }
}

impl<C> Clone for HttpHandler<C> {
    fn clone(&self) -> Self {
        Self {
            gate: self.gate.clone(),
        }
    }
}

/// Parse a request body into a payload. An empty body is an empty object.
pub fn parse_payload(body: &[u8]) -> Result<Payload, HandlerError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Payload::new());
    }

    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(HandlerError::BadRequest(
            "request body must be a JSON object".to_string(),
        )),
        Err(e) => Err(HandlerError::BadRequest(format!("invalid JSON body: {e}"))),
    }
}

/// Serialize a gate result
pub fn render(wire: &WireResponse) -> Response<Full<Bytes>> {
    json_response(wire.status, wire.kind, &wire.body)
}

/// Serialize an adapter-level error
pub fn render_error(err: &HandlerError) -> Response<Full<Bytes>> {
    let body = json!({
        "error": err.label(),
        "message": err.to_string(),
    });
    let mut response = json_response(err.status(), None, &body);
    if matches!(err, HandlerError::MethodNotAllowed(_)) {
        response
            .headers_mut()
            .insert(header::ALLOW, HeaderValue::from_static("POST"));
    }
    response
}

fn json_response(
    status: StatusCode,
    kind: Option<EndpointKind>,
    body: &Value,
) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from(body.to_string())));
    *response.status_mut() = status;

    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    if let Some(kind) = kind {
        headers.insert(ENDPOINT_KIND_HEADER, HeaderValue::from_static(kind.as_str()));
    }
    response
}

#[cfg(test)]
mod tests {
    use http_body_util::BodyExt;

    use super::*;
    use crate::core::{EndpointRegistry, Request, Response as GateResponse};

    fn create_test_handler() -> HttpHandler<()> {
        let mut registry = EndpointRegistry::new();
        registry
            .handler("/echo", |_: &(), req: Request| {
                Ok(GateResponse::ok(Value::Object(req.into_payload())))
            })
            .unwrap();
        HttpHandler::new(Arc::new(Gate::new(registry, ())))
    }

    async fn body_json(response: Response<Full<Bytes>>) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_parse_payload() {
        assert!(parse_payload(b"").unwrap().is_empty());
        assert!(parse_payload(b"  \n").unwrap().is_empty());
        assert_eq!(
            parse_payload(br#"{"prompt": "hi"}"#).unwrap().get("prompt"),
            Some(&json!("hi"))
        );
        assert!(matches!(
            parse_payload(b"[1, 2]"),
            Err(HandlerError::BadRequest(_))
        ));
        assert!(matches!(
            parse_payload(b"{not json"),
            Err(HandlerError::BadRequest(_))
        ));
    }

    #[tokio::test]
    async fn test_handle_echo() {
        let handler = create_test_handler();
        let response = handler.handle(&Method::POST, "/echo", br#"{"x": 1}"#);

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers().get(ENDPOINT_KIND_HEADER).unwrap(), "handler");
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/json"
        );
        assert_eq!(body_json(response).await, json!({"x": 1}));
    }

    #[test]
    fn test_handle_unknown_route() {
        let handler = create_test_handler();
        let response = handler.handle(&Method::POST, "/nope", b"{}");

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(response.headers().get(ENDPOINT_KIND_HEADER).is_none());
    }

    #[test]
    fn test_handle_rejects_get() {
        let handler = create_test_handler();
        let response = handler.handle(&Method::GET, "/echo", b"");

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.headers().get(header::ALLOW).unwrap(), "POST");
    }

    #[test]
    fn test_handle_rejects_bad_body() {
        let handler = create_test_handler();
        let response = handler.handle(&Method::POST, "/echo", b"\"just a string\"");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
