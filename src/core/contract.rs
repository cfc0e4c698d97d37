//! Value types crossing the gate boundary.
//!
//! A [`Request`] carries the JSON object an adapter parsed from the wire body.
//! A [`Response`] is what a handler hands back; the gate checks its shape before
//! it becomes a [`WireResponse`], which is the transport-neutral result an
//! adapter serializes.
use std::fmt;

use http::StatusCode;
use serde_json::{Map, Value, json};

use crate::core::error::{GateError, GateResult};

/// Header carrying the endpoint kind on every gate-produced response.
pub const ENDPOINT_KIND_HEADER: &str = "x-endpoint-type";

/// Parsed request body. Key order is irrelevant.
pub type Payload = Map<String, Value>;

/// How the gate executes an endpoint's handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EndpointKind {
    /// Runs on the caller's thread; the handler's response is the wire response.
    Blocking,
    /// Runs off the request path; the caller only gets an acknowledgment.
    FireAndForget,
}

impl EndpointKind {
    /// Marker value sent in [`ENDPOINT_KIND_HEADER`].
    pub fn as_str(&self) -> &'static str {
        match self {
            EndpointKind::Blocking => "handler",
            EndpointKind::FireAndForget => "background",
        }
    }
}

impl fmt::Display for EndpointKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Input handed to a handler.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Request {
    payload: Payload,
}

impl Request {
    pub fn new(payload: Payload) -> Self {
        Self { payload }
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// Look up a top-level field of the payload.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.payload.get(key)
    }

    pub fn into_payload(self) -> Payload {
        self.payload
    }
}

/// Output of a handler.
///
/// The payload is typed as an arbitrary JSON value so that handlers can be
/// written freely; only a JSON object is accepted by the gate.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub status: u16,
    pub payload: Value,
}

impl Response {
    pub fn new(status: u16, payload: Value) -> Self {
        Self { status, payload }
    }

    /// A `200 OK` response.
    pub fn ok(payload: Value) -> Self {
        Self::new(StatusCode::OK.as_u16(), payload)
    }

    /// Check the response against the handler contract and split it into its
    /// wire status and object payload.
    pub fn validate(self, route: &str) -> GateResult<(StatusCode, Payload)> {
        let status =
            StatusCode::from_u16(self.status).map_err(|_| GateError::ContractViolation {
                route: route.to_string(),
                reason: format!("status {} is not a valid HTTP status code", self.status),
            })?;

        match self.payload {
            Value::Object(map) => Ok((status, map)),
            other => Err(GateError::ContractViolation {
                route: route.to_string(),
                reason: format!("payload must be a JSON object, got {}", json_type_name(&other)),
            }),
        }
    }
}

impl Default for Response {
    fn default() -> Self {
        Self::ok(Value::Object(Map::new()))
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Transport-neutral result of a dispatch.
#[derive(Debug, Clone, PartialEq)]
pub struct WireResponse {
    pub status: StatusCode,
    /// `None` only when no endpoint matched the route.
    pub kind: Option<EndpointKind>,
    pub body: Value,
}

impl WireResponse {
    pub fn new(status: StatusCode, kind: Option<EndpointKind>, body: Value) -> Self {
        Self { status, kind, body }
    }

    /// Acknowledgment for a fire-and-forget endpoint.
    pub fn started() -> Self {
        Self::new(
            StatusCode::OK,
            Some(EndpointKind::FireAndForget),
            json!({ "started": true }),
        )
    }

    /// Convert a gate error into its wire form.
    pub fn from_error(err: &GateError, kind: Option<EndpointKind>) -> Self {
        Self::new(
            err.status(),
            kind,
            json!({
                "error": err.label(),
                "message": err.to_string(),
            }),
        )
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_kind_markers() {
        assert_eq!(EndpointKind::Blocking.as_str(), "handler");
        assert_eq!(EndpointKind::FireAndForget.to_string(), "background");
    }

    #[test]
    fn test_validate_accepts_object_payload() {
        let (status, payload) = Response::ok(json!({"result": 42}))
            .validate("/predict")
            .unwrap();
        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload.get("result"), Some(&json!(42)));
    }

    #[test]
    fn test_validate_rejects_non_object_payloads() {
        for payload in [json!([1, 2]), json!("text"), json!(7), Value::Null] {
            let err = Response::ok(payload).validate("/predict").unwrap_err();
            assert!(matches!(err, GateError::ContractViolation { .. }));
            assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        }
    }

    #[test]
    fn test_validate_rejects_invalid_status() {
        let err = Response::new(42, json!({})).validate("/predict").unwrap_err();
        assert!(err.to_string().contains("not a valid HTTP status code"));
    }

    #[test]
    fn test_request_accessors() {
        let mut payload = Payload::new();
        payload.insert("prompt".to_string(), json!("hello"));
        let request = Request::new(payload.clone());
        assert_eq!(request.get("prompt"), Some(&json!("hello")));
        assert_eq!(request.get("missing"), None);
        assert_eq!(request.into_payload(), payload);
    }

    #[test]
    fn test_started_ack_body() {
        let ack = WireResponse::started();
        assert_eq!(ack.status, StatusCode::OK);
        assert_eq!(ack.kind, Some(EndpointKind::FireAndForget));
        assert_eq!(ack.body, json!({"started": true}));
    }
}
