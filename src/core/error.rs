use http::StatusCode;
use thiserror::Error;

use crate::core::contract::EndpointKind;

/// Every outcome of registration or dispatch that is not a plain success.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum GateError {
    /// A route was registered twice
    #[error("Route already registered: {route}")]
    DuplicateRoute { route: String },
    /// Routes are matched against request paths and must start with '/'
    #[error("Invalid route '{route}': routes must start with '/'")]
    InvalidRoute { route: String },
    #[error("No endpoint registered for route: {route}")]
    RouteNotFound { route: String },
    /// The gate was held when the request was probed
    #[error("Gate is busy, rejected {kind} request")]
    Busy { kind: EndpointKind },
    #[error("Handler for {route} violated the response contract: {reason}")]
    ContractViolation { route: String, reason: String },
    #[error("Handler for {route} failed: {message}")]
    HandlerFailure { route: String, message: String },
    #[error("Failed to start background task for {route}: {source}")]
    Spawn {
        route: String,
        #[source]
        source: std::io::Error,
    },
}

/// Result type for gate operations
pub type GateResult<T> = Result<T, GateError>;

impl GateError {
    /// Wire status this error maps to.
    pub fn status(&self) -> StatusCode {
        match self {
            GateError::RouteNotFound { .. } => StatusCode::NOT_FOUND,
            GateError::Busy { .. } => StatusCode::LOCKED,
            GateError::DuplicateRoute { .. }
            | GateError::InvalidRoute { .. }
            | GateError::ContractViolation { .. }
            | GateError::HandlerFailure { .. }
            | GateError::Spawn { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short machine-readable name used in diagnostic payloads.
    pub fn label(&self) -> &'static str {
        match self {
            GateError::DuplicateRoute { .. } => "duplicate_route",
            GateError::InvalidRoute { .. } => "invalid_route",
            GateError::RouteNotFound { .. } => "route_not_found",
            GateError::Busy { .. } => "busy",
            GateError::ContractViolation { .. } => "contract_violation",
            GateError::HandlerFailure { .. } => "handler_failure",
            GateError::Spawn { .. } => "spawn_failure",
        }
    }
}
