use eyre::Result;
use http::{Method, StatusCode};
use thiserror::Error;
use tokio::net::TcpListener;

use crate::utils::ShutdownToken;

/// Errors raised by adapters before a request reaches the gate
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum HandlerError {
    /// The body could not be turned into a JSON object
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error("Method {0} not allowed, only POST is accepted")]
    MethodNotAllowed(Method),
    #[error("Internal server error: {0}")]
    InternalError(String),
}

impl HandlerError {
    pub fn status(&self) -> StatusCode {
        match self {
            HandlerError::BadRequest(_) => StatusCode::BAD_REQUEST,
            HandlerError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            HandlerError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            HandlerError::BadRequest(_) => "bad_request",
            HandlerError::MethodNotAllowed(_) => "method_not_allowed",
            HandlerError::InternalError(_) => "internal_error",
        }
    }
}

/// HttpServer is the port every wire adapter implements: accept wire requests
/// on `listener`, funnel them into the gate, write wire responses back.
pub trait HttpServer: Send + Sync + 'static {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Serve until `shutdown` fires
    ///
    /// # Returns
    /// A future that resolves once the server has stopped accepting
    /// connections and in-flight requests have drained
    fn serve(
        &self,
        listener: TcpListener,
        shutdown: ShutdownToken,
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}
