//! Kalium - a single-worker admission gate for serving stateful models over HTTP.
//!
//! Kalium is meant for servers that wrap one expensive, stateful resource (a
//! model resident on an accelerator, a large in-memory index) and must never
//! run two units of work against it at once. Every request goes through one
//! [`Gate`]:
//!
//! - **Blocking** endpoints run on the caller's thread while holding the gate;
//!   their response is the HTTP response.
//! - **Fire-and-forget** endpoints acknowledge with `{"started": true}` and run
//!   on a background thread that holds the gate until the handler returns.
//! - A request arriving while the gate is held is rejected with `423 Locked`.
//!   Nothing is queued.
//!
//! When background work finishes, the gate publishes into a single-slot
//! [`EventChannel`] that an autoscaler or health probe can poll.
//!
//! # Quick Example
//! ```no_run
//! use kalium::{App, config::ServerConfig, core::{Request, Response}};
//! use serde_json::json;
//!
//! #[derive(Default)]
//! struct Model;
//!
//! # #[tokio::main] async fn main() -> eyre::Result<()> {
//! App::<Model>::new("demo")
//!     .handler("/", |_model: &Model, req: Request| {
//!         Ok(Response::ok(json!({ "echo": req.get("prompt") })))
//!     })?
//!     .serve(&ServerConfig::default())
//!     .await
//! # }
//! ```
//!
//! # Architecture
//! Business logic lives in `core` and performs no I/O. The HTTP side is a
//! **port** ([`ports::HttpServer`]) with two **adapters**: an axum server that
//! dispatches on tokio's blocking pool and a bare hyper server that dispatches
//! inline. Both funnel into [`Gate::dispatch`].
//!
//! # Error Handling
//! Gate outcomes are typed ([`GateError`]) and converted to HTTP status codes
//! at the gate boundary; handler errors and panics never escape `dispatch`.
//! Application-level APIs return `eyre::Result<T>`.
pub mod app;
pub mod config;
pub mod ports;
pub mod tracing_setup;
pub mod utils;

pub mod adapters;
pub mod core;

pub use crate::{
    adapters::{AxumServer, HttpHandler, HyperServer},
    app::App,
    core::{EndpointKind, EndpointRegistry, EventChannel, Gate, GateError, Request, Response},
    utils::GracefulShutdown,
};
