//! Application wrapper tying the pieces together.
//!
//! [`App`] collects the context initializer and the endpoints during
//! configuration. [`App::into_gate`] runs the initializer exactly once and
//! freezes the registry into a [`Gate`]; [`App::serve`] additionally binds the
//! configured address and runs the selected HTTP backend until shutdown.
use std::sync::Arc;

use eyre::{Result, WrapErr};
use tokio::net::TcpListener;

use crate::{
    adapters::{AxumServer, HyperServer},
    config::{BackendKind, ServerConfig},
    core::{EndpointRegistry, Gate, GateError, Request, Response},
    ports::HttpServer,
    utils::GracefulShutdown,
};

type InitFn<C> = Box<dyn FnOnce() -> Result<C> + Send>;

pub struct App<C> {
    name: String,
    init: InitFn<C>,
    registry: EndpointRegistry<C>,
}

impl<C> App<C>
where
    C: Default + Send + Sync + 'static,
{
    /// An app whose context starts out as `C::default()`.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_init(name, || Ok(C::default()))
    }
}

impl<C> App<C>
where
    C: Send + Sync + 'static,
{
    pub fn with_init<F>(name: impl Into<String>, init: F) -> Self
    where
        F: FnOnce() -> Result<C> + Send + 'static,
    {
        Self {
            name: name.into(),
            init: Box::new(init),
            registry: EndpointRegistry::new(),
        }
    }

    /// Replace the context initializer. It runs once, before serving starts,
    /// and is the place to load models or open connections.
    pub fn init<F>(mut self, init: F) -> Self
    where
        F: FnOnce() -> Result<C> + Send + 'static,
    {
        self.init = Box::new(init);
        self
    }

    /// Register a blocking endpoint.
    pub fn handler<F>(mut self, route: impl Into<String>, handler: F) -> Result<Self, GateError>
    where
        F: Fn(&C, Request) -> Result<Response> + Send + Sync + 'static,
    {
        self.registry.handler(route, handler)?;
        Ok(self)
    }

    /// Register a fire-and-forget endpoint.
    pub fn background<F>(mut self, route: impl Into<String>, handler: F) -> Result<Self, GateError>
    where
        F: Fn(&C, Request) -> Result<Response> + Send + Sync + 'static,
    {
        self.registry.background(route, handler)?;
        Ok(self)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn registry(&self) -> &EndpointRegistry<C> {
        &self.registry
    }

    /// Run the initializer and freeze the registry.
    pub fn into_gate(self) -> Result<Gate<C>> {
        if self.registry.is_empty() {
            tracing::warn!("{} has no endpoints registered", self.name);
        }

        tracing::info!("Running init() for {}", self.name);
        let context = (self.init)().wrap_err_with(|| format!("init() failed for {}", self.name))?;
        Ok(Gate::new(self.registry, context))
    }

    /// Initialize, bind and serve until SIGINT/SIGTERM.
    pub async fn serve(self, config: &ServerConfig) -> Result<()> {
        let name = self.name.clone();
        let gate = Arc::new(self.into_gate()?);

        let shutdown = Arc::new(GracefulShutdown::with_timeout(config.shutdown_timeout()));
        let signals = shutdown.clone();
        tokio::spawn(async move {
            if let Err(e) = signals.run_signal_handler().await {
                tracing::error!("Signal handler error: {}", e);
            }
        });

        tracing::info!("Starting {}", name);
        serve_gate(gate, config, &shutdown).await
    }
}

/// Bind the configured address and serve `gate` with the configured backend.
pub async fn serve_gate<C>(
    gate: Arc<Gate<C>>,
    config: &ServerConfig,
    shutdown: &GracefulShutdown,
) -> Result<()>
where
    C: Send + Sync + 'static,
{
    let addr = config.socket_addr()?;
    let listener = TcpListener::bind(addr)
        .await
        .wrap_err_with(|| format!("Failed to bind to {addr}"))?;

    serve_listener(gate, config.backend, listener, shutdown).await
}

/// Serve `gate` on an already-bound listener.
pub async fn serve_listener<C>(
    gate: Arc<Gate<C>>,
    backend: BackendKind,
    listener: TcpListener,
    shutdown: &GracefulShutdown,
) -> Result<()>
where
    C: Send + Sync + 'static,
{
    for (route, kind) in gate.registry().routes() {
        tracing::info!("Route {} -> {} endpoint", route, kind);
    }

    match backend {
        BackendKind::Axum => run_until_shutdown(&AxumServer::new(gate), listener, shutdown).await,
        BackendKind::Hyper => run_until_shutdown(&HyperServer::new(gate), listener, shutdown).await,
    }
}

async fn run_until_shutdown<S: HttpServer>(
    server: &S,
    listener: TcpListener,
    shutdown: &GracefulShutdown,
) -> Result<()> {
    let addr = listener
        .local_addr()
        .wrap_err("Failed to read listener address")?;
    tracing::info!("Serving at http://{} ({} backend)", addr, server.name());

    let mut token = shutdown.shutdown_token();
    let serving = server.serve(listener, shutdown.shutdown_token());
    tokio::pin!(serving);

    tokio::select! {
        result = &mut serving => return result,
        _ = token.wait_for_shutdown() => {}
    }

    // Draining: bound the wait for in-flight handlers
    match tokio::time::timeout(shutdown.shutdown_timeout(), serving).await {
        Ok(result) => {
            tracing::info!("Graceful shutdown completed");
            result
        }
        Err(_) => {
            tracing::warn!(
                "Requests still in flight after {:?}, shutting down anyway",
                shutdown.shutdown_timeout()
            );
            Ok(())
        }
    }
}
