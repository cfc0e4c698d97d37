//! The execution gate.
//!
//! `Gate` owns the single permit that serializes every handler body in the
//! process, the frozen endpoint registry, the shared context and the
//! completion [`EventChannel`]. [`Gate::dispatch`] is the only entry point
//! adapters need: it resolves the route, rejects the request if the gate is
//! held, and otherwise runs the handler inline (blocking endpoints) or on a
//! detached thread (fire-and-forget endpoints).
//!
//! The gate is a one-permit semaphore. Probing and acquiring is a single
//! `try_acquire_owned`, so two requests can never both observe a free gate;
//! the loser is rejected with `423 Locked`. [`Gate::is_busy`] only reads the
//! permit count and never takes the gate itself.
//! For fire-and-forget endpoints the permit is taken before the acknowledgment
//! is returned and moved into the background thread, which keeps the gate
//! reserved from the moment `{"started": true}` leaves until the handler is
//! done. The permit is dropped before the completion signal is published, so an
//! observer woken by the signal sees a free gate.
use std::{
    any::Any,
    panic::{self, AssertUnwindSafe},
    sync::Arc,
    thread,
    time::Instant,
};

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::{
    core::{
        contract::{EndpointKind, Payload, Request, Response, WireResponse},
        error::{GateError, GateResult},
        event_channel::EventChannel,
        registry::{Endpoint, EndpointRegistry},
    },
    tracing_setup::create_background_span,
};

/// Single-worker admission and execution gate.
pub struct Gate<C> {
    registry: EndpointRegistry<C>,
    context: Arc<C>,
    permit: Arc<Semaphore>,
    events: Arc<EventChannel>,
}

impl<C> Gate<C>
where
    C: Send + Sync + 'static,
{
    /// Freeze `registry` and take ownership of the already-initialized context.
    pub fn new(registry: EndpointRegistry<C>, context: C) -> Self {
        Self::with_shared_context(registry, Arc::new(context))
    }

    /// Like [`Gate::new`] for a context the caller keeps a handle to.
    pub fn with_shared_context(registry: EndpointRegistry<C>, context: Arc<C>) -> Self {
        Self {
            registry,
            context,
            permit: Arc::new(Semaphore::new(1)),
            events: Arc::new(EventChannel::new()),
        }
    }

    pub fn registry(&self) -> &EndpointRegistry<C> {
        &self.registry
    }

    pub fn context(&self) -> &Arc<C> {
        &self.context
    }

    /// Completion channel fed by fire-and-forget endpoints.
    pub fn events(&self) -> Arc<EventChannel> {
        Arc::clone(&self.events)
    }

    /// Whether a handler currently holds the gate.
    pub fn is_busy(&self) -> bool {
        self.permit.available_permits() == 0
    }

    /// Route `payload` to the endpoint registered at `route`.
    ///
    /// Never fails: every error is converted to its wire status here. Blocks
    /// the caller for the duration of a blocking handler; returns immediately
    /// for fire-and-forget endpoints and for rejections.
    pub fn dispatch(&self, route: &str, payload: Payload) -> WireResponse {
        let endpoint = match self.registry.resolve(route) {
            Ok(endpoint) => endpoint,
            Err(err) => {
                tracing::debug!("{}", err);
                return WireResponse::from_error(&err, None);
            }
        };

        let kind = endpoint.kind();
        match self.try_dispatch(endpoint, payload) {
            Ok(response) => response,
            Err(err @ GateError::Busy { .. }) => {
                tracing::debug!(route, "{}", err);
                WireResponse::from_error(&err, Some(kind))
            }
            Err(err) => {
                tracing::error!(route, error = %err, "Request to {} failed", route);
                WireResponse::from_error(&err, Some(kind))
            }
        }
    }

    fn try_dispatch(
        &self,
        endpoint: Arc<Endpoint<C>>,
        payload: Payload,
    ) -> GateResult<WireResponse> {
        let permit = Arc::clone(&self.permit)
            .try_acquire_owned()
            .map_err(|_| GateError::Busy {
                kind: endpoint.kind(),
            })?;

        let request = Request::new(payload);
        match endpoint.kind() {
            EndpointKind::Blocking => self.run_blocking(&endpoint, permit, request),
            EndpointKind::FireAndForget => self.spawn_background(endpoint, permit, request),
        }
    }

    fn run_blocking(
        &self,
        endpoint: &Endpoint<C>,
        _permit: OwnedSemaphorePermit,
        request: Request,
    ) -> GateResult<WireResponse> {
        let started = Instant::now();
        let response = invoke(endpoint, &self.context, request)?;
        let (status, payload) = response.validate(endpoint.route())?;

        tracing::debug!(
            route = endpoint.route(),
            status = status.as_u16(),
            duration_ms = started.elapsed().as_millis() as u64,
            "Handler completed"
        );
        Ok(WireResponse::new(
            status,
            Some(EndpointKind::Blocking),
            payload.into(),
        ))
    }

    fn spawn_background(
        &self,
        endpoint: Arc<Endpoint<C>>,
        permit: OwnedSemaphorePermit,
        request: Request,
    ) -> GateResult<WireResponse> {
        let context = Arc::clone(&self.context);
        let events = Arc::clone(&self.events);
        let route = endpoint.route().to_string();

        thread::Builder::new()
            .name("kalium-background".to_string())
            .spawn(move || {
                let span = create_background_span(endpoint.route());
                let _entered = span.enter();
                let started = Instant::now();

                match invoke(&endpoint, &context, request) {
                    Ok(response) => tracing::info!(
                        status = response.status,
                        duration_ms = started.elapsed().as_millis() as u64,
                        "Background task finished"
                    ),
                    Err(err) => tracing::error!(
                        error = %err,
                        duration_ms = started.elapsed().as_millis() as u64,
                        "Background task failed"
                    ),
                }

                drop(permit);
                events.publish(true);
            })
            .map_err(|source| GateError::Spawn {
                route: route.clone(),
                source,
            })?;

        tracing::info!(route = %route, "Background task started");
        Ok(WireResponse::started())
    }
}

/// Run the handler, turning both error returns and panics into
/// [`GateError::HandlerFailure`].
fn invoke<C>(endpoint: &Endpoint<C>, context: &C, request: Request) -> GateResult<Response> {
    match panic::catch_unwind(AssertUnwindSafe(|| endpoint.call(context, request))) {
        Ok(Ok(response)) => Ok(response),
        Ok(Err(report)) => Err(GateError::HandlerFailure {
            route: endpoint.route().to_string(),
            message: format!("{report:#}"),
        }),
        Err(panic) => Err(GateError::HandlerFailure {
            route: endpoint.route().to_string(),
            message: format!("handler panicked: {}", panic_message(panic.as_ref())),
        }),
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&str>() {
        *message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.as_str()
    } else {
        "unknown panic payload"
    }
}
