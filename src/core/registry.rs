//! Route table mapping request paths to handlers.
//!
//! Endpoints are registered during startup and the registry is then moved into
//! a [`Gate`](crate::core::Gate), which only ever reads from it. Lookups are
//! exact string matches; there is no prefix or pattern routing.
use std::{collections::HashMap, fmt, sync::Arc};

use crate::core::{
    contract::{EndpointKind, Request, Response},
    error::{GateError, GateResult},
};

/// Signature shared by all handlers: shared context plus the request.
pub type HandlerFn<C> = dyn Fn(&C, Request) -> eyre::Result<Response> + Send + Sync;

/// A registered route. Immutable once built.
pub struct Endpoint<C> {
    route: String,
    kind: EndpointKind,
    handler: Box<HandlerFn<C>>,
}

impl<C> Endpoint<C> {
    pub fn route(&self) -> &str {
        &self.route
    }

    pub fn kind(&self) -> EndpointKind {
        self.kind
    }

    /// Call the handler without any gate bookkeeping.
    pub fn call(&self, context: &C, request: Request) -> eyre::Result<Response> {
        (self.handler)(context, request)
    }
}

impl<C> fmt::Debug for Endpoint<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoint")
            .field("route", &self.route)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

/// Collection of endpoints keyed by route.
pub struct EndpointRegistry<C> {
    endpoints: HashMap<String, Arc<Endpoint<C>>>,
}

impl<C> Default for EndpointRegistry<C> {
    fn default() -> Self {
        Self {
            endpoints: HashMap::new(),
        }
    }
}

impl<C> EndpointRegistry<C> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` under `route`.
    ///
    /// Fails with [`GateError::DuplicateRoute`] if the route is taken and
    /// [`GateError::InvalidRoute`] if it does not start with `/`.
    pub fn register<F>(
        &mut self,
        route: impl Into<String>,
        kind: EndpointKind,
        handler: F,
    ) -> GateResult<&mut Self>
    where
        F: Fn(&C, Request) -> eyre::Result<Response> + Send + Sync + 'static,
    {
        let route = route.into();
        if !route.starts_with('/') {
            return Err(GateError::InvalidRoute { route });
        }
        if self.endpoints.contains_key(&route) {
            return Err(GateError::DuplicateRoute { route });
        }

        tracing::debug!("Registered {} endpoint at {}", kind, route);
        let endpoint = Endpoint {
            route: route.clone(),
            kind,
            handler: Box::new(handler),
        };
        self.endpoints.insert(route, Arc::new(endpoint));
        Ok(self)
    }

    /// Register a blocking endpoint.
    pub fn handler<F>(&mut self, route: impl Into<String>, handler: F) -> GateResult<&mut Self>
    where
        F: Fn(&C, Request) -> eyre::Result<Response> + Send + Sync + 'static,
    {
        self.register(route, EndpointKind::Blocking, handler)
    }

    /// Register a fire-and-forget endpoint.
    pub fn background<F>(&mut self, route: impl Into<String>, handler: F) -> GateResult<&mut Self>
    where
        F: Fn(&C, Request) -> eyre::Result<Response> + Send + Sync + 'static,
    {
        self.register(route, EndpointKind::FireAndForget, handler)
    }

    /// Exact-match lookup.
    pub fn resolve(&self, route: &str) -> GateResult<Arc<Endpoint<C>>> {
        self.endpoints
            .get(route)
            .cloned()
            .ok_or_else(|| GateError::RouteNotFound {
                route: route.to_string(),
            })
    }

    pub fn contains(&self, route: &str) -> bool {
        self.endpoints.contains_key(route)
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    /// Registered routes with their kinds, sorted by route.
    pub fn routes(&self) -> Vec<(&str, EndpointKind)> {
        let mut routes = self
            .endpoints
            .values()
            .map(|endpoint| (endpoint.route(), endpoint.kind()))
            .collect::<Vec<_>>();
        routes.sort_by_key(|(route, _)| *route);
        routes
    }
}
