//! Synchronous-dispatch adapter on bare hyper HTTP/1.1 connections.
//!
//! Each connection is served on its own task and the gate dispatch runs inline
//! on that task's worker thread through `block_in_place`. On a current-thread
//! runtime, where `block_in_place` is unavailable, dispatch moves to the
//! blocking pool instead.
use std::{convert::Infallible, sync::Arc};

use bytes::Bytes;
use eyre::Result;
use http_body_util::{BodyExt, Full};
use hyper::{Request, Response, body::Incoming, server::conn::http1, service::service_fn};
use hyper_util::{rt::TokioIo, server::graceful::GracefulShutdown as ConnectionDrain};
use tokio::{
    net::TcpListener,
    runtime::{Handle, RuntimeFlavor},
};

use crate::{
    adapters::http_handler::{HttpHandler, render_error},
    core::Gate,
    ports::{HandlerError, HttpServer},
    utils::ShutdownToken,
};

pub struct HyperServer<C> {
    handler: HttpHandler<C>,
}

impl<C> HyperServer<C>
where
    C: Send + Sync + 'static,
{
    pub fn new(gate: Arc<Gate<C>>) -> Self {
        Self {
            handler: HttpHandler::new(gate),
        }
    }
}

async fn handle_request<C>(
    handler: HttpHandler<C>,
    req: Request<Incoming>,
) -> Result<Response<Full<Bytes>>, Infallible>
where
    C: Send + Sync + 'static,
{
    let (parts, body) = req.into_parts();
    let body = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            return Ok(render_error(&HandlerError::BadRequest(format!(
                "Failed to read request body: {e}"
            ))));
        }
    };

    if Handle::current().runtime_flavor() == RuntimeFlavor::MultiThread {
        let response =
            tokio::task::block_in_place(|| handler.handle(&parts.method, parts.uri.path(), &body));
        return Ok(response);
    }

    let path = parts.uri.path().to_string();
    let method = parts.method;
    let response =
        match tokio::task::spawn_blocking(move || handler.handle(&method, &path, &body)).await {
            Ok(response) => response,
            Err(e) => render_error(&HandlerError::InternalError(e.to_string())),
        };
    Ok(response)
}

impl<C> HttpServer for HyperServer<C>
where
    C: Send + Sync + 'static,
{
    fn name(&self) -> &'static str {
        "hyper"
    }

    async fn serve(&self, listener: TcpListener, mut shutdown: ShutdownToken) -> Result<()> {
        let drain = ConnectionDrain::new();

        loop {
            tokio::select! {
                accepted = listener.accept() => {
                    let (stream, peer) = match accepted {
                        Ok(connection) => connection,
                        Err(e) => {
                            tracing::debug!("Accept error: {}", e);
                            continue;
                        }
                    };

                    let handler = self.handler.clone();
                    let service = service_fn(move |req| handle_request(handler.clone(), req));
                    let connection = http1::Builder::new()
                        .serve_connection(TokioIo::new(stream), service);
                    let connection = drain.watch(connection);

                    tokio::spawn(async move {
                        if let Err(e) = connection.await {
                            tracing::debug!("Connection from {} ended with error: {}", peer, e);
                        }
                    });
                }
                reason = shutdown.wait_for_shutdown() => {
                    tracing::info!("hyper server draining connections: {:?}", reason);
                    break;
                }
            }
        }

        drop(listener);
        drain.shutdown().await;
        Ok(())
    }
}
