// Both HTTP backends, served on real sockets, must behave identically
#[cfg(test)]
mod test {
    use std::{net::SocketAddr, sync::Arc, thread, time::Duration};

    use bytes::Bytes;
    use http::{Method, Request, StatusCode, header};
    use http_body_util::{BodyExt, Full};
    use hyper_util::rt::TokioIo;
    use kalium::{
        App, GracefulShutdown,
        app::serve_listener,
        config::BackendKind,
        core::{ENDPOINT_KIND_HEADER, Gate, Response},
        utils::ShutdownReason,
    };
    use serde_json::{Value, json};
    use tokio::net::{TcpListener, TcpStream};

    #[derive(Default)]
    struct Model;

    fn build_gate() -> Arc<Gate<Model>> {
        let app = App::<Model>::new("adapter-test")
            .handler("/predict", |_, _| Ok(Response::ok(json!({"result": 42}))))
            .unwrap()
            .handler("/", |_, req| Ok(Response::ok(json!({"prompt": req.get("prompt")}))))
            .unwrap()
            .background("/train", |_, _| {
                thread::sleep(Duration::from_millis(300));
                Ok(Response::default())
            })
            .unwrap();
        Arc::new(app.into_gate().unwrap())
    }

    struct Reply {
        status: StatusCode,
        kind: Option<String>,
        body: Value,
    }

    async fn send(addr: SocketAddr, method: Method, path: &str, body: &'static str) -> Reply {
        let stream = TcpStream::connect(addr).await.unwrap();
        let (mut sender, connection) = hyper::client::conn::http1::handshake(TokioIo::new(stream))
            .await
            .unwrap();
        tokio::spawn(connection);

        let request = Request::builder()
            .method(method)
            .uri(path)
            .header(header::HOST, addr.to_string())
            .header(header::CONTENT_TYPE, "application/json")
            .body(Full::new(Bytes::from_static(body.as_bytes())))
            .unwrap();

        let response = sender.send_request(request).await.unwrap();
        let status = response.status();
        let kind = response
            .headers()
            .get(ENDPOINT_KIND_HEADER)
            .map(|value| value.to_str().unwrap().to_string());
        let bytes = response.into_body().collect().await.unwrap().to_bytes();

        Reply {
            status,
            kind,
            body: serde_json::from_slice(&bytes).unwrap(),
        }
    }

    async fn exercise(backend: BackendKind) {
        let gate = build_gate();
        let events = gate.events();

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let shutdown = Arc::new(GracefulShutdown::with_timeout(Duration::from_secs(5)));

        let server = {
            let gate = gate.clone();
            let shutdown = shutdown.clone();
            tokio::spawn(async move { serve_listener(gate, backend, listener, &shutdown).await })
        };

        let reply = send(addr, Method::POST, "/predict", "").await;
        assert_eq!(reply.status, StatusCode::OK);
        assert_eq!(reply.kind.as_deref(), Some("handler"));
        assert_eq!(reply.body, json!({"result": 42}));

        let reply = send(addr, Method::POST, "/", r#"{"prompt": "hello"}"#).await;
        assert_eq!(reply.body, json!({"prompt": "hello"}));

        let reply = send(addr, Method::POST, "/missing", "{}").await;
        assert_eq!(reply.status, StatusCode::NOT_FOUND);
        assert_eq!(reply.kind, None);

        let reply = send(addr, Method::GET, "/predict", "").await;
        assert_eq!(reply.status, StatusCode::METHOD_NOT_ALLOWED);

        let reply = send(addr, Method::POST, "/predict", "[1, 2, 3]").await;
        assert_eq!(reply.status, StatusCode::BAD_REQUEST);

        let reply = send(addr, Method::POST, "/train", "{}").await;
        assert_eq!(reply.status, StatusCode::OK);
        assert_eq!(reply.kind.as_deref(), Some("background"));
        assert_eq!(reply.body, json!({"started": true}));

        // Training holds the gate; the rejection names the endpoint we asked for
        let reply = send(addr, Method::POST, "/predict", "").await;
        assert_eq!(reply.status, StatusCode::LOCKED);
        assert_eq!(reply.kind.as_deref(), Some("handler"));

        assert!(events.consume_async().await);
        let reply = send(addr, Method::POST, "/predict", "").await;
        assert_eq!(reply.status, StatusCode::OK);

        shutdown.trigger_shutdown(ShutdownReason::Requested);
        server.await.unwrap().unwrap();
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_axum_backend() {
        exercise(BackendKind::Axum).await;
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_hyper_backend() {
        exercise(BackendKind::Hyper).await;
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_hyper_backend_on_current_thread_runtime() {
        exercise(BackendKind::Hyper).await;
    }
}
