//! A live HTTP server for tests that need a real endpoint.
//!
//! The listener is bound before [`start_http_server`] returns, so requests
//! made right after it cannot race the server start. Routes can be added at
//! any time; each request is routed against the current set.

use std::{convert::Infallible, net::TcpListener, sync::{Arc, RwLock}, thread::JoinHandle};

use axum::{body::Body, http::Request, response::Response, routing::MethodRouter, Router};
use tokio::sync::oneshot;
use tower::{service_fn, ServiceExt};
use tracing::{info, warn};

use crate::error::{TfError, TfResult};

/// A running background server. Shuts down on [`shutdown`](HttpServer::shutdown) or drop.
pub struct HttpServer {
    port: u16,
    routes: Arc<RwLock<Router>>,
    stop: Option<oneshot::Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

/// Starts a server on `port`. Port `0` picks a free port; [`HttpServer::port`]
/// reports the one actually bound.
pub fn start_http_server(port: u16) -> TfResult<HttpServer> {
    let listener = TcpListener::bind(("127.0.0.1", port))?;
    listener.set_nonblocking(true)?;
    let port = listener.local_addr()?.port();

    let routes = Arc::new(RwLock::new(Router::new()));
    let shared = Arc::clone(&routes);
    let app = Router::new().fallback_service(service_fn(move |request: Request<Body>| {
        let router = shared
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone();
        async move { Ok::<Response, Infallible>(route(router, request).await) }
    }));

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .enable_all()
        .build()?;
    let (stop, stopped) = oneshot::channel::<()>();
    let thread = std::thread::Builder::new()
        .name(format!("tf-http-{}", port))
        .spawn(move || {
            runtime.block_on(async move {
                let listener = match tokio::net::TcpListener::from_std(listener) {
                    Ok(listener) => listener,
                    Err(err) => {
                        warn!(%err, port, "failed to register listener");
                        return;
                    }
                };
                let served = axum::serve(listener, app)
                    .with_graceful_shutdown(async {
                        let _ = stopped.await;
                    })
                    .await;
                if let Err(err) = served {
                    warn!(%err, port, "http server stopped with an error");
                }
            });
        })
        .map_err(|err| TfError::Server {
            message: format!("failed to spawn server thread: {}", err),
        })?;

    info!(port, "http server listening");
    Ok(HttpServer {
        port,
        routes,
        stop: Some(stop),
        thread: Some(thread),
    })
}

async fn route(router: Router, request: Request<Body>) -> Response {
    match router.oneshot(request).await {
        Ok(response) => response,
        Err(never) => match never {},
    }
}

impl HttpServer {
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Base URL, `http://localhost:<port>`.
    pub fn endpoint(&self) -> String {
        format!("http://localhost:{}", self.port)
    }

    /// Registers `handler` at `path`. An empty path means `/`.
    ///
    /// A path ending in `/` also serves everything below it, so `""` handles
    /// every request that no more specific route claims.
    ///
    /// # Panics
    ///
    /// If `path` is already registered, as axum does for duplicate routes.
    pub fn add_handler(&self, path: &str, handler: MethodRouter) -> &Self {
        let path = normalize_path(path);
        let mut routes = self
            .routes
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let current = std::mem::take(&mut *routes);
        *routes = match subtree_pattern(&path) {
            Subtree::Root => current.route(&path, handler.clone()).fallback(handler),
            Subtree::Below(pattern) => current
                .route(&path, handler.clone())
                .route(&pattern, handler),
            Subtree::Exact => current.route(&path, handler),
        };
        self
    }

    pub fn add_handlers<I, P>(&self, handlers: I) -> &Self
    where
        I: IntoIterator<Item = (P, MethodRouter)>,
        P: AsRef<str>,
    {
        for (path, handler) in handlers {
            self.add_handler(path.as_ref(), handler);
        }
        self
    }

    /// Stops accepting connections and waits for the server thread. Calling
    /// it again does nothing.
    pub fn shutdown(&mut self) {
        let Some(stop) = self.stop.take() else {
            return;
        };
        let _ = stop.send(());
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                warn!(port = self.port, "http server thread panicked");
            }
        }
        info!(port = self.port, "http server stopped");
    }
}

impl Drop for HttpServer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn normalize_path(path: &str) -> String {
    if path.is_empty() {
        "/".to_string()
    } else if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{}", path)
    }
}

#[derive(Debug, PartialEq)]
enum Subtree {
    Exact,
    Root,
    Below(String),
}

fn subtree_pattern(path: &str) -> Subtree {
    if path == "/" {
        Subtree::Root
    } else if path.ends_with('/') {
        Subtree::Below(format!("{}*rest", path))
    } else {
        Subtree::Exact
    }
}
