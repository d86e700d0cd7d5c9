//! HTTP server and graceful shutdown.
//!
//! On shutdown the server:
//! 1. Immediately stops `listener.accept()`, so no new connections are made.
//! 2. Asks every open connection to finish its in-flight request and close.
//! 3. Returns from [`Server::serve_with_shutdown`]; the listening socket is
//!    closed when it drops.

use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::Error;
use crate::method::Method;
use crate::request::Request;
use crate::response::Response;
use crate::error::pause_after_error;
use crate::router::{Route, Router};
use crate::status::Status;

/// The HTTP server, bound and ready to serve.
pub struct Server {
    listener: TcpListener,
    addr: SocketAddr,
}

impl Server {
    /// Binds the listening socket.
    ///
    /// Binding happens here rather than when serving so a taken port is reported
    /// before any worker starts.
    pub async fn bind(addr: SocketAddr) -> Result<Self, Error> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| Error::Bind { addr, source })?;
        let addr = listener.local_addr()?;
        Ok(Self { listener, addr })
    }

    /// The address actually bound (useful when binding port 0).
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Serves `router` until `signal` resolves, then drains in-flight
    /// connections.
    pub async fn serve_with_shutdown(
        self,
        router: Router,
        signal: impl Future<Output = ()>,
    ) -> Result<(), Error> {
        let Self { listener, addr } = self;
        let router = Arc::new(router);

        info!(addr = %addr, "HTTP server listening");

        let mut tasks = tokio::task::JoinSet::new();
        let closing = CancellationToken::new();
        tokio::pin!(signal);

        loop {
            tokio::select! {
                // Check shutdown first so an interrupt stops accepting at once.
                biased;

                () = &mut signal => {
                    info!(in_flight = tasks.len(), "shutdown signal received, draining connections");
                    break;
                }

                res = listener.accept() => {
                    let (stream, remote_addr) = match res {
                        Ok(v) => v,
                        Err(e) => {
                            pause_after_error("accept", &e).await;
                            continue;
                        }
                    };

                    let router = Arc::clone(&router);
                    let closing = closing.clone();
                    let io = TokioIo::new(stream);

                    tasks.spawn(async move {
                        // Called once per request on the connection.
                        let svc = service_fn(move |req| {
                            let router = Arc::clone(&router);
                            async move { dispatch(router, req, remote_addr).await }
                        });

                        let builder = ConnBuilder::new(TokioExecutor::new());
                        let conn = builder.serve_connection(io, svc);
                        tokio::pin!(conn);

                        // Idle keep-alive connections would otherwise hold the
                        // drain below open forever.
                        let res = tokio::select! {
                            res = conn.as_mut() => res,
                            () = closing.cancelled() => {
                                conn.as_mut().graceful_shutdown();
                                conn.await
                            }
                        };
                        if let Err(e) = res {
                            error!(peer = %remote_addr, "connection error: {e}");
                        }
                    });
                }

                // Reap finished connection tasks so the JoinSet stays small.
                Some(_) = tasks.join_next(), if !tasks.is_empty() => {}
            }
        }

        drop(listener);
        closing.cancel();
        while tasks.join_next().await.is_some() {}

        info!("HTTP server stopped");
        Ok(())
    }
}

// ── Request dispatch ──────────────────────────────────────────────────────────

/// Routes one request and produces one response.
///
/// Every failure becomes a status code here, so hyper never sees an error.
async fn dispatch(
    router: Arc<Router>,
    req: hyper::Request<hyper::body::Incoming>,
    remote_addr: SocketAddr,
) -> Result<http::Response<Full<Bytes>>, Infallible> {
    let (parts, body) = req.into_parts();
    debug!(peer = %remote_addr, method = %parts.method, uri = %parts.uri, "request");

    let Ok(method) = parts.method.as_str().parse::<Method>() else {
        return Ok(Response::status(Status::NotImplemented).into_inner());
    };

    let response = match router.lookup(method, parts.uri.path()) {
        Route::Matched(endpoint) => {
            let body = match body.collect().await {
                Ok(collected) => collected.to_bytes(),
                Err(e) => {
                    warn!(peer = %remote_addr, "failed to read request body: {e}");
                    return Ok(Response::status(Status::BadRequest).into_inner());
                }
            };
            let req = Request::new(method, &parts.uri, &parts.headers, body);
            router.call(endpoint, req).await
        }
        Route::NotFound => Response::status(Status::NotFound),
        Route::UnsupportedMethod => Response::status(Status::NotImplemented),
    };

    Ok(response.into_inner())
}
