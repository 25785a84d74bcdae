//! HTTP transport.
//!
//! One tokio task per connection, HTTP/1.1 via hyper. Mock API calls run the
//! dispatcher on a blocking thread; static assets are read asynchronously.

use crate::config::{parse_listen_addr, Config};
use crate::dispatcher::{route, MockDispatcher, Route};
use crate::metrics;
use crate::request::MockRequest;
use crate::response::{error_response, text_response, MockResponse, ResponseBuilder};
use crate::static_files::StaticFiles;
use anyhow::Context;
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::header::CONTENT_TYPE;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::{TokioIo, TokioTimer};
use std::convert::Infallible;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

const METRICS_PATH: &str = "/metrics";

/// The mock API server.
pub struct MockServer {
    dispatcher: Arc<MockDispatcher>,
    static_files: StaticFiles,
    read_timeout: Duration,
}

impl MockServer {
    pub fn new(dispatcher: MockDispatcher, static_files: StaticFiles) -> Self {
        Self {
            dispatcher: Arc::new(dispatcher),
            static_files,
            read_timeout: Duration::from_secs(10),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            MockDispatcher::from_config(config),
            StaticFiles::new(config.static_dir.clone()),
        )
        .with_read_timeout(Duration::from_secs(config.read_timeout_secs))
    }

    /// Time allowed for a client to send the request head.
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    pub fn dispatcher(&self) -> &MockDispatcher {
        &self.dispatcher
    }

    /// Accept connections until `shutdown` resolves.
    pub async fn run<F>(self: Arc<Self>, listener: TcpListener, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, addr)) => {
                            let server = Arc::clone(&self);
                            tokio::spawn(async move {
                                let io = TokioIo::new(stream);
                                let read_timeout = server.read_timeout;
                                let service = service_fn(move |req| {
                                    let server = Arc::clone(&server);
                                    async move { server.handle(req).await }
                                });
                                let mut builder = http1::Builder::new();
                                builder
                                    .timer(TokioTimer::new())
                                    .header_read_timeout(read_timeout);
                                if let Err(e) = builder.serve_connection(io, service).await {
                                    debug!("Connection error from {}: {}", addr, e);
                                }
                            });
                        }
                        Err(e) => {
                            error!("Accept error: {}", e);
                        }
                    }
                }
                _ = &mut shutdown => {
                    info!("Mock server shutting down");
                    break;
                }
            }
        }
    }

    /// Answer one request. Every failure becomes a response.
    pub async fn handle(&self, req: Request<Incoming>) -> Result<Response<Full<Bytes>>, Infallible> {
        let (parts, body) = req.into_parts();
        let body = match body.collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(e) => {
                warn!("Failed to read request body: {}", e);
                return Ok(
                    error_response(StatusCode::BAD_REQUEST, "failed to read request body")
                        .into_http(),
                );
            }
        };
        let request = MockRequest::from_parts(&parts, body);

        let response = match route(&request.uri) {
            Route::Static => self.serve_static(&request).await,
            Route::Api => self.serve_api(request).await,
        };
        Ok(response.into_http())
    }

    async fn serve_static(&self, request: &MockRequest) -> MockResponse {
        let started = Instant::now();
        let response = self.static_files.serve(&request.path).await;
        metrics::record_request(
            &request.method,
            "static",
            started.elapsed().as_secs_f64() * 1000.0,
        );
        debug!(
            "{} {} -> {} (static)",
            request.method, request.path, response.status
        );
        response
    }

    async fn serve_api(&self, request: MockRequest) -> MockResponse {
        let dispatcher = Arc::clone(&self.dispatcher);
        match tokio::task::spawn_blocking(move || dispatcher.handle(&request)).await {
            Ok(response) => response,
            Err(e) => {
                error!("Dispatch task failed: {}", e);
                error_response(StatusCode::INTERNAL_SERVER_ERROR, "internal server error")
            }
        }
    }
}

/// Serve `GET /metrics` in Prometheus text format until `shutdown` resolves.
pub async fn serve_metrics<F>(listener: TcpListener, shutdown: F)
where
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            result = listener.accept() => {
                match result {
                    Ok((stream, addr)) => {
                        tokio::spawn(async move {
                            let io = TokioIo::new(stream);
                            let service = service_fn(|req: Request<Incoming>| async move {
                                Ok::<_, Infallible>(metrics_response(req.method(), req.uri().path()).into_http())
                            });
                            if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                                debug!("Metrics connection error from {}: {}", addr, e);
                            }
                        });
                    }
                    Err(e) => {
                        error!("Metrics accept error: {}", e);
                    }
                }
            }
            _ = &mut shutdown => {
                info!("Metrics listener shutting down");
                break;
            }
        }
    }
}

fn metrics_response(method: &Method, path: &str) -> MockResponse {
    if method == Method::GET && path == METRICS_PATH {
        ResponseBuilder::new(StatusCode::OK)
            .set_header(CONTENT_TYPE, prometheus::TEXT_FORMAT)
            .body(metrics::collect_metrics())
            .build()
    } else {
        text_response(StatusCode::NOT_FOUND, "not found\n")
    }
}

/// Bind the configured listeners and serve until Ctrl-C.
pub async fn serve(config: Config) -> Result<(), anyhow::Error> {
    let addr = parse_listen_addr(&config.listen)?;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind mock listener on {addr}"))?;
    info!(
        "Mock server listening on http://{} (definitions: {}, static: {}, cache: {})",
        addr,
        config.dir.display(),
        config.static_dir.display(),
        if config.cache.enabled { "on" } else { "off" }
    );

    if let Some(metrics_config) = &config.metrics {
        let metrics_addr = parse_listen_addr(&metrics_config.listen)?;
        let metrics_listener = TcpListener::bind(metrics_addr)
            .await
            .with_context(|| format!("failed to bind metrics listener on {metrics_addr}"))?;
        info!("Metrics available at http://{}{}", metrics_addr, METRICS_PATH);
        tokio::spawn(serve_metrics(metrics_listener, shutdown_signal()));
    }

    let server = Arc::new(MockServer::from_config(&config));
    server.run(listener, shutdown_signal()).await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_endpoint_routing() {
        metrics::record_definition_cache("miss");
        let response = metrics_response(&Method::GET, "/metrics");
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.header("content-type"), Some(prometheus::TEXT_FORMAT));
        assert!(String::from_utf8_lossy(&response.body).contains("mirage_definition_cache_total"));

        assert_eq!(
            metrics_response(&Method::GET, "/other").status,
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            metrics_response(&Method::POST, "/metrics").status,
            StatusCode::NOT_FOUND
        );
    }
}
