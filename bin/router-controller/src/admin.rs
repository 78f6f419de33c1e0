//! Metrics and health endpoints

use crate::metrics::AdmissionMetrics;
use anyhow::Result;
use http_body_util::Full;
use hyper::{
    body::Bytes,
    header::{HeaderValue, CONTENT_TYPE},
    server::conn::http1,
    service::service_fn,
    Method, Request, Response, StatusCode,
};
use hyper_util::rt::tokio::TokioIo;
use std::convert::Infallible;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

/// Serve `/metrics` and `/healthz` until the listener fails
pub async fn serve(addr: SocketAddr, metrics: AdmissionMetrics) -> Result<()> {
    let listener = TcpListener::bind(&addr).await?;
    info!("Admin server listening on {}", addr);

    loop {
        let (stream, peer_addr) = listener.accept().await?;
        let io = TokioIo::new(stream);
        let metrics = metrics.clone();

        tokio::task::spawn(async move {
            let service = service_fn(move |req| {
                let response = respond(&req, &metrics);
                async move { Ok::<_, Infallible>(response) }
            });

            if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                debug!("Error serving admin connection from {}: {}", peer_addr, e);
            }
        });
    }
}

fn respond<B>(req: &Request<B>, metrics: &AdmissionMetrics) -> Response<Full<Bytes>> {
    match (req.method(), req.uri().path()) {
        (&Method::GET, "/metrics") => match metrics.gather() {
            Ok(text) => {
                let mut response = Response::new(Full::new(Bytes::from(text)));
                response.headers_mut().insert(
                    CONTENT_TYPE,
                    HeaderValue::from_static("text/plain; version=0.0.4"),
                );
                response
            }
            Err(e) => {
                warn!("Failed to gather metrics: {}", e);
                status_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to gather metrics\n")
            }
        },
        (&Method::GET, "/healthz") => status_response(StatusCode::OK, "OK\n"),
        _ => status_response(StatusCode::NOT_FOUND, "Not Found\n"),
    }
}

fn status_response(status: StatusCode, body: &'static str) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from_static(body.as_bytes())));
    *response.status_mut() = status;
    response
}
