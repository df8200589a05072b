//! HTTP plumbing — listener loop and response helpers
//!
//! Every faultline service is an [`HttpApp`]: it receives the method, path,
//! query string, and collected body, and returns a full response. The serve
//! loop owns the socket handling so the services stay transport-free.

use crate::error::{Error, Result};
use async_trait::async_trait;
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use serde::Serialize;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

/// Response type produced by handlers.
pub type AppResponse = hyper::Response<Full<Bytes>>;

/// A service's HTTP surface.
#[async_trait]
pub trait HttpApp: Send + Sync + 'static {
    /// Handle one request. Transport errors never reach here; the body is
    /// already collected.
    async fn handle(
        &self,
        method: http::Method,
        path: &str,
        query: Option<&str>,
        body: Bytes,
    ) -> AppResponse;

    /// Service name for logging.
    fn name(&self) -> &str;
}

/// Bind `addr` and serve `app` until the task is aborted.
///
/// Returns the bound address (useful with port 0) and the accept-loop task
/// handle.
pub async fn serve(
    addr: SocketAddr,
    app: Arc<dyn HttpApp>,
) -> Result<(SocketAddr, tokio::task::JoinHandle<()>)> {
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| Error::Other(format!("failed to bind {}: {}", addr, e)))?;
    let local_addr = listener.local_addr()?;

    tracing::info!(service = app.name(), address = %local_addr, "listening");

    let handle = tokio::spawn(async move {
        loop {
            let (stream, remote_addr) = match listener.accept().await {
                Ok(conn) => conn,
                Err(e) => {
                    tracing::error!(error = %e, "failed to accept connection");
                    continue;
                }
            };

            let app = app.clone();
            tokio::spawn(async move {
                let io = TokioIo::new(stream);
                let served = http1::Builder::new()
                    .serve_connection(
                        io,
                        service_fn(move |req| dispatch(req, app.clone())),
                    )
                    .await;
                if let Err(e) = served {
                    tracing::debug!(error = %e, remote = %remote_addr, "connection ended");
                }
            });
        }
    });

    Ok((local_addr, handle))
}

/// Collect the body and hand the request to the app.
async fn dispatch(
    req: hyper::Request<hyper::body::Incoming>,
    app: Arc<dyn HttpApp>,
) -> std::result::Result<AppResponse, hyper::Error> {
    let (parts, body) = req.into_parts();
    let body_bytes = match BodyExt::collect(body).await {
        Ok(collected) => collected.to_bytes(),
        Err(_) => Bytes::new(),
    };

    let path = parts.uri.path().to_string();
    let query = parts.uri.query().map(|q| q.to_string());

    Ok(app
        .handle(parts.method, &path, query.as_deref(), body_bytes)
        .await)
}

/// Build a JSON response from a serializable body.
pub fn json_response(status: u16, body: &impl Serialize) -> AppResponse {
    let payload = serde_json::to_vec(body).unwrap_or_default();
    hyper::Response::builder()
        .status(status)
        .header("content-type", "application/json")
        .body(Full::new(Bytes::from(payload)))
        .unwrap()
}

/// Build a `{"error": ...}` JSON response.
pub fn error_response(status: u16, message: &str) -> AppResponse {
    json_response(
        status,
        &crate::api::ErrorResponse {
            error: message.to_string(),
        },
    )
}

/// Build a plain-text response.
pub fn text_response(status: u16, body: &str) -> AppResponse {
    hyper::Response::builder()
        .status(status)
        .header("content-type", "text/plain; charset=utf-8")
        .body(Full::new(Bytes::from(body.to_string())))
        .unwrap()
}

/// Parse a query string into a key→value map. Later duplicates win. Values
/// are percent-decoded for the small character set these services use.
pub fn parse_query(query: Option<&str>) -> HashMap<String, String> {
    let mut map = HashMap::new();
    let Some(query) = query else {
        return map;
    };
    for pair in query.split('&') {
        if pair.is_empty() {
            continue;
        }
        let (key, value) = match pair.split_once('=') {
            Some((k, v)) => (k, v),
            None => (pair, ""),
        };
        map.insert(key.to_string(), percent_decode(value));
    }
    map
}

fn percent_decode(value: &str) -> String {
    // Decode to raw bytes first: multibyte UTF-8 sequences arrive as several
    // consecutive %XX escapes and must be reassembled before interpretation.
    let bytes = value.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'%' if i + 2 < bytes.len() => {
                match u8::from_str_radix(&value[i + 1..i + 3], 16) {
                    Ok(byte) => {
                        out.push(byte);
                        i += 3;
                    }
                    Err(_) => {
                        out.push(b'%');
                        i += 1;
                    }
                }
            }
            b'+' => {
                out.push(b' ');
                i += 1;
            }
            b => {
                out.push(b);
                i += 1;
            }
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}
