//! HTTP/1.1 transport to downstream instances.
//!
//! # Responsibilities
//! - Forward method, path, query, headers and body to `http://host:port`
//! - Buffer the downstream body up to a configured limit
//! - Map 5xx answers and connection failures to `DownstreamError`
//!
//! # Design Decisions
//! - Pooled hyper-util legacy client shared by all calls
//! - 4xx answers are responses, not failures: they are neither retried nor
//!   counted against the breaker
//! - Hop-by-hop headers are dropped in both directions

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, HeaderMap, Request};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use std::time::Duration;

use crate::config::TransportConfig;
use crate::error::DownstreamError;
use crate::gateway::{DownstreamResponse, GatewayRequest, Transport};
use crate::registry::ServiceInstance;

const HOP_BY_HOP: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Remove headers that only describe a single connection.
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    for name in HOP_BY_HOP {
        headers.remove(*name);
    }
}

#[derive(Clone)]
pub struct HttpTransport {
    client: Client<HttpConnector, Body>,
    max_response_bytes: usize,
}

impl HttpTransport {
    pub fn new(config: &TransportConfig) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(Duration::from_millis(config.connect_timeout_ms)));
        connector.set_nodelay(true);

        let client = Client::builder(TokioExecutor::new()).build(connector);
        Self {
            client,
            max_response_bytes: config.max_response_bytes,
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn call(
        &self,
        target: &ServiceInstance,
        request: &GatewayRequest,
    ) -> Result<DownstreamResponse, DownstreamError> {
        let address = target.address();
        let uri = format!("http://{}{}", address, request.path_and_query());

        let mut builder = Request::builder().method(request.method.clone()).uri(&uri);
        if let Some(headers) = builder.headers_mut() {
            for (name, value) in request.headers.iter() {
                if name != header::HOST {
                    headers.append(name.clone(), value.clone());
                }
            }
            strip_hop_by_hop(headers);
        }
        let outbound = builder
            .body(Body::from(request.body.clone()))
            .map_err(|e| DownstreamError::new(format!("invalid downstream request {}: {}", uri, e)))?;

        tracing::trace!(instance = %target.id, uri = %uri, "Forwarding request");

        let response = self
            .client
            .request(outbound)
            .await
            .map_err(|e| DownstreamError::new(format!("request to {} failed: {}", address, e)))?;

        let (parts, body) = response.into_parts();
        let body = axum::body::to_bytes(Body::new(body), self.max_response_bytes)
            .await
            .map_err(|e| {
                DownstreamError::new(format!("reading response from {} failed: {}", address, e))
            })?;

        if parts.status.is_server_error() {
            return Err(DownstreamError::with_status(
                parts.status.as_u16(),
                format!("{} responded with {}", address, parts.status),
            ));
        }

        let mut headers = parts.headers;
        strip_hop_by_hop(&mut headers);
        Ok(DownstreamResponse {
            status: parts.status.as_u16(),
            headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderValue, Method};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    async fn one_shot_backend(raw_response: &'static str) -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let mut buf = [0u8; 2048];
                let _ = socket.read(&mut buf).await;
                let _ = socket.write_all(raw_response.as_bytes()).await;
            }
        });
        port
    }

    fn instance(port: u16) -> ServiceInstance {
        ServiceInstance::new("i-1", "svc", "127.0.0.1", port)
    }

    #[tokio::test]
    async fn test_success_and_client_error_are_responses() {
        let transport = HttpTransport::new(&TransportConfig::default());

        let ok = one_shot_backend("HTTP/1.1 200 OK\r\nContent-Length: 5\r\nConnection: close\r\n\r\nhello").await;
        let response = transport
            .call(&instance(ok), &GatewayRequest::new(Method::GET, "/x"))
            .await
            .unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(&response.body[..], b"hello");
        assert!(response.headers.get(header::CONNECTION).is_none());

        let missing = one_shot_backend("HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n").await;
        let response = transport
            .call(&instance(missing), &GatewayRequest::new(Method::GET, "/x"))
            .await
            .unwrap();
        assert_eq!(response.status, 404);
    }

    #[tokio::test]
    async fn test_server_error_carries_status() {
        let transport = HttpTransport::new(&TransportConfig::default());
        let port = one_shot_backend("HTTP/1.1 503 Service Unavailable\r\nContent-Length: 0\r\nConnection: close\r\n\r\n").await;

        let err = transport
            .call(&instance(port), &GatewayRequest::new(Method::GET, "/x"))
            .await
            .unwrap_err();
        assert_eq!(err.status, Some(503));
    }

    #[tokio::test]
    async fn test_connection_refused_has_no_status() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let transport = HttpTransport::new(&TransportConfig::default());
        let err = transport
            .call(&instance(port), &GatewayRequest::new(Method::GET, "/x"))
            .await
            .unwrap_err();
        assert_eq!(err.status, None);
        assert!(!err.timed_out);
    }

    #[test]
    fn test_strip_hop_by_hop() {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
        headers.insert("keep-alive", HeaderValue::from_static("timeout=5"));
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/plain"));
        strip_hop_by_hop(&mut headers);
        assert_eq!(headers.len(), 1);
    }
}
