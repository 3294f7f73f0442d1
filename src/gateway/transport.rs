//! Downstream call abstraction.
//!
//! The router only knows how to hand a request to "something that can reach
//! host:port". The HTTP implementation lives in `crate::http::client`; tests
//! plug in scripted transports.

use async_trait::async_trait;
use axum::body::Bytes;
use axum::http::{HeaderMap, Method};

use crate::error::DownstreamError;
use crate::registry::ServiceInstance;

/// Request as seen by the gateway core.
#[derive(Debug, Clone)]
pub struct GatewayRequest {
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl GatewayRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: None,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Path plus query string, as forwarded downstream.
    pub fn path_and_query(&self) -> String {
        match &self.query {
            Some(query) if !query.is_empty() => format!("{}?{}", self.path, query),
            _ => self.path.clone(),
        }
    }
}

/// Response returned by a downstream instance.
#[derive(Debug, Clone)]
pub struct DownstreamResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl DownstreamResponse {
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }

    pub fn ok(body: impl Into<Bytes>) -> Self {
        Self::new(200, body)
    }
}

/// Performs one network call to a selected instance.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn call(
        &self,
        target: &ServiceInstance,
        request: &GatewayRequest,
    ) -> Result<DownstreamResponse, DownstreamError>;
}
