//! Gateway error taxonomy.
//!
//! # Propagation
//! - The router never swallows a downstream error; the final error reaches the caller verbatim
//! - The circuit breaker records a failure and hands back the original error unmodified
//! - Metrics, breaker counters and balancer stats are side effects only

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Failure reported by the transport for a single downstream call.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct DownstreamError {
    /// Upstream status code, when the backend answered at all.
    pub status: Option<u16>,
    /// Human readable cause.
    pub message: String,
    /// Set when the per-route timeout won the race against the call.
    pub timed_out: bool,
}

impl DownstreamError {
    /// A failure without a status code (connect error, reset, protocol error).
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            status: None,
            message: message.into(),
            timed_out: false,
        }
    }

    /// A failure carrying the backend's status code.
    pub fn with_status(status: u16, message: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            message: message.into(),
            timed_out: false,
        }
    }

    /// The call did not finish within the route's timeout.
    pub fn timeout(timeout_ms: u64) -> Self {
        Self {
            status: None,
            message: format!("downstream call timed out after {}ms", timeout_ms),
            timed_out: true,
        }
    }
}

/// Application-wide error type.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GatewayError {
    #[error("No route matches {method} {path}")]
    RouteNotFound { method: String, path: String },

    #[error("No instances available for service: {0}")]
    NoInstancesAvailable(String),

    #[error("No healthy instance selected for service: {0}")]
    NoHealthyInstance(String),

    #[error("Circuit breaker is open for service: {0}")]
    CircuitOpen(String),

    #[error("Downstream call failed: {0}")]
    Downstream(#[from] DownstreamError),

    #[error("Invalid route: {0}")]
    InvalidRoute(String),
}

impl GatewayError {
    /// Status code carried by a downstream failure, if any.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            GatewayError::Downstream(e) => e.status,
            _ => None,
        }
    }

    /// Whether a failed attempt may be retried.
    ///
    /// Routing and discovery failures are never retried. With no status codes
    /// configured every call failure is retried; otherwise only downstream
    /// failures whose status is listed.
    pub fn is_retryable(&self, retryable_status_codes: Option<&[u16]>) -> bool {
        match self {
            GatewayError::Downstream(_) | GatewayError::CircuitOpen(_) => {
                match retryable_status_codes {
                    None => true,
                    Some(codes) => self
                        .status_code()
                        .map(|status| codes.contains(&status))
                        .unwrap_or(false),
                }
            }
            _ => false,
        }
    }
}

/// Error response body.
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub message: String,
    pub r#type: String,
    pub code: Option<String>,
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let (status, error_type, code) = match &self {
            GatewayError::RouteNotFound { .. } => (StatusCode::NOT_FOUND, "not_found_error", Some("route_not_found")),
            GatewayError::NoInstancesAvailable(_) => (StatusCode::SERVICE_UNAVAILABLE, "server_error", Some("no_instances_available")),
            GatewayError::NoHealthyInstance(_) => (StatusCode::SERVICE_UNAVAILABLE, "server_error", Some("no_healthy_instance")),
            GatewayError::CircuitOpen(_) => (StatusCode::SERVICE_UNAVAILABLE, "server_error", Some("circuit_open")),
            GatewayError::Downstream(e) if e.timed_out => (StatusCode::GATEWAY_TIMEOUT, "timeout_error", None),
            GatewayError::Downstream(e) => {
                let status = e
                    .status
                    .and_then(|s| StatusCode::from_u16(s).ok())
                    .unwrap_or(StatusCode::BAD_GATEWAY);
                (status, "backend_error", None)
            }
            GatewayError::InvalidRoute(_) => (StatusCode::BAD_REQUEST, "invalid_request_error", Some("invalid_route")),
        };

        let body = Json(ErrorResponse {
            error: ErrorDetail {
                message: self.to_string(),
                r#type: error_type.to_string(),
                code: code.map(|c| c.to_string()),
            },
        });

        (status, body).into_response()
    }
}

/// Result type alias for convenience.
pub type Result<T> = std::result::Result<T, GatewayError>;
