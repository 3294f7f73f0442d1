//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate route patterns and method lists
//! - Validate value ranges (thresholds >= 1, timeouts > 0, multiplier >= 1)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - The same route checks guard routes added at runtime through the admin API

use thiserror::Error;

use crate::config::schema::{GatewayConfig, RouteConfig};

const KNOWN_METHODS: &[&str] = &[
    "GET", "HEAD", "POST", "PUT", "DELETE", "PATCH", "OPTIONS", "CONNECT", "TRACE",
];

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Validate the whole configuration.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.registry.heartbeat_interval_ms == 0 {
        errors.push(ValidationError::new(
            "registry.heartbeat_interval_ms",
            "must be greater than 0",
        ));
    }
    if config.listener.request_timeout_secs == 0 {
        errors.push(ValidationError::new(
            "listener.request_timeout_secs",
            "must be greater than 0",
        ));
    }

    for (i, route) in config.routes.iter().enumerate() {
        collect_route_errors(route, &format!("routes[{}]", i), &mut errors);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Validate one route definition.
pub fn validate_route(route: &RouteConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    collect_route_errors(route, "route", &mut errors);
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn collect_route_errors(route: &RouteConfig, prefix: &str, errors: &mut Vec<ValidationError>) {
    let field = |name: &str| format!("{}.{}", prefix, name);

    if !route.path.starts_with('/') {
        errors.push(ValidationError::new(field("path"), "must start with '/'"));
    }
    if let Some(pos) = route.path.find('*') {
        if pos != route.path.len() - 1 {
            errors.push(ValidationError::new(
                field("path"),
                "'*' is only allowed as the final character",
            ));
        }
    }
    if route.service.trim().is_empty() {
        errors.push(ValidationError::new(field("service"), "must not be empty"));
    }
    if route.methods.is_empty() {
        errors.push(ValidationError::new(field("methods"), "must list at least one method"));
    }
    for method in &route.methods {
        if !KNOWN_METHODS.contains(&method.to_ascii_uppercase().as_str()) {
            errors.push(ValidationError::new(
                field("methods"),
                format!("unknown method '{}'", method),
            ));
        }
    }

    if let Some(cb) = &route.circuit_breaker {
        if cb.failure_threshold == 0 {
            errors.push(ValidationError::new(
                field("circuit_breaker.failure_threshold"),
                "must be at least 1",
            ));
        }
        if cb.half_open_requests == 0 {
            errors.push(ValidationError::new(
                field("circuit_breaker.half_open_requests"),
                "must be at least 1",
            ));
        }
        if cb.reset_timeout_ms == 0 {
            errors.push(ValidationError::new(
                field("circuit_breaker.reset_timeout_ms"),
                "must be greater than 0",
            ));
        }
    }

    if let Some(retry) = &route.retry {
        if retry.max_attempts == 0 {
            errors.push(ValidationError::new(field("retry.max_attempts"), "must be at least 1"));
        }
        if !(retry.backoff_multiplier >= 1.0) {
            errors.push(ValidationError::new(
                field("retry.backoff_multiplier"),
                "must be at least 1.0",
            ));
        }
        if retry.initial_delay_ms > retry.max_delay_ms {
            errors.push(ValidationError::new(
                field("retry.initial_delay_ms"),
                "must not exceed retry.max_delay_ms",
            ));
        }
    }

    if route.timeout_ms == Some(0) {
        errors.push(ValidationError::new(field("timeout_ms"), "must be greater than 0"));
    }
}
