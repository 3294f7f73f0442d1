//! Admin API handlers.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::admin::AdminState;
use crate::config::RouteConfig;
use crate::error::{ErrorDetail, ErrorResponse, GatewayError};
use crate::gateway::HealthReport;
use crate::load_balancer::{Algorithm, BalancerStats};
use crate::observability::MetricsSnapshot;
use crate::registry::{InstanceSnapshot, Registration};
use crate::resilience::BreakerStats;

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub routes: usize,
    pub instances: usize,
}

#[derive(Serialize, Deserialize)]
pub struct Registered {
    pub id: String,
}

#[derive(Deserialize)]
pub struct RoutePath {
    pub path: String,
}

fn error_response(status: StatusCode, code: &str, message: String) -> Response {
    let body = ErrorResponse {
        error: ErrorDetail {
            message,
            r#type: "invalid_request_error".to_string(),
            code: Some(code.to_string()),
        },
    };
    (status, Json(body)).into_response()
}

fn not_found(message: String) -> Response {
    error_response(StatusCode::NOT_FOUND, "not_found", message)
}

fn parse_algorithm(raw: &str) -> Result<Algorithm, Response> {
    raw.parse()
        .map_err(|e: String| error_response(StatusCode::BAD_REQUEST, "invalid_algorithm", e))
}

pub async fn get_status(State(state): State<AdminState>) -> Json<SystemStatus> {
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
        routes: state.gateway.get_routes().len(),
        instances: state.gateway.registry().len(),
    })
}

pub async fn get_health(State(state): State<AdminState>) -> Json<HealthReport> {
    Json(state.gateway.get_health())
}

pub async fn get_metrics(State(state): State<AdminState>) -> Json<MetricsSnapshot> {
    Json(state.gateway.get_metrics())
}

pub async fn list_routes(State(state): State<AdminState>) -> Json<Vec<RouteConfig>> {
    Json(state.gateway.get_routes())
}

pub async fn add_route(
    State(state): State<AdminState>,
    Json(route): Json<RouteConfig>,
) -> Result<(StatusCode, Json<RouteConfig>), GatewayError> {
    state.gateway.add_route(route.clone())?;
    Ok((StatusCode::CREATED, Json(route)))
}

pub async fn remove_route(
    State(state): State<AdminState>,
    Query(query): Query<RoutePath>,
) -> Response {
    if state.gateway.remove_route(&query.path) {
        StatusCode::NO_CONTENT.into_response()
    } else {
        not_found(format!("no route registered under {}", query.path))
    }
}

pub async fn list_breakers(State(state): State<AdminState>) -> Json<Vec<BreakerStats>> {
    Json(state.gateway.all_breaker_stats())
}

pub async fn get_breaker(
    State(state): State<AdminState>,
    Path(service): Path<String>,
) -> Result<Json<BreakerStats>, Response> {
    state
        .gateway
        .breaker_stats(&service)
        .map(Json)
        .ok_or_else(|| not_found(format!("no circuit breaker for service {}", service)))
}

pub async fn reset_breaker(
    State(state): State<AdminState>,
    Path(service): Path<String>,
) -> Result<Json<BreakerStats>, Response> {
    if !state.gateway.reset_breaker(&service) {
        return Err(not_found(format!("no circuit breaker for service {}", service)));
    }
    state
        .gateway
        .breaker_stats(&service)
        .map(Json)
        .ok_or_else(|| not_found(format!("no circuit breaker for service {}", service)))
}

pub async fn list_balancers(State(state): State<AdminState>) -> Json<Vec<BalancerStats>> {
    Json(state.gateway.all_balancer_stats())
}

pub async fn get_balancer(
    State(state): State<AdminState>,
    Path((service, algorithm)): Path<(String, String)>,
) -> Result<Json<BalancerStats>, Response> {
    let algorithm = parse_algorithm(&algorithm)?;
    state
        .gateway
        .balancer_stats(&service, algorithm)
        .map(Json)
        .ok_or_else(|| not_found(format!("no {} balancer for service {}", algorithm, service)))
}

pub async fn reset_balancer(
    State(state): State<AdminState>,
    Path((service, algorithm)): Path<(String, String)>,
) -> Result<Json<BalancerStats>, Response> {
    let algorithm = parse_algorithm(&algorithm)?;
    if !state.gateway.reset_balancer(&service, algorithm) {
        return Err(not_found(format!("no {} balancer for service {}", algorithm, service)));
    }
    state
        .gateway
        .balancer_stats(&service, algorithm)
        .map(Json)
        .ok_or_else(|| not_found(format!("no {} balancer for service {}", algorithm, service)))
}

pub async fn list_services(State(state): State<AdminState>) -> Json<Vec<InstanceSnapshot>> {
    let instances = state.gateway.registry().get_all_services();
    Json(instances.iter().map(|i| i.snapshot()).collect())
}

pub async fn register_service(
    State(state): State<AdminState>,
    Json(registration): Json<Registration>,
) -> Result<(StatusCode, Json<Registered>), Response> {
    if registration.name.trim().is_empty() || registration.host.trim().is_empty() {
        return Err(error_response(
            StatusCode::BAD_REQUEST,
            "invalid_registration",
            "name and host must not be empty".to_string(),
        ));
    }
    let id = state.gateway.registry().register_from(registration);
    Ok((StatusCode::CREATED, Json(Registered { id })))
}

pub async fn unregister_service(
    State(state): State<AdminState>,
    Path(id): Path<String>,
) -> Response {
    if state.gateway.registry().unregister(&id) {
        StatusCode::NO_CONTENT.into_response()
    } else {
        not_found(format!("unknown instance {}", id))
    }
}

pub async fn heartbeat(State(state): State<AdminState>, Path(id): Path<String>) -> Response {
    if state.gateway.registry().update_heartbeat(&id) {
        StatusCode::NO_CONTENT.into_response()
    } else {
        not_found(format!("unknown instance {}", id))
    }
}
