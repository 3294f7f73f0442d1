//! Admin HTTP API.
//!
//! Every endpoint requires `Authorization: Bearer <api_key>`. Backend services
//! use the `/admin/services` endpoints to register and heartbeat.

pub mod auth;
pub mod handlers;

use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;

use self::auth::admin_auth_middleware;
use self::handlers::*;
use crate::gateway::GatewayRouter;

#[derive(Clone)]
pub struct AdminState {
    pub gateway: Arc<GatewayRouter>,
    pub api_key: Arc<str>,
}

pub fn setup_admin_router(gateway: Arc<GatewayRouter>, api_key: &str) -> Router {
    let state = AdminState {
        gateway,
        api_key: Arc::from(api_key),
    };

    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/health", get(get_health))
        .route("/admin/metrics", get(get_metrics))
        .route(
            "/admin/routes",
            get(list_routes).post(add_route).delete(remove_route),
        )
        .route("/admin/breakers", get(list_breakers))
        .route("/admin/breakers/{service}", get(get_breaker))
        .route("/admin/breakers/{service}/reset", post(reset_breaker))
        .route("/admin/balancers", get(list_balancers))
        .route("/admin/balancers/{service}/{algorithm}", get(get_balancer))
        .route(
            "/admin/balancers/{service}/{algorithm}/reset",
            post(reset_balancer),
        )
        .route("/admin/services", get(list_services).post(register_service))
        .route("/admin/services/{id}", delete(unregister_service))
        .route("/admin/services/{id}/heartbeat", post(heartbeat))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            admin_auth_middleware,
        ))
        .with_state(state)
}
