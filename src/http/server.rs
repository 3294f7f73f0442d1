//! Inbound HTTP front.
//!
//! # Responsibilities
//! - Create the Axum router with a catch-all handler
//! - Wire up middleware (request ID, tracing, timeout, body limit)
//! - Hand every request to the gateway core
//! - Render gateway errors as JSON error responses
//!
//! # Design Decisions
//! - The body is buffered before routing so retries can replay it
//! - `x-request-id` is generated when absent and echoed on the response

use axum::{
    body::Body,
    extract::{Request, State},
    http::{HeaderName, StatusCode},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::ListenerConfig;
use crate::gateway::{DownstreamResponse, GatewayRequest, GatewayRouter};
use crate::http::client::strip_hop_by_hop;

pub const X_REQUEST_ID: &str = "x-request-id";

/// Application state injected into the handler.
#[derive(Clone)]
struct AppState {
    gateway: Arc<GatewayRouter>,
    max_body_bytes: usize,
}

/// HTTP server in front of the gateway.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    pub fn new(gateway: Arc<GatewayRouter>, config: &ListenerConfig) -> Self {
        let state = AppState {
            gateway,
            max_body_bytes: config.max_body_bytes,
        };
        Self {
            router: Self::build_router(config, state),
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &ListenerConfig, state: AppState) -> Router {
        let request_id = HeaderName::from_static(X_REQUEST_ID);
        Router::new()
            .route("/", any(gateway_handler))
            .route("/{*path}", any(gateway_handler))
            .with_state(state)
            .layer(RequestBodyLimitLayer::new(config.max_body_bytes))
            .layer(TimeoutLayer::new(Duration::from_secs(config.request_timeout_secs)))
            .layer(PropagateRequestIdLayer::new(request_id.clone()))
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::new(request_id, MakeRequestUuid))
    }

    /// The configured router, for in-process use.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Serve until a shutdown signal arrives.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "Gateway listener starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;

        tracing::info!("Gateway listener stopped");
        Ok(())
    }
}

async fn gateway_handler(State(state): State<AppState>, request: Request) -> Response {
    let (parts, body) = request.into_parts();
    let body = match axum::body::to_bytes(body, state.max_body_bytes).await {
        Ok(bytes) => bytes,
        Err(_) => return (StatusCode::PAYLOAD_TOO_LARGE, "Request body too large").into_response(),
    };

    let request = GatewayRequest {
        method: parts.method,
        path: parts.uri.path().to_string(),
        query: parts.uri.query().map(str::to_string),
        headers: parts.headers,
        body,
    };

    match state.gateway.route(&request).await {
        Ok(response) => into_http_response(response),
        Err(error) => error.into_response(),
    }
}

fn into_http_response(downstream: DownstreamResponse) -> Response {
    let status = StatusCode::from_u16(downstream.status).unwrap_or(StatusCode::BAD_GATEWAY);
    let mut headers = downstream.headers;
    strip_hop_by_hop(&mut headers);

    let mut response = Response::new(Body::from(downstream.body));
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RouteConfig;
    use crate::gateway::testing::ScriptedTransport;
    use crate::registry::ServiceRegistry;
    use axum::http::Request as HttpRequest;
    use std::collections::HashMap;
    use tower::ServiceExt;

    fn server(transport: Arc<ScriptedTransport>) -> (Router, Arc<GatewayRouter>) {
        let registry = Arc::new(ServiceRegistry::new(Duration::from_secs(10)));
        let gateway = Arc::new(GatewayRouter::new(registry, transport));
        let server = HttpServer::new(gateway.clone(), &ListenerConfig::default());
        (server.router(), gateway)
    }

    #[tokio::test]
    async fn test_forwards_and_sets_request_id() {
        let transport = Arc::new(ScriptedTransport::new());
        let (app, gateway) = server(transport.clone());
        gateway.add_route(RouteConfig::new("/api/*", "api", &["GET"])).unwrap();
        gateway.registry().register_service("api", "10.0.0.1", 9001, HashMap::new());

        let response = app
            .oneshot(HttpRequest::get("/api/orders?page=1").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key(X_REQUEST_ID));
        assert_eq!(transport.calls(), vec!["10.0.0.1:9001"]);
    }

    #[tokio::test]
    async fn test_unmatched_route_is_json_404() {
        let (app, _) = server(Arc::new(ScriptedTransport::new()));
        let response = app
            .oneshot(HttpRequest::get("/nowhere").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body = axum::body::to_bytes(response.into_body(), 4096).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"]["code"], "route_not_found");
    }

    #[tokio::test]
    async fn test_no_instances_is_503() {
        let (app, gateway) = server(Arc::new(ScriptedTransport::new()));
        gateway.add_route(RouteConfig::new("/api/*", "api", &["POST"])).unwrap();
        let response = app
            .oneshot(HttpRequest::post("/api/x").body(Body::from("{}")).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
