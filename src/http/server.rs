//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with gateway-local handlers
//! - Wire up middleware (request ID, tracing, timeout, CORS, auth)
//! - Bind server to listener and drain on shutdown
//! - Hand authorized requests to the forwarder

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{header, Method, Request},
    middleware,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    cors::{AllowHeaders, AllowOrigin, CorsLayer},
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::CorsConfig;
use crate::http::forward::{unsupported_routes, Forwarder, HttpForwarder};
use crate::http::request::{RequestIdExt, UuidRequestId, X_REQUEST_ID};
use crate::http::response::{ErrorCode, ErrorResponse, UpstreamUnavailable};
use crate::lifecycle::startup::GatewayState;
use crate::observability::metrics;
use crate::routing::RoutingDecision;
use crate::security::access_control::auth_middleware;

pub const WELCOME_MESSAGE: &str = "Welcome to Project Management Tool API Gateway";
pub const HEALTH_MESSAGE: &str = "API Gateway is running!";

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<GatewayState>,
    pub forwarder: Arc<dyn Forwarder>,
}

/// HTTP server for the edge gateway.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    /// Create a server that forwards over plain HTTP.
    pub fn new(gateway: Arc<GatewayState>) -> Self {
        let connect_timeout = Duration::from_secs(gateway.config().timeouts.connect_secs);
        Self::with_forwarder(gateway, Arc::new(HttpForwarder::new(connect_timeout)))
    }

    pub fn with_forwarder(gateway: Arc<GatewayState>, forwarder: Arc<dyn Forwarder>) -> Self {
        for route in unsupported_routes(gateway.routes(), forwarder.as_ref()) {
            tracing::warn!(
                route = %route.name,
                target = %route.target,
                "Forwarder cannot reach this target scheme; requests on this route will get 503"
            );
        }

        let router = Self::build_router(AppState { gateway, forwarder });
        Self { router }
    }

    /// The fully layered router, for in-process use.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(state: AppState) -> Router {
        let config = state.gateway.config();
        let request_timeout = Duration::from_secs(config.timeouts.request_secs);
        let cors = config.cors.enabled.then(|| cors_layer(&config.cors));

        let router = Router::new()
            .route("/", get(home))
            .route("/health", get(health))
            .fallback(proxy_handler)
            .layer(middleware::from_fn_with_state(
                state.gateway.clone(),
                auth_middleware,
            ))
            .with_state(state)
            .layer(TimeoutLayer::new(request_timeout))
            .layer(PropagateRequestIdLayer::new(X_REQUEST_ID))
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::new(X_REQUEST_ID, UuidRequestId));

        match cors {
            Some(cors) => router.layer(cors),
            None => router,
        }
    }

    /// Serve until `shutdown` fires, then drain in-flight requests.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let methods: Vec<Method> = config
        .allowed_methods
        .iter()
        .filter_map(|m| m.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_methods(methods)
        .allow_credentials(true)
        .expose_headers([header::AUTHORIZATION])
        .max_age(Duration::from_secs(config.max_age_secs))
}

async fn home() -> &'static str {
    WELCOME_MESSAGE
}

async fn health() -> &'static str {
    HEALTH_MESSAGE
}

/// Forwards requests the auth middleware approved; everything else is a 404.
async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start_time = Instant::now();
    let path = request.uri().path().to_string();
    let method = request.method().to_string();
    let request_id = request.request_id().unwrap_or("unknown").to_string();

    let Some(decision) = request.extensions().get::<RoutingDecision>().cloned() else {
        tracing::warn!(request_id = %request_id, path = %path, "No route matched");
        metrics::record_request(&method, "none", 404, start_time);
        return ErrorResponse::new(ErrorCode::RouteNotFound, &path).into_response();
    };

    let client_addr = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);

    tracing::debug!(
        request_id = %request_id,
        route = %decision.route,
        upstream_path = %decision.path,
        "Forwarding request"
    );

    match state.forwarder.forward(&decision, request, client_addr).await {
        Ok(response) => {
            metrics::record_request(&method, &decision.route, response.status().as_u16(), start_time);
            response
        }
        Err(e) => {
            tracing::error!(
                request_id = %request_id,
                route = %decision.route,
                error = %e,
                "Upstream request failed"
            );
            metrics::record_request(&method, &decision.route, 503, start_time);
            UpstreamUnavailable::new(&decision.route).into_response()
        }
    }
}
