//! HTTP gateway for ctxbridge.
//!
//! Exposes one endpoint per (context propagation × bridging strategy)
//! combination under `/api/context`, the pipeline type demos under
//! `/api/types`, and a `/health` probe.
//!
//! Built on Axum.

pub mod context_api;
pub mod error;
pub mod types_api;

use axum::{
    Router,
    extract::Request,
    http::HeaderValue,
    middleware::{self, Next},
    response::{Json, Response},
    routing::get,
};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{Instrument, info, info_span};

use ctxbridge_config::{AppConfig, ConfigError};
use ctxbridge_core::{Bridge, BridgePolicy};

pub use error::ApiError;

/// Shared application state for the gateway.
pub struct GatewayState {
    pub bridge: Bridge,
    /// Policies reachable over HTTP.
    pub policies: HashSet<BridgePolicy>,
}

impl GatewayState {
    pub fn from_config(config: &AppConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            bridge: Bridge::new(config.bridge.options()),
            policies: config.bridge.enabled_policies()?.into_iter().collect(),
        })
    }
}

pub type SharedState = Arc<GatewayState>;

/// Build the Axum router with all gateway routes.
pub fn build_router(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .nest("/api/context", context_api::router(state))
        .nest("/api/types", types_api::router())
        .layer(middleware::from_fn(request_id_middleware))
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

/// Start the gateway HTTP server.
pub async fn start(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);
    let state = Arc::new(GatewayState::from_config(&config)?);

    info!(
        addr = %addr,
        blocking = ?config.bridge.blocking,
        policies = state.policies.len(),
        "Gateway starting"
    );

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, build_router(state)).await?;

    Ok(())
}

/// Tag every request with an id, both in its log span and in the
/// `x-request-id` response header.
async fn request_id_middleware(req: Request, next: Next) -> Response {
    let id = uuid::Uuid::new_v4().to_string();
    let span = info_span!("request", id = %id, path = %req.uri().path());

    let mut response = next.run(req).instrument(span).await;
    if let Ok(value) = HeaderValue::from_str(&id) {
        response.headers_mut().insert("x-request-id", value);
    }
    response
}

// --- Handlers ---

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}
