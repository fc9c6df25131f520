//! Context propagation endpoints.
//!
//! Endpoints (all `GET`, plain-text body):
//!
//! - `/api/context/default`                            — nothing written
//! - `/api/context/populated`                          — written, read in-pipeline
//! - `/api/context/populated-run-blocking`             — `no-context`
//! - `/api/context/populated-run-blocking-bridged`     — `bridged-original`
//! - `/api/context/populated-run-blocking-init`        — `bridged-fabricated`
//! - `/api/context/populated-completable-future`       — `future-bridge-no-context`
//! - `/api/context/populated-completable-future-bridged` — `future-bridge-bridged`
//!
//! Every request subscribes its pipeline with a fresh, empty context.

use axum::{Router, extract::State, routing::get};

use ctxbridge_core::{Bridge, BridgePolicy, Context, ContextResponse, DEMO_KEY, Pipeline, Result};

use crate::SharedState;
use crate::error::ApiError;

/// Value the populated endpoints write under [`DEMO_KEY`].
pub const DEMO_VALUE: &str = "value";

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/default", get(default_handler))
        .route("/populated", get(populated_handler))
        .route("/populated-run-blocking", get(run_blocking_handler))
        .route("/populated-run-blocking-bridged", get(run_blocking_bridged_handler))
        .route("/populated-run-blocking-init", get(run_blocking_init_handler))
        .route("/populated-completable-future", get(completable_future_handler))
        .route(
            "/populated-completable-future-bridged",
            get(completable_future_bridged_handler),
        )
        .with_state(state)
}

/// Write the demo entry into the context seen by `pipeline`.
pub fn populated<T: Send + 'static>(pipeline: Pipeline<T>) -> Pipeline<T> {
    pipeline.context_write(|ctx| ctx.with(DEMO_KEY, DEMO_VALUE))
}

/// Run one policy against a populated pipeline and project what the far
/// side observed.
pub async fn demonstrate(bridge: &Bridge, policy: BridgePolicy) -> Result<ContextResponse> {
    populated(bridge.observe(policy))
        .map(|observed| ContextResponse::project(&observed))
        .subscribe(Context::empty())
        .await
}

async fn respond(pipeline: Pipeline<Context>) -> std::result::Result<String, ApiError> {
    let response = pipeline
        .map(|ctx| ContextResponse::project(&ctx))
        .subscribe(Context::empty())
        .await?;
    Ok(response.to_string())
}

async fn bridged(state: &SharedState, policy: BridgePolicy) -> std::result::Result<String, ApiError> {
    if !state.policies.contains(&policy) {
        return Err(ApiError::PolicyDisabled(policy));
    }
    Ok(demonstrate(&state.bridge, policy).await?.to_string())
}

async fn default_handler() -> std::result::Result<String, ApiError> {
    respond(Pipeline::context()).await
}

async fn populated_handler() -> std::result::Result<String, ApiError> {
    respond(populated(Pipeline::context())).await
}

async fn run_blocking_handler(
    State(state): State<SharedState>,
) -> std::result::Result<String, ApiError> {
    bridged(&state, BridgePolicy::NoContext).await
}

async fn run_blocking_bridged_handler(
    State(state): State<SharedState>,
) -> std::result::Result<String, ApiError> {
    bridged(&state, BridgePolicy::BridgedOriginal).await
}

async fn run_blocking_init_handler(
    State(state): State<SharedState>,
) -> std::result::Result<String, ApiError> {
    bridged(&state, BridgePolicy::BridgedFabricated).await
}

async fn completable_future_handler(
    State(state): State<SharedState>,
) -> std::result::Result<String, ApiError> {
    bridged(&state, BridgePolicy::FutureBridgeNoContext).await
}

async fn completable_future_bridged_handler(
    State(state): State<SharedState>,
) -> std::result::Result<String, ApiError> {
    bridged(&state, BridgePolicy::FutureBridgeBridged).await
}
