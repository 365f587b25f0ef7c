//! The REST surface of the trogdor agent.
//!
//! | Method | Path      | Success response                              |
//! |--------|-----------|-----------------------------------------------|
//! | GET    | /status   | `{ started_time_ms, started_time_str }`       |
//! | GET    | /faults   | `[ { name, spec, status: { state } }, ... ]`  |
//! | PUT    | /faults   | `{}`                                          |
//! | PUT    | /shutdown | `{}`                                          |
//!
//! Handler failures become 400 responses with an `{"error": ...}` body;
//! unknown paths get a 404.

use std::sync::Arc;

use axum::{
    extract::State,
    middleware,
    routing::{get, put},
    Json, Router,
};
use platform::{
    http::{log_requests, unknown_path, ApiError},
    wire::{AddFaultRequest, FaultRecord, ServerStatus},
};
use serde_json::{json, Value};
use tracing::info;

use crate::Agent;

pub fn router(agent: Arc<Agent>) -> Router {
    Router::new()
        .route("/status", get(get_status))
        .route("/faults", get(get_faults).put(put_fault))
        .route("/shutdown", put(put_shutdown))
        .fallback(unknown_path)
        .layer(middleware::from_fn(log_requests))
        .with_state(agent)
}

async fn get_status(State(agent): State<Arc<Agent>>) -> Json<ServerStatus> {
    Json(agent.status())
}

async fn get_faults(State(agent): State<Arc<Agent>>) -> Json<Vec<FaultRecord>> {
    Json(agent.faults().await)
}

async fn put_fault(
    State(agent): State<Arc<Agent>>,
    body: String,
) -> Result<Json<Value>, ApiError> {
    info!("PUT /faults. text='{body}'");
    let request: AddFaultRequest = serde_json::from_str(&body)?;
    agent.add_fault(&request).await?;
    Ok(Json(json!({})))
}

async fn put_shutdown(State(agent): State<Arc<Agent>>) -> Json<Value> {
    agent.begin_shutdown().await;
    Json(json!({}))
}
