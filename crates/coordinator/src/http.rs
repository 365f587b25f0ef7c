//! The REST surface of the trogdor coordinator.
//!
//! | Method | Path      | Success response                                   |
//! |--------|-----------|----------------------------------------------------|
//! | GET    | /status   | `{ started_time_ms, started_time_str }`            |
//! | GET    | /nodes    | `{ nodes: { <name>: { hostname, agent_port, ... } } }` |
//! | PUT    | /shutdown | `{}`                                               |
//!
//! The error, 404 and logging contract matches the agent surface.

use std::sync::Arc;

use axum::{
    extract::State,
    middleware,
    routing::{get, put},
    Json, Router,
};
use platform::{
    http::{log_requests, unknown_path},
    wire::{NodesResponse, ServerStatus},
};
use serde_json::{json, Value};

use crate::Coordinator;

pub fn router(coordinator: Arc<Coordinator>) -> Router {
    Router::new()
        .route("/status", get(get_status))
        .route("/nodes", get(get_nodes))
        .route("/shutdown", put(put_shutdown))
        .fallback(unknown_path)
        .layer(middleware::from_fn(log_requests))
        .with_state(coordinator)
}

async fn get_status(State(coordinator): State<Arc<Coordinator>>) -> Json<ServerStatus> {
    Json(coordinator.status())
}

async fn get_nodes(State(coordinator): State<Arc<Coordinator>>) -> Json<NodesResponse> {
    Json(coordinator.nodes())
}

async fn put_shutdown(State(coordinator): State<Arc<Coordinator>>) -> Json<Value> {
    coordinator.begin_shutdown().await;
    Json(json!({}))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use platform::wire::NodesResponse;
    use support::clock::WallClock;

    use super::*;
    use crate::tests::test_platform;

    #[tokio::test]
    async fn the_rest_surface_should_report_status_and_nodes() {
        let coordinator = Coordinator::new(Arc::new(WallClock), test_platform(8888), 0, 10_000);
        let handle = coordinator.start().await.unwrap();
        let base = format!("http://{}", handle.local_addr);

        let status = client::get_agent_status("127.0.0.1", handle.local_addr.port())
            .await
            .unwrap();
        assert!(status.started_time_ms > 0);
        assert!(!status.started_time_str.is_empty());

        let nodes: NodesResponse = reqwest::get(format!("{base}/nodes"))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        let report = nodes.nodes.get("node01").unwrap();
        assert_eq!(report.hostname, "127.0.0.1");
        assert_eq!(report.agent_port, Some(8888));
        assert!(report.faults.is_empty());

        let response = reqwest::get(format!("{base}/nope")).await.unwrap();
        assert_eq!(response.status().as_u16(), 404);
        assert_eq!(response.text().await.unwrap(), "Unknown path /nope\n");

        client::shutdown_agent("127.0.0.1", handle.local_addr.port())
            .await
            .unwrap();
        tokio::time::timeout(Duration::from_secs(5), handle.wait_for_exit())
            .await
            .unwrap();
    }
}
