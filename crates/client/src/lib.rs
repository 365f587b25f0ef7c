//! Blocking-style JSON/HTTP requests against the trogdor daemons. Used both
//! by the command line client and by the coordinator's node managers.

pub mod errors;

use platform::wire::{AddFaultRequest, ErrorBody, FaultRecord, ServerStatus};
use reqwest::Response;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::trace;

pub use crate::errors::ClientError;

/// Get the status of an agent or coordinator.
pub async fn get_agent_status(hostname: &str, port: u16) -> Result<ServerStatus, ClientError> {
    let url = format!("http://{hostname}:{port}/status");
    trace!("GET {url}");
    check(reqwest::get(&url).await?).await
}

/// Get the faults held by an agent, in start-time order.
pub async fn get_agent_faults(hostname: &str, port: u16) -> Result<Vec<FaultRecord>, ClientError> {
    let url = format!("http://{hostname}:{port}/faults");
    trace!("GET {url}");
    check(reqwest::get(&url).await?).await
}

/// Add a new fault to an agent.
pub async fn add_agent_fault(
    hostname: &str,
    port: u16,
    request: &AddFaultRequest,
) -> Result<Value, ClientError> {
    let url = format!("http://{hostname}:{port}/faults");
    trace!("PUT {url}");
    let response = reqwest::Client::new()
        .put(&url)
        .json(request)
        .send()
        .await?;
    check(response).await
}

/// Shut an agent down cleanly.
pub async fn shutdown_agent(hostname: &str, port: u16) -> Result<Value, ClientError> {
    let url = format!("http://{hostname}:{port}/shutdown");
    trace!("PUT {url}");
    let response = reqwest::Client::new().put(&url).send().await?;
    check(response).await
}

/// Fail on any status >= 400, surfacing the daemon's `{"error": ...}` body
/// when one is present; otherwise decode the JSON response.
async fn check<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    let status = response.status();
    let body = response.text().await?;
    if status.as_u16() >= 400 {
        let message = serde_json::from_str::<ErrorBody>(&body)
            .map(|parsed| parsed.error)
            .unwrap_or(body);
        return Err(ClientError::Http {
            status: status.as_u16(),
            message,
        });
    }
    Ok(serde_json::from_str(&body)?)
}
