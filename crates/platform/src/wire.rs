//! The JSON datatypes exchanged between the client, the coordinator and the
//! agents.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{errors::PlatformError, fault::FaultState};

/// The observable status of a fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaultStatus {
    pub state: FaultState,
}

/// One fault as reported by `GET /faults`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaultRecord {
    pub name: String,
    pub spec: Value,
    pub status: FaultStatus,
}

/// The `PUT /faults` request body.
///
/// The timing of the new fault may be given inside `spec` itself
/// (`start_ms`/`duration_ms`) or through the top-level fields the client
/// composes from its command line; [`AddFaultRequest::resolve_spec`] folds
/// the top-level fields into the spec on ingest.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AddFaultRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spec: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time_ms: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time_ms_delta: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time_ms: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<i64>,
}

impl AddFaultRequest {
    pub fn new(name: impl Into<String>, spec: Value) -> Self {
        Self {
            name: Some(name.into()),
            spec: Some(spec),
            ..Self::default()
        }
    }

    /// Validate the request and produce the fault name plus the complete
    /// wire spec, resolving any top-level timing fields against `now_ms`.
    pub fn resolve_spec(&self, now_ms: i64) -> Result<(String, Value), PlatformError> {
        let name = self
            .name
            .clone()
            .ok_or_else(|| PlatformError::Ingest("you must supply a fault name".to_owned()))?;
        let mut spec = match &self.spec {
            Some(Value::Object(map)) => map.clone(),
            Some(other) => {
                return Err(PlatformError::Ingest(format!(
                    "the fault spec must be a JSON object, got {other}"
                )))
            }
            None => {
                return Err(PlatformError::Ingest(
                    "you must supply a fault spec".to_owned(),
                ))
            }
        };
        match (self.start_time_ms, self.start_time_ms_delta) {
            (Some(_), Some(_)) => {
                return Err(PlatformError::Ingest(
                    "supply either start_time_ms or start_time_ms_delta, not both".to_owned(),
                ))
            }
            (Some(start_ms), None) => {
                spec.insert("start_ms".to_owned(), start_ms.into());
            }
            (None, Some(delta_ms)) => {
                spec.insert("start_ms".to_owned(), now_ms.saturating_add(delta_ms).into());
            }
            (None, None) => {}
        }
        match (self.end_time_ms, self.duration_ms) {
            (Some(_), Some(_)) => {
                return Err(PlatformError::Ingest(
                    "supply either end_time_ms or duration_ms, not both".to_owned(),
                ))
            }
            (Some(end_ms), None) => {
                let start_ms = spec
                    .get("start_ms")
                    .and_then(Value::as_i64)
                    .ok_or_else(|| {
                        PlatformError::Ingest(
                            "end_time_ms requires a start time to compute the duration".to_owned(),
                        )
                    })?;
                if end_ms < start_ms {
                    return Err(PlatformError::Ingest(format!(
                        "end_time_ms {end_ms} is before the start time {start_ms}"
                    )));
                }
                spec.insert("duration_ms".to_owned(), (end_ms - start_ms).into());
            }
            (None, Some(duration_ms)) => {
                spec.insert("duration_ms".to_owned(), duration_ms.into());
            }
            (None, None) => {}
        }
        Ok((name, Value::Object(spec)))
    }
}

/// The `GET /status` response of both daemons.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerStatus {
    pub started_time_ms: i64,
    pub started_time_str: String,
}

/// The error body attached to 400 responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

/// The `GET /nodes` response of the coordinator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodesResponse {
    pub nodes: BTreeMap<String, NodeReport>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeReport {
    pub hostname: String,
    pub agent_port: Option<u16>,
    pub faults: Vec<FaultRecord>,
    /// Last successful exchange with the node in ms since the epoch, or 0 if
    /// it was never reached.
    pub last_contact: i64,
}
