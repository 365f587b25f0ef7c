use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::debug;

use crate::{
    errors::PlatformError,
    fault::{FaultHandler, FaultSpec},
    registry::{Bundle, KindRegistration},
};

pub const NOOP_FAULT_KIND: &str = "NoOpFault";

/// The registration bundle holding the built-in fault kinds.
pub static FAULT_BUNDLE: Bundle = Bundle {
    name: "fault",
    kinds: &[KindRegistration {
        kind: NOOP_FAULT_KIND,
        build_spec: build_noop_spec,
    }],
    platforms: &[],
};

/// A fault that does nothing. Useful for exercising the scheduling machinery
/// end to end without disrupting anything.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NoOpFaultSpec {
    pub start_ms: i64,
    pub duration_ms: i64,
}

impl NoOpFaultSpec {
    pub fn new(start_ms: i64, duration_ms: i64) -> Self {
        Self {
            start_ms,
            duration_ms,
        }
    }
}

impl FaultSpec for NoOpFaultSpec {
    fn kind(&self) -> &'static str {
        NOOP_FAULT_KIND
    }

    fn start_ms(&self) -> i64 {
        self.start_ms
    }

    fn duration_ms(&self) -> i64 {
        self.duration_ms
    }

    fn to_value(&self) -> Value {
        json!({
            "kind": self.kind(),
            "start_ms": self.start_ms,
            "duration_ms": self.duration_ms,
        })
    }

    fn make_handler(&self, name: &str) -> Result<Box<dyn FaultHandler>, PlatformError> {
        Ok(Box::new(NoOpFaultHandler {
            name: name.to_owned(),
        }))
    }
}

fn build_noop_spec(payload: Map<String, Value>) -> Result<Arc<dyn FaultSpec>, PlatformError> {
    let spec: NoOpFaultSpec = serde_json::from_value(Value::Object(payload))
        .map_err(|err| PlatformError::Ingest(err.to_string()))?;
    if spec.duration_ms < 0 {
        return Err(PlatformError::Ingest(format!(
            "duration_ms must be non-negative, got {}",
            spec.duration_ms
        )));
    }
    Ok(Arc::new(spec))
}

struct NoOpFaultHandler {
    name: String,
}

impl FaultHandler for NoOpFaultHandler {
    fn activate(&mut self) -> anyhow::Result<()> {
        debug!("no-op fault '{}' activated", self.name);
        Ok(())
    }

    fn deactivate(&mut self) -> anyhow::Result<()> {
        debug!("no-op fault '{}' deactivated", self.name);
        Ok(())
    }
}
