//! Trogdor platform error definitions.

use thiserror::Error as ThisError;

#[derive(ThisError, Debug)]
pub enum PlatformError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid port {value} for node '{node}': must be in 0..=65535")]
    Port { node: String, value: i64 },

    #[error("failed to resolve '{symbol}' in {bundles}")]
    Resolution { symbol: String, bundles: String },

    #[error("invalid fault request: {0}")]
    Ingest(String),

    #[error("can't {action} fault '{fault}' in state '{state}'")]
    State {
        action: &'static str,
        fault: String,
        state: crate::fault::FaultState,
    },

    #[error("fault hook failed: {0}")]
    Hook(anyhow::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
