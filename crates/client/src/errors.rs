//! Trogdor client error definitions.

use thiserror::Error as ThisError;

#[derive(ThisError, Debug)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("HTTP status {status}: {message}")]
    Http { status: u16, message: String },

    #[error("invalid response body: {0}")]
    InvalidBody(#[from] serde_json::Error),
}
