//! Trogdor support error definitions.

use thiserror::Error as ThisError;

#[derive(ThisError, Debug)]
pub enum ParseError {
    #[error("unable to parse duration string '{0}'")]
    InvalidDuration(String),

    #[error("no port specified in '{0}'")]
    MissingPort(String),

    #[error("no hostname specified in '{0}'")]
    MissingHost(String),

    #[error("invalid port '{0}'")]
    InvalidPort(String),

    #[error("port {0} is out of range 0..=65535")]
    PortOutOfRange(i64),
}

#[derive(ThisError, Debug)]
pub enum ProcessError {
    #[error("daemonize: {0}")]
    Daemonize(#[from] nix::Error),
}
