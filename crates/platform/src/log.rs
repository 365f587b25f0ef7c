use std::{fs::OpenOptions, io, sync::Mutex};

use tracing_subscriber::{
    filter::{EnvFilter, LevelFilter},
    fmt::{time::ChronoLocal, writer::BoxMakeWriter},
};

use crate::{config::DEFAULT_LOG_PATH, errors::PlatformError};

/// Install the process-wide log sink.
///
/// Events are written one per line with a level tag and an ISO-8601
/// timestamp carrying the local offset. The file writer sits behind a mutex,
/// so concurrent events never interleave. The default level is INFO;
/// `RUST_LOG` overrides it.
///
/// Tests create several daemons in one process, so a second initialization
/// is quietly ignored.
pub fn init_logging(path: &str) -> Result<(), PlatformError> {
    let writer = if path == DEFAULT_LOG_PATH {
        BoxMakeWriter::new(io::stdout)
    } else {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        BoxMakeWriter::new(Mutex::new(file))
    };
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(ChronoLocal::new("%FT%T%z".to_owned()))
        .with_ansi(false)
        .with_writer(writer)
        .try_init();
    Ok(())
}
