use tokio::{
    signal::unix::{signal, SignalKind},
    task::JoinHandle,
};
use tracing::warn;

/// Spawn the dedicated signal intake task.
///
/// SIGINT and SIGTERM log which signal ended the process and exit with
/// status 1. SIGUSR1 logs a dump of the runtime state. The actual OS signal
/// handler (inside tokio's signal driver) only writes to a self-pipe; all
/// logging happens on this task.
pub fn spawn_signal_task() -> JoinHandle<()> {
    tokio::spawn(async {
        let interrupt = SignalKind::interrupt();
        let terminate = SignalKind::terminate();
        let (mut sigint, mut sigterm, mut sigusr1) = match (
            signal(interrupt),
            signal(terminate),
            signal(SignalKind::user_defined1()),
        ) {
            (Ok(sigint), Ok(sigterm), Ok(sigusr1)) => (sigint, sigterm, sigusr1),
            _ => {
                warn!("unable to register signal handlers");
                return;
            }
        };
        loop {
            tokio::select! {
                _ = sigint.recv() => exit_on_signal(interrupt.as_raw_value()),
                _ = sigterm.recv() => exit_on_signal(terminate.as_raw_value()),
                _ = sigusr1.recv() => dump_runtime_state(),
            }
        }
    })
}

fn exit_on_signal(signum: i32) -> ! {
    warn!(
        "shutting down {} on signal {}",
        std::process::id(),
        signum
    );
    std::process::exit(1);
}

fn dump_runtime_state() {
    let metrics = tokio::runtime::Handle::current().metrics();
    warn!(
        "SIGUSR1: {} worker threads, {} live tasks",
        metrics.num_workers(),
        metrics.num_alive_tasks()
    );
}
