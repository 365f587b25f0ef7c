//! The trogdor agent: the per-node daemon that owns and executes faults.
//!
//! The agent keeps its faults in a dual-ordered [`FaultSet`] and drives them
//! through their lifecycle on a single scheduler task, waking at the next
//! start or end boundary. The REST surface ingests new faults and exposes
//! the current state; see [`http`].

pub mod http;

use std::{net::SocketAddr, sync::Arc, time::Duration};

use platform::{
    fault::{FaultHandle, FaultSet, MAX_SCHEDULER_SLEEP_MS},
    wire::{AddFaultRequest, FaultRecord, ServerStatus},
    Platform, PlatformError,
};
use support::{clock::Clock, time::wall_clock_ms_to_str};
use tokio::{
    sync::{Mutex, Notify},
    task::JoinHandle,
    time::timeout,
};
use tokio_util::sync::CancellationToken;
use tracing::{info, trace, warn};

struct AgentState {
    faults: FaultSet,
    closing: bool,
}

/// The agent daemon. Shared between the scheduler task and the HTTP
/// handlers through an `Arc`.
pub struct Agent {
    clock: Arc<dyn Clock>,
    platform: Arc<Platform>,
    port: u16,
    started_time_ms: i64,
    state: Mutex<AgentState>,
    wake: Notify,
    shutdown: CancellationToken,
}

/// The long-lived tasks of a started agent.
pub struct AgentHandle {
    pub local_addr: SocketAddr,
    scheduler: JoinHandle<()>,
    server: JoinHandle<()>,
}

impl AgentHandle {
    /// Block until the agent has shut down and both tasks have exited.
    pub async fn wait_for_exit(self) {
        let _ = self.scheduler.await;
        let _ = self.server.await;
    }
}

impl Agent {
    pub fn new(clock: Arc<dyn Clock>, platform: Arc<Platform>, port: u16) -> Arc<Self> {
        let started_time_ms = clock.now_ms();
        Arc::new(Self {
            clock,
            platform,
            port,
            started_time_ms,
            state: Mutex::new(AgentState {
                faults: FaultSet::new(),
                closing: false,
            }),
            wake: Notify::new(),
            shutdown: CancellationToken::new(),
        })
    }

    /// Bind the REST listener and spawn the scheduler and server tasks.
    pub async fn start(self: &Arc<Self>) -> Result<AgentHandle, PlatformError> {
        let listener = platform::http::bind(self.port).await?;
        let local_addr = listener.local_addr()?;
        info!("starting trogdor agent on {local_addr}");
        let scheduler = tokio::spawn(self.clone().run_scheduler());
        let router = http::router(self.clone());
        let shutdown = self.shutdown.clone();
        let server = tokio::spawn(async move {
            if let Err(err) = platform::http::serve(listener, router, shutdown).await {
                warn!("agent http server error: {err}");
            }
        });
        Ok(AgentHandle {
            local_addr,
            scheduler,
            server,
        })
    }

    /// The scheduler loop: the single writer of fault state.
    ///
    /// Hooks run outside the lock, so ingest is never blocked on a slow
    /// activate or deactivate.
    async fn run_scheduler(self: Arc<Self>) {
        loop {
            let now = self.clock.now_ms();
            let (to_start, mut to_end, next_wakeup) = {
                let state = self.state.lock().await;
                let (to_start, start_wakeup) = state.faults.due_to_start(now);
                let (to_end, end_wakeup) = state.faults.due_to_end(now);
                (to_start, to_end, start_wakeup.min(end_wakeup))
            };
            for fault in to_start {
                match fault.start() {
                    // the fault's whole window may already be over
                    Ok(()) => {
                        if fault.end_ms() <= now {
                            to_end.push(fault);
                        }
                    }
                    Err(err) => warn!("failed to start fault '{}': {err}", fault.name()),
                }
            }
            for fault in to_end {
                if let Err(err) = fault.end() {
                    warn!("got an error when ending fault '{}': {err}", fault.name());
                }
            }
            {
                let state = self.state.lock().await;
                if state.closing {
                    break;
                }
                let delta = (next_wakeup - now).clamp(0, MAX_SCHEDULER_SLEEP_MS) as u64;
                trace!("{now}: waiting for {delta} ms");
                drop(state);
                let _ = timeout(Duration::from_millis(delta), self.wake.notified()).await;
            }
        }
        self.drain().await;
        info!("trogdor agent exiting");
        self.shutdown.cancel();
    }

    /// End every fault that is still active. Pending faults are dropped.
    async fn drain(&self) {
        let active: Vec<FaultHandle> = {
            let state = self.state.lock().await;
            state
                .faults
                .by_start_time()
                .filter(|fault| fault.is_active())
                .cloned()
                .collect()
        };
        for fault in active {
            if let Err(err) = fault.end() {
                warn!(
                    "got an error when ending fault '{}' on shutdown: {err}",
                    fault.name()
                );
            }
        }
    }

    pub fn status(&self) -> ServerStatus {
        ServerStatus {
            started_time_ms: self.started_time_ms,
            started_time_str: wall_clock_ms_to_str(self.started_time_ms),
        }
    }

    /// All faults, in start-time order.
    pub async fn faults(&self) -> Vec<FaultRecord> {
        let state = self.state.lock().await;
        state
            .faults
            .by_start_time()
            .map(|fault| fault.to_record())
            .collect()
    }

    /// Ingest a new fault and wake the scheduler.
    pub async fn add_fault(&self, request: &AddFaultRequest) -> Result<(), PlatformError> {
        let now = self.clock.now_ms();
        let (name, spec) = request.resolve_spec(now)?;
        let fault = self.platform.create_fault(&name, spec)?;
        let mut state = self.state.lock().await;
        if state.closing {
            return Err(PlatformError::Ingest(
                "the agent is shutting down".to_owned(),
            ));
        }
        if state.faults.contains_name(&name) {
            return Err(PlatformError::Ingest(format!(
                "a fault named '{name}' already exists"
            )));
        }
        state.faults.insert(fault);
        self.wake.notify_one();
        Ok(())
    }

    /// Request shutdown. Idempotent; returns once the intent is recorded,
    /// not once the daemon has exited.
    pub async fn begin_shutdown(&self) {
        let mut state = self.state.lock().await;
        if state.closing {
            return;
        }
        info!(
            "shutting down trogdor agent {} by request",
            std::process::id()
        );
        state.closing = true;
        self.wake.notify_one();
    }

    /// Wake the scheduler loop so it re-reads the clock. Tests driving a
    /// mock clock call this after advancing it.
    pub fn wake_scheduler(&self) {
        self.wake.notify_one();
    }
}
